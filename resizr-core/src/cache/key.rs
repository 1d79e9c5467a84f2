//! Cache key derivation

use sha2::{Digest, Sha512};

/// SHA-512 of `uri` as lowercase hex (128 chars).
///
/// Keys double as artifact file names, so they must stay filesystem safe.
pub fn cache_key(uri: &str) -> String {
    let mut hasher = Sha512::new();
    hasher.update(uri.as_bytes());
    hex::encode(hasher.finalize())
}

/// Whether `name` has the shape of a key produced by [`cache_key`]
pub fn is_cache_key(name: &str) -> bool {
    name.len() == 128 && name.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Canonical string for a resized variant: `{width}x{height}-{url}`
pub fn converted_uri(width: u32, height: u32, source_url: &str) -> String {
    format!("{}x{}-{}", width, height, source_url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_fixed_length_hex() {
        let key = cache_key("https://example.com/a.png");
        assert_eq!(key.len(), 128);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert!(is_cache_key(&key));
        assert!(!is_cache_key(".DS_Store"));
        assert!(!is_cache_key(&key.to_ascii_uppercase()));
    }

    #[test]
    fn test_key_is_deterministic() {
        assert_eq!(cache_key("a"), cache_key("a"));
        assert_ne!(cache_key("a"), cache_key("b"));
    }

    #[test]
    fn test_converted_uri_layout() {
        assert_eq!(converted_uri(50, 60, "example.com/x.jpg"), "50x60-example.com/x.jpg");
        assert_ne!(cache_key(&converted_uri(50, 60, "u")), cache_key(&converted_uri(60, 50, "u")));
    }
}
