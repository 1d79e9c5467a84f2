//! Header sanitization shared by the upstream request and the cached response
//!
//! Transport framing is recomputed by whoever serves the bytes, so it is never
//! forwarded upstream, cached, or replayed from a cached snapshot.

use http::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Headers describing connection framing, matched case-insensitively
pub const TRANSPORT_HEADERS: [&str; 8] = [
    "content-length",
    "connection",
    "content-type",
    "transfer-encoding",
    "upgrade",
    "keep-alive",
    "te",
    "accept-ranges",
];

/// Extra request headers that only make sense for the inbound hop
const INBOUND_ONLY_HEADERS: [&str; 2] = ["host", "accept-encoding"];

pub fn is_transport_header(name: &str) -> bool {
    TRANSPORT_HEADERS.iter().any(|h| h.eq_ignore_ascii_case(name))
}

/// Ordered multi-map of lowercase header name to values.
///
/// Serialized as a JSON object (`{"name": ["v1", "v2"]}`) for the on-disk
/// manifest. Transport headers can never be stored in it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HeaderSet(BTreeMap<String, Vec<String>>);

impl HeaderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy every non-transport header out of an `http` header map
    pub fn from_header_map(map: &HeaderMap) -> Self {
        let mut set = Self::new();
        for (name, value) in map {
            set.append(name.as_str(), String::from_utf8_lossy(value.as_bytes()));
        }
        set
    }

    /// Add a value; transport headers are dropped silently.
    pub fn append(&mut self, name: &str, value: impl Into<String>) {
        if is_transport_header(name) {
            return;
        }
        self.0.entry(name.to_ascii_lowercase()).or_default().push(value.into());
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.0.get(&name.to_ascii_lowercase()).map(Vec::as_slice)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(&name.to_ascii_lowercase())
    }

    /// Number of distinct header names
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .flat_map(|(name, values)| values.iter().map(move |v| (name.as_str(), v.as_str())))
    }

    /// Re-apply the filter, e.g. after loading a manifest written by another build
    pub fn sanitized(self) -> Self {
        let mut set = Self::new();
        for (name, values) in self.0 {
            for value in values {
                set.append(&name, value);
            }
        }
        set
    }

    /// Convert back to an `http` header map, skipping entries that are not
    /// valid header names or values.
    pub fn to_header_map(&self) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in self.iter() {
            if is_transport_header(name) {
                continue;
            }
            if let (Ok(name), Ok(value)) =
                (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value))
            {
                map.append(name, value);
            }
        }
        map
    }
}

/// Inbound request headers that may be forwarded to the upstream image server
pub fn forwardable_request_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut forwarded = HeaderMap::new();
    for (name, value) in inbound {
        let name_str = name.as_str();
        if is_transport_header(name_str) || INBOUND_ONLY_HEADERS.contains(&name_str) {
            continue;
        }
        forwarded.append(name.clone(), value.clone());
    }
    forwarded
}
