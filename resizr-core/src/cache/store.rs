//! On-disk artifact layout for one durable cache tier
//!
//! Every entry is two files sharing the key as base name:
//! - `<key>` holds the raw content bytes
//! - `<key>.headers` holds the header manifest as JSON

use super::traits::CacheItem;
use crate::error::{Error, Result};
use crate::proxy::HeaderSet;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Suffix of files still being written
const TEMP_SUFFIX: &str = ".tmp";

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Extension of the header manifest
pub const MANIFEST_EXTENSION: &str = "headers";

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Open (and create if needed) the directory backing a tier
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| {
            Error::Persistence(format!("cannot create cache dir {}: {}", root.display(), e))
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn content_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    pub fn manifest_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.{}", key, MANIFEST_EXTENSION))
    }

    pub fn exists(&self, key: &str) -> bool {
        self.content_path(key).is_file()
    }

    pub fn load(&self, key: &str) -> Result<CacheItem> {
        let content = fs::read(self.content_path(key))
            .map_err(|e| Error::Persistence(format!("cannot read content {}: {}", key, e)))?;
        let manifest = fs::read(self.manifest_path(key))
            .map_err(|e| Error::Persistence(format!("cannot read manifest {}: {}", key, e)))?;
        let headers: HeaderSet = serde_json::from_slice(&manifest)
            .map_err(|e| Error::Persistence(format!("corrupt manifest {}: {}", key, e)))?;

        Ok(CacheItem::new(content, headers.sanitized()))
    }

    /// Write both artifacts; on failure the partial entry is removed.
    ///
    /// Each file is written to a temporary name and renamed into place, so a
    /// concurrent [`load`](Self::load) never reads a truncated blob.
    pub fn persist(&self, key: &str, item: &CacheItem) -> Result<()> {
        let manifest = serde_json::to_vec(&item.headers)?;

        let written = write_atomic(&self.content_path(key), &item.content)
            .and_then(|_| write_atomic(&self.manifest_path(key), &manifest));

        if let Err(e) = written {
            let _ = self.remove(key);
            return Err(Error::Persistence(format!("cannot write {}: {}", key, e)));
        }
        Ok(())
    }

    /// Delete both artifacts. Missing files are not an error.
    pub fn remove(&self, key: &str) -> Result<()> {
        let content = remove_if_present(&self.content_path(key));
        let manifest = remove_if_present(&self.manifest_path(key));
        content
            .and(manifest)
            .map_err(|e| Error::Persistence(format!("cannot delete {}: {}", key, e)))
    }

    /// Scan the directory.
    ///
    /// Returns the names of content blobs, oldest modification first, and the
    /// names of manifests that have no content blob.
    pub fn scan(&self) -> Result<(Vec<String>, Vec<String>)> {
        let mut blobs = Vec::new();
        let mut manifests = Vec::new();

        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let metadata = entry.metadata()?;
            if !metadata.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.ends_with(TEMP_SUFFIX) {
                log::debug!("removing interrupted write {}", name);
                remove_if_present(&entry.path())?;
                continue;
            }
            match name.strip_suffix(&format!(".{}", MANIFEST_EXTENSION)) {
                Some(key) => manifests.push(key.to_string()),
                None => blobs.push((metadata.modified().ok(), name)),
            }
        }

        blobs.sort();
        let keys: Vec<String> = blobs.into_iter().map(|(_, name)| name).collect();
        let known: HashSet<&str> = keys.iter().map(String::as_str).collect();
        let orphans = manifests.into_iter().filter(|m| !known.contains(m.as_str())).collect();
        Ok((keys, orphans))
    }
}

fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let mut temp = path.as_os_str().to_owned();
    temp.push(format!(".{}{}", n, TEMP_SUFFIX));
    let temp = PathBuf::from(temp);

    fs::write(&temp, data).and_then(|_| fs::rename(&temp, path)).map_err(|e| {
        let _ = fs::remove_file(&temp);
        e
    })
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}
