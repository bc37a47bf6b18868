//! Persisted key/value cache for probed video metadata and calibrated offsets.
//!
//! The cache is constructed explicitly, passed by reference into video
//! scanning and calibration, and flushed with [`Cache::save`]. Concurrent
//! processes writing the same file are not coordinated; the last writer wins.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{LaprenderError, LaprenderResult};

/// On-disk layout of the cache file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct CacheData {
    /// Opaque per-video metadata keyed by the joined, sorted filename list.
    videos: BTreeMap<String, serde_json::Value>,

    /// Calibrated frame offsets keyed by primary filename.
    offsets: BTreeMap<String, i64>,
}

/// Cache of per-video metadata and frame offsets.
#[derive(Debug, Clone)]
pub struct Cache {
    path: PathBuf,
    data: CacheData,
    dirty: bool,
}

impl Cache {
    /// Load the cache at `path`. A missing or unreadable file yields an empty cache.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let data = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(data) => data,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Ignoring corrupt cache");
                    CacheData::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => CacheData::default(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Cannot read cache");
                CacheData::default()
            }
        };
        Self {
            path,
            data,
            dirty: false,
        }
    }

    /// Load the cache from its standard location.
    pub fn open_default() -> Self {
        Self::load(cache_file_path())
    }

    /// File this cache is flushed to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether there are unsaved changes.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Prior metadata stored for a file set, if any.
    pub fn video_entry(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.videos.get(key)
    }

    /// Replace the metadata stored for a file set.
    pub fn set_video_entry(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.data.videos.insert(key.into(), value);
        self.dirty = true;
    }

    /// Calibrated frame offset for a primary filename.
    pub fn offset(&self, primary: &str) -> Option<i64> {
        self.data.offsets.get(primary).copied()
    }

    /// Record a calibrated frame offset.
    pub fn set_offset(&mut self, primary: impl Into<String>, offset: i64) {
        self.data.offsets.insert(primary.into(), offset);
        self.dirty = true;
    }

    /// Flush to disk, creating parent directories as needed.
    pub fn save(&mut self) -> LaprenderResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.data)?;
        std::fs::write(&self.path, json).map_err(|e| {
            LaprenderError::cache(format!("cannot write {}: {e}", self.path.display()))
        })?;
        self.dirty = false;
        tracing::debug!(path = %self.path.display(), "Cache saved");
        Ok(())
    }
}

/// Standard cache file location.
pub fn cache_file_path() -> PathBuf {
    crate::config::xdg_dir("XDG_CACHE_HOME", ".cache")
        .join("laprender")
        .join("cache.json")
}

/// Cache key for a set of files: the sorted paths joined with `;`.
pub fn file_set_key<P: AsRef<Path>>(files: &[P]) -> String {
    let mut names: Vec<String> = files
        .iter()
        .map(|p| p.as_ref().display().to_string())
        .collect();
    names.sort();
    names.join(";")
}
