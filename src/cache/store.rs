//! Expiring key-value store persisted as JSON files
//!
//! Each entry lives in its own file named after the SHA-256 of its key, so
//! arbitrary human-readable keys (`hn/top:30`, `github_trending`) map to
//! distinct, filesystem-safe slots. Entries carry the time they were stored and
//! are only returned while younger than the configured TTL.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tempfile::Builder;
use thiserror::Error;
use tracing::{debug, warn};

/// File extension of entry files inside the cache directory
const ENTRY_EXTENSION: &str = "json";

/// Name prefix of in-flight writes; anything left with it was never persisted
const TEMP_PREFIX: &str = ".partial-";

/// Temp files older than this are treated as abandoned by `purge_expired`
const STALE_TEMP_AGE: Duration = Duration::from_secs(60);

/// Caching behaviour handed to the store at construction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheSettings {
    /// When false the store never keeps anything
    pub enabled: bool,
    /// Maximum age of an entry that is still served
    pub ttl: Duration,
}

impl CacheSettings {
    /// Builds settings from a TTL expressed in (possibly fractional) hours.
    ///
    /// Negative or non-finite values are clamped to zero; the config loader
    /// rejects them before they reach this point.
    pub fn from_hours(enabled: bool, ttl_hours: f64) -> Self {
        let secs = if ttl_hours.is_finite() && ttl_hours > 0.0 {
            ttl_hours * 3600.0
        } else {
            0.0
        };
        Self {
            enabled,
            ttl: Duration::from_secs_f64(secs),
        }
    }

    /// Settings that turn the store into a no-op
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ttl: Duration::ZERO,
        }
    }
}

/// On-disk representation of a single entry
#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry<T> {
    /// Logical key, kept so a slot can be checked against the key that asked for it
    key: String,
    /// When the entry was written
    cached_at: DateTime<Utc>,
    /// The cached payload
    data: T,
}

/// A value read back from the store together with its write time
#[derive(Debug, Clone, PartialEq)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

/// Reasons a stored entry cannot be used. Never leaves this module: every
/// variant is downgraded to a cache miss.
#[derive(Debug, Error)]
enum CacheCorruption {
    #[error("unreadable entry: {0}")]
    Io(#[from] io::Error),

    #[error("malformed entry: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("entry belongs to key '{0}'")]
    KeyMismatch(String),
}

/// Outcome of looking at one entry file
enum Lookup<T> {
    Missing,
    Fresh(CachedData<T>),
    Expired,
    Corrupt(CacheCorruption),
}

/// TTL-bounded store for fetched data
///
/// The store is a plain value: construct it once at startup and share it
/// (typically behind an `Arc`) with everything that needs caching. All
/// operations take `&self` and touch only the file belonging to the key, so
/// concurrent use on distinct keys does not interfere.
#[derive(Debug, Clone)]
pub struct ExpiringStore {
    /// Directory holding one file per entry
    cache_dir: PathBuf,
    settings: CacheSettings,
}

impl ExpiringStore {
    /// Creates a store in the XDG cache directory (`~/.cache/news-agent/` on Linux).
    ///
    /// Returns `None` if no home directory can be determined.
    pub fn new(settings: CacheSettings) -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "news-agent")?;
        Some(Self::with_dir(project_dirs.cache_dir().to_path_buf(), settings))
    }

    /// Creates a store rooted at `cache_dir`
    pub fn with_dir(cache_dir: PathBuf, settings: CacheSettings) -> Self {
        Self {
            cache_dir,
            settings,
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn settings(&self) -> CacheSettings {
        self.settings
    }

    /// Maps a logical key to its storage identifier.
    ///
    /// The hex SHA-256 digest is deterministic and collision resistant, so
    /// keys differing only in characters like `/` or `:` land in different files.
    pub fn storage_id(key: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        hex::encode(hasher.finalize())
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.cache_dir
            .join(format!("{}.{}", Self::storage_id(key), ENTRY_EXTENSION))
    }

    /// Stores `value` under `key`, replacing any previous entry and resetting its age.
    ///
    /// Storage failures are logged and swallowed; a failed write simply means
    /// the next `get` misses.
    pub fn set<T: Serialize>(&self, key: &str, value: &T) {
        if !self.settings.enabled {
            return;
        }

        if let Err(e) = self.write_entry(key, value) {
            warn!(key = %key, error = %e, "Failed to write cache entry");
        } else {
            debug!(key = %key, "Cached entry");
        }
    }

    /// Serializes the entry to a temp file in the cache directory and renames it
    /// into place, so readers see either the previous file or the new one.
    fn write_entry<T: Serialize>(&self, key: &str, value: &T) -> io::Result<()> {
        fs::create_dir_all(&self.cache_dir)?;

        let entry = CacheEntry {
            key: key.to_string(),
            cached_at: Utc::now(),
            data: value,
        };
        let json = serde_json::to_vec(&entry)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut tmp = Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(".tmp")
            .tempfile_in(&self.cache_dir)?;
        tmp.write_all(&json)?;
        tmp.flush()?;
        tmp.persist(self.entry_path(key)).map_err(|e| e.error)?;
        Ok(())
    }

    /// Returns the value stored under `key` if it is younger than the TTL
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get_entry(key).map(|cached| cached.data)
    }

    /// Like [`get`](Self::get), but also returns when the entry was written.
    ///
    /// Expired and corrupt entries are removed as a side effect.
    pub fn get_entry<T: DeserializeOwned>(&self, key: &str) -> Option<CachedData<T>> {
        if !self.settings.enabled {
            return None;
        }

        let path = self.entry_path(key);
        match self.inspect::<T>(&path, Some(key)) {
            Lookup::Fresh(cached) => {
                debug!(key = %key, "Cache hit");
                Some(cached)
            }
            Lookup::Missing => {
                debug!(key = %key, "Cache miss");
                None
            }
            Lookup::Expired => {
                debug!(key = %key, "Cache entry expired");
                remove_quietly(&path);
                None
            }
            Lookup::Corrupt(reason) => {
                debug!(key = %key, reason = %reason, "Discarding corrupt cache entry");
                remove_quietly(&path);
                None
            }
        }
    }

    /// Reads and classifies the entry file at `path`.
    ///
    /// `expected_key` is checked against the key embedded in the entry when given.
    fn inspect<T: DeserializeOwned>(&self, path: &Path, expected_key: Option<&str>) -> Lookup<T> {
        let content = match fs::read(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Lookup::Missing,
            Err(e) => return Lookup::Corrupt(e.into()),
        };

        let entry: CacheEntry<T> = match serde_json::from_slice(&content) {
            Ok(entry) => entry,
            Err(e) => return Lookup::Corrupt(e.into()),
        };

        if let Some(expected) = expected_key {
            if entry.key != expected {
                return Lookup::Corrupt(CacheCorruption::KeyMismatch(entry.key));
            }
        }

        if self.is_expired(entry.cached_at) {
            return Lookup::Expired;
        }

        Lookup::Fresh(CachedData {
            data: entry.data,
            cached_at: entry.cached_at,
        })
    }

    /// An entry is valid while `now - cached_at <= ttl`.
    fn is_expired(&self, cached_at: DateTime<Utc>) -> bool {
        // An entry from the future (clock moved backwards) counts as age zero.
        let age = (Utc::now() - cached_at).to_std().unwrap_or(Duration::ZERO);
        age > self.settings.ttl
    }

    /// Removes the entry for `key`, or every entry when `key` is `None`.
    ///
    /// Clearing something that is not there is a no-op. A full clear also
    /// removes leftover temp files from interrupted writes.
    pub fn clear(&self, key: Option<&str>) {
        if !self.settings.enabled {
            return;
        }

        match key {
            Some(key) => {
                remove_quietly(&self.entry_path(key));
            }
            None => {
                self.wipe();
            }
        }
    }

    /// Removes every entry and temp file in the cache directory, even when the
    /// store is disabled, and returns how many files were removed.
    ///
    /// This backs the explicit `--clear-cache` action: files written while
    /// caching was enabled must still be removable after it was turned off.
    pub fn wipe(&self) -> usize {
        let removed = self
            .entry_files()
            .into_iter()
            .chain(self.temp_files())
            .filter(|path| remove_quietly(path))
            .count();
        debug!(removed, dir = %self.cache_dir.display(), "Wiped cache directory");
        removed
    }

    /// Deletes every expired or unreadable entry and returns how many were removed
    pub fn purge_expired(&self) -> usize {
        if !self.settings.enabled {
            return 0;
        }

        let mut removed = 0;
        for path in self.entry_files() {
            match self.inspect::<serde_json::Value>(&path, None) {
                Lookup::Expired | Lookup::Corrupt(_) => {
                    remove_quietly(&path);
                    removed += 1;
                }
                Lookup::Fresh(_) | Lookup::Missing => {}
            }
        }
        for path in self.temp_files() {
            if is_abandoned(&path) && remove_quietly(&path) {
                removed += 1;
            }
        }
        debug!(removed, "Purged stale cache entries");
        removed
    }

    /// Lists the entry files in the cache directory
    fn entry_files(&self) -> Vec<PathBuf> {
        self.files_matching(|path| path.extension().is_some_and(|ext| ext == ENTRY_EXTENSION))
    }

    /// Lists temp files left by writes that never reached `persist`
    fn temp_files(&self) -> Vec<PathBuf> {
        self.files_matching(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(TEMP_PREFIX))
        })
    }

    fn files_matching(&self, predicate: impl Fn(&Path) -> bool) -> Vec<PathBuf> {
        let Ok(dir) = fs::read_dir(&self.cache_dir) else {
            return Vec::new();
        };

        dir.filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| predicate(path))
            .collect()
    }
}

/// A temp file nobody has touched for a while; younger ones may be in flight
fn is_abandoned(path: &Path) -> bool {
    fs::metadata(path)
        .and_then(|meta| meta.modified())
        .ok()
        .and_then(|modified| modified.elapsed().ok())
        .is_some_and(|age| age > STALE_TEMP_AGE)
}

/// Best-effort file removal; a missing file is not worth reporting.
/// Returns true if the file was removed.
fn remove_quietly(path: &Path) -> bool {
    match fs::remove_file(path) {
        Ok(()) => true,
        Err(e) => {
            if e.kind() != io::ErrorKind::NotFound {
                warn!(path = %path.display(), error = %e, "Failed to remove cache entry");
            }
            false
        }
    }
}
