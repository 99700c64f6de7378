//! On-disk response cache with a fixed time-to-live.
//!
//! Each key maps to `<dir>/<md5(key)>.cache`, a JSON document holding the
//! expiry (unix seconds) and the cached value.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Duration;
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CacheError;
use crate::rate_limiter::{Clock, SystemClock};

const CACHE_EXTENSION: &str = "cache";

#[derive(Debug, Serialize, Deserialize)]
struct CacheRecord {
    expires_at: i64,
    content: Value,
}

pub struct ResponseCache {
    dir: PathBuf,
    ttl: Duration,
    enabled: bool,
    clock: Box<dyn Clock>,
}

impl ResponseCache {
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration, enabled: bool) -> Self {
        Self::with_clock(dir, ttl, enabled, SystemClock)
    }

    pub fn with_clock(dir: impl Into<PathBuf>, ttl: Duration, enabled: bool, clock: impl Clock + 'static) -> Self {
        ResponseCache {
            dir: dir.into(),
            ttl,
            enabled,
            clock: Box::new(clock),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        let digest = md5::compute(key.as_bytes());
        self.dir.join(format!("{:x}.{}", digest, CACHE_EXTENSION))
    }

    fn now_secs(&self) -> i64 {
        self.clock.now().timestamp()
    }

    fn read_record(path: &Path) -> Option<CacheRecord> {
        let contents = fs::read_to_string(path).ok()?;
        serde_json::from_str(&contents).ok()
    }

    /// Cached value for `key`. Missing, unreadable, expired and undecodable
    /// entries are all misses; expired files are removed.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        if !self.enabled {
            return None;
        }

        let path = self.path_for(key);
        let record = Self::read_record(&path)?;

        if record.expires_at < self.now_secs() {
            debug!("[CACHE] Expired entry for '{}'", key);
            if let Err(e) = fs::remove_file(&path) {
                warn!("[CACHE] Failed to remove expired entry {:?}: {}", path, e);
            }
            return None;
        }

        match serde_json::from_value(record.content) {
            Ok(value) => {
                debug!("[CACHE] Hit for '{}'", key);
                Some(value)
            }
            Err(e) => {
                warn!("[CACHE] Undecodable entry for '{}': {}", key, e);
                None
            }
        }
    }

    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), CacheError> {
        if !self.enabled {
            return Ok(());
        }

        fs::create_dir_all(&self.dir)?;
        let record = CacheRecord {
            expires_at: self.now_secs() + self.ttl.num_seconds(),
            content: serde_json::to_value(value)?,
        };
        fs::write(self.path_for(key), serde_json::to_vec(&record)?)?;
        debug!("[CACHE] Stored '{}'", key);
        Ok(())
    }

    /// Deletes every expired cache file and returns how many were removed.
    /// Files that are not cache records are left alone.
    pub fn purge_expired(&self) -> Result<usize, CacheError> {
        if !self.enabled || !self.dir.exists() {
            return Ok(0);
        }

        let now = self.now_secs();
        let mut removed = 0;
        for dir_entry in fs::read_dir(&self.dir)? {
            let path = dir_entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(CACHE_EXTENSION) {
                continue;
            }
            let Some(record) = Self::read_record(&path) else {
                continue;
            };
            if record.expires_at < now {
                fs::remove_file(&path)?;
                removed += 1;
            }
        }

        debug!("[CACHE] Purged {} expired entries from {:?}", removed, self.dir);
        Ok(removed)
    }
}
