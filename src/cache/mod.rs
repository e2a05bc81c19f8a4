//! Content-addressed result cache.
//!
//! Entries are keyed by (artifact path, analysis kind) and validated
//! against the artifact's current content hash and the tool's schema
//! version. Any mismatch is treated as a miss and evicts the stale
//! entry, so cache corruption self-heals without surfacing errors.
//!
//! Persistence is a single JSON map written to the platform cache
//! directory: loaded at startup (already-expired entries discarded)
//! and flushed on shutdown.

mod tracker;

pub use tracker::ModificationTracker;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::config::{CacheConfig, SCHEMA_VERSION};
use crate::findings::AnalysisResult;

/// What kind of analysis produced an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisKind {
    File,
    Workspace,
}

impl AnalysisKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisKind::File => "file",
            AnalysisKind::Workspace => "workspace",
        }
    }
}

/// One cached result with its validity metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub data: AnalysisResult,
    pub timestamp_ms: u64,
    pub content_hash: String,
    pub schema_version: String,
}

/// In-memory result cache with optional file persistence.
pub struct ResultCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
    max_entries: usize,
    persist_path: Option<PathBuf>,
}

impl ResultCache {
    /// Create a cache from config. When persistence is enabled the
    /// previous session's entries are loaded, dropping any that have
    /// already expired.
    pub fn new(config: &CacheConfig) -> Self {
        let persist_path = if config.persist {
            default_persist_path()
        } else {
            None
        };

        let cache = Self {
            entries: RwLock::new(HashMap::new()),
            ttl: Duration::from_secs(config.ttl_secs),
            max_entries: config.max_entries,
            persist_path,
        };
        cache.load();
        cache
    }

    /// Cache with explicit TTL and capacity, no persistence. Used by
    /// tests and embedders that manage their own lifecycle.
    pub fn with_ttl(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            max_entries,
            persist_path: None,
        }
    }

    /// Cache persisted at an explicit path instead of the platform
    /// cache directory. Loads surviving entries like [`ResultCache::new`].
    pub fn with_persist_path(ttl: Duration, max_entries: usize, path: PathBuf) -> Self {
        let cache = Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            max_entries,
            persist_path: Some(path),
        };
        cache.load();
        cache
    }

    fn cache_key(path: &str, kind: AnalysisKind) -> String {
        format!("{}:{}", kind.as_str(), path)
    }

    /// Look up a result. Misses on absent, expired, content-hash
    /// mismatched, or schema-version mismatched entries; everything
    /// but a plain absence also evicts the stale entry.
    pub fn get(&self, path: &str, kind: AnalysisKind, content_hash: &str) -> Option<AnalysisResult> {
        let key = Self::cache_key(path, kind);
        let now = now_ms();

        let mut entries = match self.entries.write() {
            Ok(e) => e,
            Err(_) => return None,
        };

        let valid = match entries.get(&key) {
            None => return None,
            Some(entry) => {
                !expired(entry, now, self.ttl)
                    && entry.content_hash == content_hash
                    && entry.schema_version == SCHEMA_VERSION
            }
        };

        if valid {
            entries.get(&key).map(|e| e.data.clone())
        } else {
            entries.remove(&key);
            None
        }
    }

    /// Store a result. At capacity the entry with the oldest
    /// timestamp is evicted first.
    pub fn set(&self, path: &str, kind: AnalysisKind, data: AnalysisResult, content_hash: &str) {
        let key = Self::cache_key(path, kind);
        let entry = CacheEntry {
            data,
            timestamp_ms: now_ms(),
            content_hash: content_hash.to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
        };

        if let Ok(mut entries) = self.entries.write() {
            if !entries.contains_key(&key) && entries.len() >= self.max_entries {
                if let Some(oldest) = entries
                    .iter()
                    .min_by_key(|(_, e)| e.timestamp_ms)
                    .map(|(k, _)| k.clone())
                {
                    entries.remove(&oldest);
                }
            }
            entries.insert(key, entry);
        }

        if self.persist_path.is_some() {
            self.flush();
        }
    }

    /// Drop every entry for a path, regardless of kind.
    pub fn invalidate(&self, path: &str) {
        if let Ok(mut entries) = self.entries.write() {
            entries.remove(&Self::cache_key(path, AnalysisKind::File));
            entries.remove(&Self::cache_key(path, AnalysisKind::Workspace));
        }
    }

    /// Remove all expired entries. Runs under the write lock so it
    /// never interleaves with an in-flight `set`.
    pub fn sweep(&self) -> usize {
        let now = now_ms();
        if let Ok(mut entries) = self.entries.write() {
            let before = entries.len();
            entries.retain(|_, e| !expired(e, now, self.ttl));
            before - entries.len()
        } else {
            0
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Load persisted entries, discarding expired ones.
    fn load(&self) {
        let Some(path) = &self.persist_path else {
            return;
        };
        let Ok(content) = std::fs::read_to_string(path) else {
            return;
        };
        let Ok(map) = serde_json::from_str::<HashMap<String, CacheEntry>>(&content) else {
            return;
        };

        let now = now_ms();
        if let Ok(mut entries) = self.entries.write() {
            for (key, entry) in map {
                if !expired(&entry, now, self.ttl) && entry.schema_version == SCHEMA_VERSION {
                    entries.insert(key, entry);
                }
            }
        }
    }

    /// Write the full map to the persistence file. Called on shutdown
    /// and after every write-through `set`.
    pub fn flush(&self) {
        let Some(path) = &self.persist_path else {
            return;
        };
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Ok(entries) = self.entries.read() {
            if let Ok(json) = serde_json::to_string(&*entries) {
                let _ = std::fs::write(path, json);
            }
        }
    }
}

/// Spawn the periodic expiry sweep for a shared cache.
pub fn spawn_sweeper(
    cache: std::sync::Arc<ResultCache>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // first tick fires immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            cache.sweep();
        }
    })
}

fn expired(entry: &CacheEntry, now: u64, ttl: Duration) -> bool {
    now.saturating_sub(entry.timestamp_ms) > ttl.as_millis() as u64
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}

fn default_persist_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "gatecheck").map(|dirs| dirs.cache_dir().join("results.json"))
}
