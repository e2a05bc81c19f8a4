//! Incremental modification tracking.
//!
//! Keeps a monotonically increasing version counter and a dirty flag
//! per artifact so workspace-wide re-runs can skip paths that have not
//! changed since their last consumed analysis.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

#[derive(Default)]
pub struct ModificationTracker {
    inner: RwLock<TrackerState>,
}

#[derive(Default)]
struct TrackerState {
    versions: HashMap<String, u64>,
    dirty: HashSet<String>,
}

impl ModificationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an observed modification. Bumps the version counter and
    /// marks the artifact dirty. Returns the new version.
    pub fn record_change(&self, path: &str) -> u64 {
        let mut state = match self.inner.write() {
            Ok(s) => s,
            Err(_) => return 0,
        };
        let version = state.versions.entry(path.to_string()).or_insert(0);
        *version += 1;
        let version = *version;
        state.dirty.insert(path.to_string());
        version
    }

    /// Clear the dirty flag after an analysis for the artifact has
    /// been consumed. Registers the path so it no longer counts as
    /// unknown (and therefore dirty).
    pub fn mark_consumed(&self, path: &str) {
        if let Ok(mut state) = self.inner.write() {
            state.versions.entry(path.to_string()).or_insert(0);
            state.dirty.remove(path);
        }
    }

    /// Whether the artifact changed since its analysis was last
    /// consumed. Unknown paths are dirty by definition.
    pub fn is_dirty(&self, path: &str) -> bool {
        match self.inner.read() {
            Ok(state) => state.dirty.contains(path) || !state.versions.contains_key(path),
            Err(_) => true,
        }
    }

    /// Current version counter for an artifact (0 if never seen).
    pub fn version(&self, path: &str) -> u64 {
        self.inner
            .read()
            .ok()
            .and_then(|s| s.versions.get(path).copied())
            .unwrap_or(0)
    }

    /// Snapshot of all currently dirty paths.
    pub fn dirty_paths(&self) -> Vec<String> {
        self.inner
            .read()
            .map(|s| s.dirty.iter().cloned().collect())
            .unwrap_or_default()
    }
}
