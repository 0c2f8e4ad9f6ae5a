//! Run records
//!
//! Every pipeline run is persisted as a JSON file in the configured output
//! directory so runs can be listed and inspected later. File names sort
//! chronologically: `<utc-timestamp>-<run-id>.json`.

use crate::pipeline::state::PlannerState;
use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// A persisted pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    /// Unique run id
    pub id: String,

    /// RFC 3339 creation time (UTC)
    pub created_at: String,

    /// The command or question the run started from
    pub query: String,

    /// Final pipeline state
    pub state: PlannerState,
}

impl RunRecord {
    /// Build a record from a finished pipeline state.
    pub fn from_state(state: PlannerState) -> Self {
        let query = state
            .user_queries
            .first()
            .cloned()
            .unwrap_or_default();

        Self {
            id: Uuid::new_v4().to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            query,
            state,
        }
    }
}

/// JSON-file store for run records
pub struct RunStore {
    dir: PathBuf,
}

impl RunStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Persist a record; returns the file path written.
    pub fn save(&self, record: &RunRecord) -> Result<PathBuf, EngineError> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| EngineError::Store(format!("Failed to create output dir: {}", e)))?;

        let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%SZ");
        let path = self.dir.join(format!("{}-{}.json", stamp, record.id));

        let json = serde_json::to_string_pretty(record)
            .map_err(|e| EngineError::Store(format!("Failed to serialize run record: {}", e)))?;

        fs::write(&path, json)
            .map_err(|e| EngineError::Store(format!("Failed to write run record: {}", e)))?;

        debug!("Saved run record to {}", path.display());
        Ok(path)
    }

    /// Load one record from a path.
    pub fn load(path: &Path) -> Result<RunRecord, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Store(format!("Failed to read run record: {}", e)))?;

        serde_json::from_str(&contents)
            .map_err(|e| EngineError::Store(format!("Invalid run record: {}", e)))
    }

    /// The newest `limit` records, newest first.
    pub fn recent(&self, limit: usize) -> Result<Vec<RunRecord>, EngineError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut paths: Vec<PathBuf> = fs::read_dir(&self.dir)
            .map_err(|e| EngineError::Store(format!("Failed to list output dir: {}", e)))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();

        // Timestamped names sort chronologically
        paths.sort();
        paths.reverse();

        paths
            .iter()
            .take(limit)
            .map(|p| Self::load(p))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::state::{PlannerState, WorldContext};

    fn record(query: &str) -> RunRecord {
        RunRecord::from_state(PlannerState::new(query, WorldContext::default()))
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = RunStore::new(dir.path());

        let rec = record("stack the blocks");
        let path = store.save(&rec).unwrap();
        assert!(path.exists());

        let loaded = RunStore::load(&path).unwrap();
        assert_eq!(loaded.id, rec.id);
        assert_eq!(loaded.query, "stack the blocks");
        assert_eq!(loaded.state.user_queries, vec!["stack the blocks"]);
    }

    #[test]
    fn test_recent_returns_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = RunStore::new(dir.path());

        // Write with explicit names so ordering is deterministic
        for (name, query) in [
            ("20240101T000000Z-a.json", "first"),
            ("20240102T000000Z-b.json", "second"),
            ("20240103T000000Z-c.json", "third"),
        ] {
            let rec = record(query);
            let json = serde_json::to_string(&rec).unwrap();
            std::fs::write(dir.path().join(name), json).unwrap();
        }

        let recent = store.recent(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].query, "third");
        assert_eq!(recent[1].query, "second");
    }

    #[test]
    fn test_recent_missing_dir_is_empty() {
        let store = RunStore::new("/nonexistent/waypoint-test-dir");
        assert!(store.recent(10).unwrap().is_empty());
    }

    #[test]
    fn test_recent_ignores_non_json() {
        let dir = tempfile::tempdir().unwrap();
        let store = RunStore::new(dir.path());
        std::fs::write(dir.path().join("notes.txt"), "not a record").unwrap();

        assert!(store.recent(10).unwrap().is_empty());
    }
}
