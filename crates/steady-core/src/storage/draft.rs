//! Draft persistence: the locally saved snapshot that makes a run
//! resumable after an interruption.
//!
//! Exactly one draft exists per device. It is written after every state
//! transition once the session has begun, read once at cold start, and
//! deleted on completion, explicit discard, or crisis exit. A corrupt or
//! unreadable file is treated as "no draft" -- resume is silently skipped.

use std::path::PathBuf;

use crate::error::DraftError;
use crate::flow::engine::FlowEngine;

use super::data_dir;

const DRAFT_FILE: &str = "draft.json";

pub struct DraftStore {
    path: PathBuf,
}

impl DraftStore {
    /// Store at the default data directory.
    pub fn open() -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            path: data_dir()?.join(DRAFT_FILE),
        })
    }

    /// Store at a specific path (for testing).
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// Persist the full engine snapshot, replacing any previous draft.
    pub fn save(&self, engine: &FlowEngine) -> Result<(), DraftError> {
        let data = serde_json::to_string(engine)?;
        std::fs::write(&self.path, data).map_err(|source| DraftError::WriteFailed {
            path: self.path.clone(),
            source,
        })
    }

    /// Read the draft back. Missing or unreadable drafts are `None`.
    pub fn load(&self) -> Option<FlowEngine> {
        let content = std::fs::read_to_string(&self.path).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Remove the draft. Succeeds when there is none.
    pub fn clear(&self) -> Result<(), DraftError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(DraftError::RemoveFailed {
                path: self.path.clone(),
                source,
            }),
        }
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::policy::{FlowPolicy, TimerConfig};
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> DraftStore {
        DraftStore::with_path(dir.path().join("draft.json"))
    }

    fn engine_mid_run() -> FlowEngine {
        let mut e = FlowEngine::new(FlowPolicy::default(), TimerConfig::default());
        e.confirm_prime("cli", false).unwrap();
        e.rate_pre(6).unwrap();
        e.skip_regulation().unwrap();
        e.rate_mid(3).unwrap();
        e.submit_capture(Some("stuck on a mistake")).unwrap();
        e
    }

    #[test]
    fn save_load_round_trip_is_identical() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let engine = engine_mid_run();

        store.save(&engine).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded, engine);
    }

    #[test]
    fn missing_draft_loads_as_none() {
        let dir = TempDir::new().unwrap();
        assert!(store(&dir).load().is_none());
    }

    #[test]
    fn corrupt_draft_loads_as_none() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        std::fs::write(dir.path().join("draft.json"), "{not json").unwrap();
        assert!(store.load().is_none());
    }

    #[test]
    fn clear_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.save(&engine_mid_run()).unwrap();
        assert!(store.exists());
        store.clear().unwrap();
        assert!(!store.exists());
        store.clear().unwrap();
    }
}
