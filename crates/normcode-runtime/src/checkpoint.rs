//! Durable snapshots, keyed by run id.
//!
//! The store is the only component that writes durably. One JSON file per
//! run under the store root, rewritten atomically (temp file + rename) on
//! every dirty cycle, so a snapshot observed at resume time is always
//! consistent with some cycle boundary.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use normcode_core::{ConceptId, FlowIndex, Inference, InferenceRepo, Reference};

use crate::blackboard::Blackboard;
use crate::orchestrator::RunState;
use crate::run::RunRecord;
use crate::workspace::WorkspaceTable;

/// How resume reconciles a snapshot with the (possibly edited) plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationMode {
    /// Re-run inferences whose working interpretation changed, and their
    /// downstream. The default.
    Patch,
    /// Restore verbatim; no re-validation.
    Overwrite,
    /// Only populate concepts missing a Reference; completed work is not
    /// disturbed.
    FillGaps,
}

#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("no snapshot for run `{0}`")]
    NotFound(String),
    #[error("snapshot is corrupt: {0}")]
    Corrupt(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything needed to resume a run at a cycle boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub record: RunRecord,
    pub blackboard: Blackboard,
    pub workspaces: WorkspaceTable,
    pub bindings: IndexMap<ConceptId, Reference>,
    /// Per-inference fingerprints for Patch reconciliation.
    pub fingerprints: IndexMap<FlowIndex, String>,
    pub state: RunState,
}

impl Snapshot {
    pub fn fingerprints_of(inferences: &InferenceRepo) -> IndexMap<FlowIndex, String> {
        inferences
            .iter()
            .map(|inf| (inf.flow_index.clone(), fingerprint(inf)))
            .collect()
    }
}

/// A working interpretation change is what invalidates an inference on
/// Patch resume.
pub fn fingerprint(inference: &Inference) -> String {
    serde_json::to_string(inference).expect("inference serializes")
}

/// File-backed snapshot store. Writes are serialized per run id by the
/// atomic rename.
pub struct CheckpointStore {
    root: PathBuf,
}

impl CheckpointStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_of(&self, run_id: &str) -> PathBuf {
        self.root.join(format!("{run_id}.json"))
    }

    pub fn save(&self, snapshot: &Snapshot) -> Result<(), CheckpointError> {
        std::fs::create_dir_all(&self.root)?;
        let path = self.path_of(&snapshot.record.run_id);
        let tmp = path.with_extension("json.tmp");
        let body = serde_json::to_vec_pretty(snapshot)
            .map_err(|e| CheckpointError::Corrupt(e.to_string()))?;
        std::fs::write(&tmp, body)?;
        std::fs::rename(&tmp, &path)?;
        info!(run_id = %snapshot.record.run_id, cycle = snapshot.record.cycle, "checkpoint written");
        Ok(())
    }

    pub fn load(&self, run_id: &str) -> Result<Snapshot, CheckpointError> {
        let path = self.path_of(run_id);
        if !path.exists() {
            return Err(CheckpointError::NotFound(run_id.to_string()));
        }
        let body = std::fs::read_to_string(path)?;
        serde_json::from_str(&body).map_err(|e| CheckpointError::Corrupt(e.to_string()))
    }

    pub fn exists(&self, run_id: &str) -> bool {
        self.path_of(run_id).exists()
    }

    /// Fork a run at its snapshot point: a new run id whose parent is the
    /// snapshot, saved immediately. Future mutations live on the new id.
    pub fn fork(&self, run_id: &str) -> Result<String, CheckpointError> {
        let snapshot = self.load(run_id)?;
        let new_id = uuid::Uuid::new_v4().to_string();
        let mut forked = snapshot;
        forked.record.parent = Some(run_id.to_string());
        forked.record.run_id = new_id.clone();
        forked.record.finished_at = None;
        self.save(&forked)?;
        Ok(new_id)
    }

    pub fn delete(&self, run_id: &str) -> Result<(), CheckpointError> {
        let path = self.path_of(run_id);
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    /// Run ids with a stored snapshot.
    pub fn list(&self) -> Result<Vec<String>, CheckpointError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().is_some_and(|e| e == "json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    out.push(stem.to_string());
                }
            }
        }
        out.sort();
        Ok(out)
    }
}

#[cfg(test)]
mod checkpoint_tests {
    use super::*;

    fn snapshot(run_id: &str, cycle: u64) -> Snapshot {
        Snapshot {
            record: RunRecord::new(run_id.to_string(), None),
            blackboard: Blackboard::default(),
            workspaces: WorkspaceTable::new(),
            bindings: IndexMap::new(),
            fingerprints: IndexMap::new(),
            state: RunState::Running,
        }
        .at_cycle(cycle)
    }

    impl Snapshot {
        fn at_cycle(mut self, cycle: u64) -> Self {
            self.record.cycle = cycle;
            self
        }
    }

    #[test]
    fn save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());
        let snap = snapshot("run-1", 5);
        store.save(&snap).unwrap();

        let loaded = store.load("run-1").unwrap();
        assert_eq!(loaded.record.run_id, "run-1");
        assert_eq!(loaded.record.cycle, 5);
        assert_eq!(loaded.state, RunState::Running);
    }

    #[test]
    fn missing_snapshot_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());
        assert!(matches!(
            store.load("ghost"),
            Err(CheckpointError::NotFound(_))
        ));
    }

    #[test]
    fn save_overwrites_previous_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());
        store.save(&snapshot("run-1", 1)).unwrap();
        store.save(&snapshot("run-1", 2)).unwrap();
        assert_eq!(store.load("run-1").unwrap().record.cycle, 2);
    }

    #[test]
    fn list_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());
        store.save(&snapshot("run-a", 1)).unwrap();
        store.save(&snapshot("run-b", 1)).unwrap();
        assert_eq!(store.list().unwrap(), vec!["run-a", "run-b"]);
        store.delete("run-a").unwrap();
        assert_eq!(store.list().unwrap(), vec!["run-b"]);
        assert!(!store.exists("run-a"));
    }
}
