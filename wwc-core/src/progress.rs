//! Per-paper wizard progress, persisted across sessions.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::StorageConfig;
use crate::error::StoreError;
use crate::persistence::{FileStore, KeyValueStore};
use crate::types::{Judgments, PaperId, Step};

/// Where a reviewer left off in the assessment wizard for one paper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WizardProgress {
    pub paper_id: PaperId,
    #[serde(default)]
    pub judgments: Judgments,
    #[serde(default)]
    pub current_step: Step,
}

impl WizardProgress {
    /// Fresh progress: default judgments at the first step.
    pub fn new(paper_id: PaperId) -> Self {
        Self {
            paper_id,
            judgments: Judgments::default(),
            current_step: Step::default(),
        }
    }
}

/// Namespaced progress records over a [`KeyValueStore`].
///
/// Loads never fail and saves never report: a missing or corrupt record
/// reads as "no saved progress", and a failed write is logged.
#[derive(Clone)]
pub struct ProgressStore {
    backend: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for ProgressStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressStore").finish_non_exhaustive()
    }
}

impl ProgressStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// File-backed store in the configured progress directory, falling back
    /// to the platform data directory.
    pub fn from_config(storage: &StorageConfig) -> Result<Self, StoreError> {
        let files = match &storage.progress_dir {
            Some(dir) => FileStore::new(dir),
            None => FileStore::default_location().ok_or(StoreError::NoDataDir)?,
        };
        debug!(dir = %files.dir().display(), "Using progress store");
        Ok(Self::new(Arc::new(files)))
    }

    pub fn key(paper_id: PaperId) -> String {
        format!("wwc-progress-{paper_id}")
    }

    pub fn load(&self, paper_id: PaperId) -> Option<WizardProgress> {
        let key = Self::key(paper_id);
        let raw = self.backend.get(&key)?;
        match serde_json::from_str::<WizardProgress>(&raw) {
            Ok(progress) if progress.paper_id == paper_id => Some(progress),
            Ok(progress) => {
                warn!(
                    key = %key,
                    stored = %progress.paper_id,
                    "Progress record belongs to another paper, ignoring"
                );
                None
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Malformed progress record, ignoring");
                None
            }
        }
    }

    pub fn load_or_default(&self, paper_id: PaperId) -> WizardProgress {
        self.load(paper_id)
            .unwrap_or_else(|| WizardProgress::new(paper_id))
    }

    /// Write `progress`, reporting failures to the caller.
    pub fn try_save(&self, progress: &WizardProgress) -> Result<(), StoreError> {
        let json = serde_json::to_string(progress).map_err(|e| StoreError::WriteFailed {
            paper_id: progress.paper_id,
            message: e.to_string(),
        })?;
        self.backend
            .set(&Self::key(progress.paper_id), &json)
            .map_err(|e| StoreError::WriteFailed {
                paper_id: progress.paper_id,
                message: e.to_string(),
            })
    }

    /// Fire-and-forget write. Failures are logged.
    pub fn save(&self, progress: &WizardProgress) {
        match self.try_save(progress) {
            Ok(()) => debug!(
                paper_id = %progress.paper_id,
                step = %progress.current_step,
                "Saved wizard progress"
            ),
            Err(e) => warn!(error = %e, "Failed to save wizard progress"),
        }
    }
}
