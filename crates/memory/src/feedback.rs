//! Feedback store — the append-only performance history.
//!
//! Records live in memory behind a mutex and the whole history is rewritten
//! to disk after every append. Writes go to a sibling temp file that is then
//! renamed over the target, so a crash never leaves a half-written array.
//!
//! Storage location: `~/.mizan/agent_feedback_loop.json`

use mizan_core::error::MemoryError;
use mizan_core::feedback::FeedbackRecord;
use mizan_core::role::AgentRole;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Mutex-owned history of evaluator verdicts.
pub struct FeedbackStore {
    path: PathBuf,
    history: Mutex<Vec<FeedbackRecord>>,
}

impl FeedbackStore {
    /// Open the store at `path`.
    ///
    /// A missing, unreadable or malformed file starts an empty history.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let history = Self::load_from_disk(&path);
        debug!(path = %path.display(), count = history.len(), "Feedback history loaded");
        Self {
            path,
            history: Mutex::new(history),
        }
    }

    fn load_from_disk(path: &Path) -> Vec<FeedbackRecord> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return Vec::new(), // File doesn't exist yet
        };

        match serde_json::from_str::<Vec<FeedbackRecord>>(&content) {
            Ok(records) => records,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Discarding malformed feedback history");
                Vec::new()
            }
        }
    }

    /// Append a record and persist the whole history.
    ///
    /// The lock is held across the write so concurrent appends are serialized.
    /// If persisting fails the record is removed again and the error returned.
    pub async fn record_feedback(&self, record: FeedbackRecord) -> Result<(), MemoryError> {
        let mut history = self.history.lock().await;
        history.push(record);

        if let Err(e) = self.persist(&history).await {
            history.pop();
            return Err(e);
        }

        debug!(path = %self.path.display(), count = history.len(), "Feedback recorded");
        Ok(())
    }

    /// The tip of the most recently appended successful record for `role`.
    ///
    /// Recency wins over magnitude: an older 0.99 loses to a newer 0.81.
    pub async fn best_tip(&self, role: AgentRole) -> Option<String> {
        let history = self.history.lock().await;
        history
            .iter()
            .rev()
            .find(|r| r.role == role && r.is_success())
            .map(|r| r.optimization_tip.clone())
    }

    /// A copy of the full history, oldest first.
    pub async fn records(&self) -> Vec<FeedbackRecord> {
        self.history.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.history.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.history.lock().await.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, history: &[FeedbackRecord]) -> Result<(), MemoryError> {
        let json = serde_json::to_string_pretty(history)
            .map_err(|e| MemoryError::Serialization(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                MemoryError::Storage(format!("Failed to create feedback directory: {e}"))
            })?;
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| MemoryError::Storage(format!("Failed to write feedback file: {e}")))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| MemoryError::Storage(format!("Failed to replace feedback file: {e}")))?;

        Ok(())
    }
}
