//! Concurrent per-process state store.
//!
//! Each process lives behind its own mutex; the outer map lock is held
//! only long enough to resolve the entry, so unrelated processes never
//! serialize on each other. Mutations never span a backend call: stage
//! handlers read, release, call out, then write.
//!
//! When built with a snapshot directory, every mutation writes the full
//! entry as JSON under `<dir>/<process_id>/process.json` (best-effort,
//! warn-logged) so status queries survive across invocations.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::domain::{PayloadField, PipelineError, Process, ProcessPayload};

/// Everything the store tracks for one process
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ProcessEntry {
    process: Process,
    payload: ProcessPayload,
    titles: Vec<String>,
    failed: bool,
}

/// Thread-safe store of per-process state
pub struct ProcessStore {
    entries: RwLock<HashMap<String, Arc<Mutex<ProcessEntry>>>>,
    snapshot_dir: Option<PathBuf>,
}

impl ProcessStore {
    /// Purely in-memory store (tests, embedded use)
    pub fn in_memory() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            snapshot_dir: None,
        }
    }

    /// Store that snapshots every mutation under `dir`
    pub fn persistent(dir: impl Into<PathBuf>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            snapshot_dir: Some(dir.into()),
        }
    }

    /// Create a process with its payload, atomically.
    ///
    /// Fails with `AlreadyExists` when the id was used before, including
    /// ids only present as snapshots from an earlier run.
    pub async fn create(
        &self,
        process_id: &str,
        payload: ProcessPayload,
    ) -> Result<(), PipelineError> {
        let mut entries = self.entries.write().await;

        if entries.contains_key(process_id) || self.snapshot_exists(process_id).await {
            return Err(PipelineError::AlreadyExists(process_id.to_string()));
        }

        let entry = ProcessEntry {
            process: Process::new(process_id.to_string()),
            payload,
            titles: Vec::new(),
            failed: false,
        };
        self.persist(&entry).await;

        entries.insert(process_id.to_string(), Arc::new(Mutex::new(entry)));
        Ok(())
    }

    async fn entry(&self, process_id: &str) -> Option<Arc<Mutex<ProcessEntry>>> {
        self.entries.read().await.get(process_id).cloned()
    }

    /// Run a mutation against one entry, then snapshot it
    async fn mutate<R>(
        &self,
        process_id: &str,
        f: impl FnOnce(&mut ProcessEntry) -> R,
    ) -> Option<R> {
        let entry = self.entry(process_id).await?;
        let mut guard = entry.lock().await;
        guard.process.last_updated_at = Utc::now();
        let result = f(&mut guard);
        self.persist(&guard).await;
        Some(result)
    }

    /// Update the stage label and progress.
    ///
    /// Unknown ids are logged and ignored so late or racing updates can
    /// never crash a stage handler. The percentage only moves up while a
    /// process is in progress; stale lower values are clamped.
    pub async fn update_status(&self, process_id: &str, stage_label: &str, percent: u8) {
        let updated = self
            .mutate(process_id, |entry| {
                entry.process.stage = stage_label.to_string();
                entry.process.progress_percent =
                    entry.process.progress_percent.max(percent.min(100));
            })
            .await;

        if updated.is_none() {
            warn!(process_id, stage_label, "Status update for unknown process");
        }
    }

    /// Mutate exactly one payload field
    pub async fn set_field(
        &self,
        process_id: &str,
        field: PayloadField,
    ) -> Result<(), PipelineError> {
        self.mutate(process_id, |entry| match field {
            PayloadField::Title(v) => entry.payload.title = Some(v),
            PayloadField::Content(v) => entry.payload.content = Some(v),
            PayloadField::ShortContent(v) => entry.payload.short_content = Some(v),
            PayloadField::Description(v) => entry.payload.description = Some(v),
        })
        .await
        .ok_or_else(|| PipelineError::NotFound(process_id.to_string()))
    }

    /// Write the generated title candidates
    pub async fn set_titles(
        &self,
        process_id: &str,
        titles: Vec<String>,
    ) -> Result<(), PipelineError> {
        self.mutate(process_id, |entry| entry.titles = titles)
            .await
            .ok_or_else(|| PipelineError::NotFound(process_id.to_string()))
    }

    /// Record the result reference; only the first write takes effect
    pub async fn set_result(
        &self,
        process_id: &str,
        artifact_ref: &str,
    ) -> Result<(), PipelineError> {
        self.mutate(process_id, |entry| {
            if entry.process.result_ref.is_none() {
                entry.process.result_ref = Some(artifact_ref.to_string());
            } else {
                debug!(process_id, "Result reference already set; keeping first");
            }
        })
        .await
        .ok_or_else(|| PipelineError::NotFound(process_id.to_string()))
    }

    /// Transition to the failed state: the stage field carries the
    /// diagnostic and progress resets to zero.
    pub async fn mark_failed(&self, process_id: &str, diagnostic: &str) {
        let updated = self
            .mutate(process_id, |entry| {
                entry.failed = true;
                entry.process.stage = diagnostic.to_string();
                entry.process.progress_percent = 0;
            })
            .await;

        if updated.is_none() {
            warn!(process_id, "Failure mark for unknown process");
        }
    }

    /// Force the terminal completed state at 100%.
    ///
    /// Requires a result reference to already be recorded.
    pub async fn mark_completed(
        &self,
        process_id: &str,
        stage_label: &str,
    ) -> Result<(), PipelineError> {
        self.mutate(process_id, |entry| {
            if entry.process.result_ref.is_none() {
                return Err(PipelineError::Artifact(format!(
                    "process {} has no result reference to complete with",
                    process_id
                )));
            }
            entry.process.stage = stage_label.to_string();
            entry.process.progress_percent = 100;
            entry.process.completed = true;
            Ok(())
        })
        .await
        .ok_or_else(|| PipelineError::NotFound(process_id.to_string()))?
    }

    /// Observable process record; falls back to a snapshot when the id is
    /// not resident in memory.
    pub async fn get(&self, process_id: &str) -> Option<Process> {
        if let Some(entry) = self.entry(process_id).await {
            return Some(entry.lock().await.process.clone());
        }
        self.load_snapshot(process_id).await.map(|e| e.process)
    }

    /// Snapshot of the payload for the stage that needs it
    pub async fn payload(&self, process_id: &str) -> Option<ProcessPayload> {
        if let Some(entry) = self.entry(process_id).await {
            return Some(entry.lock().await.payload.clone());
        }
        self.load_snapshot(process_id).await.map(|e| e.payload)
    }

    /// Title candidates generated so far (empty until the title stage ran)
    pub async fn titles(&self, process_id: &str) -> Option<Vec<String>> {
        if let Some(entry) = self.entry(process_id).await {
            return Some(entry.lock().await.titles.clone());
        }
        self.load_snapshot(process_id).await.map(|e| e.titles)
    }

    /// Whether the process is in the absorbing failed state
    pub async fn is_failed(&self, process_id: &str) -> bool {
        if let Some(entry) = self.entry(process_id).await {
            return entry.lock().await.failed;
        }
        self.load_snapshot(process_id)
            .await
            .map(|e| e.failed)
            .unwrap_or(false)
    }

    /// All known processes, most recently started first
    pub async fn list(&self) -> Vec<Process> {
        let mut seen: HashMap<String, Process> = HashMap::new();

        let entries: Vec<Arc<Mutex<ProcessEntry>>> =
            self.entries.read().await.values().cloned().collect();
        for entry in entries {
            let process = entry.lock().await.process.clone();
            seen.insert(process.process_id.clone(), process);
        }

        if let Some(ref dir) = self.snapshot_dir {
            if let Ok(mut read_dir) = tokio::fs::read_dir(dir).await {
                while let Ok(Some(dir_entry)) = read_dir.next_entry().await {
                    let id = dir_entry.file_name().to_string_lossy().to_string();
                    if seen.contains_key(&id) {
                        continue;
                    }
                    if let Some(entry) = self.load_snapshot(&id).await {
                        seen.insert(id, entry.process);
                    }
                }
            }
        }

        let mut processes: Vec<Process> = seen.into_values().collect();
        processes.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        processes
    }

    fn snapshot_path(&self, process_id: &str) -> Option<PathBuf> {
        self.snapshot_dir
            .as_ref()
            .map(|dir| dir.join(process_id).join("process.json"))
    }

    async fn snapshot_exists(&self, process_id: &str) -> bool {
        match self.snapshot_path(process_id) {
            Some(path) => tokio::fs::try_exists(&path).await.unwrap_or(false),
            None => false,
        }
    }

    async fn load_snapshot(&self, process_id: &str) -> Option<ProcessEntry> {
        let path = self.snapshot_path(process_id)?;
        let content = tokio::fs::read_to_string(path).await.ok()?;
        match serde_json::from_str(&content) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(process_id, error = %e, "Unreadable process snapshot");
                None
            }
        }
    }

    async fn persist(&self, entry: &ProcessEntry) {
        let Some(path) = self.snapshot_path(&entry.process.process_id) else {
            return;
        };

        let result = async {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            let json = serde_json::to_string_pretty(entry)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
            tokio::fs::write(&path, json).await
        }
        .await;

        if let Err(e) = result {
            warn!(
                process_id = %entry.process.process_id,
                error = %e,
                "Failed to snapshot process state"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::GenerationParams;

    fn payload() -> ProcessPayload {
        let params = GenerationParams {
            topic: "gratitude".to_string(),
            style: "reflective".to_string(),
            duration: "Padrão".to_string(),
            prayer_kind: "morning".to_string(),
            ..Default::default()
        };
        ProcessPayload::from_params(&params, "pt")
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_id() {
        let store = ProcessStore::in_memory();
        store.create("p1", payload()).await.unwrap();

        let err = store.create("p1", payload()).await.unwrap_err();
        assert!(matches!(err, PipelineError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_progress_never_decreases_in_flight() {
        let store = ProcessStore::in_memory();
        store.create("p1", payload()).await.unwrap();

        store.update_status("p1", "a", 50).await;
        store.update_status("p1", "b", 20).await;

        let process = store.get("p1").await.unwrap();
        assert_eq!(process.progress_percent, 50);
        assert_eq!(process.stage, "b");
    }

    #[tokio::test]
    async fn test_update_status_unknown_id_is_ignored() {
        let store = ProcessStore::in_memory();
        // Must not panic
        store.update_status("ghost", "x", 10).await;
        assert!(store.get("ghost").await.is_none());
    }

    #[tokio::test]
    async fn test_result_ref_set_at_most_once() {
        let store = ProcessStore::in_memory();
        store.create("p1", payload()).await.unwrap();

        store.set_result("p1", "first").await.unwrap();
        store.set_result("p1", "second").await.unwrap();

        assert_eq!(
            store.get("p1").await.unwrap().result_ref.as_deref(),
            Some("first")
        );
    }

    #[tokio::test]
    async fn test_completion_requires_result_ref() {
        let store = ProcessStore::in_memory();
        store.create("p1", payload()).await.unwrap();

        assert!(store.mark_completed("p1", "Completed").await.is_err());

        store.set_result("p1", "doc").await.unwrap();
        store.mark_completed("p1", "Completed").await.unwrap();

        let process = store.get("p1").await.unwrap();
        assert!(process.completed);
        assert_eq!(process.progress_percent, 100);
    }

    #[tokio::test]
    async fn test_mark_failed_resets_progress_and_keeps_diagnostic() {
        let store = ProcessStore::in_memory();
        store.create("p1", payload()).await.unwrap();
        store.update_status("p1", "working", 70).await;

        store
            .mark_failed("p1", "Generating prayer text: backend unavailable")
            .await;

        let process = store.get("p1").await.unwrap();
        assert_eq!(process.progress_percent, 0);
        assert!(process.stage.contains("backend unavailable"));
        assert!(!process.completed);
        assert!(store.is_failed("p1").await);
    }

    #[tokio::test]
    async fn test_concurrent_processes_do_not_interfere() {
        let store = Arc::new(ProcessStore::in_memory());
        store.create("p1", payload()).await.unwrap();
        store.create("p2", payload()).await.unwrap();

        let mut tasks = Vec::new();
        for i in 1..=50u8 {
            let store_a = store.clone();
            tasks.push(tokio::spawn(async move {
                store_a.update_status("p1", "working", i.min(90)).await;
            }));
            let store_b = store.clone();
            tasks.push(tokio::spawn(async move {
                store_b
                    .set_field("p2", PayloadField::Content(format!("v{}", i)))
                    .await
                    .unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(store.get("p1").await.unwrap().progress_percent, 50);
        assert!(store.payload("p2").await.unwrap().content.is_some());
        assert_eq!(store.get("p2").await.unwrap().progress_percent, 0);
    }

    #[tokio::test]
    async fn test_snapshots_survive_new_store_instance() {
        let temp = tempfile::TempDir::new().unwrap();

        let store = ProcessStore::persistent(temp.path());
        store.create("p1", payload()).await.unwrap();
        store.update_status("p1", "working", 40).await;
        store
            .set_titles("p1", vec!["Morning Light".to_string()])
            .await
            .unwrap();

        let reopened = ProcessStore::persistent(temp.path());
        let process = reopened.get("p1").await.unwrap();
        assert_eq!(process.progress_percent, 40);
        assert_eq!(
            reopened.titles("p1").await.unwrap(),
            vec!["Morning Light".to_string()]
        );

        // Duplicate detection also crosses instances
        assert!(matches!(
            reopened.create("p1", payload()).await,
            Err(PipelineError::AlreadyExists(_))
        ));
    }
}
