//! Workflow state persistence

use crate::models::quick_brief::QuickBrief;
use crate::models::workflow::WorkflowState;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Durable storage for workflow records, keyed by workflow id
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    /// Write the full record, refreshing `updated_at`
    async fn save(&self, workflow: &mut WorkflowState) -> Result<()>;

    /// Load a record, `None` if it does not exist
    async fn get(&self, id: Uuid) -> Result<Option<WorkflowState>>;

    /// Remove a record, returning whether it existed
    async fn delete(&self, id: Uuid) -> Result<bool>;

    /// All records, most recently updated first
    async fn list(&self) -> Result<Vec<WorkflowState>>;
}

/// Storage for single-shot briefs, with the same contract as [`WorkflowStore`]
#[async_trait]
pub trait QuickBriefStore: Send + Sync {
    async fn save_brief(&self, brief: &mut QuickBrief) -> Result<()>;

    async fn get_brief(&self, id: Uuid) -> Result<Option<QuickBrief>>;

    async fn delete_brief(&self, id: Uuid) -> Result<bool>;

    /// Most recently updated first
    async fn list_briefs(&self) -> Result<Vec<QuickBrief>>;
}

fn sort_workflows(workflows: &mut [WorkflowState]) {
    workflows.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
}

fn sort_briefs(briefs: &mut [QuickBrief]) {
    briefs.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
}

/// Subdirectory of the data directory holding quick briefs
const QUICK_BRIEF_DIR: &str = "quick-briefs";

/// One pretty-printed JSON file per record. Workflows live directly under
/// the data directory, quick briefs under `quick-briefs/`.
pub struct JsonFileStore {
    data_dir: PathBuf,
    briefs_dir: PathBuf,
}

impl JsonFileStore {
    /// Create store rooted at `data_dir`, creating the directories if needed
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        let briefs_dir = data_dir.join(QUICK_BRIEF_DIR);
        std::fs::create_dir_all(&briefs_dir).context("Failed to create workflow data directory")?;
        Ok(Self {
            data_dir,
            briefs_dir,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn record_path(dir: &Path, id: Uuid) -> PathBuf {
        dir.join(format!("{}.json", id))
    }

    /// Read one record under a shared lock
    fn read_file<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).context("Failed to open data file"),
        };

        file.lock_shared()
            .context("Failed to acquire read lock on data file")?;

        let mut contents = String::new();
        let mut reader = std::io::BufReader::new(&file);
        reader
            .read_to_string(&mut contents)
            .context("Failed to read data file")?;
        drop(reader);
        file.unlock().context("Failed to release data file lock")?;

        let record = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse data file {}", path.display()))?;
        Ok(Some(record))
    }

    /// Replace one record under an exclusive lock
    fn write_file<T: Serialize>(path: &Path, record: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(record).context("Failed to serialize record")?;

        // Truncate only once the lock is held so readers never see a partial file
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .context("Failed to open data file for writing")?;

        file.lock_exclusive()
            .context("Failed to acquire write lock on data file")?;
        file.set_len(0).context("Failed to truncate data file")?;

        let mut writer = std::io::BufWriter::new(&file);
        writer
            .write_all(json.as_bytes())
            .context("Failed to write data file")?;
        writer
            .flush()
            .context("Failed to flush data file to disk")?;
        drop(writer);

        file.sync_all().context("Failed to sync data file")?;
        file.unlock().context("Failed to release data file lock")?;
        Ok(())
    }

    /// Every readable `*.json` record directly under `dir`
    fn list_files<T: DeserializeOwned>(dir: &Path) -> Result<Vec<T>> {
        let entries = std::fs::read_dir(dir).context("Failed to read data directory")?;

        let mut records = Vec::new();
        for entry in entries {
            let path = entry.context("Failed to read data directory entry")?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            match Self::read_file(&path) {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %format!("{:#}", e), "Skipping unreadable data file");
                }
            }
        }
        Ok(records)
    }

    async fn save_record<T>(path: PathBuf, record: T) -> Result<()>
    where
        T: Serialize + Send + 'static,
    {
        tokio::task::spawn_blocking(move || Self::write_file(&path, &record))
            .await
            .context("Write task failed")?
    }

    async fn load_record<T>(path: PathBuf) -> Result<Option<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        tokio::task::spawn_blocking(move || Self::read_file(&path))
            .await
            .context("Read task failed")?
    }

    async fn load_all<T>(dir: PathBuf) -> Result<Vec<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        tokio::task::spawn_blocking(move || Self::list_files(&dir))
            .await
            .context("List task failed")?
    }

    async fn remove_record(path: PathBuf) -> Result<bool> {
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).with_context(|| format!("Failed to delete {}", path.display())),
        }
    }
}

#[async_trait]
impl WorkflowStore for JsonFileStore {
    async fn save(&self, workflow: &mut WorkflowState) -> Result<()> {
        workflow.updated_at = Utc::now();
        let path = Self::record_path(&self.data_dir, workflow.id);
        Self::save_record(path, workflow.clone()).await
    }

    async fn get(&self, id: Uuid) -> Result<Option<WorkflowState>> {
        Self::load_record(Self::record_path(&self.data_dir, id)).await
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        Self::remove_record(Self::record_path(&self.data_dir, id)).await
    }

    async fn list(&self) -> Result<Vec<WorkflowState>> {
        let mut workflows = Self::load_all(self.data_dir.clone()).await?;
        sort_workflows(&mut workflows);
        Ok(workflows)
    }
}

#[async_trait]
impl QuickBriefStore for JsonFileStore {
    async fn save_brief(&self, brief: &mut QuickBrief) -> Result<()> {
        brief.updated_at = Utc::now();
        let path = Self::record_path(&self.briefs_dir, brief.id);
        Self::save_record(path, brief.clone()).await
    }

    async fn get_brief(&self, id: Uuid) -> Result<Option<QuickBrief>> {
        Self::load_record(Self::record_path(&self.briefs_dir, id)).await
    }

    async fn delete_brief(&self, id: Uuid) -> Result<bool> {
        Self::remove_record(Self::record_path(&self.briefs_dir, id)).await
    }

    async fn list_briefs(&self) -> Result<Vec<QuickBrief>> {
        let mut briefs = Self::load_all(self.briefs_dir.clone()).await?;
        sort_briefs(&mut briefs);
        Ok(briefs)
    }
}

/// Process-local store for tests and ephemeral runs
#[derive(Default)]
pub struct MemoryStore {
    workflows: DashMap<Uuid, WorkflowState>,
    briefs: DashMap<Uuid, QuickBrief>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored workflows
    pub fn len(&self) -> usize {
        self.workflows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workflows.is_empty()
    }
}

#[async_trait]
impl WorkflowStore for MemoryStore {
    async fn save(&self, workflow: &mut WorkflowState) -> Result<()> {
        workflow.updated_at = Utc::now();
        self.workflows.insert(workflow.id, workflow.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<WorkflowState>> {
        Ok(self.workflows.get(&id).map(|entry| entry.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        Ok(self.workflows.remove(&id).is_some())
    }

    async fn list(&self) -> Result<Vec<WorkflowState>> {
        let mut workflows: Vec<WorkflowState> = self
            .workflows
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        sort_workflows(&mut workflows);
        Ok(workflows)
    }
}

#[async_trait]
impl QuickBriefStore for MemoryStore {
    async fn save_brief(&self, brief: &mut QuickBrief) -> Result<()> {
        brief.updated_at = Utc::now();
        self.briefs.insert(brief.id, brief.clone());
        Ok(())
    }

    async fn get_brief(&self, id: Uuid) -> Result<Option<QuickBrief>> {
        Ok(self.briefs.get(&id).map(|entry| entry.clone()))
    }

    async fn delete_brief(&self, id: Uuid) -> Result<bool> {
        Ok(self.briefs.remove(&id).is_some())
    }

    async fn list_briefs(&self) -> Result<Vec<QuickBrief>> {
        let mut briefs: Vec<QuickBrief> =
            self.briefs.iter().map(|entry| entry.value().clone()).collect();
        sort_briefs(&mut briefs);
        Ok(briefs)
    }
}
