//! The save workflow — local commit first, remote analysis merged back later.
//!
//! A job walks `Draft → DirectoryCreated → RecordingIngested →
//! LocalFieldsWritten → AnalysisRequested → {AnalysisApplied | AnalysisFailed}`.
//! A local commit that breaks off ends the job in `CommitFailed` instead.
//! `save_entry` returns as soon as the local commit is visible in the cache;
//! the analysis step runs as its own tokio task keyed by the entry id.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::join_all;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::aggregator::EntryAggregator;
use crate::analysis::{AnalysisClient, AnalysisPolicy, HttpAnalysisClient};
use crate::cache::StateCache;
use crate::config::Config;
use crate::error::{AnalysisError, StoreError};
use crate::events::{JobUpdate, JobsData, JournalEvent};
use crate::highlight;
use crate::ids::{EntryId, IdAllocator};
use crate::ingest::RecordingIngestor;
use crate::jobs::JobTracker;
use crate::repository::{EntryRepository, FsEntryRepository};
use crate::types::{AnalysisResult, EntryField, EntryRecord, Highlight, JobState};

/// Handle to one job whose local commit succeeded.
#[derive(Debug)]
pub struct SaveReceipt {
    pub id: EntryId,
    analysis: JoinHandle<JobState>,
}

impl SaveReceipt {
    /// Wait for the analysis step to reach a terminal state. Dropping the
    /// receipt instead does not cancel the job.
    pub async fn wait(self) -> JobState {
        match self.analysis.await {
            Ok(state) => state,
            Err(e) => {
                error!("Analysis task for entry {} died: {}", self.id, e);
                JobState::AnalysisFailed
            }
        }
    }
}

/// Removes its id from the tracker when dropped, so a job that bails out
/// early (or whose task panics) never leaves the loading indicator stuck.
struct JobGuard {
    id: EntryId,
    jobs: Arc<JobTracker>,
    cache: Arc<StateCache>,
}

impl Drop for JobGuard {
    fn drop(&mut self) {
        if self.jobs.mark_complete(self.id) {
            self.cache.broadcast(JournalEvent::Jobs(JobsData {
                in_flight: self.jobs.in_flight_count(),
            }));
        }
    }
}

pub struct AnalysisPipeline {
    repo: Arc<dyn EntryRepository>,
    ingestor: RecordingIngestor,
    jobs: Arc<JobTracker>,
    cache: Arc<StateCache>,
    client: Arc<dyn AnalysisClient>,
    policy: AnalysisPolicy,
    ids: IdAllocator,
    title_prefix: String,
}

impl AnalysisPipeline {
    pub fn new(
        repo: Arc<dyn EntryRepository>,
        client: Arc<dyn AnalysisClient>,
        policy: AnalysisPolicy,
        title_prefix: impl Into<String>,
    ) -> Self {
        let cache = StateCache::new(EntryAggregator::new(Arc::clone(&repo)));
        Self {
            ingestor: RecordingIngestor::new(Arc::clone(&repo)),
            repo,
            jobs: Arc::new(JobTracker::new()),
            cache: Arc::new(cache),
            client,
            policy,
            ids: IdAllocator::new(),
            title_prefix: title_prefix.into(),
        }
    }

    /// Filesystem store + HTTP collaborator, both taken from `config`.
    pub fn from_config(config: &Config) -> Result<Self, AnalysisError> {
        let repo = Arc::new(FsEntryRepository::new(config.resolve_storage_root()));
        let client = Arc::new(HttpAnalysisClient::from_config(config)?);
        Ok(Self::new(
            repo,
            client,
            AnalysisPolicy::from_config(config),
            config.title_prefix.clone(),
        ))
    }

    // ── Accessors ──

    pub fn cache(&self) -> &Arc<StateCache> {
        &self.cache
    }

    pub fn jobs(&self) -> &Arc<JobTracker> {
        &self.jobs
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<JournalEvent> {
        self.cache.subscribe()
    }

    pub async fn entries(&self) -> Arc<Vec<EntryRecord>> {
        self.cache.entries().await
    }

    pub async fn refresh(&self) -> Arc<Vec<EntryRecord>> {
        self.cache.refresh().await
    }

    // ── Creation path ──

    /// Create an entry from a description and a transient recording.
    ///
    /// Returns once the directory, recording, title and description are on
    /// disk and the cache shows the entry. Analysis continues in the
    /// background; the receipt can be awaited but does not have to be.
    ///
    /// A failed local commit aborts the job without contacting the
    /// collaborator. Whatever was already written stays on disk.
    pub async fn save_entry(
        self: &Arc<Self>,
        description: &str,
        recording_source: &Path,
    ) -> Result<SaveReceipt, StoreError> {
        let id = self.allocate_id().await;
        let guard = self.track(id);
        self.transition(id, JobState::Draft);

        let recording = match self.commit_local(id, description, recording_source).await {
            Ok(recording) => recording,
            Err(e) => {
                error!("Local commit for entry {} failed: {}", id, e);
                // partial entries are still entries
                self.cache.refresh().await;
                self.transition(id, JobState::CommitFailed);
                drop(guard);
                return Err(e);
            }
        };

        self.cache.refresh().await;
        info!("Entry {} committed locally", id);

        let pipeline = Arc::clone(self);
        let description = description.to_string();
        let analysis = tokio::spawn(async move {
            let state = pipeline.run_analysis(id, &recording, &description).await;
            drop(guard);
            state
        });

        Ok(SaveReceipt { id, analysis })
    }

    async fn allocate_id(&self) -> EntryId {
        loop {
            let id = self.ids.next();
            if !self.repo.entry_exists(id).await {
                return id;
            }
            warn!("Entry id {} already taken on disk, allocating another", id);
        }
    }

    fn track(&self, id: EntryId) -> JobGuard {
        if self.jobs.mark_in_flight(id) {
            self.cache.broadcast(JournalEvent::Jobs(JobsData {
                in_flight: self.jobs.in_flight_count(),
            }));
        }
        JobGuard {
            id,
            jobs: Arc::clone(&self.jobs),
            cache: Arc::clone(&self.cache),
        }
    }

    fn transition(&self, id: EntryId, state: JobState) {
        info!("Entry {} -> {}", id, state);
        self.cache.broadcast(JournalEvent::Job(JobUpdate { id, state }));
    }

    async fn commit_local(
        &self,
        id: EntryId,
        description: &str,
        recording_source: &Path,
    ) -> Result<PathBuf, StoreError> {
        if !self.repo.create_entry(id).await {
            return Err(StoreError::WriteFailed {
                id,
                what: "entry directory".into(),
            });
        }
        self.transition(id, JobState::DirectoryCreated);

        let recording = self.ingestor.ingest(recording_source, id).await?;
        self.transition(id, JobState::RecordingIngested);

        let title = self.default_title();
        for (field, value) in [
            (EntryField::Title, title.as_str()),
            (EntryField::Description, description),
        ] {
            if !self.repo.write_field(id, field, value).await {
                return Err(StoreError::WriteFailed {
                    id,
                    what: field.to_string(),
                });
            }
        }
        self.transition(id, JobState::LocalFieldsWritten);
        Ok(recording)
    }

    fn default_title(&self) -> String {
        format!(
            "{} {}",
            self.title_prefix,
            chrono::Local::now().format("%-m/%-d/%Y")
        )
    }

    async fn run_analysis(&self, id: EntryId, recording: &Path, description: &str) -> JobState {
        self.transition(id, JobState::AnalysisRequested);

        let state = match self
            .policy
            .run(|| self.client.analyze(recording, description))
            .await
        {
            Ok(result) => {
                let written = self.apply_analysis(id, &result).await;
                self.cache.refresh().await;
                if written > 0 {
                    JobState::AnalysisApplied
                } else {
                    warn!("Analysis for entry {} arrived but nothing was written", id);
                    JobState::AnalysisFailed
                }
            }
            Err(e) => {
                warn!("Analysis for entry {} failed: {}", id, e);
                JobState::AnalysisFailed
            }
        };

        self.transition(id, state);
        state
    }

    /// Write each analysis field on its own; one failed write does not stop
    /// the others. Returns how many fields landed.
    async fn apply_analysis(&self, id: EntryId, result: &AnalysisResult) -> usize {
        let writes = result
            .fields()
            .into_iter()
            .filter_map(|(field, value)| value.map(|v| (field, v)))
            .map(|(field, value)| async move { self.repo.write_field(id, field, value).await });
        join_all(writes).await.into_iter().filter(|ok| *ok).count()
    }

    // ── Edit / delete paths ──

    /// Overwrite title and description of an existing entry. Never touches
    /// the job tracker or the collaborator.
    pub async fn edit_entry(
        &self,
        id: EntryId,
        title: &str,
        description: &str,
    ) -> Result<EntryRecord, StoreError> {
        if !self.repo.entry_exists(id).await {
            return Err(StoreError::NotFound(id));
        }
        for (field, value) in [(EntryField::Title, title), (EntryField::Description, description)] {
            if !self.repo.write_field(id, field, value).await {
                return Err(StoreError::WriteFailed {
                    id,
                    what: field.to_string(),
                });
            }
        }
        self.cache.refresh().await;
        info!("Entry {} edited", id);

        match self.cache.get(id).await {
            Some(record) => Ok(record),
            None => self
                .cache
                .aggregator()
                .load_entry(id)
                .await
                .ok_or(StoreError::NotFound(id)),
        }
    }

    /// Delete one entry (idempotent) and refresh.
    pub async fn delete_entry(&self, id: EntryId) -> bool {
        let ok = self.repo.delete_entry(id).await;
        self.cache.refresh().await;
        ok
    }

    /// Delete every entry and refresh.
    pub async fn clear_entries(&self) -> bool {
        let ok = self.repo.clear_all().await;
        self.cache.refresh().await;
        ok
    }

    // ── Highlight ──

    pub async fn highlight(&self) -> Result<Highlight, AnalysisError> {
        let entries = self.cache.entries().await;
        highlight::fetch_highlight(self.client.as_ref(), &entries).await
    }
}
