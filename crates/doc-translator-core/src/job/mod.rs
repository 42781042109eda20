//! Background job orchestration for document translation.
//!
//! Small documents translate synchronously on the caller's task; larger
//! ones are queued behind a bounded worker pool and polled by id. Job
//! records live in an in-memory registry; document bytes live on disk under
//! the artifact directory so the registry stays small.
//!
//! Progress is phased: 10 once the input is loaded, 10-90 proportional to
//! translated chunks, 100 when the output is written. Cancellation is best
//! effort: a queued job never starts, a processing job stops at its next
//! translation unit boundary.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, Semaphore};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::DocumentTranslator;
use crate::cache::TranslationCache;
use crate::config::AppConfig;
use crate::document::{DocumentFormat, RewriteControl};
use crate::error::{Error, Result};
use crate::translator::{Translator, create_translator};

/// Lifecycle of a translation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// Terminal states never transition again.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Snapshot of a job for polling clients.
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub id: String,
    pub format: DocumentFormat,
    pub status: JobStatus,
    /// 0-100
    pub progress: u8,
    /// Human-readable phase description
    pub message: String,
    pub error: Option<String>,
    /// Unix seconds
    pub created_at: u64,
    pub started_at: Option<u64>,
    pub completed_at: Option<u64>,
}

/// Registry entry for one job.
struct JobRecord {
    format: DocumentFormat,
    status: JobStatus,
    message: String,
    error: Option<String>,
    /// Monotonic age for the cleanup sweep
    created: Instant,
    created_at: SystemTime,
    started_at: Option<SystemTime>,
    completed_at: Option<SystemTime>,
    progress: Arc<AtomicU8>,
    cancel: Arc<AtomicBool>,
}

impl JobRecord {
    fn new(format: DocumentFormat) -> Self {
        Self {
            format,
            status: JobStatus::Queued,
            message: "queued".to_string(),
            error: None,
            created: Instant::now(),
            created_at: SystemTime::now(),
            started_at: None,
            completed_at: None,
            progress: Arc::new(AtomicU8::new(0)),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    fn report(&self, id: Uuid) -> JobReport {
        JobReport {
            id: id.to_string(),
            format: self.format,
            status: self.status,
            progress: self.progress.load(Ordering::SeqCst),
            message: self.message.clone(),
            error: self.error.clone(),
            created_at: unix_secs(self.created_at),
            started_at: self.started_at.map(unix_secs),
            completed_at: self.completed_at.map(unix_secs),
        }
    }
}

fn unix_secs(t: SystemTime) -> u64 {
    t.duration_since(UNIX_EPOCH).map_or(0, |d| d.as_secs())
}

struct JobManagerInner {
    config: AppConfig,
    service: Arc<dyn Translator>,
    cache: TranslationCache,
    jobs: RwLock<HashMap<Uuid, JobRecord>>,
    workers: Arc<Semaphore>,
    artifact_dir: PathBuf,
}

/// Orchestrates translation jobs over a bounded worker pool.
///
/// Cloning shares the registry and worker pool.
#[derive(Clone)]
pub struct JobManager {
    inner: Arc<JobManagerInner>,
}

impl JobManager {
    pub fn new(config: AppConfig) -> Result<Self> {
        let service = create_translator(&config.translator)?;
        Self::with_service(service, config)
    }

    /// Build with a caller-provided translator backend.
    pub fn with_service(service: Arc<dyn Translator>, config: AppConfig) -> Result<Self> {
        let cache = TranslationCache::new(&config.cache)?;
        let artifact_dir = config
            .jobs
            .artifact_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("doc-translator-jobs"));
        std::fs::create_dir_all(&artifact_dir)?;

        let workers = Arc::new(Semaphore::new(config.jobs.max_workers.max(1)));

        Ok(Self {
            inner: Arc::new(JobManagerInner {
                config,
                service,
                cache,
                jobs: RwLock::new(HashMap::new()),
                workers,
                artifact_dir,
            }),
        })
    }

    /// Submit a document for translation.
    ///
    /// Inputs at or below the sync threshold run to completion before this
    /// returns; larger inputs return immediately with a queued job to poll.
    pub async fn submit(&self, input: Vec<u8>, format: DocumentFormat) -> Result<JobReport> {
        let id = Uuid::new_v4();
        let input_len = input.len();
        tokio::fs::write(self.inner.input_path(id), input).await?;

        let record = JobRecord::new(format);
        self.inner.jobs.write().await.insert(id, record);

        if input_len <= self.inner.config.jobs.sync_threshold_bytes {
            debug!("Job {id}: {input_len} bytes, running synchronously");
            self.inner.mark_started(id).await;
            JobManagerInner::execute(Arc::clone(&self.inner), id, format).await;
        } else {
            debug!("Job {id}: {input_len} bytes, queued");
            let inner = Arc::clone(&self.inner);
            tokio::spawn(async move {
                let Ok(_permit) = Arc::clone(&inner.workers).acquire_owned().await else {
                    return;
                };
                // Cancelled while queued: never start
                if !inner.mark_started(id).await {
                    return;
                }
                JobManagerInner::execute(inner, id, format).await;
            });
        }

        self.status_by_uuid(id).await
    }

    /// Current state of a job.
    pub async fn status(&self, id: &str) -> Result<JobReport> {
        let uuid = parse_id(id)?;
        self.status_by_uuid(uuid).await
    }

    async fn status_by_uuid(&self, id: Uuid) -> Result<JobReport> {
        let jobs = self.inner.jobs.read().await;
        jobs.get(&id)
            .map(|r| r.report(id))
            .ok_or_else(|| Error::JobNotFound(id.to_string()))
    }

    /// Translated document bytes for a completed job.
    pub async fn output(&self, id: &str) -> Result<Vec<u8>> {
        let uuid = parse_id(id)?;
        let status = {
            let jobs = self.inner.jobs.read().await;
            jobs.get(&uuid)
                .map(|r| r.status)
                .ok_or_else(|| Error::JobNotFound(id.to_string()))?
        };
        if status != JobStatus::Completed {
            return Err(Error::JobFinished {
                id: id.to_string(),
                status: status.to_string(),
            });
        }
        Ok(tokio::fs::read(self.inner.output_path(uuid)).await?)
    }

    /// Request cancellation. Fails if the job already reached a terminal
    /// state; otherwise the job stops at its next unit boundary (or never
    /// starts, if still queued).
    pub async fn cancel(&self, id: &str) -> Result<()> {
        let uuid = parse_id(id)?;
        let mut jobs = self.inner.jobs.write().await;
        let record = jobs
            .get_mut(&uuid)
            .ok_or_else(|| Error::JobNotFound(id.to_string()))?;

        if record.status.is_terminal() {
            return Err(Error::JobFinished {
                id: id.to_string(),
                status: record.status.to_string(),
            });
        }

        record.cancel.store(true, Ordering::SeqCst);
        record.status = JobStatus::Cancelled;
        record.message = "cancelled".to_string();
        record.completed_at = Some(SystemTime::now());
        info!("Job {id} cancelled");
        Ok(())
    }

    /// Drop job records older than the configured maximum age, regardless of
    /// status, and delete their artifacts. Returns the number swept.
    pub async fn cleanup(&self) -> usize {
        let max_age = Duration::from_secs(self.inner.config.jobs.max_age_hours * 3600);
        self.sweep(max_age).await
    }

    async fn sweep(&self, max_age: Duration) -> usize {
        let now = Instant::now();

        let swept: Vec<Uuid> = {
            let mut jobs = self.inner.jobs.write().await;
            let old: Vec<Uuid> = jobs
                .iter()
                .filter(|(_, r)| now.duration_since(r.created) >= max_age)
                .map(|(id, _)| *id)
                .collect();
            for id in &old {
                jobs.remove(id);
            }
            old
        };

        for id in &swept {
            let _ = tokio::fs::remove_file(self.inner.input_path(*id)).await;
            let _ = tokio::fs::remove_file(self.inner.output_path(*id)).await;
        }

        if !swept.is_empty() {
            info!("Swept {} expired jobs", swept.len());
        }
        swept.len()
    }

    /// Spawn a background task sweeping expired jobs every hour.
    pub fn spawn_cleanup_task(&self) -> tokio::task::JoinHandle<()> {
        let manager = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(3600));
            interval.tick().await; // First tick fires immediately
            loop {
                interval.tick().await;
                manager.cleanup().await;
            }
        })
    }
}

impl JobManagerInner {
    fn input_path(&self, id: Uuid) -> PathBuf {
        self.artifact_dir.join(format!("{id}.in"))
    }

    fn output_path(&self, id: Uuid) -> PathBuf {
        self.artifact_dir.join(format!("{id}.out"))
    }

    /// Transition queued -> processing. Returns false if the job is gone or
    /// was cancelled while waiting.
    async fn mark_started(&self, id: Uuid) -> bool {
        let mut jobs = self.jobs.write().await;
        let Some(record) = jobs.get_mut(&id) else {
            return false;
        };
        if record.status != JobStatus::Queued {
            debug!("Job {id}: not starting, status is {}", record.status);
            return false;
        }
        record.status = JobStatus::Processing;
        record.message = "loading document".to_string();
        record.started_at = Some(SystemTime::now());
        true
    }

    async fn set_message(&self, id: Uuid, message: &str) {
        if let Some(record) = self.jobs.write().await.get_mut(&id) {
            record.message = message.to_string();
        }
    }

    /// Run one job to completion and record the outcome. Never panics or
    /// errors out; failures land in the job record.
    async fn execute(inner: Arc<Self>, id: Uuid, format: DocumentFormat) {
        let (progress, cancel) = {
            let jobs = inner.jobs.read().await;
            let Some(record) = jobs.get(&id) else {
                return;
            };
            (Arc::clone(&record.progress), Arc::clone(&record.cancel))
        };

        let translator = DocumentTranslator::from_parts(
            Arc::clone(&inner.service),
            &inner.config,
            inner.cache.clone(),
        );

        let progress_for_ctrl = Arc::clone(&progress);
        let ctrl = RewriteControl::with_cancel(cancel).on_progress(move |done, total| {
            let pct = if total == 0 {
                90
            } else {
                #[allow(clippy::cast_possible_truncation)]
                let scaled = 10 + (done as u64 * 80 / total as u64).min(80) as u8;
                scaled
            };
            // fetch_max keeps progress monotonic under races
            progress_for_ctrl.fetch_max(pct, Ordering::SeqCst);
        });

        let timeout = Duration::from_secs(inner.config.jobs.job_timeout_secs);
        let work = async {
            let input = tokio::fs::read(inner.input_path(id)).await?;
            progress.fetch_max(10, Ordering::SeqCst);
            inner.set_message(id, "translating document").await;

            let output = translator.translate(&input, format, &ctrl).await?;
            inner.set_message(id, "saving output").await;

            tokio::fs::write(inner.output_path(id), output).await?;
            Ok::<(), Error>(())
        };

        let outcome = tokio::time::timeout(timeout, work).await;

        let mut jobs = inner.jobs.write().await;
        let Some(record) = jobs.get_mut(&id) else {
            return;
        };
        if record.status.is_terminal() {
            // Cancel won the race; keep its state
            record.completed_at.get_or_insert_with(SystemTime::now);
            return;
        }

        match outcome {
            Ok(Ok(())) => {
                record.progress.store(100, Ordering::SeqCst);
                record.status = JobStatus::Completed;
                record.message = "translation complete".to_string();
                info!("Job {id} completed");
            }
            Ok(Err(Error::Cancelled)) => {
                record.status = JobStatus::Cancelled;
                record.message = "cancelled".to_string();
                info!("Job {id} stopped after cancellation");
            }
            Ok(Err(e)) => {
                error!("Job {id} failed: {e}");
                record.error = Some(e.to_string());
                record.status = JobStatus::Failed;
                record.message = "translation failed".to_string();
            }
            Err(_) => {
                let e = Error::JobTimeout {
                    seconds: inner.config.jobs.job_timeout_secs,
                };
                warn!("Job {id}: {e}");
                record.error = Some(e.to_string());
                record.status = JobStatus::Failed;
                record.message = "timed out".to_string();
            }
        }
        record.completed_at = Some(SystemTime::now());
    }
}

fn parse_id(id: &str) -> Result<Uuid> {
    Uuid::parse_str(id).map_err(|_| Error::JobNotFound(id.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn manager_with(config: AppConfig) -> JobManager {
        struct Noop;
        #[async_trait::async_trait]
        impl Translator for Noop {
            fn info(&self) -> crate::translator::TranslatorInfo {
                crate::translator::TranslatorInfo {
                    name: "noop",
                    requires_api_key: false,
                    supports_auto_detect: true,
                }
            }
            async fn translate(
                &self,
                text: &str,
                _source: &crate::config::Lang,
                _target: &crate::config::Lang,
            ) -> Result<String> {
                Ok(text.to_string())
            }
        }
        JobManager::with_service(Arc::new(Noop), config).unwrap()
    }

    fn test_config(dir: &std::path::Path) -> AppConfig {
        let mut config = AppConfig::default();
        config.jobs.artifact_dir = Some(dir.to_path_buf());
        config
    }

    async fn insert_record(manager: &JobManager, status: JobStatus) -> Uuid {
        let id = Uuid::new_v4();
        let mut record = JobRecord::new(DocumentFormat::Docx);
        record.status = status;
        manager.inner.jobs.write().await.insert(id, record);
        id
    }

    #[tokio::test]
    async fn test_status_unknown_job() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_with(test_config(dir.path()));

        assert!(matches!(
            manager.status("not-a-uuid").await,
            Err(Error::JobNotFound(_))
        ));
        assert!(matches!(
            manager.status(&Uuid::new_v4().to_string()).await,
            Err(Error::JobNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_cancel_queued_job() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_with(test_config(dir.path()));
        let id = insert_record(&manager, JobStatus::Queued).await;

        manager.cancel(&id.to_string()).await.unwrap();

        let report = manager.status(&id.to_string()).await.unwrap();
        assert_eq!(report.status, JobStatus::Cancelled);
        assert_eq!(report.message, "cancelled");
        // A cancelled queued job must never transition to processing
        assert!(!manager.inner.mark_started(id).await);
    }

    #[tokio::test]
    async fn test_message_tracks_phase_transitions() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_with(test_config(dir.path()));
        let id = insert_record(&manager, JobStatus::Queued).await;

        let report = manager.status(&id.to_string()).await.unwrap();
        assert_eq!(report.message, "queued");

        assert!(manager.inner.mark_started(id).await);
        let report = manager.status(&id.to_string()).await.unwrap();
        assert_eq!(report.message, "loading document");

        manager.inner.set_message(id, "translating document").await;
        let report = manager.status(&id.to_string()).await.unwrap();
        assert_eq!(report.message, "translating document");
    }

    #[tokio::test]
    async fn test_cancel_terminal_job_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_with(test_config(dir.path()));

        for status in [
            JobStatus::Completed,
            JobStatus::Failed,
            JobStatus::Cancelled,
        ] {
            let id = insert_record(&manager, status).await;
            assert!(matches!(
                manager.cancel(&id.to_string()).await,
                Err(Error::JobFinished { .. })
            ));
        }
    }

    #[tokio::test]
    async fn test_output_requires_completion() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_with(test_config(dir.path()));
        let id = insert_record(&manager, JobStatus::Processing).await;

        assert!(matches!(
            manager.output(&id.to_string()).await,
            Err(Error::JobFinished { .. })
        ));
    }

    #[tokio::test]
    async fn test_sweep_respects_max_age() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_with(test_config(dir.path()));
        let id = insert_record(&manager, JobStatus::Completed).await;

        // Young records survive a long max age
        assert_eq!(manager.sweep(Duration::from_secs(3600)).await, 0);
        assert!(manager.status(&id.to_string()).await.is_ok());

        // Zero max age sweeps everything, terminal or not
        assert_eq!(manager.sweep(Duration::ZERO).await, 1);
        assert!(manager.status(&id.to_string()).await.is_err());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&JobStatus::Processing).unwrap(),
            "\"processing\""
        );
        assert_eq!(JobStatus::Cancelled.to_string(), "cancelled");
    }
}
