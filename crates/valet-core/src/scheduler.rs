//! Durable cron scheduler.
//!
//! Named jobs live in the `CronJobRepository`; each enabled job has exactly
//! one live timer in a `tokio-cron-scheduler` instance. Every mutation holds
//! one internal mutex across the durable write and the in-memory arm/disarm,
//! so the timer set and the enabled flag are always consistent and a removed
//! job has no window in which it can still fire.
//!
//! On each fire the job stamps its last-run and, if a message handler is
//! attached, synthesizes an inbound turn (profile, message) into the agent
//! pipeline exactly as a human-originated message would arrive. Handler
//! failures are logged and never crash the timer. Fires missed while the
//! process is down are not replayed.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use futures_util::future::BoxFuture;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use valet_types::cron::{CronJob, NewCronJob};
use valet_types::error::RepositoryError;

use crate::repository::CronJobRepository;

/// Callback invoked with (profile, message) each time a job fires.
pub type MessageHandler =
    Arc<dyn Fn(String, String) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Errors from scheduler operations.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("invalid cron expression: {0}")]
    InvalidSchedule(String),

    #[error("scheduler error: {0}")]
    Timer(String),

    #[error("job '{0}' not found")]
    NotFound(String),

    #[error("job '{0}' already exists")]
    Duplicate(String),

    #[error("storage error: {0}")]
    Storage(#[from] RepositoryError),
}

/// Normalize a cron expression for the timer layer.
///
/// Callers write standard 5-field expressions ("0 9 * * *"); the timer layer
/// wants 6 fields with seconds. 6-field input passes through. The stored job
/// keeps the caller's original expression.
fn normalize_schedule(input: &str) -> Result<String, SchedulerError> {
    let trimmed = input.trim();
    let normalized = match trimmed.split_whitespace().count() {
        5 => format!("0 {trimmed}"),
        6 => trimmed.to_string(),
        _ => return Err(SchedulerError::InvalidSchedule(input.to_string())),
    };

    // croner is the validation primitive; the expression is otherwise opaque.
    normalized
        .parse::<croner::Cron>()
        .map_err(|e| SchedulerError::InvalidSchedule(format!("{input}: {e}")))?;

    Ok(normalized)
}

struct Inner {
    timers: Option<JobScheduler>,
    /// Job name -> timer guid for every armed job.
    armed: HashMap<String, Uuid>,
}

/// Durable registry of named cron jobs with one live timer per enabled job.
pub struct Scheduler {
    repo: Arc<dyn CronJobRepository>,
    handler: Arc<RwLock<Option<MessageHandler>>>,
    inner: Mutex<Inner>,
}

impl Scheduler {
    pub fn new(repo: Arc<dyn CronJobRepository>) -> Self {
        Self {
            repo,
            handler: Arc::new(RwLock::new(None)),
            inner: Mutex::new(Inner {
                timers: None,
                armed: HashMap::new(),
            }),
        }
    }

    /// Attach the handler that turns fires into inbound messages.
    pub async fn set_message_handler(&self, handler: MessageHandler) {
        *self.handler.write().await = Some(handler);
    }

    /// Start the timer layer and arm every enabled job.
    pub async fn start(&self) -> Result<(), SchedulerError> {
        let timers = JobScheduler::new()
            .await
            .map_err(|e| SchedulerError::Timer(e.to_string()))?;
        timers
            .start()
            .await
            .map_err(|e| SchedulerError::Timer(e.to_string()))?;

        let mut inner = self.inner.lock().await;
        inner.timers = Some(timers);

        let jobs = self.repo.list_enabled().await?;
        let count = jobs.len();
        for job in jobs {
            if let Err(e) = self.arm(&mut inner, &job).await {
                warn!(name = %job.name, error = %e, "failed to arm job on start");
            }
        }

        info!(count, "scheduler started");
        Ok(())
    }

    /// Shut down the timer layer, disarming everything.
    pub async fn stop(&self) -> Result<(), SchedulerError> {
        let mut inner = self.inner.lock().await;
        if let Some(mut timers) = inner.timers.take() {
            timers
                .shutdown()
                .await
                .map_err(|e| SchedulerError::Timer(e.to_string()))?;
        }
        inner.armed.clear();
        info!("scheduler stopped");
        Ok(())
    }

    /// Validate, persist, and arm a new job.
    pub async fn add_job(&self, new: NewCronJob) -> Result<CronJob, SchedulerError> {
        normalize_schedule(&new.schedule)?;

        let job = CronJob {
            id: Uuid::now_v7(),
            name: new.name,
            schedule: new.schedule,
            message: new.message,
            profile: new.profile,
            enabled: true,
            last_run: None,
        };

        let mut inner = self.inner.lock().await;
        self.repo.insert(&job).await.map_err(|e| match e {
            RepositoryError::Conflict(_) => SchedulerError::Duplicate(job.name.clone()),
            other => SchedulerError::Storage(other),
        })?;
        self.arm(&mut inner, &job).await?;

        info!(name = %job.name, schedule = %job.schedule, "cron job added");
        Ok(job)
    }

    /// Disarm and delete a job. The timer is gone before the durable row is,
    /// so a deleted job can never fire.
    pub async fn remove_job(&self, name: &str) -> Result<(), SchedulerError> {
        let mut inner = self.inner.lock().await;
        self.disarm(&mut inner, name).await?;
        if !self.repo.delete(name).await? {
            return Err(SchedulerError::NotFound(name.to_string()));
        }
        info!(name, "cron job removed");
        Ok(())
    }

    /// Flip the enabled flag, arming or disarming in the same critical section.
    pub async fn toggle_job(&self, name: &str, enabled: bool) -> Result<(), SchedulerError> {
        let mut inner = self.inner.lock().await;
        self.repo.set_enabled(name, enabled).await.map_err(|e| match e {
            RepositoryError::NotFound => SchedulerError::NotFound(name.to_string()),
            other => SchedulerError::Storage(other),
        })?;

        if enabled {
            if !inner.armed.contains_key(name) {
                let job = self
                    .repo
                    .get(name)
                    .await?
                    .ok_or_else(|| SchedulerError::NotFound(name.to_string()))?;
                self.arm(&mut inner, &job).await?;
            }
        } else {
            self.disarm(&mut inner, name).await?;
        }

        info!(name, enabled, "cron job toggled");
        Ok(())
    }

    /// All durable jobs, ordered by name.
    pub async fn list_jobs(&self) -> Result<Vec<CronJob>, SchedulerError> {
        Ok(self.repo.list().await?)
    }

    /// Number of jobs with a live timer.
    pub async fn armed_count(&self) -> usize {
        self.inner.lock().await.armed.len()
    }

    async fn arm(&self, inner: &mut Inner, job: &CronJob) -> Result<(), SchedulerError> {
        let timers = inner
            .timers
            .as_ref()
            .ok_or_else(|| SchedulerError::Timer("scheduler not started".to_string()))?;

        let expr = normalize_schedule(&job.schedule)?;
        let repo = Arc::clone(&self.repo);
        let handler = Arc::clone(&self.handler);
        let fired = job.clone();

        let timer_job = Job::new_async(expr.as_str(), move |_uuid, _lock| {
            let repo = Arc::clone(&repo);
            let handler = Arc::clone(&handler);
            let job = fired.clone();
            Box::pin(async move {
                debug!(name = %job.name, "cron job fired");
                if let Err(e) = repo.stamp_last_run(job.id, Utc::now()).await {
                    warn!(name = %job.name, error = %e, "failed to stamp last run");
                }

                let attached = handler.read().await.clone();
                if let Some(handle) = attached {
                    if let Err(e) = handle(job.profile.clone(), job.message.clone()).await {
                        error!(name = %job.name, error = %e, "cron job handler failed");
                    }
                }
            })
        })
        .map_err(|e| SchedulerError::InvalidSchedule(e.to_string()))?;

        let guid = timer_job.guid();
        timers
            .add(timer_job)
            .await
            .map_err(|e| SchedulerError::Timer(e.to_string()))?;
        inner.armed.insert(job.name.clone(), guid);
        Ok(())
    }

    async fn disarm(&self, inner: &mut Inner, name: &str) -> Result<(), SchedulerError> {
        if let Some(guid) = inner.armed.remove(name) {
            if let Some(timers) = inner.timers.as_ref() {
                timers
                    .remove(&guid)
                    .await
                    .map_err(|e| SchedulerError::Timer(e.to_string()))?;
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler").finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
