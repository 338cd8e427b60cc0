// Job registry: shared map of in-flight and recently finished jobs

use crate::executor::{ExecutionResult, Executor, ResourcePolicy};
use crate::jobs::config::JobsConfig;
use crate::jobs::error::{JobError, Result};
use crate::jobs::types::{Job, JobStatus};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Registry entry: the job snapshot plus its cancellation signal
struct JobEntry {
    job: Job,
    cancel_tx: watch::Sender<bool>,
}

/// Concurrency-safe job table
///
/// The map lock is only held to insert, find or remove an entry. Status
/// transitions take the entry's own mutex, so two jobs never contend and one
/// job is never transitioned by two tasks at once. No lock is held across an
/// await point.
pub struct JobRegistry {
    config: JobsConfig,
    jobs: RwLock<HashMap<String, Arc<Mutex<JobEntry>>>>,
}

fn lock(entry: &Mutex<JobEntry>) -> MutexGuard<'_, JobEntry> {
    entry.lock().unwrap_or_else(PoisonError::into_inner)
}

impl JobRegistry {
    pub fn new(config: JobsConfig) -> Self {
        Self {
            config,
            jobs: RwLock::new(HashMap::new()),
        }
    }

    fn entry(&self, id: &str) -> Option<Arc<Mutex<JobEntry>>> {
        let jobs = self.jobs.read().unwrap_or_else(PoisonError::into_inner);
        jobs.get(id).cloned()
    }

    fn entries(&self) -> Vec<Arc<Mutex<JobEntry>>> {
        let jobs = self.jobs.read().unwrap_or_else(PoisonError::into_inner);
        jobs.values().cloned().collect()
    }

    /// Register a new PENDING job
    ///
    /// Returns the job id and the receiver side of its cancellation signal.
    pub fn create(&self, operation: &str) -> (String, watch::Receiver<bool>) {
        let id = uuid::Uuid::new_v4().to_string();
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let entry = JobEntry {
            job: Job::pending(id.clone(), operation),
            cancel_tx,
        };

        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        jobs.insert(id.clone(), Arc::new(Mutex::new(entry)));
        debug!(job_id = %id, operation = %operation, "job created");
        (id, cancel_rx)
    }

    /// Snapshot of a job; `None` means it never existed or was already reaped
    pub fn get(&self, id: &str) -> Option<Job> {
        self.entry(id).map(|e| lock(&e).job.clone())
    }

    /// Request cancellation of a PENDING or RUNNING job
    ///
    /// Returns `true` only for the call that performed the transition; a
    /// terminal or unknown job yields `false`.
    pub fn cancel(&self, id: &str) -> bool {
        let Some(entry) = self.entry(id) else {
            return false;
        };
        let mut entry = lock(&entry);
        if entry.job.status.is_terminal() {
            return false;
        }

        entry.job.status = JobStatus::Cancelled;
        entry.job.ended_at = Some(Utc::now());
        entry.job.cancel_requested = true;
        entry.cancel_tx.send_replace(true);

        info!(job_id = %id, pid = ?entry.job.pid, "job cancelled");
        true
    }

    /// Drop a job from the registry, cancelling it first if still active
    pub fn remove(&self, id: &str) -> bool {
        self.cancel(id);
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        let removed = jobs.remove(id).is_some();
        if removed {
            debug!(job_id = %id, "job removed");
        }
        removed
    }

    /// PENDING and RUNNING jobs, oldest first
    pub fn list_active(&self) -> Vec<Job> {
        let mut active: Vec<Job> = self
            .entries()
            .iter()
            .map(|e| lock(e).job.clone())
            .filter(|job| !job.status.is_terminal())
            .collect();
        active.sort_by_key(|job| job.started_at);
        active
    }

    /// Jobs whose process started but whose outcome is not recorded yet
    pub fn unsettled(&self) -> usize {
        self.entries()
            .iter()
            .filter(|e| {
                let entry = lock(e);
                entry.job.pid.is_some() && entry.job.result.is_none()
            })
            .count()
    }

    /// Move a PENDING job to RUNNING once its process exists
    pub fn mark_running(&self, id: &str, pid: u32) -> Result<()> {
        let entry = self
            .entry(id)
            .ok_or_else(|| JobError::NotFound(id.to_string()))?;
        let mut entry = lock(&entry);
        entry.job.pid = Some(pid);
        if entry.job.status != JobStatus::Pending {
            return Err(JobError::InvalidTransition {
                id: id.to_string(),
                from: entry.job.status,
                to: JobStatus::Running,
            });
        }
        entry.job.status = JobStatus::Running;
        debug!(job_id = %id, pid = pid, "job running");
        Ok(())
    }

    /// Record the process outcome
    ///
    /// A cancelled job stays CANCELLED and only gains the result; otherwise
    /// the job becomes COMPLETE or FAILED.
    pub fn finish(&self, id: &str, result: ExecutionResult) -> Result<JobStatus> {
        let entry = self
            .entry(id)
            .ok_or_else(|| JobError::NotFound(id.to_string()))?;
        let mut entry = lock(&entry);

        match entry.job.status {
            JobStatus::Cancelled => {}
            JobStatus::Complete | JobStatus::Failed => {
                let to = if result.success {
                    JobStatus::Complete
                } else {
                    JobStatus::Failed
                };
                return Err(JobError::InvalidTransition {
                    id: id.to_string(),
                    from: entry.job.status,
                    to,
                });
            }
            JobStatus::Pending | JobStatus::Running => {
                entry.job.status = if result.success {
                    JobStatus::Complete
                } else {
                    JobStatus::Failed
                };
                entry.job.ended_at = Some(Utc::now());
            }
        }

        if entry.job.pid.is_none() {
            entry.job.pid = result.pid;
        }
        entry.job.result = Some(result);
        Ok(entry.job.status)
    }

    /// Start `program` as a tracked job and return its initial snapshot
    pub fn spawn(
        self: &Arc<Self>,
        executor: Arc<Executor>,
        operation: &str,
        program: String,
        args: Vec<String>,
        policy: ResourcePolicy,
    ) -> Job {
        let (id, mut cancel_rx) = self.create(operation);
        let snapshot = self
            .get(&id)
            .unwrap_or_else(|| Job::pending(id.clone(), operation));

        let registry = Arc::clone(self);
        tokio::spawn(async move {
            if *cancel_rx.borrow() {
                debug!(job_id = %id, "job cancelled before spawn");
                return;
            }

            let spawned = Arc::clone(&registry);
            let spawned_id = id.clone();
            let on_spawn = move |pid: u32| {
                if let Err(e) = spawned.mark_running(&spawned_id, pid) {
                    debug!(job_id = %spawned_id, error = %e, "job not moved to running");
                }
            };
            // A dropped sender means the job was removed; treat it as cancel
            let cancel = async move {
                let _ = cancel_rx.wait_for(|cancelled| *cancelled).await;
            };

            let result = executor
                .execute_cancellable(&program, &args, &policy, cancel, on_spawn)
                .await;

            match registry.finish(&id, result) {
                Ok(status) => info!(job_id = %id, status = %status, "job finished"),
                Err(e) => debug!(job_id = %id, error = %e, "job result discarded"),
            }
        });

        snapshot
    }

    /// Drop terminal jobs that ended more than `retention_secs` before `now`
    pub fn reap_expired(&self, now: DateTime<Utc>) -> usize {
        let retention = chrono::Duration::seconds(self.config.retention_secs as i64);
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        let before = jobs.len();
        jobs.retain(|_, entry| {
            let entry = lock(entry);
            match entry.job.ended_at {
                Some(ended) if entry.job.status.is_terminal() => now - ended < retention,
                _ => true,
            }
        });
        before - jobs.len()
    }

    /// Cancel every active job, returning how many were cancelled
    pub fn cancel_all(&self) -> usize {
        self.list_active()
            .iter()
            .filter(|job| self.cancel(&job.id))
            .count()
    }

    /// Periodically reap expired jobs until the task is aborted
    pub fn start_reaper(self: &Arc<Self>) -> JoinHandle<()> {
        let registry = Arc::clone(self);
        let period = Duration::from_secs(self.config.reap_interval_secs.max(1));
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                let reaped = registry.reap_expired(Utc::now());
                if reaped > 0 {
                    debug!(reaped = reaped, "expired jobs reaped");
                }
            }
        })
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new(JobsConfig::default())
    }
}
