use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::metrics::JOBS_ACTIVE;
use crate::models::AnalysisResult;
use crate::pipeline::{AnalysisPipeline, STAGES, StageProgress};

#[derive(Serialize, Clone, Copy, PartialEq, Eq, Debug)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

// One tracked analysis; polls clone it out as a snapshot
#[derive(Serialize, Clone, PartialEq, Debug)]
pub struct Job {
    pub id: String,
    pub url: String,
    pub status: JobStatus,
    pub sub_task_progress: HashMap<String, f64>,
    pub result: Option<AnalysisResult>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

struct WorkItem {
    job_id: String,
    url: String,
}

// Async job tracker: a bounded queue feeds a fixed worker pool, jobs live in
// an in-memory store until the reaper evicts them. All mutation of one job
// happens under its map entry lock, never across an await.
pub struct JobTracker {
    jobs: DashMap<String, Job>,
    queue: mpsc::Sender<WorkItem>,
    // Workers share this receiver; keeping it on the tracker also keeps the
    // channel open when the pool is empty
    queue_rx: Arc<Mutex<mpsc::Receiver<WorkItem>>>,
}

impl JobTracker {
    // Builds the tracker and spawns its worker pool
    pub fn start(
        pipeline: Arc<AnalysisPipeline>,
        workers: usize,
        queue_capacity: usize,
        analysis_timeout: Duration,
    ) -> Arc<Self> {
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let tracker = Arc::new(Self {
            jobs: DashMap::new(),
            queue: tx,
            queue_rx: Arc::new(Mutex::new(rx)),
        });

        for worker in 0..workers {
            let tracker = Arc::clone(&tracker);
            let rx = Arc::clone(&tracker.queue_rx);
            let pipeline = Arc::clone(&pipeline);
            tokio::spawn(async move {
                worker_loop(worker, tracker, rx, pipeline, analysis_timeout).await;
            });
        }
        tracker
    }

    // Registers a pending job and enqueues it; returns without waiting for work.
    // A full queue rejects the create and leaves no orphan record behind.
    pub fn create(&self, url: &str) -> Result<String, ApiError> {
        let job_id = Uuid::new_v4().to_string();
        let job = Job {
            id: job_id.clone(),
            url: url.to_string(),
            status: JobStatus::Pending,
            sub_task_progress: STAGES.iter().map(|s| (s.to_string(), 0.0)).collect(),
            result: None,
            error: None,
            created_at: Utc::now(),
        };
        self.jobs.insert(job_id.clone(), job);

        let item = WorkItem {
            job_id: job_id.clone(),
            url: url.to_string(),
        };
        match self.queue.try_send(item) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.jobs.remove(&job_id);
                warn!("job queue full, rejecting create");
                return Err(ApiError::QueueFull);
            }
            // Cannot happen while the tracker holds the receiver
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.jobs.remove(&job_id);
                return Err(ApiError::Internal("job queue is closed".to_string()));
            }
        }

        JOBS_ACTIVE.set(self.jobs.len() as f64);
        info!(job_id = %job_id, "analysis job created");
        Ok(job_id)
    }

    // Snapshot of the current record; NotFound once reaped or never created
    pub fn poll(&self, job_id: &str) -> Result<Job, ApiError> {
        self.jobs
            .get(job_id)
            .map(|job| job.clone())
            .ok_or(ApiError::NotFound("Job"))
    }

    // Evicts every job older than the threshold, terminal or not. Unpolled
    // results may be dropped; that is the bounded-memory trade-off.
    pub fn reap(&self, max_age_seconds: i64) {
        let now = Utc::now();
        // Counted inside the closure: creates run concurrently, so the map
        // length may grow while retain walks it
        let mut removed = 0usize;
        self.jobs.retain(|_, job| {
            let keep = (now - job.created_at).num_seconds() < max_age_seconds;
            if !keep {
                removed += 1;
            }
            keep
        });
        if removed > 0 {
            info!(removed, "reaped expired jobs");
        }
        JOBS_ACTIVE.set(self.jobs.len() as f64);
    }

    // Single-field update under the entry lock
    fn update(&self, job_id: &str, f: impl FnOnce(&mut Job)) {
        if let Some(mut job) = self.jobs.get_mut(job_id) {
            f(&mut job);
        }
    }
}

// Marks pipeline stages complete on the tracked job
struct JobStageProgress {
    tracker: Arc<JobTracker>,
    job_id: String,
}

impl StageProgress for JobStageProgress {
    fn stage_done(&self, stage: &str) {
        self.tracker.update(&self.job_id, |job| {
            job.sub_task_progress.insert(stage.to_string(), 1.0);
        });
    }
}

async fn worker_loop(
    worker: usize,
    tracker: Arc<JobTracker>,
    rx: Arc<Mutex<mpsc::Receiver<WorkItem>>>,
    pipeline: Arc<AnalysisPipeline>,
    analysis_timeout: Duration,
) {
    debug!(worker, "analysis worker started");
    loop {
        // Hold the receiver lock only while waiting for the next item
        let item = { rx.lock().await.recv().await };
        let Some(item) = item else {
            break;
        };
        // The job may have been reaped while queued
        if !tracker.jobs.contains_key(&item.job_id) {
            debug!(worker, job_id = %item.job_id, "skipping reaped job");
            continue;
        }

        tracker.update(&item.job_id, |job| job.status = JobStatus::Running);
        info!(worker, job_id = %item.job_id, "job running");

        let progress = JobStageProgress {
            tracker: Arc::clone(&tracker),
            job_id: item.job_id.clone(),
        };
        let outcome =
            tokio::time::timeout(analysis_timeout, pipeline.analyze(&item.url, &progress)).await;

        // Status and result/error land in one update so a poll never sees
        // a terminal status with the other field missing
        match outcome {
            Ok(Ok(result)) => {
                tracker.update(&item.job_id, |job| {
                    job.status = JobStatus::Completed;
                    job.result = Some(result);
                });
                info!(worker, job_id = %item.job_id, "job completed");
            }
            Ok(Err(e)) => {
                tracker.update(&item.job_id, |job| {
                    job.status = JobStatus::Failed;
                    job.error = Some(e.to_string());
                });
                warn!(worker, job_id = %item.job_id, error = %e, "job failed");
            }
            Err(_) => {
                let e = ApiError::TimedOut(analysis_timeout.as_secs());
                tracker.update(&item.job_id, |job| {
                    job.status = JobStatus::Failed;
                    job.error = Some(e.to_string());
                });
                warn!(worker, job_id = %item.job_id, "job timed out");
            }
        }
    }
}
