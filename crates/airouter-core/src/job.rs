//! The Job data model (design doc §3): the unit of work that flows through
//! admission, the priority queue, the batcher, the worker pool, and into Job
//! Storage.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::RouterError;

/// What kind of work a job represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    Inference,
    Embedding,
    Search,
}

/// Dispatch priority. Ordered so that `Priority::High > Priority::Normal >
/// Priority::Low` under the derived `Ord`, matching the queue's
/// (priority descending, sequence ascending) ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Normal,
    High,
}

impl Priority {
    /// Numeric rank used when computing a sorted-set score for the shared
    /// key-value queue backend (`priority_rank * 10^9 - sequence`).
    pub fn rank(self) -> u64 {
        match self {
            Priority::Low => 0,
            Priority::Normal => 1,
            Priority::High => 2,
        }
    }
}

/// Opaque key/value payload interpreted by the chosen provider adapter.
pub type JobPayload = HashMap<String, serde_json::Value>;

/// A job's position in the lattice described in the design doc: status
/// progresses monotonically and terminal states never transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Queued,
    Running,
    Completed,
    Failed,
    Timeout,
    Cancelled,
    DeadLetter,
}

impl JobStatus {
    /// Once reached, a status never transitions further.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed
                | JobStatus::Failed
                | JobStatus::Timeout
                | JobStatus::Cancelled
                | JobStatus::DeadLetter
        )
    }
}

/// The outcome of a job's dispatch, set exactly once when the job reaches a
/// terminal status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobOutcome {
    pub result: Option<serde_json::Value>,
    pub provider_used: Option<String>,
    pub error: Option<RouterError>,
}

impl JobOutcome {
    pub fn success(result: serde_json::Value, provider_used: impl Into<String>) -> Self {
        Self {
            result: Some(result),
            provider_used: Some(provider_used.into()),
            error: None,
        }
    }

    pub fn failure(error: RouterError) -> Self {
        Self {
            result: None,
            provider_used: None,
            error: Some(error),
        }
    }
}

/// The unit of work, as described in the design doc's data model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub idempotency_key: Option<String>,
    pub tenant_id: String,
    pub request_id: String,

    pub job_type: JobType,
    pub priority: Priority,
    pub target_provider: Option<String>,

    pub payload: JobPayload,

    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub queued_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,

    pub attempt_count: u32,
    pub max_attempts: u32,
    pub per_attempt_timeout: Duration,
    pub total_timeout: Duration,
    pub webhook_url: Option<String>,

    /// Monotonic enqueue sequence, used to break priority ties FIFO. Set by
    /// the priority queue on enqueue, not by the caller.
    pub sequence: u64,

    pub outcome: Option<JobOutcome>,
}

impl Job {
    pub fn new(
        tenant_id: impl Into<String>,
        request_id: impl Into<String>,
        job_type: JobType,
        priority: Priority,
        payload: JobPayload,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            idempotency_key: None,
            tenant_id: tenant_id.into(),
            request_id: request_id.into(),
            job_type,
            priority,
            target_provider: None,
            payload,
            status: JobStatus::Pending,
            created_at: Utc::now(),
            queued_at: None,
            started_at: None,
            completed_at: None,
            attempt_count: 0,
            max_attempts: 3,
            per_attempt_timeout: Duration::from_secs(30),
            total_timeout: Duration::from_secs(120),
            webhook_url: None,
            sequence: 0,
            outcome: None,
        }
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    pub fn with_target_provider(mut self, provider: impl Into<String>) -> Self {
        self.target_provider = Some(provider.into());
        self
    }

    /// Transitions to a new status, refusing to move out of a terminal state.
    /// Returns `false` (no-op) if `self.status` is already terminal.
    pub fn transition(&mut self, next: JobStatus) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = next;
        let now = Utc::now();
        match next {
            JobStatus::Queued => self.queued_at = Some(now),
            JobStatus::Running => self.started_at = Some(now),
            _ if next.is_terminal() => self.completed_at = Some(now),
            _ => {}
        }
        true
    }

    /// Resets a dead-lettered job for re-insertion into the priority queue
    /// (design doc §4.10 `RequeueFromDeadLetter`).
    pub fn requeue(&mut self) {
        self.status = JobStatus::Pending;
        self.attempt_count = 0;
        self.outcome = None;
        self.queued_at = None;
        self.started_at = None;
        self.completed_at = None;
    }

    pub fn to_result(&self) -> JobResult {
        JobResult {
            job_id: self.id,
            status: self.status,
            result: self.outcome.as_ref().and_then(|o| o.result.clone()),
            error: self.outcome.as_ref().and_then(|o| o.error.clone()),
            provider_used: self.outcome.as_ref().and_then(|o| o.provider_used.clone()),
            attempt_count: self.attempt_count,
            created_at: self.created_at,
            completed_at: self.completed_at,
        }
    }
}

/// A projection of [`Job`] suitable for client retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub result: Option<serde_json::Value>,
    pub error: Option<RouterError>,
    pub provider_used: Option<String>,
    pub attempt_count: u32,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// A transient grouping of jobs sharing (provider, job type), owned only
/// while in flight by the worker pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub id: Uuid,
    pub provider: String,
    pub job_type: JobType,
    pub jobs: Vec<Job>,
    pub created_at: DateTime<Utc>,
}

impl Batch {
    pub fn new(provider: impl Into<String>, job_type: JobType) -> Self {
        Self {
            id: Uuid::new_v4(),
            provider: provider.into(),
            job_type,
            jobs: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn push(&mut self, job: Job) {
        debug_assert_eq!(job.job_type, self.job_type);
        self.jobs.push(job);
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

/// A job frozen in its final failed state with an extended retention window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadLetterRecord {
    pub job: Job,
    pub error: RouterError,
    pub dead_lettered_at: DateTime<Utc>,
}

impl DeadLetterRecord {
    pub fn new(job: Job, error: RouterError) -> Self {
        Self {
            job,
            error,
            dead_lettered_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn sample_job() -> Job {
        Job::new("tenant-a", "req-1", JobType::Inference, Priority::High, JobPayload::new())
    }

    #[test]
    fn priority_ordering_matches_rank() {
        assert!(Priority::High > Priority::Normal);
        assert!(Priority::Normal > Priority::Low);
    }

    #[test]
    fn terminal_status_never_transitions() {
        let mut job = sample_job();
        assert!(job.transition(JobStatus::Queued));
        assert!(job.transition(JobStatus::Running));
        assert!(job.transition(JobStatus::Completed));
        assert!(!job.transition(JobStatus::Failed));
        assert_eq!(job.status, JobStatus::Completed);
    }

    #[test]
    fn requeue_resets_attempt_count_and_status() {
        let mut job = sample_job();
        job.attempt_count = 3;
        job.transition(JobStatus::Queued);
        job.transition(JobStatus::Running);
        job.transition(JobStatus::DeadLetter);

        job.requeue();

        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.attempt_count, 0);
        assert!(job.outcome.is_none());
    }

    #[test]
    fn serialize_roundtrip_is_identity() {
        let mut job = sample_job();
        job.outcome = Some(JobOutcome::failure(RouterError::new(
            ErrorKind::ProviderTimeout,
            "timed out",
        )));
        let encoded = serde_json::to_string(&job).unwrap();
        let decoded: Job = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.id, job.id);
        assert_eq!(decoded.status, job.status);
    }

    #[test]
    fn batch_push_keeps_homogeneous_job_type() {
        let mut batch = Batch::new("primary", JobType::Inference);
        batch.push(sample_job());
        assert_eq!(batch.len(), 1);
    }
}
