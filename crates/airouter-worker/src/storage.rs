//! Job Storage and the Dead-Letter Queue (design doc §4.10).
//!
//! In-memory only, mirroring the upstream prototype's "memory" backend — a
//! Redis-backed variant would slot in behind the same surface the way
//! [`airouter_queue`]'s `redis-backend` feature does for the priority queue,
//! but no caller in this workspace needs it yet.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;
use uuid::Uuid;

use airouter_core::{DeadLetterRecord, Job, JobResult, JobStatus, RouterError};

use crate::config::StorageConfig;

pub struct JobStorage {
    config: StorageConfig,
    jobs: Mutex<HashMap<Uuid, Job>>,
    results: Mutex<HashMap<Uuid, JobResult>>,
    idempotency: Mutex<HashMap<String, Uuid>>,
    dead_letter: Mutex<HashMap<Uuid, DeadLetterRecord>>,
}

impl JobStorage {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            jobs: Mutex::new(HashMap::new()),
            results: Mutex::new(HashMap::new()),
            idempotency: Mutex::new(HashMap::new()),
            dead_letter: Mutex::new(HashMap::new()),
        }
    }

    /// §4.10 `SaveJob`.
    pub fn save_job(&self, job: Job) {
        let mut jobs = self.jobs.lock().expect("job storage poisoned");
        if let Some(key) = job.idempotency_key.clone() {
            self.idempotency
                .lock()
                .expect("idempotency map poisoned")
                .insert(key, job.id);
        }
        jobs.insert(job.id, job);
    }

    /// §4.10 `GetJob`.
    pub fn get_job(&self, job_id: Uuid) -> Option<Job> {
        self.jobs.lock().expect("job storage poisoned").get(&job_id).cloned()
    }

    /// §4.10 `CheckIdempotency(key) -> jobId?`.
    pub fn check_idempotency(&self, key: &str) -> Option<Uuid> {
        self.idempotency.lock().expect("idempotency map poisoned").get(key).copied()
    }

    /// §4.10 `UpdateStatus`. A storage-level write failure here would
    /// surface as a job-level failure per §4.10's failure semantics; the
    /// in-memory backend cannot fail, so this always succeeds.
    pub fn update_status(&self, job_id: Uuid, status: JobStatus, error: Option<RouterError>) {
        let mut jobs = self.jobs.lock().expect("job storage poisoned");
        if let Some(job) = jobs.get_mut(&job_id) {
            job.transition(status);
            if let Some(error) = error {
                job.outcome = Some(airouter_core::JobOutcome::failure(error));
            }
        }
    }

    /// §4.10 `SaveResult`.
    pub fn save_result(&self, result: JobResult) {
        self.results
            .lock()
            .expect("result storage poisoned")
            .insert(result.job_id, result);
    }

    /// §4.10 `GetResult`.
    pub fn get_result(&self, job_id: Uuid) -> Option<JobResult> {
        self.results.lock().expect("result storage poisoned").get(&job_id).cloned()
    }

    /// §4.10 `AddToDeadLetter`.
    pub fn add_to_dead_letter(&self, mut job: Job, error: RouterError) {
        job.transition(JobStatus::DeadLetter);
        job.outcome = Some(airouter_core::JobOutcome::failure(error.clone()));
        let job_id = job.id;
        self.dead_letter
            .lock()
            .expect("dead letter storage poisoned")
            .insert(job_id, DeadLetterRecord::new(job, error));
    }

    /// §4.10 `ListDeadLetter(limit) -> jobs`.
    pub fn list_dead_letter(&self, limit: usize) -> Vec<DeadLetterRecord> {
        self.dead_letter
            .lock()
            .expect("dead letter storage poisoned")
            .values()
            .take(limit)
            .cloned()
            .collect()
    }

    /// §4.10 `RequeueFromDeadLetter(jobId) -> job`. Resets attempt count and
    /// status and removes the record from the dead-letter queue, returning
    /// the job for re-insertion into the priority queue.
    pub fn requeue_from_dead_letter(&self, job_id: Uuid) -> Option<Job> {
        let record = self
            .dead_letter
            .lock()
            .expect("dead letter storage poisoned")
            .remove(&job_id)?;
        let mut job = record.job;
        job.requeue();
        Some(job)
    }

    /// §4.10 `CleanupOlderThan(age)`. Only meaningful for the in-memory
    /// backend; a shared key-value store would rely on its own TTL instead.
    pub fn cleanup_older_than(&self, age: std::time::Duration) {
        let cutoff = Utc::now() - chrono::Duration::from_std(age).unwrap_or(chrono::Duration::zero());
        let mut jobs = self.jobs.lock().expect("job storage poisoned");
        let to_remove: Vec<Uuid> = jobs
            .values()
            .filter(|job| job.completed_at.map(|at| at < cutoff).unwrap_or(false))
            .map(|job| job.id)
            .collect();
        for job_id in &to_remove {
            jobs.remove(job_id);
        }
        drop(jobs);

        let mut results = self.results.lock().expect("result storage poisoned");
        for job_id in &to_remove {
            results.remove(job_id);
        }

        let dead_letter_cutoff = Utc::now()
            - chrono::Duration::from_std(self.config.dead_letter_ttl()).unwrap_or(chrono::Duration::zero());
        self.dead_letter
            .lock()
            .expect("dead letter storage poisoned")
            .retain(|_, record| record.dead_lettered_at >= dead_letter_cutoff);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use airouter_core::{ErrorKind, JobType, Priority};
    use std::collections::HashMap as StdHashMap;

    fn job() -> Job {
        Job::new("tenant-a", "req-1", JobType::Inference, Priority::Normal, StdHashMap::new())
    }

    #[test]
    fn saved_job_is_retrievable() {
        let storage = JobStorage::new(StorageConfig::default());
        let job = job();
        let id = job.id;
        storage.save_job(job);
        assert!(storage.get_job(id).is_some());
    }

    #[test]
    fn idempotency_key_resolves_to_job_id() {
        let storage = JobStorage::new(StorageConfig::default());
        let job = job().with_idempotency_key("key-1");
        let id = job.id;
        storage.save_job(job);
        assert_eq!(storage.check_idempotency("key-1"), Some(id));
    }

    #[test]
    fn dead_letter_round_trips_and_requeue_resets_state() {
        let storage = JobStorage::new(StorageConfig::default());
        let mut job = job();
        job.attempt_count = 3;
        let id = job.id;
        storage.add_to_dead_letter(job, RouterError::new(ErrorKind::AllProvidersFailed, "exhausted"));

        assert_eq!(storage.list_dead_letter(10).len(), 1);

        let requeued = storage.requeue_from_dead_letter(id).expect("job should requeue");
        assert_eq!(requeued.status, JobStatus::Pending);
        assert_eq!(requeued.attempt_count, 0);
        assert!(storage.list_dead_letter(10).is_empty());
    }

    #[test]
    fn requeue_of_unknown_job_is_none() {
        let storage = JobStorage::new(StorageConfig::default());
        assert!(storage.requeue_from_dead_letter(Uuid::new_v4()).is_none());
    }
}
