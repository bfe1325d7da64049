use std::collections::HashMap;
use std::sync::Mutex;

use uuid::Uuid;

/// Maps an idempotency key to the job id it was first associated with. A
/// repeat `Enqueue` with the same key returns the original job rather than
/// enqueueing a duplicate (design doc §4.4).
#[derive(Default)]
pub struct IdempotencyMap {
    keys: Mutex<HashMap<String, Uuid>>,
}

impl IdempotencyMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn existing(&self, key: &str) -> Option<Uuid> {
        self.keys.lock().expect("idempotency map poisoned").get(key).copied()
    }

    pub fn record(&self, key: &str, job_id: Uuid) {
        self.keys
            .lock()
            .expect("idempotency map poisoned")
            .insert(key.to_string(), job_id);
    }

    pub fn forget(&self, key: &str) {
        self.keys.lock().expect("idempotency map poisoned").remove(key);
    }
}
