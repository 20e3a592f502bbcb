//! Gauge tracking the number of stored tasks.
//!
//! The service owns an `Arc<TaskGauge>` handed to it at construction; the
//! HTTP boundary reads the same handle when rendering `/metrics`.

use std::sync::atomic::{AtomicI64, Ordering};

#[derive(Debug, Default)]
pub struct TaskGauge {
    value: AtomicI64,
}

impl TaskGauge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decrement(&self) {
        self.value.fetch_sub(1, Ordering::Relaxed);
    }

    /// Overwrite with a full recount, used once at startup.
    pub fn set(&self, value: i64) {
        self.value.store(value, Ordering::Relaxed);
    }

    pub fn get(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }
}
