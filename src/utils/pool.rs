// src/utils/pool.rs

//! Shared bounded worker pool.
//!
//! A single pool is created at process entry and threaded into every
//! component; its capacity caps total in-flight I/O across all collections
//! and sub-tasks combined.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Handle to the process-wide bounded worker pool.
#[derive(Clone)]
pub struct PoolHandle {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl PoolHandle {
    /// Create a pool with the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Number of permits the pool was created with.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Acquire a permit, waiting until one is free.
    pub async fn acquire(&self) -> OwnedSemaphorePermit {
        // The semaphore is never closed for the lifetime of the pool.
        self.semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("worker pool semaphore closed")
    }

    /// Run a task while holding one pool permit.
    pub async fn run<F: Future>(&self, task: F) -> F::Output {
        let _permit = self.acquire().await;
        task.await
    }
}
