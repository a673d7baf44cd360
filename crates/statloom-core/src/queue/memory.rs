//! In-memory job queue.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;

use super::Job;
use crate::error::{Error, Result};

#[derive(Default)]
struct QueueState {
    jobs: VecDeque<Job>,
    /// Set once; afterwards `push` is rejected.
    closed: bool,
}

/// Unbounded FIFO shared by the pool's workers.
#[derive(Default)]
pub struct JobQueue {
    state: Mutex<QueueState>,
    notify: Notify,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a job. Fails with `PoolClosed` after [`close`](Self::close).
    pub async fn push(&self, job: Job) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.closed {
            return Err(Error::PoolClosed);
        }
        state.jobs.push_back(job);

        // Notify waiting workers
        drop(state);
        self.notify.notify_one();
        Ok(())
    }

    /// Take the oldest job, waiting up to `timeout` for one to arrive.
    pub async fn pop(&self, timeout: Duration) -> Option<Job> {
        let deadline = Instant::now() + timeout;
        loop {
            {
                let mut state = self.state.lock().await;
                if let Some(job) = state.jobs.pop_front() {
                    let more = !state.jobs.is_empty();
                    drop(state);
                    // pass the wakeup on so another idle worker picks up the rest
                    if more {
                        self.notify.notify_one();
                    }
                    return Some(job);
                }
            }

            tokio::select! {
                _ = self.notify.notified() => {},
                _ = tokio::time::sleep_until(deadline) => return None,
            }
        }
    }

    /// Stop accepting new jobs. Jobs already queued stay until popped or drained.
    pub async fn close(&self) {
        self.state.lock().await.closed = true;
    }

    pub async fn is_closed(&self) -> bool {
        self.state.lock().await.closed
    }

    /// Drop every queued job without running it. Returns how many were dropped.
    pub async fn drain(&self) -> usize {
        let mut state = self.state.lock().await;
        let dropped = state.jobs.len();
        state.jobs.clear();
        dropped
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.jobs.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
