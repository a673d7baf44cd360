//! WorkerPool - 常駐ワーカーによるジョブ実行
//!
//! - `submit()` はキューに積んで即座に返る（呼び出し側は生成を待たない）
//! - 各ワーカーは shutdown 通知と `pop()` を select で競合させる
//! - ジョブは個別の tokio タスクで実行する。panic してもワーカーは止まらない
//! - リトライはしない。1 回の submit につき最大 1 回実行

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::queue::{JobQueue, job};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub workers: usize,
    /// Upper bound on how long an idle worker waits before re-checking shutdown.
    pub poll_interval: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            poll_interval: Duration::from_secs(1),
        }
    }
}

/// What `shutdown` left behind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Queued jobs dropped without running.
    pub discarded: usize,
    /// Workers still busy at the deadline and aborted.
    pub aborted_workers: usize,
}

/// Worker pool handle.
/// - `shutdown_tx` に true を送るとワーカーは現在のジョブの後で止まる
/// - `shutdown()` で全ワーカーの終了を待つ（期限付き）
pub struct WorkerPool {
    queue: Arc<JobQueue>,
    shutdown_tx: watch::Sender<bool>,
    joins: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Spawn `config.workers` workers on the current tokio runtime.
    pub fn spawn(config: PoolConfig) -> Self {
        let queue = Arc::new(JobQueue::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut joins = Vec::with_capacity(config.workers);
        for worker in 0..config.workers {
            let q = Arc::clone(&queue);
            let rx = shutdown_rx.clone();
            joins.push(tokio::spawn(worker_loop(worker, q, config.poll_interval, rx)));
        }
        info!(workers = config.workers, "worker pool started");

        Self {
            queue,
            shutdown_tx,
            joins: Mutex::new(joins),
        }
    }

    /// Enqueue `f` and return immediately.
    ///
    /// Errors: `PoolClosed` once `shutdown` has begun.
    pub async fn submit<F, Fut>(&self, f: F) -> Result<()>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.queue.push(job(f)).await
    }

    pub async fn is_closed(&self) -> bool {
        self.queue.is_closed().await
    }

    /// Jobs waiting for a worker.
    pub async fn queued(&self) -> usize {
        self.queue.len().await
    }

    /// Stop the pool.
    ///
    /// New submissions are rejected, workers finish their current job and
    /// exit, anything still running at `timeout` is aborted, and jobs that
    /// never started are discarded. Calling it twice is harmless.
    pub async fn shutdown(&self, timeout: Duration) -> ShutdownReport {
        self.queue.close().await;
        // ignore send error: all workers may already be gone
        let _ = self.shutdown_tx.send(true);

        let joins = std::mem::take(&mut *self.joins.lock().await);
        let deadline = Instant::now() + timeout;
        let mut aborted_workers = 0;
        for mut join in joins {
            if tokio::time::timeout_at(deadline, &mut join).await.is_err() {
                join.abort();
                aborted_workers += 1;
            }
        }

        let discarded = self.queue.drain().await;
        if discarded > 0 || aborted_workers > 0 {
            warn!(discarded, aborted_workers, "worker pool stopped with unfinished work");
        } else {
            info!("worker pool stopped");
        }
        ShutdownReport {
            discarded,
            aborted_workers,
        }
    }
}

/// Aborts the job task when the worker itself is aborted.
struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

async fn worker_loop(
    worker: usize,
    queue: Arc<JobQueue>,
    poll_interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    debug!(worker, "worker started");
    loop {
        // shutdown が来ていたら抜ける
        if *shutdown_rx.borrow() {
            break;
        }

        // pop は待つ可能性があるので select で shutdown と競合させる
        let next = tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
            next = queue.pop(poll_interval) => next,
        };

        let Some(job) = next else {
            continue;
        };

        let handle = tokio::spawn(job());
        let _guard = AbortOnDrop(handle.abort_handle());
        if let Err(e) = handle.await {
            if e.is_panic() {
                error!(worker, error = %e, "job panicked");
            } else {
                warn!(worker, error = %e, "job cancelled");
            }
        }
    }
    debug!(worker, "worker stopped");
}
