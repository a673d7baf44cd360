//! TaskService - 呼び出し側から見た操作面
//!
//! 投入・一覧・取得・キャンセル・削除・結果取得。
//! 投入は検証してストアに書いてキューに積むだけで、生成の完了は待たない。

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::{
    ResultFilter, StatisticRecord, StatusChange, TaskId, TaskRecord, TaskSpec, TaskStatus,
};
use crate::error::{Error, Result};
use crate::observability::TaskCounts;
use crate::ports::{Clock, IdGenerator, TaskStore};
use crate::worker::WorkerPool;

use super::pipeline::Pipeline;

#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn TaskStore>,
    pool: Arc<WorkerPool>,
    pipeline: Arc<Pipeline>,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
}

impl TaskService {
    pub fn new(
        store: Arc<dyn TaskStore>,
        pool: Arc<WorkerPool>,
        pipeline: Arc<Pipeline>,
        ids: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            pool,
            pipeline,
            ids,
            clock,
        }
    }

    /// Validate, store as `pending` and hand off to the pool.
    ///
    /// Errors: `Validation` (nothing stored), `PoolClosed`.
    pub async fn create_task(&self, spec: TaskSpec) -> Result<TaskRecord> {
        spec.validate()?;
        if self.pool.is_closed().await {
            return Err(Error::PoolClosed);
        }

        let task = TaskRecord::new(self.ids.generate_task_id(), spec, self.clock.now());
        self.store.insert_task(task.clone()).await?;

        if let Err(e) = self.enqueue(task.id).await {
            // shutdown raced us; nothing will ever run this task
            if let Err(rollback) = self.store.delete_task(task.id).await {
                warn!(task_id = %task.id, error = %rollback, "could not remove unscheduled task");
            }
            return Err(e);
        }

        info!(task_id = %task.id, name = %task.name, game = task.game.label(), "task accepted");
        Ok(task)
    }

    /// Queue an execution of `id`. Extra executions of a task that has
    /// already been claimed do nothing.
    pub async fn enqueue(&self, id: TaskId) -> Result<()> {
        let pipeline = Arc::clone(&self.pipeline);
        self.pool
            .submit(move || async move { pipeline.run(id).await })
            .await
    }

    pub async fn list_tasks(&self) -> Result<Vec<TaskRecord>> {
        self.store.list_tasks().await
    }

    pub async fn get_task(&self, id: TaskId) -> Result<TaskRecord> {
        self.store.get_task(id).await?.ok_or(Error::NotFound(id))
    }

    /// `pending → cancelled`. Any other current status is a `Conflict`.
    pub async fn cancel_task(&self, id: TaskId) -> Result<TaskRecord> {
        let change = StatusChange::new(TaskStatus::Pending, TaskStatus::Cancelled, self.clock.now());
        let task = self.store.transition(id, change).await?;
        info!(task_id = %id, "task cancelled");
        Ok(task)
    }

    /// Remove a task in any status together with its rows.
    pub async fn delete_task(&self, id: TaskId) -> Result<usize> {
        let rows = self.store.delete_task(id).await?;
        info!(task_id = %id, rows, "task deleted");
        Ok(rows)
    }

    /// Rows of a completed task.
    ///
    /// Errors: `NotFound`, `ResultsUnavailable` unless the task is `complete`.
    pub async fn get_results(
        &self,
        id: TaskId,
        filter: &ResultFilter,
    ) -> Result<Vec<StatisticRecord>> {
        let task = self.get_task(id).await?;
        if task.status != TaskStatus::Complete {
            return Err(Error::ResultsUnavailable {
                id,
                status: task.status,
            });
        }
        self.store.query_stats(id, filter).await
    }

    pub async fn counts(&self) -> Result<TaskCounts> {
        let tasks = self.store.list_tasks().await?;
        Ok(TaskCounts::from_tasks(&tasks))
    }

    /// Jobs waiting for a worker.
    pub async fn queued(&self) -> usize {
        self.pool.queued().await
    }
}
