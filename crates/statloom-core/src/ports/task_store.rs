//! TaskStore port - タスクと統計行の正本（source of truth）
//!
//! TaskStore は以下を管理します：
//! - タスクのパラメータと状態
//! - タスクに従属する StatisticRecord（タスク削除で一緒に消える）
//!
//! # 設計原則
//! - 状態遷移は 1 回ごとに独立したトランザクション（compare-and-swap）
//! - 統計行の一括挿入も 1 トランザクション（全件入るか、何も入らない）
//! - admission 側と worker 側の協調はすべてここを経由する。メモリ上のキャッシュは持たない

use async_trait::async_trait;

use crate::domain::{ResultFilter, StatisticRecord, StatusChange, TaskId, TaskRecord};
use crate::error::Result;

#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Insert a freshly admitted task.
    async fn insert_task(&self, task: TaskRecord) -> Result<()>;

    async fn get_task(&self, id: TaskId) -> Result<Option<TaskRecord>>;

    /// All tasks, oldest first.
    async fn list_tasks(&self) -> Result<Vec<TaskRecord>>;

    /// Apply `change` atomically if the task is still in `change.from`.
    ///
    /// Errors: `NotFound` for an unknown id, `Conflict` if the status moved on.
    async fn transition(&self, id: TaskId, change: StatusChange) -> Result<TaskRecord>;

    /// Remove a task together with all of its statistic rows.
    /// Returns the number of rows removed alongside the task.
    async fn delete_task(&self, id: TaskId) -> Result<usize>;

    /// Bulk insert rows for one task in a single transaction.
    /// Fails with `NotFound` (inserting nothing) if the task no longer exists.
    async fn insert_stats(&self, task_id: TaskId, stats: Vec<StatisticRecord>) -> Result<usize>;

    /// Rows of one task matching `filter`, ordered by date, then character.
    async fn query_stats(
        &self,
        task_id: TaskId,
        filter: &ResultFilter,
    ) -> Result<Vec<StatisticRecord>>;

    async fn count_stats(&self, task_id: TaskId) -> Result<usize>;
}
