//! InMemoryTaskStore - 開発用・テスト用の正本
//!
//! # 実装詳細
//! - 1 つの Mutex の中にタスクと統計行を両方持つ
//! - ロック 1 回 = トランザクション 1 回。状態遷移・一括挿入・カスケード削除は途中状態が見えない
//! - タスクは BTreeMap<TaskId, _>。ULID 順なので一覧は作成順になる

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{ResultFilter, StatisticRecord, StatusChange, TaskId, TaskRecord};
use crate::error::{Error, Result};
use crate::ports::TaskStore;

#[derive(Default)]
struct StoreState {
    tasks: BTreeMap<TaskId, TaskRecord>,
    /// Rows per owning task.
    stats: HashMap<TaskId, Vec<StatisticRecord>>,
}

#[derive(Default)]
pub struct InMemoryTaskStore {
    state: Mutex<StoreState>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of rows across all tasks.
    pub async fn total_stats(&self) -> usize {
        let state = self.state.lock().await;
        state.stats.values().map(Vec::len).sum()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn insert_task(&self, task: TaskRecord) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.tasks.contains_key(&task.id) {
            return Err(Error::Storage(format!("task {} already exists", task.id)));
        }
        state.tasks.insert(task.id, task);
        Ok(())
    }

    async fn get_task(&self, id: TaskId) -> Result<Option<TaskRecord>> {
        let state = self.state.lock().await;
        Ok(state.tasks.get(&id).cloned())
    }

    async fn list_tasks(&self) -> Result<Vec<TaskRecord>> {
        let state = self.state.lock().await;
        Ok(state.tasks.values().cloned().collect())
    }

    async fn transition(&self, id: TaskId, change: StatusChange) -> Result<TaskRecord> {
        let mut state = self.state.lock().await;
        let record = state.tasks.get_mut(&id).ok_or(Error::NotFound(id))?;
        record.apply(&change)?;
        Ok(record.clone())
    }

    async fn delete_task(&self, id: TaskId) -> Result<usize> {
        let mut state = self.state.lock().await;
        if state.tasks.remove(&id).is_none() {
            return Err(Error::NotFound(id));
        }
        Ok(state.stats.remove(&id).map_or(0, |rows| rows.len()))
    }

    async fn insert_stats(&self, task_id: TaskId, stats: Vec<StatisticRecord>) -> Result<usize> {
        let mut state = self.state.lock().await;
        if !state.tasks.contains_key(&task_id) {
            return Err(Error::NotFound(task_id));
        }
        if let Some(foreign) = stats.iter().find(|s| s.task_id != task_id) {
            return Err(Error::Storage(format!(
                "row {} belongs to {}, not {task_id}",
                foreign.id, foreign.task_id
            )));
        }
        let inserted = stats.len();
        state.stats.entry(task_id).or_default().extend(stats);
        Ok(inserted)
    }

    async fn query_stats(
        &self,
        task_id: TaskId,
        filter: &ResultFilter,
    ) -> Result<Vec<StatisticRecord>> {
        let state = self.state.lock().await;
        if !state.tasks.contains_key(&task_id) {
            return Err(Error::NotFound(task_id));
        }
        let mut rows: Vec<StatisticRecord> = state
            .stats
            .get(&task_id)
            .map(|rows| rows.iter().filter(|r| filter.matches(r)).cloned().collect())
            .unwrap_or_default();
        // stable: ties keep insertion order
        rows.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.character.cmp(&b.character)));
        Ok(rows)
    }

    async fn count_stats(&self, task_id: TaskId) -> Result<usize> {
        let state = self.state.lock().await;
        Ok(state.stats.get(&task_id).map_or(0, Vec::len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        GameId, GameSelector, Metric, RawStat, StatId, TaskSpec, TaskStatus,
    };
    use chrono::{NaiveDate, Utc};
    use ulid::Ulid;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn task() -> TaskRecord {
        let spec = TaskSpec::new(
            "t",
            GameSelector::single("valorant"),
            date(1),
            date(31),
            vec![Metric::Kills],
        );
        TaskRecord::new(TaskId::from_ulid(Ulid::new()), spec, Utc::now())
    }

    fn row(task_id: TaskId, d: u32, character: &str) -> StatisticRecord {
        StatisticRecord::from_raw(
            StatId::from_ulid(Ulid::new()),
            task_id,
            RawStat::new(
                GameId::new("valorant"),
                Some(character.to_string()),
                date(d),
                10,
                5,
                3,
                2,
            ),
        )
    }

    #[tokio::test]
    async fn insert_and_get() {
        let store = InMemoryTaskStore::new();
        let t = task();
        store.insert_task(t.clone()).await.unwrap();

        assert_eq!(store.get_task(t.id).await.unwrap(), Some(t.clone()));
        assert!(store.insert_task(t).await.is_err());
    }

    #[tokio::test]
    async fn transition_is_compare_and_swap() {
        let store = InMemoryTaskStore::new();
        let t = task();
        store.insert_task(t.clone()).await.unwrap();

        let now = Utc::now();
        let claimed = store
            .transition(
                t.id,
                StatusChange::new(TaskStatus::Pending, TaskStatus::InProgress, now),
            )
            .await
            .unwrap();
        assert_eq!(claimed.status, TaskStatus::InProgress);

        // a second claim loses
        let err = store
            .transition(
                t.id,
                StatusChange::new(TaskStatus::Pending, TaskStatus::InProgress, now),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict { current: TaskStatus::InProgress, .. }));

        let missing = TaskId::from_ulid(Ulid::new());
        let err = store
            .transition(
                missing,
                StatusChange::new(TaskStatus::Pending, TaskStatus::Cancelled, now),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(id) if id == missing));
    }

    #[tokio::test]
    async fn delete_cascades_rows() {
        let store = InMemoryTaskStore::new();
        let keep = task();
        let gone = task();
        store.insert_task(keep.clone()).await.unwrap();
        store.insert_task(gone.clone()).await.unwrap();
        store
            .insert_stats(gone.id, vec![row(gone.id, 1, "Jett"), row(gone.id, 2, "Sage")])
            .await
            .unwrap();
        store.insert_stats(keep.id, vec![row(keep.id, 1, "Omen")]).await.unwrap();

        let removed = store.delete_task(gone.id).await.unwrap();

        assert_eq!(removed, 2);
        assert_eq!(store.count_stats(gone.id).await.unwrap(), 0);
        assert!(store.get_task(gone.id).await.unwrap().is_none());
        assert_eq!(store.total_stats().await, 1);
        assert!(matches!(store.delete_task(gone.id).await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn insert_stats_requires_owner() {
        let store = InMemoryTaskStore::new();
        let t = task();
        let err = store.insert_stats(t.id, vec![row(t.id, 1, "Jett")]).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        store.insert_task(t.clone()).await.unwrap();
        let other = TaskId::from_ulid(Ulid::new());
        let err = store
            .insert_stats(t.id, vec![row(t.id, 1, "Jett"), row(other, 1, "Sage")])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
        // all-or-nothing
        assert_eq!(store.count_stats(t.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn query_filters_and_orders() {
        let store = InMemoryTaskStore::new();
        let t = task();
        store.insert_task(t.clone()).await.unwrap();
        store
            .insert_stats(
                t.id,
                vec![
                    row(t.id, 3, "Sage"),
                    row(t.id, 1, "Sage"),
                    row(t.id, 2, "Jett"),
                    row(t.id, 1, "Jett"),
                ],
            )
            .await
            .unwrap();

        let all = store.query_stats(t.id, &ResultFilter::default()).await.unwrap();
        let order: Vec<(u32, &str)> = all
            .iter()
            .map(|r| (chrono::Datelike::day(&r.date), r.character.as_deref().unwrap()))
            .collect();
        assert_eq!(order, vec![(1, "Jett"), (1, "Sage"), (2, "Jett"), (3, "Sage")]);

        let jett = store
            .query_stats(t.id, &ResultFilter::default().character("Jett"))
            .await
            .unwrap();
        assert_eq!(jett.len(), 2);

        let window = store
            .query_stats(t.id, &ResultFilter::default().between(Some(date(2)), Some(date(3))))
            .await
            .unwrap();
        assert_eq!(window.len(), 2);
    }

    #[tokio::test]
    async fn list_is_creation_ordered() {
        let store = InMemoryTaskStore::new();
        let first = task();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = task();
        store.insert_task(second.clone()).await.unwrap();
        store.insert_task(first.clone()).await.unwrap();

        let ids: Vec<TaskId> = store.list_tasks().await.unwrap().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![first.id, second.id]);
    }
}
