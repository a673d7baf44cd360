//! Pipeline - 1 タスク分の実行
//!
//! # フロー
//! 1. TaskStore::get_task() でタスク取得（無ければ何もしない）
//! 2. pending → in_progress を CAS で claim（負けたら何もしない）
//! 3. 擬似レイテンシの後、StatGenerator を呼ぶ（custom はソースごとに 1 回）
//! 4. RawStat → StatisticRecord に変換して一括挿入
//! 5. in_progress → complete / failed
//!
//! 失敗は呼び出し元に返さない。タスクの `error` に残してログに出す。

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Once};
use std::time::Duration;

use rand::Rng;
use tracing::{debug, error, info, warn};

use crate::domain::{
    GameSelector, RawStat, StatisticRecord, StatusChange, TaskId, TaskRecord, TaskStatus,
};
use crate::error::{Error, Result};
use crate::ports::{
    Clock, GameTarget, GenerateError, GenerateRequest, IdGenerator, StatGenerator, TaskStore,
};

/// Simulated processing delay, sampled uniformly per task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Latency {
    pub min: Duration,
    pub max: Duration,
}

impl Latency {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }

    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    fn sample(&self) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        rand::thread_rng().gen_range(self.min..=self.max)
    }
}

impl Default for Latency {
    fn default() -> Self {
        Self::new(Duration::from_secs(3), Duration::from_secs(5))
    }
}

pub struct Pipeline {
    store: Arc<dyn TaskStore>,
    generator: Arc<dyn StatGenerator>,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
    latency: Latency,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn TaskStore>,
        generator: Arc<dyn StatGenerator>,
        ids: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            generator,
            ids,
            clock,
            latency: Latency::default(),
        }
    }

    pub fn with_latency(mut self, latency: Latency) -> Self {
        self.latency = latency;
        self
    }

    /// Execute one task to a terminal status. Never returns an error.
    pub async fn run(&self, task_id: TaskId) {
        let task = match self.store.get_task(task_id).await {
            Ok(Some(task)) => task,
            Ok(None) => {
                debug!(%task_id, "task no longer exists, skipping");
                return;
            }
            Err(e) => {
                error!(%task_id, error = %e, "task lookup failed");
                return;
            }
        };

        let claim = StatusChange::new(TaskStatus::Pending, TaskStatus::InProgress, self.clock.now());
        match self.store.transition(task_id, claim).await {
            Ok(_) => {}
            Err(Error::Conflict { current, .. }) => {
                debug!(%task_id, status = %current, "task already claimed or cancelled, skipping");
                return;
            }
            Err(Error::NotFound(_)) => {
                debug!(%task_id, "task deleted before claim, skipping");
                return;
            }
            Err(e) => {
                error!(%task_id, error = %e, "claim failed");
                return;
            }
        }
        info!(%task_id, game = task.game.label(), "task started");

        match self.execute(&task).await {
            Ok(rows) => {
                let done = StatusChange::new(TaskStatus::InProgress, TaskStatus::Complete, self.clock.now());
                match self.store.transition(task_id, done).await {
                    Ok(_) => info!(%task_id, rows, "task complete"),
                    Err(Error::NotFound(_)) => debug!(%task_id, "task deleted during execution"),
                    Err(e) => warn!(%task_id, error = %e, "could not mark task complete"),
                }
            }
            Err(Error::NotFound(_)) => {
                debug!(%task_id, "task deleted during execution, discarding rows");
            }
            Err(e) => self.fail(task_id, e).await,
        }
    }

    async fn execute(&self, task: &TaskRecord) -> Result<usize> {
        let delay = self.latency.sample();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let raw = self.generate(task)?;
        let records: Vec<StatisticRecord> = raw
            .into_iter()
            .map(|r| StatisticRecord::from_raw(self.ids.generate_stat_id(), task.id, r))
            .collect();
        self.store.insert_stats(task.id, records).await
    }

    fn generate(&self, task: &TaskRecord) -> Result<Vec<RawStat>> {
        match &task.game {
            GameSelector::Single { game } => {
                self.call(task, GameTarget::One(game.clone()), task.characters.as_deref())
            }
            GameSelector::All => self.call(task, GameTarget::All, task.characters.as_deref()),
            GameSelector::Custom {
                sources,
                characters,
            } => {
                let mut out = Vec::new();
                for source in sources {
                    // only this source's filter; other sources never leak in
                    let filter = characters.get(source).map(Vec::as_slice);
                    out.extend(self.call(task, GameTarget::One(source.clone()), filter)?);
                }
                Ok(out)
            }
        }
    }

    fn call(
        &self,
        task: &TaskRecord,
        target: GameTarget,
        characters: Option<&[String]>,
    ) -> Result<Vec<RawStat>> {
        let request = GenerateRequest {
            target,
            start: task.start_date,
            end: task.end_date,
            metrics: &task.metrics,
            characters,
        };
        let generator = &self.generator;
        install_panic_hook();
        LAST_PANIC.with(|slot| slot.borrow_mut().take());
        match catch_unwind(AssertUnwindSafe(|| generator.generate(&request))) {
            Ok(result) => Ok(result?),
            Err(payload) => Err(GenerateError::Panicked {
                message: panic_message(payload.as_ref()),
                trace: LAST_PANIC.with(|slot| slot.borrow_mut().take()),
            }
            .into()),
        }
    }

    async fn fail(&self, task_id: TaskId, e: Error) {
        let chain = error_chain(&e);
        let change = StatusChange::new(TaskStatus::InProgress, TaskStatus::Failed, self.clock.now())
            .with_error(chain.clone());
        let marked = self.store.transition(task_id, change).await;
        if let Err(Error::NotFound(_)) = marked {
            debug!(%task_id, error = %chain, "task deleted during execution");
            return;
        }

        let trace = match &e {
            Error::Generate(GenerateError::Panicked { trace, .. }) => trace.as_deref(),
            _ => None,
        };
        error!(%task_id, error = %e, chain = %chain, backtrace = trace, "task failed");
        if let Err(mark) = marked {
            warn!(%task_id, error = %mark, "could not mark task failed");
        }
    }
}

thread_local! {
    static LAST_PANIC: RefCell<Option<String>> = const { RefCell::new(None) };
}

static PANIC_HOOK: Once = Once::new();

/// Chains onto the existing hook and keeps the location and backtrace of the
/// last panic on this thread, so `call` can attach them to the failure.
fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let location = info
                .location()
                .map_or_else(|| "unknown location".to_string(), ToString::to_string);
            let trace = format!("at {location}\n{}", Backtrace::capture());
            LAST_PANIC.with(|slot| *slot.borrow_mut() = Some(trace));
            previous(info);
        }));
    });
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn error_chain(e: &dyn std::error::Error) -> String {
    let mut chain = e.to_string();
    let mut source = e.source();
    while let Some(inner) = source {
        chain.push_str(": ");
        chain.push_str(&inner.to_string());
        source = inner.source();
    }
    chain
}
