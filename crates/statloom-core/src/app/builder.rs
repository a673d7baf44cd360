//! AppBuilder - アプリケーションの構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）
//! - 差し替え可能な ports（未指定ならインメモリ実装を使う）

use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::impls::{InMemoryTaskStore, SyntheticGenerator};
use crate::ports::{Clock, IdGenerator, StatGenerator, SystemClock, TaskStore, UlidGenerator};
use crate::worker::{PoolConfig, ShutdownReport, WorkerPool};

use super::pipeline::{Latency, Pipeline};
use super::service::TaskService;

/// AppBuilder はアプリケーションを構築
///
/// # 使用例
/// ```ignore
/// let app = AppBuilder::from_config(&config)
///     .generator(Arc::new(SyntheticGenerator::with_seed(7)))
///     .build()?;
/// let task = app.service().create_task(spec).await?;
/// ```
///
/// # Fail-fast 設計
/// - build() 時にワーカー数とレイテンシ範囲を検査
/// - 不正なら BuildError を返す（ワーカーは起動しない）
pub struct AppBuilder {
    store: Option<Arc<dyn TaskStore>>,
    generator: Option<Arc<dyn StatGenerator>>,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdGenerator>>,
    pool: PoolConfig,
    latency: Latency,
    shutdown_timeout: Duration,
}

/// BuildError はアプリケーション構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("worker count must be at least 1")]
    NoWorkers,

    #[error("latency range is inverted: min {min:?} > max {max:?}")]
    InvertedLatency { min: Duration, max: Duration },
}

impl AppBuilder {
    /// 新しい AppBuilder を作成
    pub fn new() -> Self {
        Self {
            store: None,
            generator: None,
            clock: None,
            ids: None,
            pool: PoolConfig::default(),
            latency: Latency::default(),
            shutdown_timeout: Duration::from_secs(2),
        }
    }

    /// 設定ファイルの値で初期化
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new()
            .workers(config.workers.count)
            .poll_interval(Duration::from_millis(config.workers.poll_interval_ms))
            .shutdown_timeout(Duration::from_millis(config.workers.shutdown_timeout_ms))
            .latency(Latency::new(
                Duration::from_millis(config.latency.min_ms),
                Duration::from_millis(config.latency.max_ms),
            ))
    }

    pub fn store(mut self, store: Arc<dyn TaskStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn generator(mut self, generator: Arc<dyn StatGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.pool.workers = workers;
        self
    }

    pub fn poll_interval(mut self, poll_interval: Duration) -> Self {
        self.pool.poll_interval = poll_interval;
        self
    }

    pub fn latency(mut self, latency: Latency) -> Self {
        self.latency = latency;
        self
    }

    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// AppBuilder を構築して App を生成（ワーカーもここで起動する）
    ///
    /// tokio ランタイムの中で呼ぶこと。
    pub fn build(self) -> Result<App, BuildError> {
        if self.pool.workers == 0 {
            return Err(BuildError::NoWorkers);
        }
        if self.latency.min > self.latency.max {
            return Err(BuildError::InvertedLatency {
                min: self.latency.min,
                max: self.latency.max,
            });
        }

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let ids = self
            .ids
            .unwrap_or_else(|| Arc::new(UlidGenerator::new(Arc::clone(&clock))));
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(InMemoryTaskStore::new()));
        let generator = self
            .generator
            .unwrap_or_else(|| Arc::new(SyntheticGenerator::new()));

        let pipeline = Arc::new(
            Pipeline::new(
                Arc::clone(&store),
                generator,
                Arc::clone(&ids),
                Arc::clone(&clock),
            )
            .with_latency(self.latency),
        );
        let pool = Arc::new(WorkerPool::spawn(self.pool));
        let service = TaskService::new(store, Arc::clone(&pool), pipeline, ids, clock);

        Ok(App {
            service,
            pool,
            shutdown_timeout: self.shutdown_timeout,
        })
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// App はアプリケーションのランタイム
pub struct App {
    service: TaskService,
    pool: Arc<WorkerPool>,
    shutdown_timeout: Duration,
}

impl App {
    pub fn service(&self) -> &TaskService {
        &self.service
    }

    /// Stop the workers within the configured timeout.
    pub async fn shutdown(&self) -> ShutdownReport {
        self.pool.shutdown(self.shutdown_timeout).await
    }
}
