//! statloom-core
//!
//! Core building blocks for the statloom task runner.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, game, task, state, stat）
//! - **ports**: 抽象化レイヤー（TaskStore, StatGenerator, Clock, IdGenerator）
//! - **impls**: 実装（InMemoryTaskStore, SyntheticGenerator）
//! - **queue** / **worker**: ジョブキューと常駐ワーカープール
//! - **app**: アプリケーションロジック（builder, pipeline, service）
//! - **config**: TOML 設定と環境変数
//! - **observability**: ステータス別の件数
//! - **error**: エラー型

pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod impls;
pub mod observability;
pub mod ports;
pub mod queue;
pub mod worker;

pub use app::{App, AppBuilder, BuildError, TaskService};
pub use config::AppConfig;
pub use error::{Error, Result};
