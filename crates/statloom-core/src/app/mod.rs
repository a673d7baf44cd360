//! App - アプリケーション層
//!
//! ports を組み合わせてタスクのライフサイクルを実装します。
//!
//! # 主要コンポーネント
//! - **AppBuilder**: アプリケーションの構築とワイヤリング
//! - **Pipeline**: 1 タスク分の実行（claim → generate → persist → 終端状態）
//! - **TaskService**: 投入・キャンセル・削除・結果取得

pub mod builder;
pub mod pipeline;
pub mod service;

#[cfg(test)]
pub(crate) mod testing;

// 主要な型を再エクスポート
pub use self::builder::{App, AppBuilder, BuildError};
pub use self::pipeline::{Latency, Pipeline};
pub use self::service::TaskService;
