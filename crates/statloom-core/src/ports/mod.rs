//! Ports - 抽象化レイヤー
//!
//! Hexagonal Architecture の「ポート」。実装は `impls` に置く。
//!
//! # 設計原則
//! - TaskStore が source of truth（正本）
//! - 生成器は差し替え可能（テストでは記録用・失敗用のフェイクを使う）

pub mod clock;
pub mod generator;
pub mod id_generator;
pub mod task_store;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::generator::{GameTarget, GenerateError, GenerateRequest, StatGenerator};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::task_store::TaskStore;
