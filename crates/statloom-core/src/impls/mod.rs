//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **InMemoryTaskStore**: プロセス内の TaskStore
//! - **SyntheticGenerator**: 乱数ベースの StatGenerator

pub mod inmem_store;
pub mod synthetic;

pub use self::inmem_store::InMemoryTaskStore;
pub use self::synthetic::{GameProfile, SyntheticGenerator};
