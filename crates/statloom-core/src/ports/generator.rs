//! StatGenerator port - 統計データの生成器
//!
//! 入力と内部の乱数だけで決まる純粋な関数として扱う。共有状態への副作用はない。
//! 返す件数は日付範囲と一致するとは限らない（0 件もありうる）。

use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::{GameId, Metric, RawStat};

/// What one generator call covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameTarget {
    One(GameId),
    All,
}

/// Input of a single generator call.
#[derive(Debug, Clone)]
pub struct GenerateRequest<'a> {
    pub target: GameTarget,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub metrics: &'a [Metric],
    pub characters: Option<&'a [String]>,
}

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("{0}")]
    Failed(String),

    /// `trace` is the panic location and, when enabled, the backtrace.
    #[error("generator panicked: {message}")]
    Panicked {
        message: String,
        trace: Option<String>,
    },
}

pub trait StatGenerator: Send + Sync {
    fn generate(&self, request: &GenerateRequest<'_>) -> Result<Vec<RawStat>, GenerateError>;
}
