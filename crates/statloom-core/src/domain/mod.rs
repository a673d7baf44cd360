//! Domain model (ids, games, tasks, statuses, statistic rows).

pub mod game;
pub mod ids;
pub mod stat;
pub mod state;
pub mod task;

pub use game::{GameId, Metric, SUPPORTED_GAMES};
pub use ids::{StatId, TaskId};
pub use stat::{RawStat, ResultFilter, StatisticRecord, kd_ratio, win_rate};
pub use state::TaskStatus;
pub use task::{GameSelector, StatusChange, TaskRecord, TaskSpec};
