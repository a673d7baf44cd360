//! TaskStatus - タスクの状態機械
//!
//! # 状態遷移
//! - pending -> in_progress -> complete
//! - pending -> in_progress -> failed
//! - pending -> cancelled
//!
//! pending を離れたら戻らない。終端状態（complete / failed / cancelled）からの遷移はない。

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of an analytics task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Admitted, waiting for a worker.
    Pending,
    /// Claimed by a worker, generation running.
    InProgress,
    /// Rows persisted.
    Complete,
    /// Generation or persistence failed.
    Failed,
    /// Cancelled before a worker claimed it.
    Cancelled,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 5] = [
        TaskStatus::Pending,
        TaskStatus::InProgress,
        TaskStatus::Complete,
        TaskStatus::Failed,
        TaskStatus::Cancelled,
    ];

    pub fn can_transition_to(self, to: TaskStatus) -> bool {
        use TaskStatus::*;
        matches!(
            (self, to),
            (Pending, InProgress)
                | (Pending, Cancelled)
                | (InProgress, Complete)
                | (InProgress, Failed)
        )
    }

    /// Is this a terminal state (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Complete | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Complete => "complete",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
