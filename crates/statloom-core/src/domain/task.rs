//! Task - 分析タスクの定義とレコード
//!
//! - `TaskSpec`: 投入時のリクエスト（検証はここで行う）
//! - `TaskRecord`: ストアに保存される正本。状態遷移はすべて `apply()` を通す

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::game::{GameId, Metric};
use super::ids::TaskId;
use super::state::TaskStatus;
use crate::error::{Error, Result};

/// Which game(s) a task covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameSelector {
    Single {
        game: GameId,
    },
    All,
    /// Explicit list of game sources, each with its own character filter.
    Custom {
        sources: Vec<GameId>,
        #[serde(default)]
        characters: BTreeMap<GameId, Vec<String>>,
    },
}

impl GameSelector {
    pub fn single(game: impl Into<GameId>) -> Self {
        GameSelector::Single { game: game.into() }
    }

    pub fn label(&self) -> &str {
        match self {
            GameSelector::Single { game } => game.as_str(),
            GameSelector::All => "all",
            GameSelector::Custom { .. } => "custom",
        }
    }
}

/// Submission request for a new task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub name: String,
    pub game: GameSelector,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub metrics: Vec<Metric>,
    /// Global character filter; only meaningful for `Single` and `All`.
    #[serde(default)]
    pub characters: Option<Vec<String>>,
}

impl TaskSpec {
    pub fn new(
        name: impl Into<String>,
        game: GameSelector,
        start_date: NaiveDate,
        end_date: NaiveDate,
        metrics: Vec<Metric>,
    ) -> Self {
        Self {
            name: name.into(),
            game,
            start_date,
            end_date,
            metrics,
            characters: None,
        }
    }

    pub fn characters<I, S>(mut self, characters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.characters = Some(characters.into_iter().map(Into::into).collect());
        self
    }

    /// Admission checks. Nothing is stored unless this passes.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return invalid("name must not be empty");
        }
        if self.start_date > self.end_date {
            return invalid(format!(
                "end_date {} is before start_date {}",
                self.end_date, self.start_date
            ));
        }
        if self.metrics.is_empty() {
            return invalid("at least one metric is required");
        }
        let mut seen = HashSet::new();
        if let Some(dup) = self.metrics.iter().find(|m| !seen.insert(**m)) {
            return invalid(format!("metric '{dup}' is listed twice"));
        }

        match &self.game {
            GameSelector::Single { game } => {
                if !game.is_supported() {
                    return invalid(format!("unsupported game '{game}'"));
                }
            }
            GameSelector::All => {}
            GameSelector::Custom {
                sources,
                characters,
            } => {
                if sources.is_empty() {
                    return invalid("custom selection needs at least one game source");
                }
                if self.characters.is_some() {
                    return invalid(
                        "custom selection takes per-source characters, not a global list",
                    );
                }
                let mut seen = HashSet::new();
                for source in sources {
                    if !source.is_supported() {
                        return invalid(format!("unsupported game source '{source}'"));
                    }
                    if !seen.insert(source) {
                        return invalid(format!("game source '{source}' is listed twice"));
                    }
                }
                if let Some(stray) = characters.keys().find(|k| !seen.contains(k)) {
                    return invalid(format!(
                        "characters given for '{stray}', which is not a game source"
                    ));
                }
            }
        }
        Ok(())
    }
}

fn invalid<T>(msg: impl Into<String>) -> Result<T> {
    Err(Error::Validation(msg.into()))
}

/// A requested status change, applied only if the task is still in `from`.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub from: TaskStatus,
    pub to: TaskStatus,
    pub at: DateTime<Utc>,
    pub error: Option<String>,
}

impl StatusChange {
    pub fn new(from: TaskStatus, to: TaskStatus, at: DateTime<Utc>) -> Self {
        Self {
            from,
            to,
            at,
            error: None,
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// Stored task: parameters + lifecycle status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: TaskId,
    pub name: String,
    pub game: GameSelector,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub metrics: Vec<Metric>,
    pub characters: Option<Vec<String>>,
    pub status: TaskStatus,

    /// Failure message, set when the task ends in `failed`.
    pub error: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl TaskRecord {
    pub fn new(id: TaskId, spec: TaskSpec, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: spec.name,
            game: spec.game,
            start_date: spec.start_date,
            end_date: spec.end_date,
            metrics: spec.metrics,
            characters: spec.characters,
            status: TaskStatus::Pending,
            error: None,
            created_at: now,
            updated_at: now,
            started_at: None,
            finished_at: None,
        }
    }

    /// Compare-and-swap on status.
    ///
    /// Fails with `Conflict` (leaving the record untouched) if the current
    /// status is not `change.from` or the edge is not in the state machine.
    pub fn apply(&mut self, change: &StatusChange) -> Result<()> {
        if self.status != change.from || !self.status.can_transition_to(change.to) {
            return Err(Error::Conflict {
                id: self.id,
                current: self.status,
                requested: change.to,
            });
        }

        self.status = change.to;
        self.updated_at = change.at;
        if change.to == TaskStatus::InProgress {
            self.started_at = Some(change.at);
        }
        if change.to.is_terminal() {
            self.finished_at = Some(change.at);
        }
        if change.error.is_some() {
            self.error = change.error.clone();
        }
        Ok(())
    }
}
