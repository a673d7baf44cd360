//! Stat - 生成結果（RawStat）と保存行（StatisticRecord）
//!
//! 派生値（kd_ratio / win_rate）は生成時に一度だけ計算して保存する。読み出し時に再計算しない。

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::game::GameId;
use super::ids::{StatId, TaskId};

/// Kill/death ratio rounded to 2 decimals; `kills` itself when there are no deaths.
pub fn kd_ratio(kills: u32, deaths: u32) -> f64 {
    if deaths == 0 {
        return f64::from(kills);
    }
    round2(f64::from(kills) / f64::from(deaths))
}

/// Win rate in percent (0–100) rounded to 2 decimals; 0 when no matches were played.
pub fn win_rate(wins: u32, losses: u32) -> f64 {
    let matches = u64::from(wins) + u64::from(losses);
    if matches == 0 {
        return 0.0;
    }
    round2(100.0 * f64::from(wins) / matches as f64)
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// One generator output row.
///
/// Counters may be missing; missing counters count as 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawStat {
    pub game: GameId,
    pub character: Option<String>,
    pub date: NaiveDate,
    #[serde(default)]
    pub kills: Option<u32>,
    #[serde(default)]
    pub deaths: Option<u32>,
    #[serde(default)]
    pub wins: Option<u32>,
    #[serde(default)]
    pub losses: Option<u32>,
    #[serde(default)]
    pub kd_ratio: Option<f64>,
    #[serde(default)]
    pub win_rate: Option<f64>,
}

impl RawStat {
    /// Full row with ratios derived from the counters.
    pub fn new(
        game: GameId,
        character: Option<String>,
        date: NaiveDate,
        kills: u32,
        deaths: u32,
        wins: u32,
        losses: u32,
    ) -> Self {
        Self {
            game,
            character,
            date,
            kills: Some(kills),
            deaths: Some(deaths),
            wins: Some(wins),
            losses: Some(losses),
            kd_ratio: Some(kd_ratio(kills, deaths)),
            win_rate: Some(win_rate(wins, losses)),
        }
    }
}

/// A persisted statistic row, owned by exactly one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticRecord {
    pub id: StatId,
    pub task_id: TaskId,
    pub game: GameId,
    pub character: Option<String>,
    pub date: NaiveDate,
    pub kills: u32,
    pub deaths: u32,
    pub wins: u32,
    pub losses: u32,
    pub kd_ratio: f64,
    pub win_rate: f64,
}

impl StatisticRecord {
    /// Copy counters verbatim (missing -> 0) and keep the generator's ratios.
    /// Ratios the generator left out are derived from the defaulted counters.
    pub fn from_raw(id: StatId, task_id: TaskId, raw: RawStat) -> Self {
        let kills = raw.kills.unwrap_or(0);
        let deaths = raw.deaths.unwrap_or(0);
        let wins = raw.wins.unwrap_or(0);
        let losses = raw.losses.unwrap_or(0);
        Self {
            id,
            task_id,
            game: raw.game,
            character: raw.character,
            date: raw.date,
            kills,
            deaths,
            wins,
            losses,
            kd_ratio: raw.kd_ratio.unwrap_or_else(|| kd_ratio(kills, deaths)),
            win_rate: raw.win_rate.unwrap_or_else(|| win_rate(wins, losses)),
        }
    }
}

/// Filter for the results read path. All bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Exact character match; `"all"` disables the filter.
    pub character: Option<String>,
}

impl ResultFilter {
    pub fn character(mut self, character: impl Into<String>) -> Self {
        self.character = Some(character.into());
        self
    }

    pub fn between(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.start_date = start;
        self.end_date = end;
        self
    }

    pub fn matches(&self, record: &StatisticRecord) -> bool {
        if self.start_date.is_some_and(|start| record.date < start) {
            return false;
        }
        if self.end_date.is_some_and(|end| record.date > end) {
            return false;
        }
        match self.character.as_deref() {
            None | Some("all") => true,
            Some(wanted) => record.character.as_deref() == Some(wanted),
        }
    }
}
