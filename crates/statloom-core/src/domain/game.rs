use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Games a task may target directly.
pub const SUPPORTED_GAMES: [&str; 5] = ["valorant", "overwatch", "lol", "apex", "fortnite"];

/// Game identifier, e.g. `valorant`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(String);

impl GameId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_supported(&self) -> bool {
        SUPPORTED_GAMES.contains(&self.0.as_str())
    }

    pub fn supported() -> impl Iterator<Item = GameId> {
        SUPPORTED_GAMES.iter().map(|g| GameId::new(*g))
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for GameId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Metrics a task can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Kills,
    Deaths,
    Wins,
    KdRatio,
    WinRate,
}

impl Metric {
    pub fn as_str(self) -> &'static str {
        match self {
            Metric::Kills => "kills",
            Metric::Deaths => "deaths",
            Metric::Wins => "wins",
            Metric::KdRatio => "kd_ratio",
            Metric::WinRate => "win_rate",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "kills" => Ok(Metric::Kills),
            "deaths" => Ok(Metric::Deaths),
            "wins" => Ok(Metric::Wins),
            "kd_ratio" => Ok(Metric::KdRatio),
            "win_rate" => Ok(Metric::WinRate),
            other => Err(format!(
                "unknown metric '{other}' (expected kills, deaths, wins, kd_ratio or win_rate)"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supported_games_are_recognised() {
        assert!(GameId::new("valorant").is_supported());
        assert!(!GameId::new("chess").is_supported());
        assert_eq!(GameId::supported().count(), SUPPORTED_GAMES.len());
    }

    #[test]
    fn metric_parses_its_own_name() {
        for m in [
            Metric::Kills,
            Metric::Deaths,
            Metric::Wins,
            Metric::KdRatio,
            Metric::WinRate,
        ] {
            assert_eq!(m.as_str().parse::<Metric>().unwrap(), m);
        }
        assert!("headshots".parse::<Metric>().is_err());
    }
}
