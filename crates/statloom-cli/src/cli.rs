use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, bail};
use chrono::NaiveDate;
use clap::{Args as ClapArgs, Parser, Subcommand};
use statloom_core::domain::{GameId, GameSelector, Metric, ResultFilter, TaskSpec};

#[derive(Parser, Debug)]
#[command(name = "statloom", about = "Generate synthetic game statistics as background tasks")]
pub struct Args {
    /// Config file (default: ./statloom.toml if present).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Submit one task, wait for it and print the task with its results as JSON.
    Run(RunArgs),
    /// Print the supported games and their rosters.
    Games,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RunArgs {
    #[arg(long, default_value = "cli task")]
    pub name: String,

    /// Single game, e.g. `valorant`.
    #[arg(long, conflicts_with_all = ["all", "source"])]
    pub game: Option<String>,

    /// Every supported game.
    #[arg(long, conflicts_with = "source")]
    pub all: bool,

    /// Custom selection; repeat for several games.
    #[arg(long = "source")]
    pub source: Vec<String>,

    #[arg(long)]
    pub start: NaiveDate,

    #[arg(long)]
    pub end: NaiveDate,

    #[arg(long = "metric", value_delimiter = ',', default_value = "kills,deaths,kd_ratio")]
    pub metrics: Vec<Metric>,

    /// Character filter for `--game` / `--all`; repeatable.
    #[arg(long = "character", conflicts_with = "source")]
    pub characters: Vec<String>,

    /// Per-source character filter for `--source`, as `SRC=NAME`; repeatable.
    #[arg(long = "source-character", requires = "source")]
    pub source_characters: Vec<String>,

    /// Only return rows from this date on.
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// Only return rows up to this date.
    #[arg(long)]
    pub to: Option<NaiveDate>,

    /// Only return rows for this character (`all` for no filter).
    #[arg(long)]
    pub only: Option<String>,

    /// Seed for reproducible output.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Skip the simulated processing delay.
    #[arg(long)]
    pub no_latency: bool,

    /// Give up waiting after this many seconds.
    #[arg(long, default_value_t = 60)]
    pub timeout_secs: u64,
}

impl RunArgs {
    pub fn spec(&self) -> anyhow::Result<TaskSpec> {
        let game = if !self.source.is_empty() {
            GameSelector::Custom {
                sources: self.source.iter().map(GameId::new).collect(),
                characters: parse_source_characters(&self.source_characters)?,
            }
        } else if self.all {
            GameSelector::All
        } else if let Some(game) = &self.game {
            GameSelector::single(game.as_str())
        } else {
            bail!("one of --game, --all or --source is required");
        };

        let mut spec = TaskSpec::new(
            self.name.clone(),
            game,
            self.start,
            self.end,
            self.metrics.clone(),
        );
        if !self.characters.is_empty() {
            spec = spec.characters(self.characters.iter().cloned());
        }
        Ok(spec)
    }

    pub fn filter(&self) -> ResultFilter {
        let mut filter = ResultFilter::default().between(self.from, self.to);
        if let Some(only) = &self.only {
            filter = filter.character(only.clone());
        }
        filter
    }
}

fn parse_source_characters(raw: &[String]) -> anyhow::Result<BTreeMap<GameId, Vec<String>>> {
    let mut out: BTreeMap<GameId, Vec<String>> = BTreeMap::new();
    for item in raw {
        let (source, name) = item
            .split_once('=')
            .with_context(|| format!("--source-character expects SRC=NAME, got '{item}'"))?;
        out.entry(GameId::new(source.trim()))
            .or_default()
            .push(name.trim().to_string());
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> RunArgs {
        let args = Args::try_parse_from(argv).unwrap();
        match args.command {
            Commands::Run(run) => run,
            Commands::Games => panic!("expected run"),
        }
    }

    #[test]
    fn single_game_with_characters() {
        let run = parse(&[
            "statloom", "run", "--game", "valorant", "--start", "2024-01-01", "--end",
            "2024-01-31", "--character", "Jett", "--metric", "kills,win_rate",
        ]);
        let spec = run.spec().unwrap();

        assert_eq!(spec.game, GameSelector::single("valorant"));
        assert_eq!(spec.characters, Some(vec!["Jett".to_string()]));
        assert_eq!(spec.metrics, vec![Metric::Kills, Metric::WinRate]);
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn custom_sources_with_per_source_filter() {
        let run = parse(&[
            "statloom", "run", "--source", "valorant", "--source", "lol", "--source-character",
            "valorant=Jett", "--start", "2024-01-01", "--end", "2024-01-02",
        ]);
        let spec = run.spec().unwrap();

        let GameSelector::Custom { sources, characters } = spec.game else {
            panic!("expected custom selection");
        };
        assert_eq!(sources, vec![GameId::new("valorant"), GameId::new("lol")]);
        assert_eq!(characters.get(&GameId::new("valorant")), Some(&vec!["Jett".to_string()]));
        assert!(!characters.contains_key(&GameId::new("lol")));
    }

    #[test]
    fn selection_is_required() {
        let run = parse(&["statloom", "run", "--start", "2024-01-01", "--end", "2024-01-02"]);
        assert!(run.spec().is_err());
    }

    #[test]
    fn all_and_source_conflict() {
        let err = Args::try_parse_from([
            "statloom", "run", "--all", "--source", "lol", "--start", "2024-01-01", "--end",
            "2024-01-02",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn malformed_source_character() {
        assert!(parse_source_characters(&["valorant".to_string()]).is_err());
    }

    #[test]
    fn result_filter_from_flags() {
        let run = parse(&[
            "statloom", "run", "--all", "--start", "2024-01-01", "--end", "2024-01-09",
            "--from", "2024-01-02", "--only", "Sage",
        ]);
        let filter = run.filter();

        assert_eq!(filter.start_date, NaiveDate::from_ymd_opt(2024, 1, 2));
        assert_eq!(filter.end_date, None);
        assert_eq!(filter.character.as_deref(), Some("Sage"));
    }
}
