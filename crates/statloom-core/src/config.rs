//! Config - 設定ファイル（TOML）と環境変数
//!
//! 優先順位（高い順）:
//! 1. 環境変数 `STATLOOM_WORKERS` / `STATLOOM_LATENCY_MS` / `STATLOOM_LOG_LEVEL`
//! 2. 明示されたパス、なければ `./statloom.toml`
//! 3. デフォルト値

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_CONFIG_FILE: &str = "statloom.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub workers: WorkersConfig,

    #[serde(default)]
    pub latency: LatencyConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkersConfig {
    #[serde(default = "default_worker_count")]
    pub count: usize,

    /// How long an idle worker waits on the queue before re-checking shutdown.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,
}

fn default_worker_count() -> usize {
    2
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_shutdown_timeout_ms() -> u64 {
    2000
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            count: default_worker_count(),
            poll_interval_ms: default_poll_interval_ms(),
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
        }
    }
}

/// Simulated per-task processing delay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatencyConfig {
    #[serde(default = "default_latency_min_ms")]
    pub min_ms: u64,

    #[serde(default = "default_latency_max_ms")]
    pub max_ms: u64,
}

fn default_latency_min_ms() -> u64 {
    3000
}

fn default_latency_max_ms() -> u64 {
    5000
}

impl Default for LatencyConfig {
    fn default() -> Self {
        Self {
            min_ms: default_latency_min_ms(),
            max_ms: default_latency_max_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// EnvFilter string, e.g. "info" or "statloom_core=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,
}

fn default_logging_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_logging_level(),
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| Error::Config(e.to_string()))
    }

    /// Read `path`, or `./statloom.toml` when no path is given and it exists,
    /// then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut cfg = match path {
            Some(path) => Self::read(path)?,
            None => {
                let local = Path::new(DEFAULT_CONFIG_FILE);
                if local.exists() {
                    Self::read(local)?
                } else {
                    Self::default()
                }
            }
        };
        cfg.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(cfg)
    }

    fn read(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&s).map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    /// Apply `STATLOOM_*` overrides looked up through `var`. Blank values are ignored.
    pub fn apply_overrides<F>(&mut self, var: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = lookup("STATLOOM_WORKERS") {
            self.workers.count = v
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("STATLOOM_WORKERS: not a number: {v}")))?;
        }
        if let Some(v) = lookup("STATLOOM_LATENCY_MS") {
            let (min, max) = parse_latency(&v)?;
            self.latency.min_ms = min;
            self.latency.max_ms = max;
        }
        if let Some(v) = lookup("STATLOOM_LOG_LEVEL") {
            self.logging.level = v.trim().to_string();
        }
        Ok(())
    }
}

/// `"min-max"` or a single number for a fixed delay.
fn parse_latency(v: &str) -> Result<(u64, u64)> {
    let bad = || Error::Config(format!("STATLOOM_LATENCY_MS: expected 'min-max' or a number, got {v}"));
    let parse = |s: &str| s.trim().parse::<u64>().map_err(|_| bad());
    match v.split_once('-') {
        Some((min, max)) => Ok((parse(min)?, parse(max)?)),
        None => {
            let fixed = parse(v)?;
            Ok((fixed, fixed))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.workers.count, 2);
        assert_eq!(cfg.workers.poll_interval_ms, 1000);
        assert_eq!((cfg.latency.min_ms, cfg.latency.max_ms), (3000, 5000));
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg = AppConfig::from_toml_str(
            r#"
            [workers]
            count = 4

            [latency]
            max_ms = 100
            min_ms = 10
            "#,
        )
        .unwrap();

        assert_eq!(cfg.workers.count, 4);
        assert_eq!(cfg.workers.shutdown_timeout_ms, 2000);
        assert_eq!((cfg.latency.min_ms, cfg.latency.max_ms), (10, 100));
        assert_eq!(cfg.logging, LoggingConfig::default());
    }

    #[test]
    fn bad_toml_is_config_error() {
        let err = AppConfig::from_toml_str("[workers]\ncount = \"many\"").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn env_overrides_win() {
        let mut cfg = AppConfig::default();
        cfg.apply_overrides(env(&[
            ("STATLOOM_WORKERS", "8"),
            ("STATLOOM_LATENCY_MS", "0"),
            ("STATLOOM_LOG_LEVEL", "debug"),
        ]))
        .unwrap();

        assert_eq!(cfg.workers.count, 8);
        assert_eq!((cfg.latency.min_ms, cfg.latency.max_ms), (0, 0));
        assert_eq!(cfg.logging.level, "debug");
    }

    #[test]
    fn blank_env_is_ignored() {
        let mut cfg = AppConfig::default();
        cfg.apply_overrides(env(&[("STATLOOM_WORKERS", "  ")])).unwrap();
        assert_eq!(cfg, AppConfig::default());
    }

    #[rstest]
    #[case::range("100-250", Some((100, 250)))]
    #[case::fixed("40", Some((40, 40)))]
    #[case::spaces(" 1 - 2 ", Some((1, 2)))]
    #[case::garbage("fast", None)]
    #[case::half("10-", None)]
    fn latency_override(#[case] raw: &str, #[case] expected: Option<(u64, u64)>) {
        assert_eq!(parse_latency(raw).ok(), expected);
    }

    #[test]
    fn load_reads_explicit_path() {
        let path = std::env::temp_dir().join(format!("statloom-{}.toml", ulid::Ulid::new()));
        std::fs::write(&path, "[logging]\nlevel = \"warn\"\n").unwrap();

        let cfg = AppConfig::read(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(cfg.logging.level, "warn");
        assert!(matches!(AppConfig::read(&path), Err(Error::Config(_))));
    }
}
