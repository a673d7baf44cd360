mod cli;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::Parser;
use serde::Serialize;
use statloom_core::app::Latency;
use statloom_core::domain::{StatisticRecord, TaskRecord, TaskStatus};
use statloom_core::impls::SyntheticGenerator;
use statloom_core::impls::synthetic::rosters;
use statloom_core::{App, AppBuilder, AppConfig};
use tracing_subscriber::EnvFilter;

use crate::cli::{Args, Commands, RunArgs};

#[derive(Serialize)]
struct RunOutput<'a> {
    task: &'a TaskRecord,
    results: &'a [StatisticRecord],
}

#[derive(Serialize)]
struct Roster {
    game: &'static str,
    characters: &'static [&'static str],
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let cfg = AppConfig::load(args.config.as_deref()).context("load config")?;
    init_tracing(&cfg.logging.level)?;

    match args.command {
        Commands::Games => print_games(),
        Commands::Run(run) => run_task(&cfg, &run).await,
    }
}

fn init_tracing(level: &str) -> anyhow::Result<()> {
    let filter = match std::env::var("RUST_LOG") {
        Ok(v) if !v.trim().is_empty() => EnvFilter::from_default_env(),
        _ => EnvFilter::try_new(level).with_context(|| format!("invalid log level '{level}'"))?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn print_games() -> anyhow::Result<()> {
    let games: Vec<Roster> = rosters()
        .map(|(game, characters)| Roster { game, characters })
        .collect();
    println!("{}", serde_json::to_string_pretty(&games)?);
    Ok(())
}

async fn run_task(cfg: &AppConfig, run: &RunArgs) -> anyhow::Result<()> {
    let spec = run.spec()?;

    let generator = match run.seed {
        Some(seed) => SyntheticGenerator::with_seed(seed),
        None => SyntheticGenerator::new(),
    };
    let mut builder = AppBuilder::from_config(cfg).generator(Arc::new(generator));
    if run.no_latency {
        builder = builder.latency(Latency::none());
    }
    let app = builder.build().context("build app")?;

    let outcome = tokio::select! {
        res = submit_and_wait(&app, run, spec) => res,
        _ = tokio::signal::ctrl_c() => Err(anyhow::anyhow!("interrupted")),
    };

    let report = app.shutdown().await;
    tracing::debug!(discarded = report.discarded, aborted = report.aborted_workers, "shutdown");
    outcome
}

async fn submit_and_wait(
    app: &App,
    run: &RunArgs,
    spec: statloom_core::domain::TaskSpec,
) -> anyhow::Result<()> {
    let service = app.service();
    let created = service.create_task(spec).await.context("submit task")?;
    tracing::info!(task_id = %created.id, "waiting for task");

    let deadline = tokio::time::Instant::now() + Duration::from_secs(run.timeout_secs);
    let task = loop {
        let task = service.get_task(created.id).await?;
        if task.status.is_terminal() {
            break task;
        }
        if tokio::time::Instant::now() >= deadline {
            bail!("task {} still {} after {}s", task.id, task.status, run.timeout_secs);
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    };

    let results = if task.status == TaskStatus::Complete {
        service.get_results(task.id, &run.filter()).await?
    } else {
        Vec::new()
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&RunOutput {
            task: &task,
            results: &results,
        })?
    );

    if task.status == TaskStatus::Failed {
        bail!(
            "task {} failed: {}",
            task.id,
            task.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}
