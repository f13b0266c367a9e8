use anyhow::Context;
use clap::Parser;
use sharpe_search::cli::{init_tracing, RunArgs};
use sharpe_search::price_feed::load_dataset;
use sharpe_search::recorder::ResultRecorder;
use sharpe_search::{run_search, CancellationToken, ExecutionMode, SearchConfig};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::task;
use tracing::{info, warn};

/// Times repeated Sequential and Parallel searches over the same data and
/// seed, appending one row per run to the results log.
#[derive(Parser, Debug)]
#[command(name = "benchmark", version, about, long_about = None)]
struct Cli {
    /// Runs per execution mode
    #[arg(long, default_value_t = 3, env = "SHARPE_SEARCH_REPETITIONS")]
    repetitions: usize,

    /// Modes to time, in the order they run within a repetition
    #[arg(
        long,
        value_enum,
        value_delimiter = ',',
        default_values_t = [ExecutionMode::Sequential, ExecutionMode::Parallel]
    )]
    modes: Vec<ExecutionMode>,

    #[command(flatten)]
    run: RunArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = cli.run.resolve()?;
    // Every run must score the same allocations for the timings to compare.
    let seed = config.search.seed.unwrap_or(42);
    config.search.seed = Some(seed);
    config.search.validate()?;

    let dataset = Arc::new(
        load_dataset(&config.dataset)
            .await
            .with_context(|| format!("loading price data from {}", config.dataset))?,
    );
    let recorder = Arc::new(ResultRecorder::open(&config.results_path)?);

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after the current run");
            signal_token.cancel();
        }
    });

    println!("Starting experiment: ");
    let start = Instant::now();
    let mut timings: BTreeMap<&'static str, Vec<f64>> = BTreeMap::new();
    let mut best_sharpes = Vec::new();

    'repetitions: for repetition in 1..=cli.repetitions {
        for &mode in &cli.modes {
            if cancel.is_cancelled() {
                break 'repetitions;
            }
            info!("Run {} ({}) was launched", repetition, mode);

            let search = SearchConfig {
                mode,
                ..config.search.clone()
            };
            let (dataset, recorder, cancel) =
                (Arc::clone(&dataset), Arc::clone(&recorder), cancel.clone());
            let outcome = task::spawn_blocking(move || {
                let outcome = run_search(&search, &dataset, &cancel)?;
                recorder.record_outcome(&outcome)?;
                anyhow::Ok(outcome)
            })
            .await
            .context("search task panicked")??;

            println!(
                "→ run {} ({}): {} in {:.2}s, best_sharpe = {}",
                repetition,
                mode,
                outcome.status,
                outcome.elapsed_seconds,
                outcome
                    .best_sharpe()
                    .map_or_else(|| "none".to_string(), |s| format!("{s:.4}"))
            );
            if outcome.is_finished() {
                timings
                    .entry(mode.label())
                    .or_default()
                    .push(outcome.elapsed_seconds);
            }
            best_sharpes.extend(outcome.best_sharpe());
        }
    }

    for (label, seconds) in &timings {
        println!(
            "{}: mean {:.3}s over {} runs (std dev {:.3}s)",
            label,
            seconds.iter().mean(),
            seconds.len(),
            seconds.iter().population_std_dev()
        );
    }
    if let (Some(sequential), Some(parallel)) = (
        timings.get(ExecutionMode::Sequential.label()),
        timings.get(ExecutionMode::Parallel.label()),
    ) {
        println!(
            "Speedup: {:.2}x",
            sequential.iter().mean() / parallel.iter().mean()
        );
    }
    if best_sharpes
        .windows(2)
        .any(|pair| pair[0].to_bits() != pair[1].to_bits())
    {
        warn!("Runs disagreed on the best Sharpe ratio under seed {}", seed);
    }

    println!("Total experiment time: {:.2?}", start.elapsed());
    Ok(())
}
