use anyhow::Context;
use clap::Parser;
use sharpe_search::cli::{init_tracing, RunArgs};
use sharpe_search::price_feed::load_dataset;
use sharpe_search::recorder::ResultRecorder;
use sharpe_search::{run_search, CancellationToken, ExecutionMode};
use tokio::task;
use tracing::{info, warn};

/// Finds the k-ticker long-only allocation with the best annualized Sharpe
/// ratio by scoring random weights on every subset of the universe.
#[derive(Parser, Debug)]
#[command(name = "sharpe-search", version, about, long_about = None)]
struct Cli {
    /// Run on one thread or on a worker pool
    #[arg(short, long, value_enum, env = "SHARPE_SEARCH_MODE")]
    mode: Option<ExecutionMode>,

    #[command(flatten)]
    run: RunArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = cli.run.resolve()?;
    if let Some(mode) = cli.mode {
        config.search.mode = mode;
    }
    config.search.validate()?;

    let dataset = load_dataset(&config.dataset)
        .await
        .with_context(|| format!("loading price data from {}", config.dataset))?;

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing the combinations in flight");
            signal_token.cancel();
        }
    });

    let search = config.search.clone();
    let outcome = task::spawn_blocking(move || run_search(&search, &dataset, &cancel))
        .await
        .context("search task panicked")??;

    println!("{outcome}");

    let recorder = ResultRecorder::open(&config.results_path)?;
    let record = recorder.record_outcome(&outcome)?;
    info!(
        "Run {} recorded to {}",
        record.run_id,
        recorder.path().display()
    );

    if let Some(path) = &config.output_path {
        let json = serde_json::to_string_pretty(&outcome)?;
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        info!("Outcome written to {}", path.display());
    }

    Ok(())
}
