mod config;

use clap::Parser;
use infragraph_rs::{
    table, GraphDriver, InventoryRecord, MemoryGraph, Neo4jDriver, RunSummary, Writer,
};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{Args, Config, LogFormat};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // ── Tracing ───────────────────────────────────────────────────────────────
    init_tracing(args.log_format)?;
    info!("infragraph-loader starting");

    // ── Config ────────────────────────────────────────────────────────────────
    let mut config = Config::from_args(args).map_err(|e| {
        error!("Configuration error: {}", e);
        e
    })?;

    config.validate_input().await.map_err(|e| {
        error!("Input validation failed: {}", e);
        e
    })?;

    info!(
        input = %config.input.display(),
        dry_run = config.dry_run(),
        batch_size = config.writer.batch_size,
        "configuration loaded"
    );

    // ── Table ─────────────────────────────────────────────────────────────────
    let input = config.input.clone();
    let table = tokio::task::spawn_blocking(move || table::load(&input))
        .await?
        .map_err(|e| {
            error!("Failed to load inventory: {}", e);
            e
        })?;

    // ── Write ─────────────────────────────────────────────────────────────────
    let summary = tokio::select! {
        result = run(&config, &table.records) => result?,
        _ = shutdown_signal() => {
            anyhow::bail!("run aborted before completion; rerun to converge");
        }
    };

    report(&summary);
    if config.summary_json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    info!("loader finished");
    Ok(())
}

fn init_tracing(format: LogFormat) -> anyhow::Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive("infragraph_loader=info".parse()?)
        .add_directive("infragraph_rs=info".parse()?);
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
    Ok(())
}

/// Pick the driver for this run and write every statement.
async fn run(config: &Config, records: &[InventoryRecord]) -> anyhow::Result<RunSummary> {
    match &config.store {
        None => {
            let graph = MemoryGraph::new();
            let summary = write(&graph, config, records).await?;
            info!(
                nodes = graph.total_nodes(),
                edges = graph.total_edges(),
                "dry run graph built"
            );
            Ok(summary)
        }
        Some(store) => {
            let driver = Neo4jDriver::connect(store).await?;
            driver.ping().await?;
            write(&driver, config, records).await
        }
    }
}

async fn write<D: GraphDriver>(
    driver: &D,
    config: &Config,
    records: &[InventoryRecord],
) -> anyhow::Result<RunSummary> {
    let writer = Writer::new(driver, config.writer.clone());
    if config.skip_constraints {
        info!("skipping constraint creation");
    } else {
        writer.ensure_constraints().await?;
    }

    let summary = writer.write_all(records).await;
    driver.close().await?;
    Ok(summary)
}

/// Log one line per statement, then the totals.
fn report(summary: &RunSummary) {
    for s in &summary.statements {
        info!(
            statement = %s.statement,
            written = s.written,
            skipped = s.skipped(),
            skipped_invalid = s.skipped_invalid,
            skipped_failed = s.skipped_failed,
            excluded = s.excluded,
            "statement summary"
        );
        if let Some(reason) = &s.last_failure {
            warn!(statement = %s.statement, reason = %reason, "last batch failure");
        }
    }
    if summary.has_failures() {
        warn!(
            failed_batches = summary.failed_batches(),
            "some batches failed; rerun to fill the gaps"
        );
    }
    info!(
        run_id = %summary.run_id,
        written = summary.total_written(),
        skipped = summary.total_skipped(),
        "run summary"
    );
}

/// Resolves on SIGTERM or Ctrl-C.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => { warn!("received Ctrl-C, aborting run"); }
        _ = terminate => { warn!("received SIGTERM, aborting run"); }
    }
}
