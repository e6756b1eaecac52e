use archivist::config::Config;
use archivist::invalidator::{ArchiveInvalidator, CancellationToken, InvalidationReport};
use archivist::store::ArchiveStore;
use chrono::Utc;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, warn};

use crate::cli::{Commands, InvalidateArgs, PruneRangesArgs};

pub async fn run(command: Commands, config: Config) -> archivist::Result<ExitCode> {
    match command {
        Commands::Invalidate(args) => invalidate(args, &config, config.open_store()?).await,
        Commands::Stats => stats(config.open_store()?).await,
        Commands::PruneRanges(args) => prune_ranges(args, config.open_store()?).await,
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn invalidate(
    args: InvalidateArgs,
    config: &Config,
    store: Arc<dyn ArchiveStore>,
) -> archivist::Result<ExitCode> {
    let request = args.to_request(config.invalidation.default_cascade);
    let invalidator = ArchiveInvalidator::new(
        store,
        Arc::new(config.site_registry()),
        Arc::new(config.segment_catalog()),
    )
    .with_log_retention(config.log_retention());

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_shutdown(cancel.clone()));
    let run_token = cancel.clone();

    let report = tokio::task::spawn_blocking(move || {
        invalidator.invalidate_with_cancel(&request, &run_token)
    })
    .await;
    // The run is over; stop watching for Ctrl+C
    cancel.cancel();
    let report = report??;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(if report.is_complete() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_report(report: &InvalidationReport) {
    for line in &report.log {
        println!("{}", line);
    }
    for (kind, sites) in &report.counts {
        for (site, count) in sites {
            println!("  site {} {}: {}", site, kind, count);
        }
    }
}

async fn stats(store: Arc<dyn ArchiveStore>) -> archivist::Result<ExitCode> {
    let stats = tokio::task::spawn_blocking(move || store.stats()).await??;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(ExitCode::SUCCESS)
}

async fn prune_ranges(
    args: PruneRangesArgs,
    store: Arc<dyn ArchiveStore>,
) -> archivist::Result<ExitCode> {
    let age = chrono::Duration::from_std(args.older_than.as_duration())
        .unwrap_or(chrono::Duration::MAX);
    let cutoff = Utc::now()
        .checked_sub_signed(age)
        .unwrap_or(chrono::DateTime::<Utc>::MIN_UTC);

    let stats = tokio::task::spawn_blocking(move || store.prune_ranges(cutoff)).await??;
    info!(
        pruned = stats.ranges_pruned,
        kept = stats.ranges_kept,
        older_than = %args.older_than,
        "Pruned range invalidations"
    );
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(ExitCode::SUCCESS)
}

/// Cancel `token` on Ctrl+C; the run stops at its next unit boundary
async fn cancel_on_shutdown(token: CancellationToken) {
    tokio::select! {
        signal = tokio::signal::ctrl_c() => match signal {
            Ok(()) => {
                info!("Shutdown signal received, cancelling invalidation");
                token.cancel();
            }
            Err(e) => warn!(error = %e, "Failed to install Ctrl+C handler"),
        },
        _ = token.cancelled() => {}
    }
}
