//! Twinsync runner - syncs two replica snapshot files.
//!
//! Loads the left and right replicas and the shared state from JSON
//! snapshots, runs sync rounds between them, prints each round's report and
//! writes all three snapshots back.

mod config;
mod error;
mod files;

use crate::config::Config;
use crate::error::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use twinsync_engine::{AttributeSchema, MemoryReplica, StateStore, SyncEngine, SyncReport};

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "twinsync=info,twinsync_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing::info!(
        left = %config.left.display(),
        right = %config.right.display(),
        state = %config.state.display(),
        "Starting sync"
    );

    for report in sync(&config)? {
        println!("{}", render(&report)?);
    }

    Ok(())
}

/// A round report as pretty JSON.
fn render(report: &SyncReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Run up to `config.rounds` rounds and persist the result.
///
/// Stops early after a quiet round. Snapshots are written even when some
/// records failed to sync; their changes are found again next time.
fn sync(config: &Config) -> Result<Vec<SyncReport>> {
    let schema = AttributeSchema::new(config.attributes.iter().cloned());

    let left = MemoryReplica::from_snapshot("left", &files::load(&config.left)?, &schema)?;
    let right = MemoryReplica::from_snapshot("right", &files::load(&config.right)?, &schema)?;
    let state = match files::load_optional(&config.state)? {
        Some(snapshot) => StateStore::from_snapshot(&snapshot, &schema)?,
        None => {
            tracing::info!("No shared state found, running a first sync");
            StateStore::new()
        }
    };

    let mut engine = SyncEngine::with_state(left, right, state);
    engine.debug_dump("before sync");

    let mut reports = Vec::new();
    for _ in 0..config.rounds {
        let report = engine.run()?;
        let quiet = report.is_quiet();
        if report.failure_count() > 0 {
            tracing::warn!(
                round = report.round,
                failures = report.failure_count(),
                "Some records were not synced"
            );
        }
        reports.push(report);
        if quiet {
            break;
        }
    }

    engine.debug_dump("after sync");

    files::save(&config.left, &engine.left().replica().export_snapshot(&schema))?;
    files::save(&config.right, &engine.right().replica().export_snapshot(&schema))?;
    let state = engine.state().read().export_snapshot(&schema);
    files::save(&config.state, &state)?;

    Ok(reports)
}
