use anyhow::{Context, Result};
use pokeindex_sync::{
    cli::{Cli, Commands},
    export::export_to_file,
    fetch::{RateLimitedClient, RetryPolicy, MAX_PAGE_SIZE},
    filter::resolve_target,
    logging::{self, LogTarget},
    paths::{resolve_snapshot, snapshot_log_path},
    sync::{run_sync, SyncOptions, SyncReport},
    ui::{TracingUi, UiApp},
    writer::{table_counts, SnapshotWriter},
};
use rusqlite::{Connection, OpenFlags};
use std::time::{Duration, Instant};

fn main() -> Result<()> {
    let cli = Cli::parse_args();

    match cli.command {
        Commands::Sync {
            db,
            names,
            limit,
            offset,
            page_size,
            delay_ms,
            max_attempts,
            backoff_ms,
            base_url,
            tui,
        } => {
            let db_path = resolve_snapshot(db)?;
            if tui {
                let log_path = snapshot_log_path(&db_path)?;
                logging::init(&cli.log_level, LogTarget::File(log_path))?;
            } else {
                logging::init(&cli.log_level, LogTarget::Stderr)?;
            }

            let start = Instant::now();
            let options = SyncOptions {
                base_url,
                page_size: page_size.clamp(1, MAX_PAGE_SIZE),
                target: resolve_target(names, offset, limit)?,
            };
            let policy = RetryPolicy {
                max_attempts,
                backoff_base: Duration::from_millis(backoff_ms),
                min_delay: Duration::from_millis(delay_ms),
                ..RetryPolicy::default()
            };

            let client = RateLimitedClient::http(policy)?;
            let mut writer = SnapshotWriter::open(&db_path)
                .with_context(|| format!("Failed to open snapshot {}", db_path.display()))?;

            let report = if tui {
                let mut ui = UiApp::new()?;
                let report = run_sync(&client, &mut writer, &options, &mut ui)?;
                ui.finish(&report.to_string())?;
                report
            } else {
                run_sync(&client, &mut writer, &options, &mut TracingUi::default())?
            };

            print_report(&report);
            println!(
                "\nSnapshot {:?} updated in {:.1}s",
                db_path,
                start.elapsed().as_secs_f64()
            );
        }

        Commands::Export { db, output } => {
            logging::init(&cli.log_level, LogTarget::Stderr)?;

            let db_path = resolve_snapshot(db)?;
            let summary = export_to_file(&db_path, &output)?;
            println!(
                "Exported {} entries to {:?}",
                summary.total, summary.output
            );
        }

        Commands::Status { db } => {
            logging::init(&cli.log_level, LogTarget::Stderr)?;

            let db_path = resolve_snapshot(db)?;
            if !db_path.exists() {
                println!("No snapshot at {:?} yet; run `pokeindex-sync sync` first", db_path);
                return Ok(());
            }
            let conn = Connection::open_with_flags(&db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)
                .with_context(|| format!("Failed to open snapshot {}", db_path.display()))?;

            println!("Snapshot {:?}:\n", db_path);
            for (table, count) in table_counts(&conn)? {
                println!("  {:<26} {:>8}", table, count);
            }
        }
    }

    Ok(())
}

fn print_report(report: &SyncReport) {
    println!("\n{}", report);
    if let Some(names) = report.retry_names() {
        for failure in &report.failures {
            match failure.status {
                Some(status) => {
                    println!("  {} (HTTP {}): {}", failure.identifier, status, failure.reason)
                }
                None => println!("  {}: {}", failure.identifier, failure.reason),
            }
        }
        println!("\nRetry the failures with:\n  pokeindex-sync sync --names {}", names);
    }
}
