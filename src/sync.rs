//! One sync run: page through the catalog, resolve each entry, commit it.
//!
//! Entries are isolated from each other. A failure to resolve or store one
//! entry is logged and tallied and the run moves on; only a failure to fetch a
//! listing page ends the run early.

use anyhow::{Context, Result};
use std::fmt;
use std::time::Instant;
use tracing::{info, warn};

use crate::fetch::{EntrySummary, Paginator, RateLimitedClient, DEFAULT_BASE_URL, DEFAULT_PAGE_SIZE};
use crate::error::{FetchError, SyncError};
use crate::filter::SyncTarget;
use crate::resolve::{ChainCache, EntityResolver};
use crate::ui::{Phase, Ui, FAILURE_MARK};
use crate::writer::SnapshotWriter;

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub base_url: String,
    pub page_size: u32,
    pub target: SyncTarget,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            target: SyncTarget::default(),
        }
    }
}

/// An entry that could not be synced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncFailure {
    /// Numeric id when known, else the name
    pub identifier: String,
    pub reason: String,
    /// HTTP status behind the failure, when it came from the API
    pub status: Option<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub failures: Vec<SyncFailure>,
    /// The operator stopped the run before the selection was exhausted
    pub cancelled: bool,
}

impl SyncReport {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Comma-separated identifiers to pass back to `--names`
    pub fn retry_names(&self) -> Option<String> {
        if self.failures.is_empty() {
            return None;
        }
        let names: Vec<&str> = self
            .failures
            .iter()
            .map(|f| f.identifier.as_str())
            .collect();
        Some(names.join(","))
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} attempted, {} synced, {} failed",
            self.attempted,
            self.succeeded,
            self.failed()
        )?;
        if self.cancelled {
            write!(f, " (stopped early)")?;
        }
        Ok(())
    }
}

/// Sync the selected entries into `writer`.
///
/// Returns an error only when the listing itself cannot be walked; entries
/// already committed stay committed in that case.
pub fn run_sync<U: Ui>(
    client: &RateLimitedClient,
    writer: &mut SnapshotWriter,
    options: &SyncOptions,
    ui: &mut U,
) -> Result<SyncReport> {
    let start = Instant::now();
    let paginator = Paginator::new(client, options.base_url.as_str());

    ui.set_phase(Phase::Discovering);
    ui.set_info(format!("Source: {}", options.base_url));
    let pages = options
        .target
        .pages(&paginator, options.page_size)
        .context("Invalid sync options")?;
    let limit = options.target.limit().map(|l| l as usize);

    let mut chains = ChainCache::new();
    let mut resolver = EntityResolver::new(client, &mut chains);
    let mut report = SyncReport::default();
    let mut expected: Option<u64> = None;

    'pages: for (index, page) in pages.enumerate() {
        let page = page.context("Failed to fetch catalog page")?;
        if index == 0 {
            expected = options.target.expected(page.total);
            ui.set_phase(Phase::Syncing);
        }

        for summary in &page.summaries {
            if limit.is_some_and(|limit| report.attempted >= limit) {
                break 'pages;
            }
            if ui.should_stop() {
                warn!(attempted = report.attempted, "sync stopped by operator");
                report.cancelled = true;
                break 'pages;
            }

            report.attempted += 1;
            match sync_entry(&mut resolver, writer, summary) {
                Ok(id) => {
                    report.succeeded += 1;
                    ui.log(format!("#{} {}", id, summary.name));
                }
                Err(err) => {
                    let identifier = summary.identifier();
                    warn!(entry = %identifier, error = %format!("{:#}", err), "entry failed");
                    ui.log(format!("{} {}: {:#}", FAILURE_MARK, identifier, err));
                    report.failures.push(SyncFailure {
                        identifier,
                        reason: format!("{:#}", err),
                        status: http_status(&err),
                    });
                }
            }

            ui.set_progress(report.attempted as u64, expected.unwrap_or(0), "Syncing");
            ui.set_tally(report.succeeded, report.failed());
        }

        // stop before requesting a page nothing will be taken from
        if limit.is_some_and(|limit| report.attempted >= limit) {
            break;
        }
    }

    ui.clear_progress();
    info!(
        attempted = report.attempted,
        succeeded = report.succeeded,
        failed = report.failed(),
        chains = chains.len(),
        chain_fetches = chains.fetches(),
        requests = client.requests_issued(),
        elapsed_s = start.elapsed().as_secs_f64(),
        "sync finished"
    );
    Ok(report)
}

fn sync_entry(
    resolver: &mut EntityResolver<'_>,
    writer: &mut SnapshotWriter,
    summary: &EntrySummary,
) -> Result<u32> {
    let entity = resolver
        .resolve(summary)
        .with_context(|| format!("Failed to resolve {}", summary.name))?;
    writer.upsert(&entity)?;
    Ok(entity.entry.id)
}

fn http_status(err: &anyhow::Error) -> Option<u16> {
    err.chain().find_map(|cause| match cause.downcast_ref::<SyncError>() {
        Some(SyncError::Fetch(fetch)) => fetch.status(),
        _ => cause.downcast_ref::<FetchError>().and_then(FetchError::status),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::stub::{ManualClock, StubTransport};
    use crate::fetch::{RetryPolicy, TransportResponse};
    use crate::ui::SilentUi;
    use serde_json::json;
    use std::rc::Rc;

    const BASE: &str = "https://example.org/api/v2";

    /// Serve a listing of `names` (ids 1..) plus detail and species for each.
    fn catalog(transport: &StubTransport, names: &[&str]) {
        let results: Vec<_> = names
            .iter()
            .enumerate()
            .map(|(i, name)| json!({"name": name, "url": format!("{BASE}/pokemon/{}/", i + 1)}))
            .collect();
        transport.serve(
            &format!("{BASE}/pokemon?offset=0&limit=200"),
            json!({"count": names.len(), "next": null, "results": results}).to_string(),
        );

        for (i, name) in names.iter().enumerate() {
            let id = i + 1;
            transport.serve(
                &format!("{BASE}/pokemon/{id}/"),
                json!({
                    "id": id,
                    "name": name,
                    "species": {"name": name, "url": format!("{BASE}/pokemon-species/{id}/")},
                    "types": [{"slot": 1, "type": {"name": "normal", "url": ""}}]
                })
                .to_string(),
            );
            transport.serve(
                &format!("{BASE}/pokemon-species/{id}/"),
                json!({"name": name, "names": [], "egg_groups": []}).to_string(),
            );
        }
    }

    fn stored_ids(writer: &SnapshotWriter) -> Vec<u32> {
        writer
            .connection()
            .prepare("SELECT id FROM pokemon ORDER BY id")
            .unwrap()
            .query_map([], |r| r.get(0))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap()
    }

    fn client(transport: &Rc<StubTransport>) -> RateLimitedClient {
        RateLimitedClient::new(
            Box::new(transport.clone()),
            Box::new(ManualClock::new()),
            RetryPolicy {
                max_attempts: 2,
                ..RetryPolicy::default()
            },
        )
    }

    fn options() -> SyncOptions {
        SyncOptions {
            base_url: BASE.to_string(),
            ..SyncOptions::default()
        }
    }

    struct StopAfter {
        polls: usize,
        remaining: usize,
    }

    impl Ui for StopAfter {
        fn set_phase(&mut self, _phase: Phase) {}
        fn set_info(&mut self, _info: impl Into<String>) {}
        fn set_progress(&mut self, _current: u64, _total: u64, _label: impl Into<String>) {}
        fn clear_progress(&mut self) {}
        fn log(&mut self, _message: impl Into<String>) {}
        fn should_stop(&mut self) -> bool {
            self.polls += 1;
            if self.remaining == 0 {
                return true;
            }
            self.remaining -= 1;
            false
        }
    }

    #[test]
    fn test_failed_entry_does_not_stop_run() {
        let transport = Rc::new(StubTransport::new());
        catalog(&transport, &["a", "b", "c", "d", "e"]);
        transport.withdraw(&format!("{BASE}/pokemon/3/"));
        for _ in 0..2 {
            transport.push(&format!("{BASE}/pokemon/3/"), Ok(TransportResponse::status(500)));
        }
        let client = client(&transport);
        let mut writer = SnapshotWriter::open_in_memory().unwrap();

        let report = run_sync(&client, &mut writer, &options(), &mut SilentUi::new()).unwrap();

        assert_eq!(report.attempted, 5);
        assert_eq!(report.succeeded, 4);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].identifier, "3");
        assert_eq!(report.failures[0].status, Some(500));
        assert_eq!(report.retry_names().as_deref(), Some("3"));
        assert_eq!(stored_ids(&writer), vec![1, 2, 4, 5]);
    }

    #[test]
    fn test_rejected_write_does_not_stop_run() {
        let transport = Rc::new(StubTransport::new());
        catalog(&transport, &["a", "b", "c", "d", "e"]);
        // #3 resolves fine but reuses the slug of #1
        transport.serve(
            &format!("{BASE}/pokemon/3/"),
            json!({
                "id": 3,
                "name": "a",
                "species": {"name": "c", "url": format!("{BASE}/pokemon-species/3/")}
            })
            .to_string(),
        );
        let client = client(&transport);
        let mut writer = SnapshotWriter::open_in_memory().unwrap();

        let report = run_sync(&client, &mut writer, &options(), &mut SilentUi::new()).unwrap();

        assert_eq!(report.attempted, 5);
        assert_eq!(report.succeeded, 4);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].identifier, "3");
        assert_eq!(report.failures[0].status, None);
        assert_eq!(stored_ids(&writer), vec![1, 2, 4, 5]);
        let orphans: i64 = writer
            .connection()
            .query_row(
                "SELECT COUNT(*) FROM pokemon_types WHERE pokemon_id = 3",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[test]
    fn test_limit_caps_attempts() {
        let transport = Rc::new(StubTransport::new());
        catalog(&transport, &["a", "b", "c"]);
        let client = client(&transport);
        let mut writer = SnapshotWriter::open_in_memory().unwrap();
        let options = SyncOptions {
            target: SyncTarget::Catalog {
                offset: 0,
                limit: Some(2),
            },
            ..options()
        };

        let report = run_sync(&client, &mut writer, &options, &mut SilentUi::new()).unwrap();

        assert_eq!(report.attempted, 2);
        assert_eq!(transport.calls(&format!("{BASE}/pokemon/3/")), 0);
    }

    #[test]
    fn test_named_target_skips_listing() {
        let transport = Rc::new(StubTransport::new());
        catalog(&transport, &["a", "b"]);
        // named lookups hit /pokemon/{name} without a trailing slash
        transport.serve(
            &format!("{BASE}/pokemon/b"),
            json!({
                "id": 2,
                "name": "b",
                "species": {"name": "b", "url": format!("{BASE}/pokemon-species/2/")}
            })
            .to_string(),
        );
        let client = client(&transport);
        let mut writer = SnapshotWriter::open_in_memory().unwrap();
        let options = SyncOptions {
            target: SyncTarget::Named(vec!["b".into()]),
            ..options()
        };

        let report = run_sync(&client, &mut writer, &options, &mut SilentUi::new()).unwrap();

        assert_eq!(report.succeeded, 1);
        assert_eq!(transport.calls(&format!("{BASE}/pokemon?offset=0&limit=200")), 0);
    }

    #[test]
    fn test_operator_stop_is_reported() {
        let transport = Rc::new(StubTransport::new());
        catalog(&transport, &["a", "b", "c"]);
        let client = client(&transport);
        let mut writer = SnapshotWriter::open_in_memory().unwrap();
        let mut ui = StopAfter {
            polls: 0,
            remaining: 1,
        };

        let report = run_sync(&client, &mut writer, &options(), &mut ui).unwrap();

        assert!(report.cancelled);
        assert_eq!(report.attempted, 1);
        assert_eq!(ui.polls, 2);
        assert!(report.to_string().ends_with("(stopped early)"));
    }

    #[test]
    fn test_page_failure_aborts() {
        let transport = Rc::new(StubTransport::new());
        let client = client(&transport);
        let mut writer = SnapshotWriter::open_in_memory().unwrap();

        let result = run_sync(&client, &mut writer, &options(), &mut SilentUi::new());

        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_page_size_fails_before_requests() {
        let transport = Rc::new(StubTransport::new());
        let client = client(&transport);
        let mut writer = SnapshotWriter::open_in_memory().unwrap();
        let options = SyncOptions {
            page_size: 0,
            ..options()
        };

        assert!(run_sync(&client, &mut writer, &options, &mut SilentUi::new()).is_err());
        assert!(transport.requested().is_empty());
    }
}
