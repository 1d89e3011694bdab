use anyhow::{bail, Result};

use crate::error::SyncError;
use crate::fetch::{PageOfSummaries, Paginator};

/// Pages of summaries, from either the catalog listing or a name list
pub type PageStream<'a> = Box<dyn Iterator<Item = Result<PageOfSummaries, SyncError>> + 'a>;

/// Which entries a sync run visits
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncTarget {
    /// Walk the catalog listing from `offset`, stopping after `limit` entries
    Catalog { offset: u32, limit: Option<u32> },
    /// Only these identifiers (names or numeric ids)
    Named(Vec<String>),
}

impl Default for SyncTarget {
    fn default() -> Self {
        SyncTarget::Catalog {
            offset: 0,
            limit: None,
        }
    }
}

impl SyncTarget {
    pub fn limit(&self) -> Option<u32> {
        match self {
            SyncTarget::Catalog { limit, .. } => *limit,
            SyncTarget::Named(_) => None,
        }
    }

    /// Start the page stream for this target.
    pub fn pages<'a>(
        &self,
        paginator: &Paginator<'a>,
        page_size: u32,
    ) -> Result<PageStream<'a>, SyncError> {
        match self {
            SyncTarget::Catalog { offset, .. } => {
                Ok(Box::new(paginator.pages(page_size, *offset)?))
            }
            SyncTarget::Named(names) => Ok(Box::new(paginator.by_identifiers(names))),
        }
    }

    /// Number of entries the run will attempt, given the catalog size the
    /// source reported
    pub fn expected(&self, reported: Option<u32>) -> Option<u64> {
        match self {
            SyncTarget::Catalog { offset, limit } => {
                let remaining = reported.map(|count| count.saturating_sub(*offset));
                match (remaining, limit) {
                    (Some(remaining), Some(limit)) => Some(u64::from(remaining.min(*limit))),
                    (Some(remaining), None) => Some(u64::from(remaining)),
                    (None, Some(limit)) => Some(u64::from(*limit)),
                    (None, None) => None,
                }
            }
            SyncTarget::Named(names) => Some(names.len() as u64),
        }
    }
}

/// Resolves which entries to sync from the command-line selection
pub fn resolve_target(
    names: Option<Vec<String>>,
    offset: u32,
    limit: Option<u32>,
) -> Result<SyncTarget> {
    if limit == Some(0) {
        bail!("--limit must be at least 1");
    }

    match names {
        Some(_) if offset > 0 => {
            bail!("Cannot use both --names and --offset at the same time");
        }
        Some(list) => {
            let mut seen = Vec::new();
            for name in list {
                let name = name.trim().to_lowercase();
                if !name.is_empty() && !seen.contains(&name) {
                    seen.push(name);
                }
            }
            if seen.is_empty() {
                bail!("--names did not contain any identifiers");
            }
            let seen = match limit {
                Some(limit) => seen.into_iter().take(limit as usize).collect(),
                None => seen,
            };
            Ok(SyncTarget::Named(seen))
        }
        None => Ok(SyncTarget::Catalog { offset, limit }),
    }
}
