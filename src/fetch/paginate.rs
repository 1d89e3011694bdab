use serde::Deserialize;
use std::collections::HashSet;
use std::collections::VecDeque;
use tracing::debug;

use super::client::RateLimitedClient;
use crate::error::SyncError;

pub const DEFAULT_BASE_URL: &str = "https://pokeapi.co/api/v2";
pub const DEFAULT_PAGE_SIZE: u32 = 200;
/// Largest `limit` the list endpoint honours
pub const MAX_PAGE_SIZE: u32 = 500;

/// `{name, url}` reference as returned by list endpoints
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EntrySummary {
    pub name: String,
    pub url: String,
}

impl EntrySummary {
    /// Numeric id from the trailing path segment, when the URL carries one
    pub fn source_id(&self) -> Option<u32> {
        resource_id(&self.url)
    }

    /// Identifier to report for this entry: the numeric id if known, else the name
    pub fn identifier(&self) -> String {
        self.source_id()
            .map(|id| id.to_string())
            .unwrap_or_else(|| self.name.clone())
    }
}

/// Parse the last non-empty path segment of `url` as an id.
pub fn resource_id(url: &str) -> Option<u32> {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .and_then(|segment| segment.parse().ok())
}

#[derive(Debug, Deserialize)]
struct ListPayload {
    count: Option<u32>,
    next: Option<String>,
    #[serde(default)]
    results: Vec<EntrySummary>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageOfSummaries {
    /// Catalog size reported by the source, if any
    pub total: Option<u32>,
    pub summaries: Vec<EntrySummary>,
}

/// Walks the catalog list endpoint or expands an explicit identifier list.
pub struct Paginator<'a> {
    client: &'a RateLimitedClient,
    base_url: String,
}

impl<'a> Paginator<'a> {
    pub fn new(client: &'a RateLimitedClient, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Lazily follow `next` links starting at `offset`.
    pub fn pages(&self, page_size: u32, offset: u32) -> Result<Pages<'a>, SyncError> {
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(SyncError::InvalidPageSize {
                requested: page_size,
                max: MAX_PAGE_SIZE,
            });
        }

        Ok(Pages {
            client: self.client,
            next_url: Some(format!(
                "{}/pokemon?offset={}&limit={}",
                self.base_url, offset, page_size
            )),
        })
    }

    /// One single-entry page per distinct identifier; performs no requests.
    pub fn by_identifiers<I, S>(&self, identifiers: I) -> ByIdentifiers
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut pending = VecDeque::new();

        for raw in identifiers {
            let identifier = raw.as_ref().trim().to_lowercase();
            if identifier.is_empty() || !seen.insert(identifier.clone()) {
                continue;
            }
            pending.push_back(EntrySummary {
                url: format!("{}/pokemon/{}", self.base_url, identifier),
                name: identifier,
            });
        }

        ByIdentifiers { pending }
    }
}

/// Iterator over list pages. Yields an error at most once, then ends.
pub struct Pages<'a> {
    client: &'a RateLimitedClient,
    next_url: Option<String>,
}

impl Iterator for Pages<'_> {
    type Item = Result<PageOfSummaries, SyncError>;

    fn next(&mut self) -> Option<Self::Item> {
        let url = self.next_url.take()?;
        debug!(%url, "fetching list page");

        let body = match self.client.fetch(&url) {
            Ok(body) => body,
            Err(e) => return Some(Err(e.into())),
        };
        let payload: ListPayload = match serde_json::from_str(&body) {
            Ok(payload) => payload,
            Err(source) => return Some(Err(SyncError::Decode { url, source })),
        };

        self.next_url = payload.next.filter(|next| !next.is_empty());
        Some(Ok(PageOfSummaries {
            total: payload.count,
            summaries: payload.results,
        }))
    }
}

pub struct ByIdentifiers {
    pending: VecDeque<EntrySummary>,
}

impl ByIdentifiers {
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl Iterator for ByIdentifiers {
    type Item = Result<PageOfSummaries, SyncError>;

    fn next(&mut self) -> Option<Self::Item> {
        let summary = self.pending.pop_front()?;
        Some(Ok(PageOfSummaries {
            total: None,
            summaries: vec![summary],
        }))
    }
}
