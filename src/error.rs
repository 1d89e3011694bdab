//! Error taxonomy for fetching, resolving and writing catalog entries.

use thiserror::Error;

/// Why a single attempt failed in a way worth retrying.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransientCause {
    #[error("network error: {0}")]
    Network(String),
    #[error("server error (status {0})")]
    ServerError(u16),
    #[error("rate limited (status 429)")]
    RateLimited,
}

/// Errors surfaced by the rate-limited HTTP client.
#[derive(Debug, Error)]
pub enum FetchError {
    /// A retryable failure for one attempt.
    #[error("transient failure fetching {url}: {cause}")]
    Transient { url: String, cause: TransientCause },
    /// The source rejected the request; retrying will not help.
    #[error("request to {url} was rejected with status {status}")]
    Permanent { url: String, status: u16 },
    /// Every allowed attempt failed transiently.
    #[error("gave up on {url} after {attempts} attempts: {last}")]
    Exhausted {
        url: String,
        attempts: u32,
        #[source]
        last: Box<FetchError>,
    },
}

impl FetchError {
    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Transient {
                cause: TransientCause::ServerError(status),
                ..
            } => Some(*status),
            FetchError::Transient {
                cause: TransientCause::RateLimited,
                ..
            } => Some(429),
            FetchError::Transient { .. } => None,
            FetchError::Permanent { status, .. } => Some(*status),
            FetchError::Exhausted { last, .. } => last.status(),
        }
    }
}

/// Errors raised while discovering or resolving one catalog entry.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("failed to decode payload from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("entry {entity} has no species reference")]
    MissingSpecies { entity: String },
    #[error("evolution chain {chain} is malformed: {reason}")]
    MalformedChain { chain: String, reason: String },
    #[error("page size {requested} is outside 1..={max}")]
    InvalidPageSize { requested: u32, max: u32 },
}

/// Errors raised by the snapshot writer.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("failed to open snapshot: {0}")]
    Open(#[source] rusqlite::Error),
    #[error("failed to create snapshot directory: {0}")]
    CreateDir(#[source] std::io::Error),
    #[error("failed to prepare snapshot schema for {table}: {source}")]
    Schema {
        table: &'static str,
        #[source]
        source: rusqlite::Error,
    },
    /// The per-entity transaction could not commit and was rolled back.
    #[error("failed to write entity {entity_id}: {source}")]
    WriteFailure {
        entity_id: u32,
        #[source]
        source: rusqlite::Error,
    },
    #[error("failed to read snapshot: {0}")]
    Read(#[source] rusqlite::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exhausted_reports_last_status() {
        let err = FetchError::Exhausted {
            url: "https://example.org/a".to_string(),
            attempts: 3,
            last: Box::new(FetchError::Transient {
                url: "https://example.org/a".to_string(),
                cause: TransientCause::ServerError(503),
            }),
        };
        assert_eq!(err.status(), Some(503));
        assert!(err.to_string().contains("after 3 attempts"));
    }
}
