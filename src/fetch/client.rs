use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::header::RETRY_AFTER;
use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::error::{FetchError, TransientCause};

pub const USER_AGENT: &str = concat!("pokeindex-sync/", env!("CARGO_PKG_VERSION"));

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Raw outcome of a single GET that reached the server.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    /// Parsed `Retry-After` header, seconds form only
    pub retry_after: Option<Duration>,
    pub body: String,
}

impl TransportResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            retry_after: None,
            body: body.into(),
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            retry_after: None,
            body: String::new(),
        }
    }
}

/// The request never produced a response (DNS, connect, timeout, body read).
#[derive(Debug, Clone)]
pub struct TransportError(pub String);

/// One GET against the upstream source. No retries, no pacing.
pub trait Transport {
    fn get(&self, url: &str) -> std::result::Result<TransportResponse, TransportError>;
}

/// Time source used for pacing and backoff.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

impl<T: Transport + ?Sized> Transport for Rc<T> {
    fn get(&self, url: &str) -> std::result::Result<TransportResponse, TransportError> {
        (**self).get(url)
    }
}

impl<C: Clock + ?Sized> Clock for Rc<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    fn get(&self, url: &str) -> std::result::Result<TransportResponse, TransportError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| TransportError(e.to_string()))?;

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after);
        let body = response.text().map_err(|e| TransportError(e.to_string()))?;

        Ok(TransportResponse {
            status,
            retry_after,
            body,
        })
    }
}

fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

/// Pacing and retry settings for [`RateLimitedClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per URL, first try included
    pub max_attempts: u32,
    pub backoff_base: Duration,
    pub backoff_cap: Duration,
    /// Minimum gap between the starts of two consecutive requests
    pub min_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            backoff_base: Duration::from_millis(300),
            backoff_cap: Duration::from_secs(30),
            min_delay: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    /// Wait before the retry that follows failed attempt `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.backoff_base
            .saturating_mul(1u32 << exponent)
            .min(self.backoff_cap)
    }
}

/// Sequential GET client enforcing a fixed delay between request starts and
/// exponential backoff on transient failures.
pub struct RateLimitedClient {
    transport: Box<dyn Transport>,
    clock: Box<dyn Clock>,
    policy: RetryPolicy,
    last_start: Cell<Option<Instant>>,
    requests: Cell<u64>,
}

impl RateLimitedClient {
    pub fn new(transport: Box<dyn Transport>, clock: Box<dyn Clock>, policy: RetryPolicy) -> Self {
        Self {
            transport,
            clock,
            policy,
            last_start: Cell::new(None),
            requests: Cell::new(0),
        }
    }

    /// Client backed by reqwest and the wall clock
    pub fn http(policy: RetryPolicy) -> Result<Self> {
        Ok(Self::new(
            Box::new(ReqwestTransport::new()?),
            Box::new(SystemClock),
            policy,
        ))
    }

    /// Number of requests issued so far, retries included
    pub fn requests_issued(&self) -> u64 {
        self.requests.get()
    }

    /// GET `url` and return the body of the first successful response.
    pub fn fetch(&self, url: &str) -> std::result::Result<String, FetchError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            self.pace();
            debug!(url, attempt, "GET");

            let (cause, retry_after) = match self.transport.get(url) {
                Ok(response) if (200..300).contains(&response.status) => {
                    return Ok(response.body);
                }
                Ok(response) => match classify_status(response.status) {
                    Some(cause) => (cause, response.retry_after),
                    None => {
                        return Err(FetchError::Permanent {
                            url: url.to_string(),
                            status: response.status,
                        });
                    }
                },
                Err(TransportError(message)) => (TransientCause::Network(message), None),
            };

            let failure = FetchError::Transient {
                url: url.to_string(),
                cause,
            };

            if attempt >= max_attempts {
                return Err(FetchError::Exhausted {
                    url: url.to_string(),
                    attempts: attempt,
                    last: Box::new(failure),
                });
            }

            let mut wait = self.policy.backoff(attempt);
            // the server may ask for longer, but never past the cap
            if let Some(server_wait) = retry_after {
                wait = wait.max(server_wait.min(self.policy.backoff_cap));
            }
            warn!(url, attempt, wait_ms = wait.as_millis() as u64, error = %failure, "retrying");
            if !wait.is_zero() {
                self.clock.sleep(wait);
            }
        }
    }

    /// Block until `min_delay` has passed since the previous request started.
    fn pace(&self) {
        if let Some(last) = self.last_start.get() {
            let ready = last + self.policy.min_delay;
            let now = self.clock.now();
            if ready > now {
                self.clock.sleep(ready - now);
            }
        }
        self.last_start.set(Some(self.clock.now()));
        self.requests.set(self.requests.get() + 1);
    }
}

/// `None` means the status is not worth retrying.
fn classify_status(status: u16) -> Option<TransientCause> {
    match status {
        429 => Some(TransientCause::RateLimited),
        500..=599 => Some(TransientCause::ServerError(status)),
        _ => None,
    }
}
