//! In-memory transport and clock for running the pipeline without a network.
//!
//! `StubTransport` answers from scripted per-URL queues first, then from a
//! standing body registered with [`StubTransport::serve`]; anything else is a
//! 404. `ManualClock` never blocks: sleeping advances virtual time and is
//! recorded so callers can assert on pacing and backoff.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use super::client::{Clock, Transport, TransportError, TransportResponse};

type Scripted = Result<TransportResponse, TransportError>;

#[derive(Default)]
pub struct StubTransport {
    queued: RefCell<HashMap<String, VecDeque<Scripted>>>,
    standing: RefCell<HashMap<String, String>>,
    calls: RefCell<HashMap<String, usize>>,
    log: RefCell<Vec<String>>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a one-shot response for `url`
    pub fn push(&self, url: &str, response: Scripted) {
        self.queued
            .borrow_mut()
            .entry(url.to_string())
            .or_default()
            .push_back(response);
    }

    /// Answer every request for `url` with `body` once the queue is drained
    pub fn serve(&self, url: &str, body: impl Into<String>) {
        self.standing
            .borrow_mut()
            .insert(url.to_string(), body.into());
    }

    /// Stop answering `url` with a standing body
    pub fn withdraw(&self, url: &str) {
        self.standing.borrow_mut().remove(url);
    }

    pub fn calls(&self, url: &str) -> usize {
        self.calls.borrow().get(url).copied().unwrap_or(0)
    }

    /// Every requested URL in order
    pub fn requested(&self) -> Vec<String> {
        self.log.borrow().clone()
    }
}

impl Transport for StubTransport {
    fn get(&self, url: &str) -> Result<TransportResponse, TransportError> {
        *self.calls.borrow_mut().entry(url.to_string()).or_default() += 1;
        self.log.borrow_mut().push(url.to_string());

        if let Some(next) = self
            .queued
            .borrow_mut()
            .get_mut(url)
            .and_then(VecDeque::pop_front)
        {
            return next;
        }

        match self.standing.borrow().get(url) {
            Some(body) => Ok(TransportResponse::ok(body.clone())),
            None => Ok(TransportResponse::status(404)),
        }
    }
}

pub struct ManualClock {
    now: Cell<Instant>,
    sleeps: RefCell<Vec<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Cell::new(Instant::now()),
            sleeps: RefCell::new(Vec::new()),
        }
    }

    /// Move virtual time forward without recording a sleep
    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.borrow().clone()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.borrow_mut().push(duration);
        self.advance(duration);
    }
}
