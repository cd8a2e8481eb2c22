//! Fakes for the connector and the resource limiter.

use core::{
    future::Future,
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};
use std::{
    io,
    sync::{Arc, Mutex},
};

use crate::{
    conn::{Connection, Connector},
    error::Error,
    limit::{FdLimit, ResourceLimiter},
};

#[derive(Debug, Default)]
struct Counters {
    attempts: AtomicUsize,
    opened: AtomicUsize,
    closed: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// Shared bookkeeping of fake connections.
#[derive(Debug, Clone, Default)]
pub struct Tally(Arc<Counters>);

impl Tally {
    pub fn attempts(&self) -> usize {
        self.0.attempts.load(Ordering::SeqCst)
    }

    pub fn opened(&self) -> usize {
        self.0.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.0.closed.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.0.in_flight.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.0.max_in_flight.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct FakeConn {
    id: usize,
    tally: Tally,
    fail_close: bool,
}

impl FakeConn {
    pub fn new(id: usize, tally: &Tally) -> Self {
        Self { id, tally: tally.clone(), fail_close: false }
    }

    pub fn with_close_failure(mut self) -> Self {
        self.fail_close = true;
        self
    }

    pub fn id(&self) -> usize {
        self.id
    }
}

impl Connection for FakeConn {
    fn close(self) -> impl Future<Output = Result<(), Error>> + Send {
        async move {
            self.tally.0.closed.fetch_add(1, Ordering::SeqCst);
            if self.fail_close {
                return Err(Error::connection(io::Error::from(io::ErrorKind::BrokenPipe)));
            }

            Ok(())
        }
    }
}

/// Connector that hands out [`FakeConn`]s, numbered by attempt.
#[derive(Debug, Default)]
pub struct FakeConnector {
    tally: Tally,
    delay: Duration,
    fail_at: Option<usize>,
    panic_at: Option<usize>,
}

impl FakeConnector {
    pub fn new(tally: &Tally) -> Self {
        Self { tally: tally.clone(), ..Default::default() }
    }

    /// Each attempt takes the given time.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// The attempt with the given zero-based number fails.
    pub fn with_failure_at(mut self, attempt: usize) -> Self {
        self.fail_at = Some(attempt);
        self
    }

    /// The attempt with the given zero-based number panics.
    pub fn with_panic_at(mut self, attempt: usize) -> Self {
        self.panic_at = Some(attempt);
        self
    }
}

impl Connector for FakeConnector {
    type Conn = FakeConn;

    fn connect(&self) -> impl Future<Output = Result<Self::Conn, Error>> + Send {
        async move {
            let counters = &self.tally.0;
            let attempt = counters.attempts.fetch_add(1, Ordering::SeqCst);
            let curr = counters.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            counters.max_in_flight.fetch_max(curr, Ordering::SeqCst);

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            } else {
                tokio::task::yield_now().await;
            }

            counters.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.panic_at == Some(attempt) {
                panic!("connector exploded at attempt {attempt}");
            }
            if self.fail_at == Some(attempt) {
                return Err(Error::connection(io::Error::from(io::ErrorKind::ConnectionRefused)));
            }

            counters.opened.fetch_add(1, Ordering::SeqCst);

            Ok(FakeConn::new(attempt, &self.tally))
        }
    }
}

/// In-memory resource limiter.
#[derive(Debug)]
pub struct FakeLimiter {
    limit: Mutex<FdLimit>,
    num_sets: AtomicUsize,
    fail_set: bool,
    /// Connection attempts observed when the limit was set.
    attempts_at_set: Mutex<Option<usize>>,
    tally: Option<Tally>,
}

impl FakeLimiter {
    pub fn new(limit: FdLimit) -> Self {
        Self {
            limit: Mutex::new(limit),
            num_sets: AtomicUsize::new(0),
            fail_set: false,
            attempts_at_set: Mutex::new(None),
            tally: None,
        }
    }

    pub fn with_set_failure(mut self) -> Self {
        self.fail_set = true;
        self
    }

    /// Records connection attempts made before the limit is set.
    pub fn with_tally(mut self, tally: &Tally) -> Self {
        self.tally = Some(tally.clone());
        self
    }

    pub fn current(&self) -> FdLimit {
        *self.limit.lock().unwrap()
    }

    pub fn num_sets(&self) -> usize {
        self.num_sets.load(Ordering::SeqCst)
    }

    pub fn attempts_at_set(&self) -> Option<usize> {
        *self.attempts_at_set.lock().unwrap()
    }
}

impl ResourceLimiter for FakeLimiter {
    fn get(&self) -> Result<FdLimit, Error> {
        Ok(self.current())
    }

    fn set(&self, limit: FdLimit) -> Result<(), Error> {
        if let Some(tally) = &self.tally {
            *self.attempts_at_set.lock().unwrap() = Some(tally.attempts());
        }
        if self.fail_set {
            return Err(Error::ResourceLimit {
                op: "set",
                source: io::Error::from(io::ErrorKind::PermissionDenied),
            });
        }

        self.num_sets.fetch_add(1, Ordering::SeqCst);
        *self.limit.lock().unwrap() = limit;

        Ok(())
    }
}
