use core::{
    fmt::{self, Display, Formatter},
    num::NonZero,
    time::Duration,
};

use crate::{histogram::LatencyHistogram, limit::FdAdjustment};

/// Measurement phase outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    /// Number of connections requested.
    pub count: usize,
    /// Number of connections successfully created.
    pub created: usize,
    /// Number of failed attempts; non-zero only with failures isolated.
    pub failed: usize,
    pub concurrency: NonZero<usize>,
    /// Wall-clock time of the whole batch.
    pub elapsed: Duration,
    /// Per-connection latency quantiles: p50, p90 and p99.
    pub quantiles: Option<[Duration; 3]>,
}

impl RunResult {
    pub(crate) fn new(
        count: usize,
        created: usize,
        failed: usize,
        concurrency: NonZero<usize>,
        elapsed: Duration,
        hist: &LatencyHistogram,
    ) -> Self {
        debug_assert_eq!(hist.count(), created as u64);

        let quantiles = match (hist.quantile(0.5), hist.quantile(0.9), hist.quantile(0.99)) {
            (Some(p50), Some(p90), Some(p99)) => Some([p50, p90, p99]),
            _ => None,
        };

        Self {
            count,
            created,
            failed,
            concurrency,
            elapsed,
            quantiles,
        }
    }

    /// Returns the average time spent per connection, i.e. the batch time
    /// divided by the number of connections requested.
    ///
    /// Returns `None` for an empty batch.
    pub fn average(&self) -> Option<Duration> {
        if self.count == 0 {
            return None;
        }

        let nanos = self.elapsed.as_nanos() / self.count as u128;

        Some(Duration::from_nanos(nanos as u64))
    }
}

impl Display for RunResult {
    fn fmt(&self, fmt: &mut Formatter) -> Result<(), fmt::Error> {
        let Some(average) = self.average() else {
            return writeln!(fmt, "no connections created");
        };

        writeln!(
            fmt,
            "{} connections with concurrency {} created in {:.2?}",
            self.created, self.concurrency, self.elapsed
        )?;
        writeln!(fmt, "1 connection took on average {average:.2?} to establish")?;
        if let Some([p50, p90, p99]) = self.quantiles {
            writeln!(fmt, "latency p50 {p50:.2?} p90 {p90:.2?} p99 {p99:.2?}")?;
        }
        if self.failed > 0 {
            writeln!(fmt, "{} of {} connections failed", self.failed, self.count)?;
        }

        Ok(())
    }
}

/// Summary of a complete benchmark run.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub adjustment: FdAdjustment,
    /// Number of connections created before the measurement.
    pub preloaded: usize,
    pub result: RunResult,
    /// Number of measured connections closed during teardown.
    pub closed: usize,
    /// Number of precreated connections closed during teardown.
    pub closed_preload: usize,
}

impl Display for Report {
    fn fmt(&self, fmt: &mut Formatter) -> Result<(), fmt::Error> {
        if let FdAdjustment::Raised { from, to } = self.adjustment {
            writeln!(fmt, "NOFILE limit adjusted from {from} to {to}")?;
        }
        if self.preloaded > 0 {
            writeln!(fmt, "precreated: {} connections", self.preloaded)?;
        }
        write!(fmt, "{}", self.result)?;
        write!(
            fmt,
            "closed: {} connections, {} precreated connections",
            self.closed, self.closed_preload
        )
    }
}
