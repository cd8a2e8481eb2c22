use core::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

/// Upper bound of the last bucket, in microseconds.
const MAX_US: f64 = 60_000_000.0;
/// Ratio between two adjacent bucket bounds.
const FACTOR: f64 = 1.5;

/// Lock-free histogram of connection establishment latencies with
/// logarithmic buckets.
///
/// Bucket `i` holds values in `[f^i; f^(i+1))` microseconds, the last one
/// absorbs everything above a minute.
#[derive(Debug)]
pub struct LatencyHistogram {
    buckets: Vec<AtomicU64>,
    factor: f64,
}

impl Default for LatencyHistogram {
    fn default() -> Self {
        let len = MAX_US.log(FACTOR).ceil() as usize;
        let buckets = (0..len).map(|_| AtomicU64::new(0)).collect();

        Self { buckets, factor: FACTOR }
    }
}

impl LatencyHistogram {
    #[inline]
    pub fn record(&self, latency: Duration) {
        let us = latency.as_micros() as f64;
        // Negative logarithms of sub-microsecond values saturate to zero.
        let idx = us.log(self.factor) as usize;
        let idx = idx.min(self.buckets.len() - 1);
        self.buckets[idx].fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the number of recorded values.
    pub fn count(&self) -> u64 {
        self.buckets.iter().map(|v| v.load(Ordering::Relaxed)).sum()
    }

    /// Estimates the given quantile.
    ///
    /// Finds the first bucket `i` where the cumulative count reaches
    /// `q * total`, then interpolates linearly between `i` and `i + 1` in
    /// logarithmic coordinates, so the result is `f^x` for a fractional
    /// pseudo-index `x`.
    ///
    /// Returns `None` if nothing has been recorded yet.
    pub fn quantile(&self, q: f64) -> Option<Duration> {
        assert!((0.0..=1.0).contains(&q));

        let snapshot: Vec<u64> = self.buckets.iter().map(|v| v.load(Ordering::Relaxed)).collect();
        let size: u64 = snapshot.iter().sum();
        if size == 0 {
            return None;
        }

        let target = q * size as f64;
        let mut sum = 0;
        for (idx, &b) in snapshot.iter().enumerate() {
            if ((sum + b) as f64) >= target && b > 0 {
                let x = (target - sum as f64) / b as f64 + idx as f64;
                let us = self.factor.powf(x);

                return Some(Duration::from_micros(us as u64));
            }
            sum += b;
        }

        Some(Duration::from_micros(MAX_US as u64))
    }
}
