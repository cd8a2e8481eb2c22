use std::{
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    time::Instant,
};

use anyhow::{Context, Error};
use futures::FutureExt;

use crate::{
    bounded::{self, FailurePolicy},
    cfg::BenchConfig,
    conn::Connector,
    error::Error as ConnError,
    histogram::LatencyHistogram,
    limit::{self, ResourceLimiter},
    pool::ConnectionPool,
    report::{Report, RunResult},
};

/// Connection establishment benchmark.
#[derive(Debug)]
pub struct Runtime<C, L> {
    cfg: BenchConfig,
    connector: Arc<C>,
    limiter: L,
}

impl<C, L> Runtime<C, L>
where
    C: Connector,
    L: ResourceLimiter,
{
    pub fn new(cfg: BenchConfig, connector: C, limiter: L) -> Self {
        Self { cfg, connector: Arc::new(connector), limiter }
    }

    /// Runs the benchmark.
    ///
    /// Every connection created is closed before this method returns,
    /// regardless of whether the run succeeded. A panic in either phase is
    /// resumed only after both pools are closed.
    pub async fn run(&self) -> Result<Report, Error> {
        let needed = self.cfg.fd_needed();
        let adjustment = limit::ensure(&self.limiter, needed).context("failed to adjust descriptor limit")?;

        let mut preload = ConnectionPool::new(self.cfg.preload);
        let mut pool = ConnectionPool::new(self.cfg.count);

        let rc = AssertUnwindSafe(self.run_phases(&mut preload, &mut pool))
            .catch_unwind()
            .await;

        let closed = pool.close().await;
        log::info!("closed {closed} connections");
        let closed_preload = preload.close().await;
        if self.cfg.preload > 0 {
            log::info!("closed {closed_preload} precreated connections");
        }

        let result = match rc {
            Ok(rc) => rc?,
            Err(payload) => panic::resume_unwind(payload),
        };

        let m = Report {
            adjustment,
            preloaded: self.cfg.preload,
            result,
            closed,
            closed_preload,
        };

        Ok(m)
    }

    async fn run_phases(
        &self,
        preload: &mut ConnectionPool<C::Conn>,
        pool: &mut ConnectionPool<C::Conn>,
    ) -> Result<RunResult, Error> {
        self.preload(preload).await?;
        self.measure(pool).await
    }

    /// Creates the precreated connections, one by one.
    async fn preload(&self, pool: &mut ConnectionPool<C::Conn>) -> Result<(), Error> {
        if pool.size() == 0 {
            return Ok(());
        }

        log::info!("precreating {} connections", pool.size());
        for idx in 0..pool.size() {
            let conn = self
                .connector
                .connect()
                .await
                .with_context(|| format!("failed to precreate connection #{idx}"))?;
            pool.insert(idx, conn);
        }
        debug_assert!(pool.is_full());
        log::info!("precreated {} connections", pool.num_populated());

        Ok(())
    }

    /// Creates the measured connections with bounded concurrency.
    ///
    /// On return `pool` holds every connection created, even if the phase
    /// failed.
    async fn measure(&self, pool: &mut ConnectionPool<C::Conn>) -> Result<RunResult, Error> {
        let count = self.cfg.count;
        let concurrency = self.cfg.concurrency;
        let hist = Arc::new(LatencyHistogram::default());

        log::info!("starting test: {count} connections with concurrency {concurrency}");

        let batch = bounded::run_bounded(count, concurrency, self.cfg.policy, |idx| {
            let connector = self.connector.clone();
            let hist = hist.clone();

            async move {
                let now = Instant::now();
                let conn = connector.connect().await?;
                hist.record(now.elapsed());
                log::trace!("connection #{idx} established in {:?}", now.elapsed());

                Ok::<_, ConnError>(conn)
            }
        })
        .await;

        let created = batch.num_populated();
        let failed = batch.errors.len();
        let elapsed = batch.elapsed;
        let mut errors = batch.errors.into_iter();
        *pool = ConnectionPool::from(batch.slots);

        if let Some(payload) = batch.panic {
            panic::resume_unwind(payload);
        }

        match self.cfg.policy {
            FailurePolicy::Abort => {
                if let Some((idx, err)) = errors.next() {
                    return Err(Error::new(err).context(format!(
                        "failed to create connection #{idx}, {created} of {count} created"
                    )));
                }
            }
            FailurePolicy::Isolate => {
                for (idx, err) in errors {
                    log::warn!("connection #{idx} failed: {err}");
                }
                if count > 0 && created == 0 {
                    return Err(ConnError::Failed { failed, total: count }.into());
                }
            }
        }

        log::debug!("{created} connections created in {elapsed:?}");

        Ok(RunResult::new(count, created, failed, concurrency, elapsed, &hist))
    }
}
