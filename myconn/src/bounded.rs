//! Bounded fan-out of asynchronous tasks.
//!
//! [`run_bounded`] launches a fixed number of tasks while keeping at most
//! `concurrency` of them in flight. Admission is controlled by a counting
//! semaphore: the launcher acquires a permit before spawning each task and the
//! task releases it on completion. The launcher never waits for a particular
//! task, so creation is bounded, but not serialized.

use core::{
    any::Any,
    future::Future,
    num::NonZero,
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};
use std::{sync::Arc, time::Instant};

use tokio::{sync::Semaphore, task::JoinSet};

/// What to do when one of the tasks fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop launching new tasks after the first failure.
    ///
    /// Tasks already launched are still awaited, so their outputs end up in
    /// the batch and can be released by the caller.
    #[default]
    Abort,
    /// Launch all tasks regardless of failures and collect every error.
    Isolate,
}

/// Outcome of [`run_bounded`].
#[derive(Debug)]
pub struct Batch<T, E> {
    /// Task outputs indexed by launch order.
    ///
    /// A slot stays empty if its task failed or was never launched.
    pub slots: Vec<Option<T>>,
    /// Failures together with the index of the task that produced them,
    /// ordered by index.
    pub errors: Vec<(usize, E)>,
    /// Number of tasks actually launched.
    pub launched: usize,
    /// Wall-clock time from the first launch till the last task completion.
    pub elapsed: Duration,
    /// Payload of the first task panic, if any.
    ///
    /// Outputs of the other tasks are kept in `slots`, so the caller can
    /// release them before resuming the unwind.
    pub panic: Option<Box<dyn Any + Send>>,
}

impl<T, E> Batch<T, E> {
    /// Returns the number of populated slots.
    #[inline]
    pub fn num_populated(&self) -> usize {
        self.slots.iter().filter(|v| v.is_some()).count()
    }
}

/// Runs `n` tasks produced by `f`, with at most `concurrency` of them in
/// flight at any time.
///
/// The task for index `idx` is `f(idx)`, called in index order from the
/// launching task. Each task is spawned on the current tokio runtime, so
/// tasks run in parallel on a multi-threaded one.
///
/// A panicking task does not unwind through this function. All other tasks
/// are awaited and the payload is returned in [`Batch::panic`].
pub async fn run_bounded<F, Fut, T, E>(
    n: usize,
    concurrency: NonZero<usize>,
    policy: FailurePolicy,
    mut f: F,
) -> Batch<T, E>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    let gate = Arc::new(Semaphore::new(concurrency.get().min(Semaphore::MAX_PERMITS)));
    let failed = Arc::new(AtomicBool::new(false));
    let mut set = JoinSet::new();
    let mut launched = 0;

    let now = Instant::now();

    for idx in 0..n {
        if policy == FailurePolicy::Abort && failed.load(Ordering::Acquire) {
            break;
        }

        // The semaphore is never closed.
        let permit = match gate.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(..) => break,
        };

        // Re-check, since some task may have failed while we were waiting.
        if policy == FailurePolicy::Abort && failed.load(Ordering::Acquire) {
            break;
        }

        let task = f(idx);
        let failed = failed.clone();
        set.spawn(async move {
            let rc = task.await;
            if rc.is_err() {
                failed.store(true, Ordering::Release);
            }
            drop(permit);

            (idx, rc)
        });
        launched += 1;
    }

    let mut slots: Vec<Option<T>> = (0..n).map(|_| None).collect();
    let mut errors = Vec::new();
    let mut panicked = None;

    while let Some(rc) = set.join_next().await {
        match rc {
            Ok((idx, Ok(v))) => slots[idx] = Some(v),
            Ok((idx, Err(err))) => errors.push((idx, err)),
            Err(err) if err.is_panic() => {
                panicked.get_or_insert(err.into_panic());
            }
            // Tasks are never aborted.
            Err(err) => log::error!("task cancelled: {err}"),
        }
    }

    let elapsed = now.elapsed();

    errors.sort_unstable_by_key(|&(idx, ..)| idx);

    Batch { slots, errors, launched, elapsed, panic: panicked }
}
