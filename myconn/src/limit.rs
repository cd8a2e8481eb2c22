use core::fmt::{self, Display, Formatter};

use crate::error::Error;

/// Open file descriptors limit of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FdLimit {
    /// Soft limit, the one actually enforced.
    pub soft: u64,
    /// Hard limit, the ceiling for the soft one.
    pub hard: u64,
}

impl Display for FdLimit {
    fn fmt(&self, fmt: &mut Formatter) -> Result<(), fmt::Error> {
        write!(fmt, "{}/{}", self.soft, self.hard)
    }
}

/// Outcome of [`ensure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FdAdjustment {
    /// The current limit is already sufficient.
    Kept(FdLimit),
    /// The limit has been raised.
    Raised { from: FdLimit, to: FdLimit },
}

/// Access to the process-wide open file descriptors limit.
pub trait ResourceLimiter {
    fn get(&self) -> Result<FdLimit, Error>;
    fn set(&self, limit: FdLimit) -> Result<(), Error>;
}

/// Makes sure the process is able to hold at least `needed` descriptors.
///
/// The limit is raised only if the soft one is lower than required, in which
/// case both limits become at least `needed`. A hard limit that is already
/// higher stays as is.
pub fn ensure<L>(limiter: &L, needed: u64) -> Result<FdAdjustment, Error>
where
    L: ResourceLimiter + ?Sized,
{
    let curr = limiter.get()?;
    if needed <= curr.soft {
        log::debug!("NOFILE limit {curr} is enough for {needed} descriptors");
        return Ok(FdAdjustment::Kept(curr));
    }

    let next = FdLimit { soft: needed, hard: curr.hard.max(needed) };

    log::info!("adjusting NOFILE limit from {} to {}", curr.soft, next.soft);
    limiter.set(next)?;

    Ok(FdAdjustment::Raised { from: curr, to: next })
}

/// Limiter backed by `getrlimit(2)` and `setrlimit(2)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsLimiter;

#[cfg(unix)]
impl ResourceLimiter for OsLimiter {
    fn get(&self) -> Result<FdLimit, Error> {
        let mut rlim = libc::rlimit { rlim_cur: 0, rlim_max: 0 };
        let rc = unsafe { libc::getrlimit(libc::RLIMIT_NOFILE, &mut rlim) };
        if rc != 0 {
            return Err(Error::ResourceLimit {
                op: "get",
                source: std::io::Error::last_os_error(),
            });
        }

        let m = FdLimit {
            soft: rlim.rlim_cur as u64,
            hard: rlim.rlim_max as u64,
        };

        Ok(m)
    }

    fn set(&self, limit: FdLimit) -> Result<(), Error> {
        let rlim = libc::rlimit {
            rlim_cur: limit.soft as libc::rlim_t,
            rlim_max: limit.hard as libc::rlim_t,
        };
        let rc = unsafe { libc::setrlimit(libc::RLIMIT_NOFILE, &rlim) };
        if rc != 0 {
            return Err(Error::ResourceLimit {
                op: "set",
                source: std::io::Error::last_os_error(),
            });
        }

        Ok(())
    }
}

#[cfg(not(unix))]
impl ResourceLimiter for OsLimiter {
    fn get(&self) -> Result<FdLimit, Error> {
        Ok(FdLimit { soft: u64::MAX, hard: u64::MAX })
    }

    fn set(&self, _limit: FdLimit) -> Result<(), Error> {
        Ok(())
    }
}
