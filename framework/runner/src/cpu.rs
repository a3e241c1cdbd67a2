use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

/// User and system CPU time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CpuTimes {
    pub user: Duration,
    pub system: Duration,
}

impl CpuTimes {
    pub fn saturating_sub(self, earlier: CpuTimes) -> CpuTimes {
        CpuTimes {
            user: self.user.saturating_sub(earlier.user),
            system: self.system.saturating_sub(earlier.system),
        }
    }
}

/// Capability to measure the CPU time used by child processes.
///
/// Implementations report the cumulative CPU time of every child process that has terminated and
/// been waited for. The CPU time of one command is the difference between a reading taken before
/// it was spawned and one taken after it was waited for.
pub trait CpuClock: Debug + Send + Sync {
    /// `None` when the platform cannot provide the reading.
    fn children_times(&self) -> Option<CpuTimes>;
}

/// Reads the resource usage of waited-for children with `getrusage(RUSAGE_CHILDREN)`, at
/// microsecond resolution.
#[cfg(unix)]
#[derive(Debug, Clone, Copy, Default)]
pub struct RusageCpuClock;

#[cfg(unix)]
impl CpuClock for RusageCpuClock {
    fn children_times(&self) -> Option<CpuTimes> {
        use nix::sys::resource::{getrusage, UsageWho};

        match getrusage(UsageWho::RUSAGE_CHILDREN) {
            Ok(usage) => Some(CpuTimes {
                user: timeval_duration(usage.user_time()),
                system: timeval_duration(usage.system_time()),
            }),
            Err(e) => {
                log::trace!("getrusage failed: {e}");
                None
            }
        }
    }
}

#[cfg(unix)]
fn timeval_duration(time: nix::sys::time::TimeVal) -> Duration {
    use nix::sys::time::TimeValLike;

    Duration::from_micros(u64::try_from(time.num_microseconds()).unwrap_or(0))
}

/// Used where CPU time cannot be measured. Traces then report zero user and system time rather
/// than failing.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedCpuClock;

impl CpuClock for UnsupportedCpuClock {
    fn children_times(&self) -> Option<CpuTimes> {
        None
    }
}

/// Pick the best available clock for this platform.
pub fn detect_cpu_clock() -> Arc<dyn CpuClock> {
    #[cfg(unix)]
    {
        if RusageCpuClock.children_times().is_some() {
            return Arc::new(RusageCpuClock);
        }
    }

    log::warn!("CPU time measurement is not supported here, user and system times will be reported as zero");
    Arc::new(UnsupportedCpuClock)
}
