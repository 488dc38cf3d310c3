//! Time sources for wait deadlines.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use lazy_static::lazy_static;
use parking_lot::Mutex;

const NSEC_PER_SEC: i64 = 1_000_000_000;

/// A point in time as whole seconds plus nanoseconds, `nsec` always in
/// `0..1_000_000_000`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timespec {
    pub sec: i64,
    pub nsec: i64,
}

impl Timespec {
    pub fn new(sec: i64, nsec: i64) -> Timespec {
        Timespec {
            sec: sec + nsec.div_euclid(NSEC_PER_SEC),
            nsec: nsec.rem_euclid(NSEC_PER_SEC),
        }
    }

    pub fn from_duration(d: Duration) -> Timespec {
        Timespec::default().add_duration(d)
    }

    /// Returns `self + d`, carrying nanosecond overflow into `sec`.
    pub fn add_duration(self, d: Duration) -> Timespec {
        let secs = d.as_secs().min(i64::max_value() as u64) as i64;
        let mut sec = self.sec.saturating_add(secs);
        let mut nsec = self.nsec + i64::from(d.subsec_nanos());
        if nsec >= NSEC_PER_SEC {
            sec = sec.saturating_add(1);
            nsec -= NSEC_PER_SEC;
        }
        Timespec { sec, nsec }
    }

    pub fn add_millis(self, ms: u32) -> Timespec {
        self.add_duration(Duration::from_millis(u64::from(ms)))
    }

    /// Time from `earlier` to `self`, zero if `earlier` is later.
    pub fn saturating_duration_since(self, earlier: Timespec) -> Duration {
        if self <= earlier {
            return Duration::from_secs(0);
        }
        let mut sec = self.sec - earlier.sec;
        let mut nsec = self.nsec - earlier.nsec;
        if nsec < 0 {
            sec -= 1;
            nsec += NSEC_PER_SEC;
        }
        Duration::new(sec as u64, nsec as u32)
    }
}

/// Source of the current time for deadline checks.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> Timespec;
}

lazy_static! {
    static ref EPOCH: Instant = Instant::now();
}

/// Monotonic clock counting from the first time any `SystemClock` is read.
#[derive(Copy, Clone, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timespec {
        Timespec::from_duration(EPOCH.elapsed())
    }
}

/// A clock that only moves when told to. Clones share the same time.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use futures_epoll::driver::{Clock, ManualClock, Timespec};
///
/// let clock = ManualClock::new();
/// clock.advance(Duration::from_millis(1500));
///
/// assert_eq!(clock.now(), Timespec::new(1, 500_000_000));
/// ```
#[derive(Clone, Default)]
pub struct ManualClock {
    now: Arc<Mutex<Timespec>>,
}

impl ManualClock {
    pub fn new() -> ManualClock {
        ManualClock::default()
    }

    pub fn advance(&self, d: Duration) {
        let mut now = self.now.lock();
        *now = now.add_duration(d);
    }

    pub fn set(&self, to: Timespec) {
        *self.now.lock() = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timespec {
        *self.now.lock()
    }
}

impl fmt::Debug for ManualClock {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_tuple("ManualClock").field(&self.now()).finish()
    }
}
