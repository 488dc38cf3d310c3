use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use log::{debug, trace};

use super::clock::Timespec;
use super::epoll::Epoll;
use super::registry::Handle;
use crate::event::Events;

/// How long a wait may stay suspended.
///
/// Built from the classic millisecond argument with [`Timeout::from_millis`]:
/// `0` polls, a negative value waits forever, anything else waits at most that
/// long.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Timeout {
    /// Return whatever is ready now.
    Immediate,
    /// Wait until something becomes ready.
    Never,
    /// Wait until something becomes ready or the duration elapses.
    After(Duration),
}

impl Timeout {
    pub fn from_millis(ms: i32) -> Timeout {
        if ms == 0 {
            Timeout::Immediate
        } else if ms < 0 {
            Timeout::Never
        } else {
            Timeout::After(Duration::from_millis(ms as u64))
        }
    }
}

impl From<i32> for Timeout {
    fn from(ms: i32) -> Timeout {
        Timeout::from_millis(ms)
    }
}

impl From<Option<Duration>> for Timeout {
    fn from(timeout: Option<Duration>) -> Timeout {
        match timeout {
            None => Timeout::Never,
            Some(d) if d == Duration::from_secs(0) => Timeout::Immediate,
            Some(d) => Timeout::After(d),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Deadline {
    Now,
    Never,
    At(Timespec),
}

impl Deadline {
    pub(crate) fn new(timeout: Timeout, now: Timespec) -> Deadline {
        match timeout {
            Timeout::Immediate => Deadline::Now,
            Timeout::Never => Deadline::Never,
            Timeout::After(d) => Deadline::At(now.add_duration(d)),
        }
    }

    fn expired(&self, now: Timespec) -> bool {
        match *self {
            Deadline::Now => true,
            Deadline::Never => false,
            Deadline::At(at) => now >= at,
        }
    }
}

/// Rejects a zero `maxevents`, as `epoll_wait(2)` does.
pub(crate) fn check_capacity(capacity: usize) -> io::Result<()> {
    if capacity == 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "maxevents must be greater than zero",
        ));
    }
    Ok(())
}

/// Future returned by [`Epoll::wait`].
///
/// Each poll drains the instance's ready queue if it holds anything.
/// Otherwise the future resolves to an empty [`Events`] once the deadline has
/// passed, or parks its waker on the instance. A parked wait is woken by any
/// notification that links an entry of that instance and by every
/// [`Epoll::tick`], which is how the deadline gets re-checked.
///
/// [`Epoll::wait`]: struct.Epoll.html#method.wait
/// [`Epoll::tick`]: struct.Epoll.html#method.tick
#[must_use = "futures do nothing unless you `.await` or poll them"]
#[derive(Debug)]
pub struct Wait {
    epoll: Epoll,
    handle: Handle,
    capacity: usize,
    deadline: Deadline,
}

impl Wait {
    pub(crate) fn new(epoll: Epoll, handle: Handle, capacity: usize, timeout: Timeout) -> Wait {
        let deadline = Deadline::new(timeout, epoll.now());
        Wait {
            epoll,
            handle,
            capacity,
            deadline,
        }
    }
}

impl Future for Wait {
    type Output = io::Result<Events>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        if let Err(e) = check_capacity(this.capacity) {
            return Poll::Ready(Err(e));
        }

        let instance = match this.epoll.instance(this.handle) {
            Ok(instance) => instance,
            Err(e) => return Poll::Ready(Err(e)),
        };
        let mut ep = instance.lock();

        if ep.has_ready() {
            let mut events = Events::with_capacity(this.capacity);
            let n = ep.drain(&mut events);
            if n > 0 {
                trace!("{} wait returned {} events", this.handle, n);
                return Poll::Ready(Ok(events));
            }
        }

        let now = this.epoll.now();
        if this.deadline.expired(now) {
            if let Deadline::At(_) = this.deadline {
                debug!("{} wait timed out", this.handle);
            }
            return Poll::Ready(Ok(Events::with_capacity(this.capacity)));
        }

        if let Deadline::At(at) = this.deadline {
            trace!(
                "{} parked, {:?} left",
                this.handle,
                at.saturating_duration_since(now)
            );
        }
        ep.park(cx.waker());
        Poll::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_from_millis() {
        assert_eq!(Timeout::from_millis(0), Timeout::Immediate);
        assert_eq!(Timeout::from_millis(-1), Timeout::Never);
        assert_eq!(Timeout::from_millis(i32::min_value()), Timeout::Never);
        assert_eq!(
            Timeout::from_millis(1500),
            Timeout::After(Duration::from_millis(1500))
        );
        assert_eq!(Timeout::from(None::<Duration>), Timeout::Never);
        assert_eq!(Timeout::from(Some(Duration::from_secs(0))), Timeout::Immediate);
    }

    #[test]
    fn deadline_arithmetic() {
        let now = Timespec::new(7, 999_000_000);
        let deadline = Deadline::new(Timeout::from_millis(1_001), now);
        assert_eq!(deadline, Deadline::At(Timespec::new(9, 0)));

        assert!(!deadline.expired(Timespec::new(8, 999_999_999)));
        assert!(deadline.expired(Timespec::new(9, 0)));
        assert!(Deadline::new(Timeout::Immediate, now).expired(now));
        let end_of_time = Timespec::new(i64::max_value(), 0);
        assert!(!Deadline::new(Timeout::Never, now).expired(end_of_time));
    }
}
