//! Process-wide epoll table.
//!
//! Free functions in the shape of the classic C interface, operating on a
//! single lazily created [`Epoll`] that reads readiness from a shared
//! [`ReadinessTable`]. The protocol layer calls [`set_readiness`] (or
//! [`raise_event`] if it tracks readiness itself); applications use
//! [`epoll_create1`], [`epoll_ctl`] and [`epoll_wait`].
//!
//! The default [`runtime`](../runtime/index.html) ticks this table.
//!
//! [`Epoll`]: ../driver/struct.Epoll.html
//! [`ReadinessTable`]: ../driver/struct.ReadinessTable.html

use std::io;

use lazy_static::lazy_static;

use crate::driver::{CtlOp, Epoll, Handle, ReadinessTable, Wait};
use crate::event::{Descriptor, Event, Ready};

lazy_static! {
    static ref READINESS: ReadinessTable = ReadinessTable::new();
    static ref DEFAULT: Epoll = Epoll::builder().readiness(READINESS.clone()).build();
}

/// The process-wide table.
pub fn handle() -> Epoll {
    DEFAULT.clone()
}

/// The readiness table backing the process-wide epoll table.
pub fn readiness() -> ReadinessTable {
    READINESS.clone()
}

/// `size` is ignored.
pub fn epoll_create(_size: i32) -> io::Result<Handle> {
    DEFAULT.create()
}

/// `flags` is ignored.
pub fn epoll_create1(_flags: i32) -> io::Result<Handle> {
    DEFAULT.create()
}

/// `op` is one of `EPOLL_CTL_ADD`, `EPOLL_CTL_DEL`, `EPOLL_CTL_MOD`.
pub fn epoll_ctl(epfd: Handle, op: i32, fd: Descriptor, event: Event) -> io::Result<()> {
    DEFAULT.ctl(epfd, CtlOp::from_raw(op)?, fd, event)
}

/// `timeout` is in milliseconds: `0` polls, negative waits forever.
pub fn epoll_wait(epfd: Handle, maxevents: usize, timeout: i32) -> Wait {
    DEFAULT.wait(epfd, maxevents, timeout)
}

/// Notifies every instance watching `fd`.
pub fn raise_event(fd: Descriptor, event: Ready) {
    DEFAULT.notify(fd, event)
}

/// Records `ready` as the current readiness of `fd` and notifies watchers.
pub fn set_readiness(fd: Descriptor, ready: Ready) {
    READINESS.set(fd, ready);
    if !ready.is_empty() {
        DEFAULT.notify(fd, ready);
    }
}

/// Drops `kinds` from the recorded readiness of `fd`.
pub fn clear_readiness(fd: Descriptor, kinds: Ready) {
    READINESS.clear(fd, kinds);
}
