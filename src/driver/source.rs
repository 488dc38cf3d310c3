//! The readiness side of the protocol layer.
//!
//! The epoll core never reaches into sockets. When a descriptor is registered
//! it asks a [`Readiness`] implementation whether the new interest is already
//! satisfied; every later change has to be pushed in with
//! [`Epoll::notify`](../struct.Epoll.html#method.notify).

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::event::{Descriptor, Ready};

/// Answers "which of `interest` does `fd` satisfy right now".
///
/// Implementations must not call back into the `Epoll` they are installed in.
pub trait Readiness: Send + Sync + 'static {
    fn readiness(&self, fd: Descriptor, interest: Ready) -> Ready;
}

impl<R: Readiness + ?Sized> Readiness for Arc<R> {
    fn readiness(&self, fd: Descriptor, interest: Ready) -> Ready {
        (**self).readiness(fd, interest)
    }
}

impl<R: Readiness + ?Sized> Readiness for Box<R> {
    fn readiness(&self, fd: Descriptor, interest: Ready) -> Ready {
        (**self).readiness(fd, interest)
    }
}

/// Wraps a closure as a [`Readiness`] source.
///
/// # Examples
///
/// ```
/// use futures_epoll::driver::{from_fn, Epoll};
/// use futures_epoll::event::Ready;
///
/// // Even descriptors always have data.
/// let epoll = Epoll::new(from_fn(|fd, interest| {
///     if fd % 2 == 0 { interest & Ready::readable() } else { Ready::empty() }
/// }));
/// # drop(epoll);
/// ```
pub fn from_fn<F>(f: F) -> FnReadiness<F>
where
    F: Fn(Descriptor, Ready) -> Ready + Send + Sync + 'static,
{
    FnReadiness(f)
}

/// See [`from_fn`].
pub struct FnReadiness<F>(F);

impl<F> Readiness for FnReadiness<F>
where
    F: Fn(Descriptor, Ready) -> Ready + Send + Sync + 'static,
{
    fn readiness(&self, fd: Descriptor, interest: Ready) -> Ready {
        (self.0)(fd, interest)
    }
}

impl<F> fmt::Debug for FnReadiness<F> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str("FnReadiness")
    }
}

/// Per descriptor readiness state kept by the protocol layer.
///
/// Clones share the same table, so one clone can be installed in an `Epoll`
/// while the protocol layer keeps updating another.
///
/// # Examples
///
/// ```
/// use futures_epoll::driver::{Readiness, ReadinessTable};
/// use futures_epoll::event::Ready;
///
/// let table = ReadinessTable::new();
/// table.set(3, Ready::readable() | Ready::writable());
///
/// assert_eq!(table.readiness(3, Ready::readable()), Ready::readable());
///
/// table.clear(3, Ready::readable());
/// assert!(table.readiness(3, Ready::readable()).is_empty());
/// ```
#[derive(Clone, Default)]
pub struct ReadinessTable {
    states: Arc<Mutex<HashMap<Descriptor, Ready>>>,
}

impl ReadinessTable {
    pub fn new() -> ReadinessTable {
        ReadinessTable::default()
    }

    /// Replaces the readiness of `fd`.
    pub fn set(&self, fd: Descriptor, ready: Ready) {
        let mut states = self.states.lock();
        if ready.is_empty() {
            states.remove(&fd);
        } else {
            states.insert(fd, ready);
        }
    }

    /// Removes `kinds` from the readiness of `fd`.
    pub fn clear(&self, fd: Descriptor, kinds: Ready) {
        let mut states = self.states.lock();
        if let Some(ready) = states.get_mut(&fd) {
            ready.remove(kinds);
            if ready.is_empty() {
                states.remove(&fd);
            }
        }
    }

    pub fn get(&self, fd: Descriptor) -> Ready {
        self.states.lock().get(&fd).copied().unwrap_or_default()
    }
}

impl Readiness for ReadinessTable {
    fn readiness(&self, fd: Descriptor, interest: Ready) -> Ready {
        self.get(fd) & interest
    }
}

impl fmt::Debug for ReadinessTable {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("ReadinessTable")
            .field("tracked", &self.states.lock().len())
            .finish()
    }
}
