use std::fmt;
use std::io;
use std::sync::Arc;

use log::debug;

use super::clock::{Clock, SystemClock, Timespec};
use super::registry::{Handle, Registry, SharedPoll, DEFAULT_MAX_INSTANCES};
use super::source::{from_fn, Readiness};
use super::wait::{check_capacity, Timeout, Wait};
use crate::event::{Descriptor, Event, Events, Ready, Token};

pub const EPOLL_CTL_ADD: i32 = 1;
pub const EPOLL_CTL_DEL: i32 = 2;
pub const EPOLL_CTL_MOD: i32 = 3;

/// Control operation applied by [`Epoll::ctl`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CtlOp {
    /// Start watching a descriptor.
    Add,
    /// Stop watching a descriptor.
    Del,
    /// Replace the interest mask and token of a watched descriptor.
    Mod,
}

impl CtlOp {
    pub fn from_raw(op: i32) -> io::Result<CtlOp> {
        match op {
            EPOLL_CTL_ADD => Ok(CtlOp::Add),
            EPOLL_CTL_DEL => Ok(CtlOp::Del),
            EPOLL_CTL_MOD => Ok(CtlOp::Mod),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("unknown epoll_ctl op {}", op),
            )),
        }
    }

    pub fn as_raw(&self) -> i32 {
        match *self {
            CtlOp::Add => EPOLL_CTL_ADD,
            CtlOp::Del => EPOLL_CTL_DEL,
            CtlOp::Mod => EPOLL_CTL_MOD,
        }
    }
}

/// A table of epoll instances sharing one readiness source and one clock.
///
/// `Epoll` is a cheap handle: clones refer to the same table. Instances are
/// created with [`create`] and named by the returned [`Handle`]; descriptors
/// are watched with [`add`], [`modify`] and [`delete`]; the protocol layer
/// reports readiness changes with [`notify`], which reaches every instance
/// watching the descriptor; applications collect ready descriptors with
/// [`wait`].
///
/// Readiness is level-triggered but draining is destructive: once a wait has
/// returned an event for a descriptor, that descriptor is reported again only
/// after the next `notify` for it (or after re-registration finds it ready).
///
/// # Examples
///
/// ```
/// use futures_epoll::driver::{Epoll, ReadinessTable};
/// use futures_epoll::event::{Events, Ready, Token};
///
/// # fn main() -> std::io::Result<()> {
/// let table = ReadinessTable::new();
/// let epoll = Epoll::new(table.clone());
///
/// let ep = epoll.create()?;
/// epoll.add(ep, 7, Ready::readable(), Token(70))?;
///
/// // the protocol layer sees data on descriptor 7
/// table.set(7, Ready::readable());
/// epoll.notify(7, Ready::readable());
///
/// let mut events = Events::with_capacity(8);
/// assert_eq!(epoll.try_wait(ep, &mut events)?, 1);
/// assert_eq!(events.get(0).unwrap().token(), Token(70));
///
/// // drained until notified again
/// assert_eq!(epoll.try_wait(ep, &mut events)?, 0);
/// # Ok(())
/// # }
/// ```
///
/// [`create`]: #method.create
/// [`add`]: #method.add
/// [`modify`]: #method.modify
/// [`delete`]: #method.delete
/// [`notify`]: #method.notify
/// [`wait`]: #method.wait
#[derive(Clone)]
pub struct Epoll {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Registry,
    source: Box<dyn Readiness>,
    clock: Box<dyn Clock>,
}

impl Epoll {
    /// Creates a table with default settings reading readiness from `source`.
    pub fn new<R: Readiness>(source: R) -> Epoll {
        Builder::new().readiness(source).build()
    }

    pub fn builder() -> Builder {
        Builder::new()
    }

    /// Allocates a new instance in the lowest free slot.
    ///
    /// Fails with `ErrorKind::Other` once the table holds its maximum number
    /// of instances. Instances are never destroyed, so this is permanent.
    pub fn create(&self) -> io::Result<Handle> {
        self.inner.registry.create()
    }

    /// Dispatches a control operation. `event` is ignored for `Del`.
    pub fn ctl(
        &self,
        handle: Handle,
        op: CtlOp,
        fd: Descriptor,
        event: Event,
    ) -> io::Result<()> {
        let instance = self.instance(handle)?;
        debug!("{} ctl {:?} fd {} {:?}", handle, op, fd, event.readiness());

        match op {
            CtlOp::Add => {
                let waiters = {
                    let mut ep = instance.lock();
                    if !ep.insert(fd, event, &*self.inner.source)? {
                        return Ok(());
                    }
                    ep.take_waiters()
                };
                waiters.into_iter().for_each(|w| w.wake());
                Ok(())
            }
            CtlOp::Del => instance.lock().remove(fd),
            CtlOp::Mod => instance.lock().modify(fd, event),
        }
    }

    /// Watches `fd` for `interest` on `handle`.
    ///
    /// If the readiness source reports the interest as already satisfied the
    /// descriptor is queued right away. Fails with `ErrorKind::AlreadyExists`
    /// if `fd` is already watched by this instance.
    pub fn add(
        &self,
        handle: Handle,
        fd: Descriptor,
        interest: Ready,
        token: Token,
    ) -> io::Result<()> {
        self.ctl(handle, CtlOp::Add, fd, Event::new(interest, token))
    }

    /// Stops watching `fd`, dropping it from the ready queue if it is queued.
    /// Fails with `ErrorKind::NotFound` if `fd` is not watched.
    pub fn delete(&self, handle: Handle, fd: Descriptor) -> io::Result<()> {
        self.ctl(handle, CtlOp::Del, fd, Event::new(Ready::empty(), Token(0)))
    }

    /// Replaces the interest and token of `fd` without re-checking readiness.
    /// Fails with `ErrorKind::NotFound` if `fd` is not watched.
    pub fn modify(
        &self,
        handle: Handle,
        fd: Descriptor,
        interest: Ready,
        token: Token,
    ) -> io::Result<()> {
        self.ctl(handle, CtlOp::Mod, fd, Event::new(interest, token))
    }

    /// Reports that `fd` became ready for `event`.
    ///
    /// Every instance watching `fd` with a matching interest queues it, unless
    /// it is already queued. Each instance is locked on its own, one after the
    /// other. Only readable readiness is acted upon; other kinds are ignored.
    pub fn notify(&self, fd: Descriptor, event: Ready) {
        for instance in self.inner.registry.snapshot() {
            let waiters = {
                let mut ep = instance.lock();
                if !ep.raise(fd, event) {
                    continue;
                }
                ep.take_waiters()
            };
            waiters.into_iter().for_each(|w| w.wake());
        }
    }

    /// Waits for ready descriptors on `handle`, returning at most `maxevents`
    /// of them in the order they became ready.
    ///
    /// `timeout` accepts the millisecond convention (`0`, negative, positive)
    /// or a [`Timeout`]. An expired deadline resolves to an empty `Events`.
    pub fn wait<T: Into<Timeout>>(&self, handle: Handle, maxevents: usize, timeout: T) -> Wait {
        Wait::new(self.clone(), handle, maxevents, timeout.into())
    }

    /// Drains ready descriptors into `events` without waiting. `events` is
    /// cleared first and filled up to its capacity.
    ///
    /// Fails with `ErrorKind::InvalidInput` if `events` has zero capacity,
    /// like [`wait`] with a zero `maxevents`.
    ///
    /// [`wait`]: #method.wait
    pub fn try_wait(&self, handle: Handle, events: &mut Events) -> io::Result<usize> {
        check_capacity(events.capacity())?;
        let instance = self.instance(handle)?;
        events.clear();
        let n = instance.lock().drain(events);
        Ok(n)
    }

    /// One pass of the surrounding loop: wakes every parked wait so it
    /// re-checks its deadline.
    pub fn tick(&self) {
        for instance in self.inner.registry.snapshot() {
            let waiters = instance.lock().take_waiters();
            waiters.into_iter().for_each(|w| w.wake());
        }
    }

    /// Number of live instances.
    pub fn instances(&self) -> usize {
        self.inner.registry.len()
    }

    pub fn max_instances(&self) -> usize {
        self.inner.registry.capacity()
    }

    /// Descriptors watched by `handle`, ascending.
    pub fn watched(&self, handle: Handle) -> io::Result<Vec<Descriptor>> {
        Ok(self.instance(handle)?.lock().watched())
    }

    /// Smallest descriptor watched by `handle`.
    pub fn first_watched(&self, handle: Handle) -> io::Result<Option<Descriptor>> {
        Ok(self.instance(handle)?.lock().first_watched())
    }

    /// Number of descriptors queued as ready on `handle`.
    pub fn ready_len(&self, handle: Handle) -> io::Result<usize> {
        Ok(self.instance(handle)?.lock().ready_len())
    }

    pub(crate) fn instance(&self, handle: Handle) -> io::Result<SharedPoll> {
        self.inner.registry.get(handle)
    }

    pub(crate) fn now(&self) -> Timespec {
        self.inner.clock.now()
    }
}

impl fmt::Debug for Epoll {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("Epoll")
            .field("registry", &self.inner.registry)
            .finish()
    }
}

/// Configures an [`Epoll`] table.
///
/// ```
/// use futures_epoll::driver::{Epoll, ManualClock, ReadinessTable};
///
/// let epoll = Epoll::builder()
///     .max_instances(16)
///     .clock(ManualClock::new())
///     .readiness(ReadinessTable::new())
///     .build();
///
/// assert_eq!(epoll.max_instances(), 16);
/// ```
pub struct Builder {
    max_instances: usize,
    source: Option<Box<dyn Readiness>>,
    clock: Option<Box<dyn Clock>>,
}

impl Builder {
    pub fn new() -> Builder {
        Builder {
            max_instances: DEFAULT_MAX_INSTANCES,
            source: None,
            clock: None,
        }
    }

    /// Bound on live instances, 1024 by default.
    pub fn max_instances(mut self, max: usize) -> Builder {
        self.max_instances = max;
        self
    }

    /// Readiness source queried at registration. Without one, nothing is
    /// ever ready at registration time.
    pub fn readiness<R: Readiness>(mut self, source: R) -> Builder {
        self.source = Some(Box::new(source));
        self
    }

    /// Time source for wait deadlines, `SystemClock` by default.
    pub fn clock<C: Clock>(mut self, clock: C) -> Builder {
        self.clock = Some(Box::new(clock));
        self
    }

    pub fn build(self) -> Epoll {
        let source = self
            .source
            .unwrap_or_else(|| Box::new(from_fn(|_, _| Ready::empty())));
        let clock = self.clock.unwrap_or_else(|| Box::new(SystemClock));
        Epoll {
            inner: Arc::new(Inner {
                registry: Registry::new(self.max_instances),
                source,
                clock,
            }),
        }
    }
}

impl Default for Builder {
    fn default() -> Builder {
        Builder::new()
    }
}

impl fmt::Debug for Builder {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("Builder")
            .field("max_instances", &self.max_instances)
            .field("custom_source", &self.source.is_some())
            .field("custom_clock", &self.clock.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ctl_op_raw_values() {
        for op in &[CtlOp::Add, CtlOp::Del, CtlOp::Mod] {
            assert_eq!(CtlOp::from_raw(op.as_raw()).unwrap(), *op);
        }
        let err = CtlOp::from_raw(4).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn operations_on_unknown_handle_fail() {
        let epoll = Epoll::builder().build();
        let bogus = Handle::from_raw(3);

        let kind = |r: io::Result<()>| r.unwrap_err().kind();
        let invalid = io::ErrorKind::InvalidInput;
        assert_eq!(kind(epoll.add(bogus, 1, Ready::readable(), Token(1))), invalid);
        assert_eq!(kind(epoll.delete(bogus, 1)), invalid);
        assert_eq!(kind(epoll.modify(bogus, 1, Ready::readable(), Token(1))), invalid);
        assert!(epoll.watched(bogus).is_err());

        let mut events = Events::with_capacity(1);
        assert!(epoll.try_wait(bogus, &mut events).is_err());
    }

    #[test]
    fn try_wait_clears_previous_events() {
        let epoll = Epoll::builder().build();
        let ep = epoll.create().unwrap();
        epoll.add(ep, 1, Ready::readable(), Token(1)).unwrap();
        epoll.notify(1, Ready::readable());

        let mut events = Events::with_capacity(4);
        assert_eq!(epoll.try_wait(ep, &mut events).unwrap(), 1);
        assert_eq!(epoll.try_wait(ep, &mut events).unwrap(), 0);
        assert!(events.is_empty());
    }

    #[test]
    fn try_wait_rejects_zero_capacity() {
        let epoll = Epoll::builder().build();
        let ep = epoll.create().unwrap();
        epoll.add(ep, 1, Ready::readable(), Token(1)).unwrap();
        epoll.notify(1, Ready::readable());

        let mut events = Events::with_capacity(0);
        let err = epoll.try_wait(ep, &mut events).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);

        // nothing was drained
        assert_eq!(epoll.ready_len(ep).unwrap(), 1);
    }
}
