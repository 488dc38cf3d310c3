use std::io;
use std::task::Waker;

use log::trace;

use super::registry::Handle;
use super::source::Readiness;
use super::sys::{ReadyQueue, WatchEntry, WatchIndex};
use crate::event::{Descriptor, Event, Events, Ready};

/// Kinds the fan-out and the registration check act upon. Anything else is
/// accepted in interest masks but never raised. A signal carrying readable
/// alongside other kinds still counts as readable.
fn raisable(interest: Ready, event: Ready) -> Ready {
    interest & event & Ready::readable()
}

/// One epoll instance: its watch index, its ready queue and the wakers of the
/// waits parked on it.
#[derive(Debug)]
pub(crate) struct EventPoll {
    handle: Handle,
    index: WatchIndex,
    ready: ReadyQueue,
    waiters: Vec<Waker>,
}

impl EventPoll {
    pub(crate) fn new(handle: Handle) -> EventPoll {
        EventPoll {
            handle,
            index: WatchIndex::new(),
            ready: ReadyQueue::new(),
            waiters: Vec::new(),
        }
    }

    /// Registers `fd` and links it at once if `source` says the interest is
    /// already met. Returns whether the entry was linked.
    pub(crate) fn insert(
        &mut self,
        fd: Descriptor,
        event: Event,
        source: &dyn Readiness,
    ) -> io::Result<bool> {
        let entry = WatchEntry::new(fd, self.handle, event);
        let key = match self.index.insert(entry) {
            Ok(key) => key,
            Err(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("fd {} is already registered with {}", fd, self.handle),
                ))
            }
        };

        let interest = event.readiness();
        let ready = raisable(interest, source.readiness(fd, interest));
        if ready.is_empty() {
            return Ok(false);
        }
        self.index.get_mut(key).raise(ready);
        let linked = self.ready.link(&mut self.index, key);
        trace!("{} fd {} ready on registration: {:?}", self.handle, fd, ready);
        Ok(linked)
    }

    pub(crate) fn remove(&mut self, fd: Descriptor) -> io::Result<()> {
        let key = self.index.find(fd).ok_or_else(|| self.not_found(fd))?;
        if self.ready.is_linked(&self.index, key) {
            self.ready.unlink(&mut self.index, key);
        }
        self.index.remove(key);
        Ok(())
    }

    /// Overwrites the interest and token of `fd`. Current readiness is not
    /// re-evaluated against the new mask.
    pub(crate) fn modify(&mut self, fd: Descriptor, event: Event) -> io::Result<()> {
        let key = self.index.find(fd).ok_or_else(|| self.not_found(fd))?;
        self.index.get_mut(key).set_event(event);
        Ok(())
    }

    /// Applies one readiness signal. Returns true if `fd` was newly linked.
    pub(crate) fn raise(&mut self, fd: Descriptor, event: Ready) -> bool {
        let key = match self.index.find(fd) {
            Some(key) => key,
            None => return false,
        };

        let entry = self.index.get_mut(key);
        let ready = raisable(entry.interest(), event);
        if ready.is_empty() {
            return false;
        }
        entry.raise(ready);
        let owner = entry.owner();
        let linked = self.ready.link(&mut self.index, key);
        if linked {
            trace!("{} fd {} linked: {:?}", owner, fd, ready);
        }
        linked
    }

    pub(crate) fn has_ready(&self) -> bool {
        !self.ready.is_empty()
    }

    pub(crate) fn ready_len(&self) -> usize {
        self.ready.len()
    }

    /// Moves ready entries into `events` in FIFO order until it is full or the
    /// queue is empty. Drained entries stay unlinked until raised again.
    pub(crate) fn drain(&mut self, events: &mut Events) -> usize {
        let mut n = 0;
        while !events.is_full() {
            let key = match self.ready.pop_front(&mut self.index) {
                Some(key) => key,
                None => break,
            };
            let entry = self.index.get_mut(key);
            let revents = entry.take_revents();
            // interest narrowed by a modify while linked
            if revents.is_empty() {
                continue;
            }
            events.push(Event::new(revents, entry.token()));
            n += 1;
        }
        n
    }

    pub(crate) fn park(&mut self, waker: &Waker) {
        if !self.waiters.iter().any(|w| w.will_wake(waker)) {
            self.waiters.push(waker.clone());
        }
    }

    pub(crate) fn take_waiters(&mut self) -> Vec<Waker> {
        std::mem::replace(&mut self.waiters, Vec::new())
    }

    pub(crate) fn watched(&self) -> Vec<Descriptor> {
        self.index.descriptors()
    }

    pub(crate) fn first_watched(&self) -> Option<Descriptor> {
        self.index.first().map(|key| self.index.get(key).fd())
    }

    fn not_found(&self, fd: Descriptor) -> io::Error {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("fd {} is not registered with {}", fd, self.handle),
        )
    }
}
