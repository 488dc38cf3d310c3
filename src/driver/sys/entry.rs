use crate::driver::Handle;
use crate::event::{Descriptor, Event, Ready, Token};

/// Stable arena key of a watch entry. Keys stay valid until the entry is
/// removed from its index, whatever rotations the tree performs.
pub(crate) type EntryKey = usize;

/// Ready queue linkage stored inline in the entry.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Link {
    pub(crate) prev: Option<EntryKey>,
    pub(crate) next: Option<EntryKey>,
    pub(crate) linked: bool,
}

/// One descriptor's registration within one epoll instance.
#[derive(Debug)]
pub(crate) struct WatchEntry {
    fd: Descriptor,
    owner: Handle,
    interest: Ready,
    token: Token,
    // Kinds raised since the entry was last drained.
    revents: Ready,
    pub(crate) link: Link,
}

impl WatchEntry {
    pub(crate) fn new(fd: Descriptor, owner: Handle, event: Event) -> WatchEntry {
        WatchEntry {
            fd,
            owner,
            interest: event.readiness(),
            token: event.token(),
            revents: Ready::empty(),
            link: Link::default(),
        }
    }

    pub(crate) fn fd(&self) -> Descriptor {
        self.fd
    }

    pub(crate) fn owner(&self) -> Handle {
        self.owner
    }

    pub(crate) fn interest(&self) -> Ready {
        self.interest
    }

    pub(crate) fn token(&self) -> Token {
        self.token
    }

    /// Replaces interest and token. The key is left alone.
    pub(crate) fn set_event(&mut self, event: Event) {
        self.interest = event.readiness();
        self.token = event.token();
    }

    pub(crate) fn is_linked(&self) -> bool {
        self.link.linked
    }

    pub(crate) fn raise(&mut self, kinds: Ready) {
        self.revents |= kinds;
    }

    /// Returns the raised kinds still covered by the interest mask and resets
    /// them.
    pub(crate) fn take_revents(&mut self) -> Ready {
        let revents = self.revents & self.interest;
        self.revents = Ready::empty();
        revents
    }
}
