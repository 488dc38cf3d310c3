//! Readiness event types and Utility

use std::{cmp, fmt, ops, slice};

/// Identifier of a watchable endpoint in the network stack's own descriptor
/// space. This is not an operating system file descriptor.
pub type Descriptor = i32;

// Upper bound on the up-front allocation of an `Events` buffer. Past this the
// buffer grows as events are pushed.
const PREALLOCATED: usize = 256;

const IN: u32 = 0x0000_0001;
const PRI: u32 = 0x0000_0002;
const OUT: u32 = 0x0000_0004;
const ERR: u32 = 0x0000_0008;
const HUP: u32 = 0x0000_0010;
const NVAL: u32 = 0x0000_0020;
const RDNORM: u32 = 0x0000_0040;
const RDBAND: u32 = 0x0000_0080;
const WRNORM: u32 = 0x0000_0100;
const WRBAND: u32 = 0x0000_0200;
const MSG: u32 = 0x0000_0400;
const RDHUP: u32 = 0x0000_2000;

const ALL: u32 =
    IN | PRI | OUT | ERR | HUP | NVAL | RDNORM | RDBAND | WRNORM | WRBAND | MSG | RDHUP;

/// A set of readiness event kinds.
///
/// `Ready` is used both as an interest mask, passed when registering a
/// descriptor, and as the readiness reported back by [`Epoll::wait`]. The bit
/// values are the ones of the Linux `EPOLL*` constants.
///
/// Only readable readiness is acted upon by the fan-out. The remaining kinds
/// can be registered and reported but the driver never raises them itself.
///
/// # Examples
///
/// ```
/// use futures_epoll::event::Ready;
///
/// let ready = Ready::readable() | Ready::writable();
///
/// assert!(ready.is_readable());
/// assert!(ready.is_writable());
/// assert!(!ready.is_hup());
/// ```
///
/// [`Epoll::wait`]: ../struct.Epoll.html#method.wait
#[derive(Copy, PartialEq, Eq, Clone, PartialOrd, Ord, Hash, Default)]
pub struct Ready(u32);

impl Ready {
    /// Returns the empty `Ready` set.
    pub fn empty() -> Ready {
        Ready(0)
    }

    /// Returns a `Ready` representing readable readiness (`EPOLLIN`).
    #[inline]
    pub fn readable() -> Ready {
        Ready(IN)
    }

    /// Returns a `Ready` representing urgent data (`EPOLLPRI`).
    #[inline]
    pub fn priority() -> Ready {
        Ready(PRI)
    }

    /// Returns a `Ready` representing writable readiness (`EPOLLOUT`).
    #[inline]
    pub fn writable() -> Ready {
        Ready(OUT)
    }

    #[inline]
    pub fn error() -> Ready {
        Ready(ERR)
    }

    #[inline]
    pub fn hup() -> Ready {
        Ready(HUP)
    }

    /// Returns a `Ready` representing a peer half-close (`EPOLLRDHUP`).
    #[inline]
    pub fn read_hup() -> Ready {
        Ready(RDHUP)
    }

    /// Returns a `Ready` set containing every known kind.
    #[inline]
    pub fn all() -> Ready {
        Ready(ALL)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        *self == Ready::empty()
    }

    #[inline]
    pub fn is_readable(&self) -> bool {
        self.contains(Ready::readable())
    }

    #[inline]
    pub fn is_writable(&self) -> bool {
        self.contains(Ready::writable())
    }

    #[inline]
    pub fn is_priority(&self) -> bool {
        self.contains(Ready::priority())
    }

    #[inline]
    pub fn is_error(&self) -> bool {
        self.contains(Ready::error())
    }

    #[inline]
    pub fn is_hup(&self) -> bool {
        self.contains(Ready::hup())
    }

    #[inline]
    pub fn is_read_hup(&self) -> bool {
        self.contains(Ready::read_hup())
    }

    #[inline]
    pub fn insert<T: Into<Self>>(&mut self, other: T) {
        let other = other.into();
        self.0 |= other.0;
    }

    #[inline]
    pub fn remove<T: Into<Self>>(&mut self, other: T) {
        let other = other.into();
        self.0 &= !other.0;
    }

    /// Returns true if every kind in `other` is also in `self`.
    #[inline]
    pub fn contains<T: Into<Self>>(&self, other: T) -> bool {
        let other = other.into();
        (*self & other) == other
    }

    /// Returns true if `self` and `other` share at least one kind.
    #[inline]
    pub fn intersects<T: Into<Self>>(&self, other: T) -> bool {
        !(*self & other).is_empty()
    }

    /// Builds a set from raw `EPOLL*` bits. Unknown bits are kept.
    #[inline]
    pub fn from_bits(bits: u32) -> Ready {
        Ready(bits)
    }

    #[inline]
    pub fn bits(&self) -> u32 {
        self.0
    }
}

impl From<u32> for Ready {
    fn from(bits: u32) -> Ready {
        Ready(bits)
    }
}

impl<T: Into<Ready>> ops::BitOr<T> for Ready {
    type Output = Ready;

    #[inline]
    fn bitor(self, other: T) -> Ready {
        Ready(self.0 | other.into().0)
    }
}

impl<T: Into<Ready>> ops::BitOrAssign<T> for Ready {
    #[inline]
    fn bitor_assign(&mut self, other: T) {
        self.0 |= other.into().0;
    }
}

impl<T: Into<Ready>> ops::BitAnd<T> for Ready {
    type Output = Ready;

    #[inline]
    fn bitand(self, other: T) -> Ready {
        Ready(self.0 & other.into().0)
    }
}

impl<T: Into<Ready>> ops::BitAndAssign<T> for Ready {
    #[inline]
    fn bitand_assign(&mut self, other: T) {
        self.0 &= other.into().0
    }
}

impl<T: Into<Ready>> ops::Sub<T> for Ready {
    type Output = Ready;

    #[inline]
    fn sub(self, other: T) -> Ready {
        Ready(self.0 & !other.into().0)
    }
}

impl<T: Into<Ready>> ops::SubAssign<T> for Ready {
    #[inline]
    fn sub_assign(&mut self, other: T) {
        self.0 &= !other.into().0;
    }
}

impl fmt::Debug for Ready {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut one = false;
        let flags = [
            (IN, "Readable"),
            (PRI, "Priority"),
            (OUT, "Writable"),
            (ERR, "Error"),
            (HUP, "Hup"),
            (NVAL, "Invalid"),
            (RDNORM, "ReadNormal"),
            (RDBAND, "ReadBand"),
            (WRNORM, "WriteNormal"),
            (WRBAND, "WriteBand"),
            (MSG, "Msg"),
            (RDHUP, "ReadHup"),
        ];

        for &(flag, msg) in &flags {
            if self.contains(Ready(flag)) {
                if one {
                    write!(fmt, " | ")?
                }
                write!(fmt, "{}", msg)?;

                one = true
            }
        }

        if !one {
            fmt.write_str("(empty)")?;
        }

        Ok(())
    }
}

/// Opaque user data associated with a registration.
///
/// The value is handed back verbatim in every [`Event`] produced for the
/// registered descriptor.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct Token(pub u64);

impl From<u64> for Token {
    fn from(val: u64) -> Token {
        Token(val)
    }
}

impl From<Token> for u64 {
    fn from(val: Token) -> u64 {
        val.0
    }
}

/// A readiness record: an event mask plus the registration's user token.
///
/// The same record is passed to the control operations, where the mask is the
/// interest set, and returned by waits, where it is the satisfied subset.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Event {
    kind: Ready,
    token: Token,
}

impl Event {
    pub fn new(readiness: Ready, token: Token) -> Event {
        Event {
            kind: readiness,
            token,
        }
    }

    pub fn readiness(&self) -> Ready {
        self.kind
    }

    pub fn token(&self) -> Token {
        self.token
    }
}

/// A bounded buffer of [`Event`] values filled by a wait.
///
/// The capacity given at construction is the `maxevents` bound: a wait never
/// produces more events than that. It is a limit, not an allocation size, so
/// any value is accepted.
///
/// # Examples
///
/// ```
/// use futures_epoll::event::Events;
///
/// let events = Events::with_capacity(16);
///
/// assert_eq!(events.capacity(), 16);
/// assert!(events.is_empty());
/// ```
#[derive(Clone, Debug)]
pub struct Events {
    inner: Vec<Event>,
    capacity: usize,
}

impl Events {
    pub fn with_capacity(capacity: usize) -> Events {
        Events {
            inner: Vec::with_capacity(cmp::min(capacity, PREALLOCATED)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.inner.len() >= self.capacity
    }

    pub fn get(&self, idx: usize) -> Option<Event> {
        self.inner.get(idx).copied()
    }

    pub fn iter(&self) -> Iter<'_> {
        Iter {
            inner: self.inner.iter(),
        }
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }

    /// Appends `event` unless the buffer is full. Returns whether it was
    /// stored.
    pub(crate) fn push(&mut self, event: Event) -> bool {
        if self.is_full() {
            return false;
        }
        self.inner.push(event);
        true
    }
}

impl<'a> IntoIterator for &'a Events {
    type Item = Event;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// [`Events`] iterator.
#[derive(Debug, Clone)]
pub struct Iter<'a> {
    inner: slice::Iter<'a, Event>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = Event;

    fn next(&mut self) -> Option<Event> {
        self.inner.next().copied()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

#[test]
fn test_debug_ready() {
    assert_eq!("(empty)", format!("{:?}", Ready::empty()));
    assert_eq!("Readable", format!("{:?}", Ready::readable()));
    assert_eq!("Writable", format!("{:?}", Ready::writable()));
    assert_eq!(
        "Readable | Writable | ReadHup",
        format!("{:?}", Ready::readable() | Ready::writable() | Ready::read_hup())
    );
}

#[test]
fn test_ready_bits_match_epoll() {
    assert_eq!(Ready::readable().bits(), 0x1);
    assert_eq!(Ready::priority().bits(), 0x2);
    assert_eq!(Ready::writable().bits(), 0x4);
    assert_eq!(Ready::read_hup().bits(), 0x2000);
    assert!(Ready::all().contains(Ready::readable() | Ready::hup()));
}

#[test]
fn test_events_respect_capacity() {
    let mut events = Events::with_capacity(2);
    assert!(events.push(Event::new(Ready::readable(), Token(1))));
    assert!(events.push(Event::new(Ready::readable(), Token(2))));
    assert!(!events.push(Event::new(Ready::readable(), Token(3))));

    let tokens: Vec<_> = events.iter().map(|e| e.token()).collect();
    assert_eq!(tokens, vec![Token(1), Token(2)]);

    events.clear();
    assert!(events.is_empty());
    assert_eq!(events.capacity(), 2);
}

#[test]
fn test_huge_capacity_is_only_a_bound() {
    let mut events = Events::with_capacity(usize::max_value());
    assert_eq!(events.capacity(), usize::max_value());
    for i in 0..1000 {
        assert!(events.push(Event::new(Ready::readable(), Token(i))));
    }
    assert_eq!(events.len(), 1000);
    assert!(!events.is_full());
}
