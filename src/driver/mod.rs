//! The epoll readiness core.
//!
//! # Overview
//!
//! An [`Epoll`] is a fixed-capacity table of epoll instances. Each instance
//! keeps
//!
//! * an ordered watch index (an AVL tree keyed by descriptor, with a cached
//!   minimum) holding one entry per watched descriptor, and
//! * a FIFO ready queue threaded through those same entries.
//!
//! The protocol layer pushes readiness changes with [`Epoll::notify`], which
//! fans out to every instance watching the descriptor. Applications register
//! interest with [`Epoll::add`] and collect ready descriptors with
//! [`Epoll::wait`].
//!
//! # Waiting
//!
//! There is no blocking system call anywhere in this module. [`Wait`] is a
//! future: it resolves as soon as the ready queue is non-empty, parks itself
//! on the instance otherwise, and is re-polled whenever a notification queues
//! something on that instance or the surrounding loop calls [`Epoll::tick`].
//! Deadlines are checked against a [`Clock`], which tests replace with a
//! [`ManualClock`].
//!
//! [`Epoll`]: struct.Epoll.html
//! [`Epoll::notify`]: struct.Epoll.html#method.notify
//! [`Epoll::add`]: struct.Epoll.html#method.add
//! [`Epoll::wait`]: struct.Epoll.html#method.wait
//! [`Epoll::tick`]: struct.Epoll.html#method.tick
//! [`Wait`]: struct.Wait.html
//! [`Clock`]: trait.Clock.html
//! [`ManualClock`]: struct.ManualClock.html

mod clock;
mod epoll;
mod instance;
mod registry;
mod source;
mod sys;
mod wait;

pub use self::clock::{Clock, ManualClock, SystemClock, Timespec};
pub use self::epoll::{Builder, CtlOp, Epoll, EPOLL_CTL_ADD, EPOLL_CTL_DEL, EPOLL_CTL_MOD};
pub use self::registry::{Handle, DEFAULT_MAX_INSTANCES};
pub use self::source::{from_fn, FnReadiness, Readiness, ReadinessTable};
pub use self::wait::{Timeout, Wait};
