//! # User-space epoll for futures based network stacks
//!
//! The readiness-notification core of a user-space network stack. Application
//! code registers interest in logical descriptors with an epoll instance and
//! collects the ones that became ready, immediately, after a bounded wait or
//! after an unbounded wait. The protocol layer drives it by reporting
//! readiness changes.
//!
//! # Examples
//! __Explicit table__
//! ```rust
//! use futures_epoll::{Epoll, Ready, ReadinessTable, Token};
//! use futures_epoll::runtime::{self, Runtime};
//!
//! fn main() -> std::io::Result<()> {
//!     let table = ReadinessTable::new();
//!     let epoll = Epoll::new(table.clone());
//!     let ep = epoll.create()?;
//!
//!     table.set(3, Ready::readable());
//!     // already readable, so queued on registration
//!     epoll.add(ep, 3, Ready::readable(), Token(3))?;
//!
//!     let mut rt = runtime::with_epoll(epoll.clone());
//!     let events = rt.exec(epoll.wait(ep, 16, -1))?;
//!     assert_eq!(events.len(), 1);
//!     Ok(())
//! }
//! ```
//! __Process-wide table__
//! ```rust,no_run
//! use futures_epoll::global::{epoll_create1, epoll_ctl, epoll_wait, set_readiness};
//! use futures_epoll::{Event, Ready, Token, EPOLL_CTL_ADD};
//!
//! #[futures_epoll::main]
//! async fn main() -> std::io::Result<()> {
//!     let epfd = epoll_create1(0)?;
//!     epoll_ctl(epfd, EPOLL_CTL_ADD, 5, Event::new(Ready::readable(), Token(5)))?;
//!
//!     set_readiness(5, Ready::readable());
//!     for event in &epoll_wait(epfd, 16, 1000).await? {
//!         println!("{:?}", event);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(
    rust_2018_idioms,
    unreachable_pub,
    missing_debug_implementations,
    missing_docs
)]
#![allow(
    missing_docs,
    clippy::type_complexity,
    clippy::needless_doctest_main,
    clippy::new_without_default
)]

#[cfg(feature = "macro")]
#[doc(inline)]
pub use futures_epoll_macro::{main, test};

pub mod driver;
pub mod event;
pub mod global;
pub mod runtime;

#[doc(inline)]
pub use crate::driver::{
    Epoll, Handle, Readiness, ReadinessTable, Timeout, Wait, EPOLL_CTL_ADD, EPOLL_CTL_DEL,
    EPOLL_CTL_MOD,
};
#[doc(inline)]
pub use crate::event::{Descriptor, Event, Events, Ready, Token};
