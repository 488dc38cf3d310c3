//! Index based storage behind an epoll instance: the watch entries, the
//! ordered watch index that owns them, and the ready queue threaded through
//! them.

pub(crate) mod entry;
pub(crate) mod ready;
pub(crate) mod tree;

pub(crate) use self::entry::WatchEntry;
pub(crate) use self::ready::ReadyQueue;
pub(crate) use self::tree::WatchIndex;
