use std::fmt;
use std::io;
use std::sync::Arc;

use log::{debug, warn};
use parking_lot::{Mutex, RwLock};

use super::instance::EventPoll;

/// Default bound on the number of live epoll instances.
pub const DEFAULT_MAX_INSTANCES: usize = 1024;

/// Names one epoll instance in an [`Epoll`] table.
///
/// Handles are small dense integers. The lowest free slot is handed out first
/// and, since instances are never destroyed, a handle is never reused.
///
/// [`Epoll`]: struct.Epoll.html
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct Handle(usize);

impl Handle {
    pub fn from_raw(raw: usize) -> Handle {
        Handle(raw)
    }

    pub fn as_raw(&self) -> usize {
        self.0
    }
}

impl From<Handle> for usize {
    fn from(handle: Handle) -> usize {
        handle.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "epoll#{}", self.0)
    }
}

pub(crate) type SharedPoll = Arc<Mutex<EventPoll>>;

/// Fixed capacity table of instances.
///
/// Each instance sits behind its own lock. The table lock is only taken to
/// resolve a handle or to snapshot the live instances, and never while an
/// instance lock is held.
pub(crate) struct Registry {
    slots: RwLock<Vec<Option<SharedPoll>>>,
    capacity: usize,
}

impl Registry {
    pub(crate) fn new(capacity: usize) -> Registry {
        Registry {
            slots: RwLock::new(Vec::new()),
            capacity,
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.read().iter().filter(|slot| slot.is_some()).count()
    }

    pub(crate) fn create(&self) -> io::Result<Handle> {
        let mut slots = self.slots.write();
        let idx = match slots.iter().position(Option::is_none) {
            Some(idx) => idx,
            None if slots.len() < self.capacity => {
                slots.push(None);
                slots.len() - 1
            }
            None => {
                warn!("epoll table full ({} instances)", self.capacity);
                return Err(io::Error::new(
                    io::ErrorKind::Other,
                    "too many epoll instances",
                ));
            }
        };

        let handle = Handle(idx);
        slots[idx] = Some(Arc::new(Mutex::new(EventPoll::new(handle))));
        debug!("created {}", handle);
        Ok(handle)
    }

    pub(crate) fn get(&self, handle: Handle) -> io::Result<SharedPoll> {
        self.slots
            .read()
            .get(handle.0)
            .and_then(Option::clone)
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("{} is not a live epoll instance", handle),
                )
            })
    }

    /// Live instances in handle order.
    pub(crate) fn snapshot(&self) -> Vec<SharedPoll> {
        self.slots.read().iter().flatten().cloned().collect()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("Registry")
            .field("instances", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowest_handle_first() {
        let registry = Registry::new(4);
        assert_eq!(registry.create().unwrap(), Handle(0));
        assert_eq!(registry.create().unwrap(), Handle(1));
        assert_eq!(registry.create().unwrap(), Handle(2));
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.snapshot().len(), 3);
    }

    #[test]
    fn exhaustion_is_permanent() {
        let registry = Registry::new(2);
        registry.create().unwrap();
        registry.create().unwrap();

        for _ in 0..3 {
            let err = registry.create().unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::Other);
        }
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn unknown_handle() {
        let registry = Registry::new(2);
        registry.create().unwrap();
        assert!(registry.get(Handle(0)).is_ok());

        let err = registry.get(Handle(1)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert!(registry.get(Handle(900)).is_err());
    }

    #[test]
    fn zero_capacity_never_creates() {
        let registry = Registry::new(0);
        assert!(registry.create().is_err());
    }
}
