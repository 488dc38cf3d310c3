use super::entry::{EntryKey, Link};
use super::tree::WatchIndex;

/// FIFO of ready entries, threaded through the entries' inline `Link`s.
///
/// The queue only stores head and tail; every operation takes the owning
/// `WatchIndex` to reach the entries.
#[derive(Debug, Default)]
pub(crate) struct ReadyQueue {
    head: Option<EntryKey>,
    tail: Option<EntryKey>,
    len: usize,
}

impl ReadyQueue {
    pub(crate) fn new() -> ReadyQueue {
        ReadyQueue::default()
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    pub(crate) fn is_linked(&self, index: &WatchIndex, key: EntryKey) -> bool {
        index.get(key).is_linked()
    }

    /// Appends `key` at the tail. Returns false if it was already linked.
    pub(crate) fn link(&mut self, index: &mut WatchIndex, key: EntryKey) -> bool {
        let tail = self.tail;
        {
            let entry = index.get_mut(key);
            if entry.is_linked() {
                return false;
            }
            entry.link = Link {
                prev: tail,
                next: None,
                linked: true,
            };
        }

        match tail {
            Some(tail) => index.get_mut(tail).link.next = Some(key),
            None => self.head = Some(key),
        }
        self.tail = Some(key);
        self.len += 1;
        true
    }

    /// Detaches `key` wherever it sits. Returns false if it was not linked.
    pub(crate) fn unlink(&mut self, index: &mut WatchIndex, key: EntryKey) -> bool {
        let link = index.get(key).link;
        if !link.linked {
            return false;
        }

        match link.prev {
            Some(prev) => index.get_mut(prev).link.next = link.next,
            None => self.head = link.next,
        }
        match link.next {
            Some(next) => index.get_mut(next).link.prev = link.prev,
            None => self.tail = link.prev,
        }
        index.get_mut(key).link = Link::default();
        self.len -= 1;
        true
    }

    pub(crate) fn pop_front(&mut self, index: &mut WatchIndex) -> Option<EntryKey> {
        let head = self.head?;
        self.unlink(index, head);
        Some(head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::sys::entry::WatchEntry;
    use crate::driver::Handle;
    use crate::event::{Event, Ready, Token};

    fn index_with(fds: &[i32]) -> (WatchIndex, Vec<EntryKey>) {
        let mut index = WatchIndex::new();
        let keys = fds
            .iter()
            .map(|&fd| {
                let event = Event::new(Ready::readable(), Token(fd as u64));
                index
                    .insert(WatchEntry::new(fd, Handle::from_raw(0), event))
                    .unwrap()
            })
            .collect();
        (index, keys)
    }

    fn drain(queue: &mut ReadyQueue, index: &mut WatchIndex) -> Vec<i32> {
        let mut out = Vec::new();
        while let Some(key) = queue.pop_front(index) {
            assert!(!queue.is_linked(index, key));
            out.push(index.get(key).fd());
        }
        out
    }

    #[test]
    fn fifo_order() {
        let (mut index, keys) = index_with(&[30, 10, 20]);
        let mut queue = ReadyQueue::new();

        assert!(queue.link(&mut index, keys[2]));
        assert!(queue.link(&mut index, keys[0]));
        assert!(queue.link(&mut index, keys[1]));
        assert_eq!(queue.len(), 3);

        assert_eq!(drain(&mut queue, &mut index), vec![20, 30, 10]);
        assert!(queue.is_empty());
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn link_twice_is_noop() {
        let (mut index, keys) = index_with(&[1, 2]);
        let mut queue = ReadyQueue::new();

        assert!(queue.link(&mut index, keys[0]));
        assert!(queue.link(&mut index, keys[1]));
        assert!(!queue.link(&mut index, keys[0]));
        assert_eq!(queue.len(), 2);
        assert_eq!(drain(&mut queue, &mut index), vec![1, 2]);
    }

    #[test]
    fn unlink_from_middle_and_ends() {
        let (mut index, keys) = index_with(&[1, 2, 3, 4]);
        let mut queue = ReadyQueue::new();
        for &key in &keys {
            queue.link(&mut index, key);
        }

        assert!(queue.unlink(&mut index, keys[1]));
        assert!(!queue.unlink(&mut index, keys[1]));
        assert!(queue.unlink(&mut index, keys[0]));
        assert!(queue.unlink(&mut index, keys[3]));
        assert_eq!(queue.len(), 1);

        // relinking puts it back at the tail
        assert!(queue.link(&mut index, keys[0]));
        assert_eq!(drain(&mut queue, &mut index), vec![3, 1]);
    }
}
