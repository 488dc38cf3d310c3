//! Ordered watch index.
//!
//! An AVL tree keyed by descriptor whose nodes live in a `Slab`. Links are
//! slab keys rather than pointers, and a node never changes slot while it is
//! in the tree: deleting an inner node splices its in-order successor into
//! its place instead of swapping payloads, so keys held by the ready queue
//! stay valid across rebalancing.

use std::cmp::{self, Ordering};

use slab::Slab;

use super::entry::{EntryKey, WatchEntry};
use crate::event::Descriptor;

#[derive(Debug)]
struct Node {
    entry: WatchEntry,
    left: Option<EntryKey>,
    right: Option<EntryKey>,
    height: u8,
}

#[derive(Debug)]
pub(crate) struct WatchIndex {
    nodes: Slab<Node>,
    root: Option<EntryKey>,
    // Cached minimum.
    leftmost: Option<EntryKey>,
}

impl WatchIndex {
    pub(crate) fn new() -> WatchIndex {
        WatchIndex {
            nodes: Slab::new(),
            root: None,
            leftmost: None,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn get(&self, key: EntryKey) -> &WatchEntry {
        &self.nodes[key].entry
    }

    pub(crate) fn get_mut(&mut self, key: EntryKey) -> &mut WatchEntry {
        &mut self.nodes[key].entry
    }

    /// Entry with the smallest descriptor.
    pub(crate) fn first(&self) -> Option<EntryKey> {
        self.leftmost
    }

    pub(crate) fn find(&self, fd: Descriptor) -> Option<EntryKey> {
        let mut cur = self.root;
        while let Some(key) = cur {
            let node = &self.nodes[key];
            cur = match fd.cmp(&node.entry.fd()) {
                Ordering::Less => node.left,
                Ordering::Greater => node.right,
                Ordering::Equal => return Some(key),
            };
        }
        None
    }

    /// Inserts `entry`, handing it back if its descriptor is already present.
    pub(crate) fn insert(&mut self, entry: WatchEntry) -> Result<EntryKey, WatchEntry> {
        let fd = entry.fd();
        if self.find(fd).is_some() {
            return Err(entry);
        }

        let key = self.nodes.insert(Node {
            entry,
            left: None,
            right: None,
            height: 1,
        });
        self.root = Some(self.insert_at(self.root, key, fd));

        if self.leftmost.map_or(true, |min| fd < self.fd(min)) {
            self.leftmost = Some(key);
        }
        Ok(key)
    }

    /// Removes the entry stored under `key` and returns it.
    ///
    /// `key` must belong to this index.
    pub(crate) fn remove(&mut self, key: EntryKey) -> WatchEntry {
        let fd = self.fd(key);
        self.root = self.remove_at(self.root, fd);

        if self.leftmost == Some(key) {
            // The successor of the old minimum is the new minimum.
            self.leftmost = self.root.map(|root| self.min_from(root));
        }
        self.nodes.remove(key).entry
    }

    /// Watched descriptors in ascending order.
    pub(crate) fn descriptors(&self) -> Vec<Descriptor> {
        if self.is_empty() {
            return Vec::new();
        }
        let mut out = Vec::with_capacity(self.len());
        let mut stack = Vec::new();
        let mut cur = self.root;
        loop {
            while let Some(key) = cur {
                stack.push(key);
                cur = self.nodes[key].left;
            }
            match stack.pop() {
                Some(key) => {
                    out.push(self.fd(key));
                    cur = self.nodes[key].right;
                }
                None => return out,
            }
        }
    }

    fn fd(&self, key: EntryKey) -> Descriptor {
        self.nodes[key].entry.fd()
    }

    fn insert_at(&mut self, at: Option<EntryKey>, key: EntryKey, fd: Descriptor) -> EntryKey {
        let at = match at {
            Some(at) => at,
            None => return key,
        };
        if fd < self.fd(at) {
            let left = self.insert_at(self.nodes[at].left, key, fd);
            self.nodes[at].left = Some(left);
        } else {
            let right = self.insert_at(self.nodes[at].right, key, fd);
            self.nodes[at].right = Some(right);
        }
        self.rebalance(at)
    }

    fn remove_at(&mut self, at: Option<EntryKey>, fd: Descriptor) -> Option<EntryKey> {
        let at = at?;
        match fd.cmp(&self.fd(at)) {
            Ordering::Less => {
                let left = self.remove_at(self.nodes[at].left, fd);
                self.nodes[at].left = left;
                Some(self.rebalance(at))
            }
            Ordering::Greater => {
                let right = self.remove_at(self.nodes[at].right, fd);
                self.nodes[at].right = right;
                Some(self.rebalance(at))
            }
            Ordering::Equal => match (self.nodes[at].left, self.nodes[at].right) {
                (None, None) => None,
                (Some(child), None) | (None, Some(child)) => Some(child),
                (Some(left), Some(right)) => {
                    let (rest, succ) = self.take_min(right);
                    let node = &mut self.nodes[succ];
                    node.left = Some(left);
                    node.right = rest;
                    Some(self.rebalance(succ))
                }
            },
        }
    }

    /// Detaches the minimum of the subtree at `at`. Returns the new subtree
    /// root and the detached node.
    fn take_min(&mut self, at: EntryKey) -> (Option<EntryKey>, EntryKey) {
        match self.nodes[at].left {
            None => (self.nodes[at].right, at),
            Some(left) => {
                let (rest, min) = self.take_min(left);
                self.nodes[at].left = rest;
                (Some(self.rebalance(at)), min)
            }
        }
    }

    fn min_from(&self, mut at: EntryKey) -> EntryKey {
        while let Some(left) = self.nodes[at].left {
            at = left;
        }
        at
    }

    fn height(&self, key: Option<EntryKey>) -> u8 {
        key.map_or(0, |key| self.nodes[key].height)
    }

    fn balance(&self, key: EntryKey) -> i32 {
        let node = &self.nodes[key];
        i32::from(self.height(node.left)) - i32::from(self.height(node.right))
    }

    fn update_height(&mut self, key: EntryKey) {
        let node = &self.nodes[key];
        let height = 1 + cmp::max(self.height(node.left), self.height(node.right));
        self.nodes[key].height = height;
    }

    fn rebalance(&mut self, at: EntryKey) -> EntryKey {
        self.update_height(at);
        let balance = self.balance(at);

        if balance > 1 {
            if let Some(left) = self.nodes[at].left {
                if self.balance(left) < 0 {
                    let left = self.rotate_left(left);
                    self.nodes[at].left = Some(left);
                }
            }
            return self.rotate_right(at);
        }
        if balance < -1 {
            if let Some(right) = self.nodes[at].right {
                if self.balance(right) > 0 {
                    let right = self.rotate_right(right);
                    self.nodes[at].right = Some(right);
                }
            }
            return self.rotate_left(at);
        }
        at
    }

    fn rotate_right(&mut self, at: EntryKey) -> EntryKey {
        let pivot = match self.nodes[at].left {
            Some(pivot) => pivot,
            None => return at,
        };
        self.nodes[at].left = self.nodes[pivot].right;
        self.nodes[pivot].right = Some(at);
        self.update_height(at);
        self.update_height(pivot);
        pivot
    }

    fn rotate_left(&mut self, at: EntryKey) -> EntryKey {
        let pivot = match self.nodes[at].right {
            Some(pivot) => pivot,
            None => return at,
        };
        self.nodes[at].right = self.nodes[pivot].left;
        self.nodes[pivot].left = Some(at);
        self.update_height(at);
        self.update_height(pivot);
        pivot
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::driver::Handle;
    use crate::event::{Event, Ready, Token};

    fn entry(fd: Descriptor) -> WatchEntry {
        let event = Event::new(Ready::readable(), Token(fd as u64));
        WatchEntry::new(fd, Handle::from_raw(0), event)
    }

    // Returns the subtree height, panicking on any ordering or balance violation.
    fn check_subtree(
        index: &WatchIndex,
        at: Option<EntryKey>,
        lo: Option<Descriptor>,
        hi: Option<Descriptor>,
    ) -> u8 {
        let key = match at {
            Some(key) => key,
            None => return 0,
        };
        let node = &index.nodes[key];
        let fd = node.entry.fd();
        assert!(lo.map_or(true, |lo| fd > lo), "{} not above {:?}", fd, lo);
        assert!(hi.map_or(true, |hi| fd < hi), "{} not below {:?}", fd, hi);

        let l = check_subtree(index, node.left, lo, Some(fd));
        let r = check_subtree(index, node.right, Some(fd), hi);
        assert!((i32::from(l) - i32::from(r)).abs() <= 1, "unbalanced at {}", fd);
        assert_eq!(node.height, 1 + l.max(r));
        node.height
    }

    fn check(index: &WatchIndex, expected: &BTreeSet<Descriptor>) {
        check_subtree(index, index.root, None, None);
        let got: Vec<_> = index.descriptors();
        let want: Vec<_> = expected.iter().copied().collect();
        assert_eq!(got, want);
        assert_eq!(index.len(), expected.len());
        assert_eq!(index.first().map(|k| index.get(k).fd()), expected.iter().next().copied());
    }

    #[test]
    fn insert_find_remove() {
        let mut index = WatchIndex::new();
        let mut keys = Vec::new();
        for fd in &[5, 3, 8, 1, 4, 7, 9] {
            keys.push(index.insert(entry(*fd)).unwrap());
        }

        assert_eq!(index.descriptors(), vec![1, 3, 4, 5, 7, 8, 9]);
        assert_eq!(index.get(index.find(7).unwrap()).token(), Token(7));
        assert!(index.find(6).is_none());

        let removed = index.remove(keys[0]);
        assert_eq!(removed.fd(), 5);
        assert!(index.find(5).is_none());
        assert_eq!(index.descriptors(), vec![1, 3, 4, 7, 8, 9]);

        // keys survive the splice of the removed root's successor
        assert_eq!(index.get(keys[5]).fd(), 7);
    }

    #[test]
    fn duplicate_is_rejected() {
        let mut index = WatchIndex::new();
        index.insert(entry(10)).unwrap();
        let back = index.insert(entry(10)).unwrap_err();
        assert_eq!(back.fd(), 10);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn leftmost_follows_successor() {
        let mut index = WatchIndex::new();
        let k2 = index.insert(entry(2)).unwrap();
        let k1 = index.insert(entry(1)).unwrap();
        index.insert(entry(3)).unwrap();
        assert_eq!(index.first(), Some(k1));

        index.remove(k1);
        assert_eq!(index.first(), Some(k2));

        index.remove(k2);
        assert_eq!(index.get(index.first().unwrap()).fd(), 3);

        let k3 = index.find(3).unwrap();
        index.remove(k3);
        assert_eq!(index.first(), None);
        assert!(index.is_empty());
    }

    #[test]
    fn sequential_inserts_stay_balanced() {
        let mut index = WatchIndex::new();
        let mut expected = BTreeSet::new();
        for fd in 0..1024 {
            index.insert(entry(fd)).unwrap();
            expected.insert(fd);
        }
        check(&index, &expected);
        // AVL bound for 1024 nodes
        assert!(index.nodes[index.root.unwrap()].height <= 14);
    }

    #[test]
    fn randomized_against_btreeset() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut index = WatchIndex::new();
        let mut expected = BTreeSet::new();

        for _ in 0..4000 {
            let fd = rng.gen_range(-64, 192);
            if rng.gen_bool(0.55) {
                let inserted = index.insert(entry(fd)).is_ok();
                assert_eq!(inserted, expected.insert(fd));
            } else {
                match index.find(fd) {
                    Some(key) => {
                        assert_eq!(index.remove(key).fd(), fd);
                        assert!(expected.remove(&fd));
                    }
                    None => assert!(!expected.contains(&fd)),
                }
            }
            assert_eq!(
                index.first().map(|k| index.get(k).fd()),
                expected.iter().next().copied()
            );
        }
        check(&index, &expected);
    }
}
