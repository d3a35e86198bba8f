// Copyright 2026 shardset Project Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::{fmt::Debug, hash::Hash};

use hashbrown::HashMap;
use shardset_common::strict_assert;

#[derive(Debug)]
struct Slot<K> {
    key: Option<K>,
    prev: Option<usize>,
    next: Option<usize>,
}

/// A doubly linked list of keys ordered from the most recently touched (head) to the least recently touched
/// (tail).
///
/// Nodes live in a slot arena and are linked by index, an index map locates the slot of a key. Freed slots are
/// reused. Every operation is O(1) except [`RecencyList::iter`] and [`RecencyList::clear`].
///
/// Each key occurs at most once.
pub struct RecencyList<K> {
    slots: Vec<Slot<K>>,
    free: Vec<usize>,
    index: HashMap<K, usize>,

    head: Option<usize>,
    tail: Option<usize>,
}

impl<K> Debug for RecencyList<K>
where
    K: Debug + Hash + Eq + Clone,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<K> Default for RecencyList<K>
where
    K: Hash + Eq + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> RecencyList<K> {
    /// Count of tracked keys.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns `true` if no key is tracked.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

impl<K> RecencyList<K>
where
    K: Hash + Eq + Clone,
{
    /// Create an empty list.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create an empty list with room for `capacity` keys before reallocating.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            index: HashMap::with_capacity(capacity),
            head: None,
            tail: None,
        }
    }

    /// Returns `true` if `key` is tracked.
    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Move `key` to the head, inserting it if it is not tracked yet.
    pub fn touch(&mut self, key: &K) {
        if let Some(&slot) = self.index.get(key) {
            if self.head != Some(slot) {
                self.unlink(slot);
                self.link_front(slot);
            }
            return;
        }

        let slot = match self.free.pop() {
            Some(slot) => {
                strict_assert!(self.slots[slot].key.is_none());
                self.slots[slot].key = Some(key.clone());
                slot
            }
            None => {
                self.slots.push(Slot {
                    key: Some(key.clone()),
                    prev: None,
                    next: None,
                });
                self.slots.len() - 1
            }
        };
        self.index.insert(key.clone(), slot);
        self.link_front(slot);
    }

    /// Untrack `key`.
    ///
    /// Returns `false` if the key is not tracked.
    pub fn remove(&mut self, key: &K) -> bool {
        let Some(slot) = self.index.remove(key) else {
            return false;
        };
        self.unlink(slot);
        self.slots[slot].key = None;
        self.free.push(slot);
        true
    }

    /// The most recently touched key.
    pub fn head(&self) -> Option<&K> {
        self.head.and_then(|slot| self.slots[slot].key.as_ref())
    }

    /// The least recently touched key.
    pub fn tail(&self) -> Option<&K> {
        self.tail.and_then(|slot| self.slots[slot].key.as_ref())
    }

    /// Iterate the keys from head to tail.
    pub fn iter(&self) -> impl Iterator<Item = &K> + '_ {
        let mut cursor = self.head;
        std::iter::from_fn(move || {
            let slot = &self.slots[cursor?];
            cursor = slot.next;
            slot.key.as_ref()
        })
    }

    /// Untrack all keys and release the arena.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.index.clear();
        self.head = None;
        self.tail = None;
    }

    fn unlink(&mut self, slot: usize) {
        let (prev, next) = (self.slots[slot].prev.take(), self.slots[slot].next.take());

        match prev {
            Some(prev) => self.slots[prev].next = next,
            None => {
                strict_assert!(self.head == Some(slot));
                self.head = next;
            }
        }
        match next {
            Some(next) => self.slots[next].prev = prev,
            None => {
                strict_assert!(self.tail == Some(slot));
                self.tail = prev;
            }
        }
    }

    fn link_front(&mut self, slot: usize) {
        strict_assert!(self.slots[slot].prev.is_none());
        strict_assert!(self.slots[slot].next.is_none());

        self.slots[slot].next = self.head;
        match self.head {
            Some(head) => self.slots[head].prev = Some(slot),
            None => self.tail = Some(slot),
        }
        self.head = Some(slot);
    }
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;

    use super::*;

    fn dump(list: &RecencyList<u64>) -> Vec<u64> {
        list.iter().copied().collect_vec()
    }

    #[test]
    fn test_recency_list_touch() {
        let mut list = RecencyList::new();
        assert!(list.is_empty());
        assert_eq!(list.head(), None);
        assert_eq!(list.tail(), None);

        for i in 0..4 {
            list.touch(&i);
        }
        assert_eq!(dump(&list), vec![3, 2, 1, 0]);
        assert_eq!(list.head(), Some(&3));
        assert_eq!(list.tail(), Some(&0));

        // Touch tail, middle and head.
        list.touch(&0);
        assert_eq!(dump(&list), vec![0, 3, 2, 1]);
        list.touch(&2);
        assert_eq!(dump(&list), vec![2, 0, 3, 1]);
        list.touch(&2);
        assert_eq!(dump(&list), vec![2, 0, 3, 1]);

        assert_eq!(list.len(), 4);
    }

    #[test]
    fn test_recency_list_remove() {
        let mut list = RecencyList::with_capacity(8);
        for i in 0..5 {
            list.touch(&i);
        }

        assert!(list.remove(&4));
        assert_eq!(dump(&list), vec![3, 2, 1, 0]);
        assert!(list.remove(&0));
        assert_eq!(dump(&list), vec![3, 2, 1]);
        assert!(list.remove(&2));
        assert_eq!(dump(&list), vec![3, 1]);

        // Idempotent.
        assert!(!list.remove(&2));
        assert!(!list.remove(&42));
        assert_eq!(list.len(), 2);
        assert!(!list.contains(&2));

        list.remove(&3);
        list.remove(&1);
        assert!(list.is_empty());
        assert_eq!(list.head(), None);
        assert_eq!(list.tail(), None);
    }

    #[test]
    fn test_recency_list_reuse_slots() {
        let mut list = RecencyList::new();
        for i in 0..4 {
            list.touch(&i);
        }
        list.remove(&1);
        list.remove(&2);
        list.touch(&10);
        list.touch(&11);
        list.touch(&12);

        assert_eq!(list.slots.len(), 5);
        assert_eq!(dump(&list), vec![12, 11, 10, 3, 0]);

        list.clear();
        assert!(list.is_empty());
        assert_eq!(dump(&list), Vec::<u64>::new());
        list.touch(&7);
        assert_eq!(dump(&list), vec![7]);
        assert_eq!(list.tail(), Some(&7));
    }

    #[test]
    fn test_recency_list_debug() {
        let mut list = RecencyList::new();
        list.touch(&1u64);
        list.touch(&2u64);
        assert_eq!(format!("{list:?}"), "[2, 1]");
    }
}
