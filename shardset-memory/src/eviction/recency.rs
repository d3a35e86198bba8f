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

use std::fmt::Debug;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use shardset_common::code::{Key, Value};

use super::{list::RecencyList, Action, EvictionPolicy};

/// Lru eviction algorithm config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LruConfig {}

/// Mru eviction algorithm config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MruConfig {}

/// The end of the recency list the victim is taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VictimEnd {
    /// The most recently used key.
    Head,
    /// The least recently used key.
    Tail,
}

/// Eviction policy backed by a recency list.
///
/// Every insertion or read moves the key to the head of the list. The victim is the tail for LRU and the head for
/// MRU.
pub struct RecencyPolicy<K> {
    list: Mutex<RecencyList<K>>,
    end: VictimEnd,
}

impl<K> Debug for RecencyPolicy<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecencyPolicy")
            .field("end", &self.end)
            .field("len", &self.list.lock().len())
            .finish()
    }
}

/// Least recently used eviction policy.
pub type LruPolicy<K> = RecencyPolicy<K>;

/// Most recently used eviction policy.
pub type MruPolicy<K> = RecencyPolicy<K>;

impl<K> RecencyPolicy<K>
where
    K: Key,
{
    /// Create a recency policy that evicts from `end`.
    pub fn new(end: VictimEnd) -> Self {
        Self {
            list: Mutex::new(RecencyList::new()),
            end,
        }
    }

    /// Create a least recently used policy.
    pub fn lru() -> Self {
        Self::new(VictimEnd::Tail)
    }

    /// Create a most recently used policy.
    pub fn mru() -> Self {
        Self::new(VictimEnd::Head)
    }

    /// The end of the list the victim is taken from.
    pub fn end(&self) -> VictimEnd {
        self.end
    }

    /// Count of tracked keys.
    pub fn len(&self) -> usize {
        self.list.lock().len()
    }

    /// Returns `true` if no key is tracked.
    pub fn is_empty(&self) -> bool {
        self.list.lock().is_empty()
    }

    /// Snapshot of the tracked keys, most recently used first.
    pub fn keys(&self) -> Vec<K> {
        self.list.lock().iter().cloned().collect()
    }
}

impl<K, V> EvictionPolicy<K, V> for RecencyPolicy<K>
where
    K: Key,
    V: Value,
{
    fn notify(&self, action: Action, key: &K, _: &V) {
        let mut list = self.list.lock();
        match action {
            Action::Added | Action::Get => list.touch(key),
            Action::Evicted => {
                list.remove(key);
            }
        }
    }

    fn next_victim(&self) -> Option<K> {
        let list = self.list.lock();
        match self.end {
            VictimEnd::Head => list.head().cloned(),
            VictimEnd::Tail => list.tail().cloned(),
        }
    }
}
