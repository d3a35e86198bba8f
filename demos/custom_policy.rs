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

use std::sync::atomic::{AtomicU64, Ordering};

use shardset::{
    Action, Cache, EvictionConfig, EvictionPolicy, Key, PolicyContext, RecencyPolicy, Result, Value, VictimEnd,
};

/// Evicts like LRU and counts the accesses it sees.
struct CountingLru<K> {
    lru: RecencyPolicy<K>,
    accesses: AtomicU64,
}

impl<K, V> EvictionPolicy<K, V> for CountingLru<K>
where
    K: Key,
    V: Value,
{
    fn notify(&self, action: Action, key: &K, value: &V) {
        if action != Action::Evicted {
            self.accesses.fetch_add(1, Ordering::Relaxed);
        }
        self.lru.notify(action, key, value);
    }

    fn next_victim(&self) -> Option<K> {
        let victim = EvictionPolicy::<K, V>::next_victim(&self.lru);
        println!(
            "victim: {victim:?} after {} accesses",
            self.accesses.load(Ordering::Relaxed)
        );
        victim
    }
}

fn counting_lru(context: &PolicyContext<u64>) -> Result<Box<dyn EvictionPolicy<u64, u64>>> {
    println!("attach policy to shard {}", context.shard());
    Ok(Box::new(CountingLru {
        lru: RecencyPolicy::new(VictimEnd::Tail),
        accesses: AtomicU64::new(0),
    }))
}

fn main() {
    let cache: Cache<u64, u64> = Cache::builder()
        .with_capacity_per_shard(3)
        .with_eviction_config(EvictionConfig::custom(counting_lru))
        .build()
        .unwrap();

    for i in 0..5 {
        cache.add(i, i * i);
        cache.get(&0);
    }
    assert!(cache.contains(&0));
    assert_eq!(cache.len(), 3);
}
