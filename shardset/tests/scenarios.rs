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

use std::{
    thread,
    time::{Duration, Instant},
};

use shardset::{Cache, CacheBuilder, ExpirationConfig, LruConfig, ModHasher, MruConfig};

fn cache(shards: usize, capacity_per_shard: usize) -> Cache<i32, String, ModHasher> {
    CacheBuilder::new()
        .with_shards(shards)
        .with_capacity_per_shard(capacity_per_shard)
        .with_hash_builder(ModHasher::default())
        .build()
        .unwrap()
}

fn wait_until(timeout: Duration, f: impl Fn() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if f() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    f()
}

#[test]
fn test_manual_eviction() {
    let cache = cache(2, 5);
    for i in 1..=10 {
        assert!(cache.add(i, i.to_string()));
    }
    assert_eq!(cache.shard(0).unwrap().count(), 5);
    assert_eq!(cache.shard(1).unwrap().count(), 5);

    assert_eq!(cache.evict(&1).as_deref(), Some("1"));
    assert_eq!(cache.shard(1).unwrap().count(), 4);
    assert_eq!(cache.shard(0).unwrap().count(), 5);

    assert_eq!(cache.evict(&2).as_deref(), Some("2"));
    assert_eq!(cache.shard(0).unwrap().count(), 4);

    assert_eq!(cache.evict(&2), None);
    assert_eq!(cache.len(), 8);
}

#[test]
fn test_no_policy_grows_unbounded() {
    let cache = cache(1, 5);
    for i in 0..100 {
        cache.add(i, i.to_string());
    }
    assert_eq!(cache.len(), 100);
}

#[test]
fn test_policy_attached_to_bulk_load_drains_on_next_add() {
    let cache = cache(1, 5);
    for i in 0..100 {
        cache.add(i, i.to_string());
    }

    cache.set_eviction_policy(LruConfig::default()).unwrap();
    assert_eq!(cache.len(), 100);

    cache.add(100, "100".to_string());
    assert_eq!(cache.len(), 5);
    assert!(cache.contains(&100));
}

#[test]
fn test_lru_basic() {
    let cache = cache(1, 5);
    cache.set_eviction_policy(LruConfig::default()).unwrap();

    for i in 1..=6 {
        cache.add(i, i.to_string());
    }
    assert_eq!(cache.len(), 5);
    assert!(!cache.contains(&1));
    assert!((2..=6).all(|i| cache.contains(&i)));
}

#[test]
fn test_lru_advanced() {
    let cache = cache(1, 5);
    cache.set_eviction_policy(LruConfig::default()).unwrap();

    for i in 1..=5 {
        cache.add(i, i.to_string());
    }
    assert_eq!(cache.get(&1).as_deref(), Some("1"));
    cache.add(6, "6".to_string());

    assert_eq!(cache.len(), 5);
    assert!(cache.contains(&1));
    assert!(!cache.contains(&2));
}

#[test]
fn test_lru_duplicate_add_is_not_an_access() {
    let cache = cache(1, 3);
    cache.set_eviction_policy(LruConfig::default()).unwrap();

    for i in 1..=3 {
        cache.add(i, i.to_string());
    }
    assert!(!cache.add(1, "one".to_string()));
    cache.add(4, "4".to_string());

    assert!(!cache.contains(&1));
    assert_eq!(cache.get(&2).as_deref(), Some("2"));
}

#[test]
fn test_mru_basic() {
    let cache = cache(1, 5);
    cache.set_eviction_policy(MruConfig::default()).unwrap();

    for i in 1..=5 {
        cache.add(i, i.to_string());
    }
    cache.get(&2);

    // The key just added is the most recent one when the capacity is exceeded.
    cache.add(6, "6".to_string());
    assert_eq!(cache.len(), 5);
    assert!(!cache.contains(&6));
    assert!((1..=5).all(|i| cache.contains(&i)));

    // Evicting a key makes room without consulting the policy.
    cache.evict(&2);
    cache.add(7, "7".to_string());
    assert_eq!(cache.len(), 5);
    assert!(cache.contains(&7));
}

#[test]
fn test_expiration() {
    let cache = cache(2, 5);
    cache
        .set_eviction_policy(
            ExpirationConfig::new(Duration::from_millis(100)).with_sweep_interval(Duration::from_millis(20)),
        )
        .unwrap();

    for i in 1..=6 {
        cache.add(i, i.to_string());
    }
    assert_eq!(cache.len(), 6);

    assert!(wait_until(Duration::from_secs(10), || cache.is_empty()));

    cache.add(7, "7".to_string());
    cache.add(8, "8".to_string());
    assert_eq!(cache.shard(0).unwrap().count(), 1);
    assert_eq!(cache.shard(1).unwrap().count(), 1);
}

#[test]
fn test_expiration_refresh_on_get() {
    let cache = cache(1, 5);
    cache
        .set_eviction_policy(
            ExpirationConfig::new(Duration::from_millis(300)).with_sweep_interval(Duration::from_millis(20)),
        )
        .unwrap();

    cache.add(1, "1".to_string());
    cache.add(2, "2".to_string());

    // Keep key 1 warm for longer than its ttl.
    let start = Instant::now();
    while start.elapsed() < Duration::from_millis(600) {
        assert_eq!(cache.get(&1).as_deref(), Some("1"));
        thread::sleep(Duration::from_millis(50));
    }

    assert!(cache.contains(&1));
    assert!(!cache.contains(&2));
}

#[test]
fn test_switch_policy() {
    let cache = cache(1, 3);
    cache.set_eviction_policy(MruConfig::default()).unwrap();
    for i in 1..=3 {
        cache.add(i, i.to_string());
    }

    // The new policy starts from the entries in place, in no particular order.
    cache.set_eviction_policy(LruConfig::default()).unwrap();
    cache.add(4, "4".to_string());
    assert_eq!(cache.len(), 3);
    assert!(cache.contains(&4));
    assert_eq!((1..=3).filter(|i| cache.contains(i)).count(), 2);

    cache.add(5, "5".to_string());
    assert!(cache.contains(&4));
    assert!(cache.contains(&5));
}
