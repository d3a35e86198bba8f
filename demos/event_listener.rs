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

use std::sync::Arc;

use shardset::{Cache, Event, EventListener, MruConfig};

struct EchoEventListener;

impl EventListener for EchoEventListener {
    type Key = u64;
    type Value = String;

    fn on_leave(&self, reason: Event, key: &Self::Key, value: &Self::Value)
    where
        Self::Key: shardset::Key,
        Self::Value: shardset::Value,
    {
        println!("Entry [key = {key}] [value = {value}] left for {reason:?}.")
    }
}

/// Output:
///
/// ```plain
/// Entry [key = 3] [value = Third] left for Evict.
/// Entry [key = 1] [value = First] left for Remove.
/// ```
fn main() {
    let cache: Cache<u64, String> = Cache::builder()
        .with_capacity_per_shard(2)
        .with_eviction_config(MruConfig::default())
        .with_event_listener(Arc::new(EchoEventListener))
        .build()
        .unwrap();

    cache.add(1, "First".to_string());
    cache.add(2, "Second".to_string());
    cache.add(3, "Third".to_string());
    cache.evict(&1);
}
