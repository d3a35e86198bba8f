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

use shardset::{Cache, LruConfig};

fn main() {
    let cache: Cache<String, String> = Cache::builder()
        .with_shards(4)
        .with_capacity_per_shard(16)
        .with_eviction_config(LruConfig::default())
        .build()
        .unwrap();

    assert!(cache.add("hello".to_string(), "world".to_string()));
    assert!(!cache.add("hello".to_string(), "again".to_string()));

    let value = cache.get("hello").unwrap();
    assert_eq!(value, "world");

    assert_eq!(cache.evict("hello").as_deref(), Some("world"));
    assert!(cache.is_empty());
}
