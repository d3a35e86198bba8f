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

use std::{thread, time::Duration};

use shardset::{Cache, ExpirationConfig};

/// Output:
///
/// ```plain
/// before expiration: Some("bar")
/// after expiration: None
/// ```
fn main() {
    tracing_subscriber::fmt().with_env_filter("shardset=debug").init();

    let cache: Cache<&'static str, &'static str> = Cache::builder()
        .with_shards(2)
        .with_capacity_per_shard(1024)
        .with_eviction_config(
            ExpirationConfig::new(Duration::from_millis(200)).with_sweep_interval(Duration::from_millis(50)),
        )
        .build()
        .unwrap();

    cache.add("foo", "bar");
    println!("before expiration: {:?}", cache.get("foo"));

    thread::sleep(Duration::from_millis(500));
    println!("after expiration: {:?}", cache.get("foo"));
}
