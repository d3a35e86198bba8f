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

//! This crate provides a sharded in-memory cache with pluggable eviction policies.
//!
//! A [`Cache`] routes every key to one of a fixed number of shards by hash. Each [`Shard`] owns its entries,
//! enforces its capacity and asks its [`EvictionPolicy`] which entry to sacrifice. The built-in policies are LRU,
//! MRU and time-based expiration, custom ones are plugged in through [`EvictionConfig::custom`].
//!
//! ```
//! use shardset_memory::{Cache, LruConfig};
//!
//! let cache: Cache<u64, String> = Cache::builder()
//!     .with_shards(4)
//!     .with_capacity_per_shard(1024)
//!     .with_eviction_config(LruConfig::default())
//!     .build()
//!     .unwrap();
//!
//! assert!(cache.add(42, "answer".to_string()));
//! assert_eq!(cache.get(&42).as_deref(), Some("answer"));
//! assert_eq!(cache.evict(&42).as_deref(), Some("answer"));
//! ```

mod cache;
mod eviction;
mod prelude;
mod shard;

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;

pub use prelude::*;
