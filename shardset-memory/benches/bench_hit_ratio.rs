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

//! micro benchmark for shardset in-memory cache hit ratio
//!
//! cargo bench --bench bench_hit_ratio

use std::sync::Arc;

use rand::{rngs::SmallRng, Rng, SeedableRng};
use rand_distr::Zipf;
use shardset_memory::{Cache, EvictionConfig, LruConfig, MruConfig};

type CacheKey = u64;
type CacheValue = ();

const ITEMS: usize = 10_000;
const ITERATIONS: usize = 2_000_000;

fn cache_hit(cache: Cache<CacheKey, CacheValue>, keys: Arc<Vec<CacheKey>>) -> f64 {
    let mut hit = 0;
    for key in keys.iter() {
        if cache.get(key).is_some() {
            hit += 1;
        } else {
            cache.add(*key, ());
        }
    }
    hit as f64 / keys.len() as f64
}

fn new_cache(
    shards: usize,
    capacity: usize,
    config: EvictionConfig<CacheKey, CacheValue>,
) -> Cache<CacheKey, CacheValue> {
    Cache::builder()
        .with_shards(shards)
        .with_capacity_per_shard((capacity / shards).max(1))
        .with_eviction_config(config)
        .build()
        .unwrap()
}

fn bench_workload(keys: Vec<CacheKey>, cache_size: usize) {
    let keys = Arc::new(keys);

    let handles = [
        new_cache(1, cache_size, LruConfig::default().into()),
        new_cache(8, cache_size, LruConfig::default().into()),
        new_cache(1, cache_size, MruConfig::default().into()),
        new_cache(8, cache_size, MruConfig::default().into()),
    ]
    .into_iter()
    .map(|cache| {
        let keys = keys.clone();
        std::thread::spawn(move || cache_hit(cache, keys))
    })
    .collect::<Vec<_>>();

    for handle in handles {
        print!("{:15.2}%", handle.join().unwrap() * 100.0);
    }
    println!();
}

fn bench_one(zif_exp: f64, cache_size_percent: f64) {
    print!("{zif_exp:6.2}, {cache_size_percent:6}{:6}", "");
    let cache_size = (ITEMS as f64 * cache_size_percent) as usize;
    let zipf = Zipf::new(ITEMS as f64, zif_exp).unwrap();
    let mut rng = SmallRng::seed_from_u64(42);
    let keys = (0..ITERATIONS).map(|_| rng.sample(zipf) as CacheKey).collect();
    bench_workload(keys, cache_size);
}

fn bench_zipf_hit() {
    println!(
        "{:30}{:16}{:16}{:16}{:16}",
        "zif_exp, cache_size", "lru (1s)", "lru (8s)", "mru (1s)", "mru (8s)"
    );
    for zif_exp in [0.9, 1.0, 1.05, 1.1, 1.5] {
        for cache_capacity in [0.005, 0.01, 0.05, 0.1, 0.25] {
            bench_one(zif_exp, cache_capacity);
        }
    }
}

fn main() {
    bench_zipf_hit();
}
