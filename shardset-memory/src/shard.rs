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
    fmt::Debug,
    hash::Hash,
    sync::{Arc, OnceLock, Weak},
};

use arc_swap::ArcSwapOption;
use equivalent::Equivalent;
use hashbrown::hash_table::{Entry as HashTableEntry, HashTable};
use parking_lot::RwLock;
use shardset_common::{
    code::{DefaultHasher, HashBuilder, Key, Value},
    error::Result,
    event::{Event, EventListener},
    scope::Scope,
};

use crate::eviction::{
    context::{PolicyContext, RequestSink},
    Action, EvictionConfig, EvictionPolicy,
};

/// Consecutive nominations of absent keys tolerated by one capacity check.
const MAX_STALE_VICTIMS: usize = 8;

struct Entry<K, V> {
    hash: u64,
    key: K,
    value: V,
}

pub(crate) struct ShardInner<K, V, S> {
    index: usize,
    capacity: usize,
    hash_builder: Arc<S>,

    table: RwLock<HashTable<Entry<K, V>>>,
    policy: ArcSwapOption<Box<dyn EvictionPolicy<K, V>>>,

    /// Sender of the asynchronous eviction channel, created with the drainer on first use.
    requests: OnceLock<flume::Sender<K>>,

    event_listener: Option<Arc<dyn EventListener<Key = K, Value = V>>>,
}

impl<K, V, S> ShardInner<K, V, S>
where
    K: Key,
    V: Value,
    S: HashBuilder,
{
    fn notify(&self, action: Action, entry: &Entry<K, V>) {
        if let Some(policy) = &*self.policy.load() {
            policy.notify(action, &entry.key, &entry.value);
        }
    }

    fn on_leave(&self, event: Event, entry: &Entry<K, V>) {
        if let Some(listener) = self.event_listener.as_ref() {
            listener.on_leave(event, &entry.key, &entry.value);
        }
    }

    fn insert(&self, hash: u64, key: K, value: V) -> bool {
        self.table.write().with(|mut table| {
            match table.entry(hash, |e| e.key == key, |e| e.hash) {
                HashTableEntry::Occupied(_) => false,
                HashTableEntry::Vacant(v) => {
                    let o = v.insert(Entry { hash, key, value });
                    self.notify(Action::Added, o.get());
                    true
                }
            }
        })
    }

    fn remove<Q>(&self, hash: u64, key: &Q) -> Option<Entry<K, V>>
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        self.table.write().with(|mut table| {
            match table.entry(hash, |e| key.equivalent(&e.key), |e| e.hash) {
                HashTableEntry::Occupied(o) => {
                    let (entry, _) = o.remove();
                    self.notify(Action::Evicted, &entry);
                    Some(entry)
                }
                HashTableEntry::Vacant(_) => None,
            }
        })
    }

    fn get<Q>(&self, hash: u64, key: &Q) -> Option<V>
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        self.table.read().with(|table| {
            let entry = table.find(hash, |e| key.equivalent(&e.key))?;
            self.notify(Action::Get, entry);
            Some(entry.value.clone())
        })
    }

    fn contains<Q>(&self, hash: u64, key: &Q) -> bool
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        self.table.read().find(hash, |e| key.equivalent(&e.key)).is_some()
    }

    fn count(&self) -> usize {
        self.table.read().len()
    }

    /// Evict the victims nominated by the policy until the shard is back within its capacity.
    ///
    /// Runs after the insertion released the table lock, so concurrent inserts may each evict a victim for the
    /// same excess entry. Stops early if the policy has no victim, or keeps nominating keys that are not present.
    fn enforce_capacity(&self) {
        let mut stale = 0;
        while self.count() > self.capacity {
            let victim = match &*self.policy.load() {
                Some(policy) => policy.next_victim(),
                None => return,
            };
            let Some(victim) = victim else {
                tracing::trace!("[shard]: shard {} is over capacity without a victim", self.index);
                return;
            };

            let hash = self.hash_builder.hash_one(&victim);
            match self.remove(hash, &victim) {
                Some(entry) => {
                    stale = 0;
                    self.on_leave(Event::Evict, &entry);
                }
                None => {
                    // A racing add may have evicted the same victim already.
                    tracing::trace!("[shard]: victim {victim:?} of shard {} is already gone", self.index);
                    stale += 1;
                    if stale >= MAX_STALE_VICTIMS {
                        return;
                    }
                }
            }
        }
    }

    /// Apply an asynchronous eviction request if the current policy still agrees.
    fn serve_request(&self, key: K) {
        let hash = self.hash_builder.hash_one(&key);
        let entry = self.table.write().with(|mut table| {
            let guard = self.policy.load();
            let Some(policy) = &*guard else {
                return None;
            };
            match table.entry(hash, |e| e.key == key, |e| e.hash) {
                HashTableEntry::Occupied(o) if policy.confirm_request(&key) => {
                    let (entry, _) = o.remove();
                    policy.notify(Action::Evicted, &entry.key, &entry.value);
                    Some(entry)
                }
                _ => None,
            }
        });
        if let Some(entry) = entry {
            self.on_leave(Event::Expire, &entry);
        }
    }
}

impl<K, V, S> RequestSink<K> for ShardInner<K, V, S>
where
    K: Key,
    V: Value,
    S: HashBuilder,
{
    fn sender(self: Arc<Self>) -> flume::Sender<K> {
        self.requests
            .get_or_init(|| {
                let (tx, rx) = flume::unbounded();
                let drainer = Drainer {
                    shard: Arc::downgrade(&self),
                    rx,
                };
                if let Err(e) = std::thread::Builder::new()
                    .name(format!("shardset-drainer-{}", self.index))
                    .spawn(move || drainer.run())
                {
                    tracing::error!(
                        "[shard]: spawn eviction request drainer for shard {} failed: {e}",
                        self.index
                    );
                }
                tx
            })
            .clone()
    }
}

/// Applies the asynchronous eviction requests of one shard until the shard is dropped.
struct Drainer<K, V, S> {
    shard: Weak<ShardInner<K, V, S>>,
    rx: flume::Receiver<K>,
}

impl<K, V, S> Drainer<K, V, S>
where
    K: Key,
    V: Value,
    S: HashBuilder,
{
    fn run(self) {
        while let Ok(key) = self.rx.recv() {
            let Some(shard) = self.shard.upgrade() else {
                break;
            };
            std::iter::once(key)
                .chain(self.rx.drain())
                .for_each(|key| shard.serve_request(key));
        }
        tracing::debug!("[shard]: eviction request drainer exits");
    }
}

/// One partition of the cache.
///
/// A shard owns the entries routed to it, enforces its capacity and delegates the choice of the victim to its
/// eviction policy, if any. Without a policy the shard grows unbounded and only shrinks on explicit eviction.
///
/// The shard notifies its policy inside the critical section of the storage mutation that caused the
/// notification, so the per-key order observed by the policy is the order of the mutations.
pub struct Shard<K, V, S = DefaultHasher> {
    inner: Arc<ShardInner<K, V, S>>,
}

impl<K, V, S> Clone for Shard<K, V, S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<K, V, S> Debug for Shard<K, V, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shard")
            .field("index", &self.inner.index)
            .field("capacity", &self.inner.capacity)
            .field("count", &self.inner.table.read().len())
            .finish()
    }
}

impl<K, V> Shard<K, V, DefaultHasher>
where
    K: Key,
    V: Value,
{
    /// Create a standalone shard with no eviction policy.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        Self::open(0, capacity, Arc::default(), None)
    }
}

impl<K, V, S> Shard<K, V, S>
where
    K: Key,
    V: Value,
    S: HashBuilder,
{
    pub(crate) fn open(
        index: usize,
        capacity: usize,
        hash_builder: Arc<S>,
        event_listener: Option<Arc<dyn EventListener<Key = K, Value = V>>>,
    ) -> Self {
        assert!(capacity > 0, "shard capacity must be greater than zero.");

        let inner = ShardInner {
            index,
            capacity,
            hash_builder,
            table: RwLock::new(HashTable::new()),
            policy: ArcSwapOption::empty(),
            requests: OnceLock::new(),
            event_listener,
        };
        Self { inner: Arc::new(inner) }
    }

    /// Insert the entry if the key is absent. Returns `false` and keeps the present value otherwise.
    ///
    /// If the insertion leaves the shard over its capacity, the victims nominated by the policy are evicted before
    /// returning.
    pub fn add(&self, key: K, value: V) -> bool {
        let hash = self.inner.hash_builder.hash_one(&key);
        self.add_with_hash(hash, key, value)
    }

    pub(crate) fn add_with_hash(&self, hash: u64, key: K, value: V) -> bool {
        if !self.inner.insert(hash, key, value) {
            return false;
        }
        self.inner.enforce_capacity();
        true
    }

    /// Get a clone of the value of `key`. A hit counts as an access for the policy.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        let hash = self.inner.hash_builder.hash_one(key);
        self.get_with_hash(hash, key)
    }

    pub(crate) fn get_with_hash<Q>(&self, hash: u64, key: &Q) -> Option<V>
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        self.inner.get(hash, key)
    }

    /// Remove `key` unconditionally and return its value. Evicting an absent key is a no-op.
    pub fn evict<Q>(&self, key: &Q) -> Option<V>
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        let hash = self.inner.hash_builder.hash_one(key);
        self.evict_with_hash(hash, key)
    }

    pub(crate) fn evict_with_hash<Q>(&self, hash: u64, key: &Q) -> Option<V>
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        let entry = self.inner.remove(hash, key)?;
        self.inner.on_leave(Event::Remove, &entry);
        Some(entry.value)
    }

    /// Returns `true` if `key` is present. Not an access for the policy.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        let hash = self.inner.hash_builder.hash_one(key);
        self.contains_with_hash(hash, key)
    }

    pub(crate) fn contains_with_hash<Q>(&self, hash: u64, key: &Q) -> bool
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        self.inner.contains(hash, key)
    }

    /// Attach a fresh policy built from `config`, replacing the current one.
    ///
    /// The new policy is seeded with an `Added` notification for every entry already in the shard, in no particular
    /// order.
    pub fn set_eviction_policy(&self, config: &EvictionConfig<K, V>) -> Result<()> {
        let sink: Arc<dyn RequestSink<K>> = self.inner.clone();
        let context = PolicyContext::new(self.inner.index, self.inner.capacity, sink);
        let policy = config.build(&context)?;

        let old = self.inner.table.write().with(|table| {
            for entry in table.iter() {
                policy.notify(Action::Added, &entry.key, &entry.value);
            }
            self.inner.policy.swap(Some(Arc::new(policy)))
        });
        // Drop the old policy out of the lock critical section, it may join a background thread.
        drop(old);

        tracing::debug!("[shard]: shard {} attached eviction policy {config:?}", self.inner.index);
        Ok(())
    }

    /// Detach the policy. The shard grows unbounded until a policy is attached again.
    pub fn remove_eviction_policy(&self) {
        if self.inner.policy.swap(None).is_some() {
            tracing::debug!("[shard]: shard {} detached eviction policy", self.inner.index);
        }
    }

    /// Returns `true` if an eviction policy is attached.
    pub fn has_eviction_policy(&self) -> bool {
        self.inner.policy.load().is_some()
    }

    /// Count of entries.
    pub fn count(&self) -> usize {
        self.inner.count()
    }

    /// Returns `true` if the shard holds no entry.
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Capacity of the shard.
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Index of the shard in its cache.
    pub fn index(&self) -> usize {
        self.inner.index
    }

    /// Hash builder of the shard.
    pub fn hash_builder(&self) -> &Arc<S> {
        &self.inner.hash_builder
    }
}
