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

use std::{sync::Arc, time::Duration};

use parking_lot::Mutex;
use shardset_common::code::{Key, Value};

use super::{
    context::{PolicyContext, RequestSink},
    Action, EvictionPolicy,
};

/// Stands in for a shard on the receiving end of the asynchronous eviction channel.
pub struct RequestRecorder<K> {
    tx: flume::Sender<K>,
    rx: flume::Receiver<K>,
}

impl<K> RequestSink<K> for RequestRecorder<K>
where
    K: Key,
{
    fn sender(self: Arc<Self>) -> flume::Sender<K> {
        self.tx.clone()
    }
}

impl<K> RequestRecorder<K>
where
    K: Key,
{
    /// Create a recorder.
    pub fn new() -> Arc<Self> {
        let (tx, rx) = flume::unbounded();
        Arc::new(Self { tx, rx })
    }

    /// Build the context a shard would hand to a policy factory.
    pub fn context(self: &Arc<Self>, shard: usize, capacity: usize) -> PolicyContext<K> {
        PolicyContext::new(shard, capacity, self.clone())
    }

    /// Wait for the next request.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<K> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// Count of live requesters, excluding the recorder itself.
    pub fn requesters(&self) -> usize {
        self.tx.sender_count() - 1
    }
}

#[derive(Debug)]
struct Recording<K> {
    actions: Vec<(Action, K)>,
    victim: Option<K>,
    rejected: Vec<K>,
}

/// A policy that records every notification and nominates a scripted victim.
///
/// Clones share the same recording, so a test can keep one clone while the shard owns another.
#[derive(Debug)]
pub struct RecordingPolicy<K> {
    inner: Arc<Mutex<Recording<K>>>,
}

impl<K> Clone for RecordingPolicy<K> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<K> Default for RecordingPolicy<K> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Recording {
                actions: vec![],
                victim: None,
                rejected: vec![],
            })),
        }
    }
}

impl<K> RecordingPolicy<K>
where
    K: Key,
{
    /// Create a policy with no victim that confirms every request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded notifications, in order.
    pub fn actions(&self) -> Vec<(Action, K)> {
        self.inner.lock().actions.clone()
    }

    /// Set the key returned by `next_victim`.
    pub fn set_victim(&self, victim: Option<K>) {
        self.inner.lock().victim = victim;
    }

    /// Make `confirm_request` refuse the requests for `key`.
    pub fn reject(&self, key: K) {
        self.inner.lock().rejected.push(key);
    }
}

impl<K, V> EvictionPolicy<K, V> for RecordingPolicy<K>
where
    K: Key,
    V: Value,
{
    fn notify(&self, action: Action, key: &K, _: &V) {
        self.inner.lock().actions.push((action, key.clone()));
    }

    fn next_victim(&self) -> Option<K> {
        self.inner.lock().victim.clone()
    }

    fn confirm_request(&self, key: &K) -> bool {
        !self.inner.lock().rejected.contains(key)
    }
}
