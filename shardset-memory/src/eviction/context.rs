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

use std::{fmt::Debug, sync::Arc};

use shardset_common::{
    code::Key,
    error::{Error, ErrorKind, Result},
};

/// The receiving end of the asynchronous eviction channel of a shard.
pub(crate) trait RequestSink<K>: Send + Sync + 'static {
    /// Get a sender of the channel. The consumer is started on demand.
    fn sender(self: Arc<Self>) -> flume::Sender<K>;
}

/// Context passed to a policy factory when a shard attaches a new policy instance.
pub struct PolicyContext<K> {
    shard: usize,
    capacity: usize,
    sink: Arc<dyn RequestSink<K>>,
}

impl<K> Debug for PolicyContext<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyContext")
            .field("shard", &self.shard)
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl<K> PolicyContext<K>
where
    K: Key,
{
    pub(crate) fn new(shard: usize, capacity: usize, sink: Arc<dyn RequestSink<K>>) -> Self {
        Self { shard, capacity, sink }
    }

    /// Index of the shard the policy is attached to.
    pub fn shard(&self) -> usize {
        self.shard
    }

    /// Capacity of the shard the policy is attached to.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Open the asynchronous eviction channel of the shard.
    ///
    /// Only policies that evict without capacity pressure need it.
    pub fn requester(&self) -> EvictionRequester<K> {
        EvictionRequester {
            shard: self.shard,
            tx: self.sink.clone().sender(),
        }
    }
}

/// Handle for a policy to ask its shard to evict a key at any time, from any thread.
///
/// Requests are fire-and-forget. The shard applies them in the background once
/// `EvictionPolicy::confirm_request` agrees. Requests for keys that are no longer present are ignored.
pub struct EvictionRequester<K> {
    shard: usize,
    tx: flume::Sender<K>,
}

impl<K> Debug for EvictionRequester<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvictionRequester").field("shard", &self.shard).finish()
    }
}

impl<K> Clone for EvictionRequester<K> {
    fn clone(&self) -> Self {
        Self {
            shard: self.shard,
            tx: self.tx.clone(),
        }
    }
}

impl<K> EvictionRequester<K> {
    /// Request the eviction of `key`.
    ///
    /// Fails only if the shard has been dropped.
    pub fn request(&self, key: K) -> Result<()> {
        self.tx.send(key).map_err(|_| {
            Error::new(ErrorKind::ChannelClosed, "eviction request channel closed").with_context("shard", self.shard)
        })
    }

    /// Index of the shard that receives the requests.
    pub fn shard(&self) -> usize {
        self.shard
    }
}
