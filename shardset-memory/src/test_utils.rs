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

//! Utilities for testing caches.

use std::{marker::PhantomData, sync::Arc};

use parking_lot::{Mutex, MutexGuard};
use shardset_common::{
    code::{Key, Value},
    event::{Event, EventListener},
};

/// An event listener that records the keys leaving the cache with the reason.
#[derive(Debug)]
pub struct EventRecorder<K, V> {
    events: Arc<Mutex<Vec<(Event, K)>>>,
    _marker: PhantomData<fn() -> V>,
}

impl<K, V> Clone for EventRecorder<K, V> {
    fn clone(&self) -> Self {
        Self {
            events: self.events.clone(),
            _marker: PhantomData,
        }
    }
}

impl<K, V> Default for EventRecorder<K, V> {
    fn default() -> Self {
        Self {
            events: Default::default(),
            _marker: PhantomData,
        }
    }
}

impl<K, V> EventListener for EventRecorder<K, V>
where
    K: Key,
    V: Value,
{
    type Key = K;
    type Value = V;

    fn on_leave(&self, reason: Event, key: &Self::Key, _: &Self::Value) {
        self.events.lock().push((reason, key.clone()));
    }
}

impl<K, V> EventRecorder<K, V> {
    /// Get all recorded events.
    pub fn events(&self) -> MutexGuard<'_, Vec<(Event, K)>> {
        self.events.lock()
    }
}
