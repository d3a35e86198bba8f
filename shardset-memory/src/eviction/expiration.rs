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
    sync::Arc,
    thread::JoinHandle,
    time::{Duration, Instant},
};

use hashbrown::HashMap;
use itertools::Itertools;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use shardset_common::{
    code::{Key, Value},
    error::{Error, ErrorKind, Result},
};

use super::{context::EvictionRequester, Action, EvictionPolicy};

/// Expiration eviction algorithm config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpirationConfig {
    /// How long a key may stay idle before it expires. Every insertion or read restarts the clock.
    pub ttl: Duration,
    /// How often the background sweeper looks for expired keys.
    ///
    /// A key is evicted at most about one interval after its deadline.
    pub sweep_interval: Duration,
}

impl Default for ExpirationConfig {
    fn default() -> Self {
        Self::new(Duration::from_secs(3600))
    }
}

impl ExpirationConfig {
    /// Create an expiration config that uses `interval` as both the time-to-live and the sweep interval.
    pub fn new(interval: Duration) -> Self {
        Self {
            ttl: interval,
            sweep_interval: interval,
        }
    }

    /// Set a sweep interval different from the time-to-live.
    pub fn with_sweep_interval(mut self, sweep_interval: Duration) -> Self {
        self.sweep_interval = sweep_interval;
        self
    }

    /// Both knobs must be positive.
    pub fn validate(&self) -> Result<()> {
        if self.ttl.is_zero() {
            return Err(Error::config("expiration ttl must be positive").with_context("ttl", format!("{:?}", self.ttl)));
        }
        if self.sweep_interval.is_zero() {
            return Err(Error::config("expiration sweep interval must be positive")
                .with_context("sweep_interval", format!("{:?}", self.sweep_interval)));
        }
        Ok(())
    }
}

/// Eviction policy that evicts keys left idle for longer than the time-to-live, regardless of the shard capacity.
///
/// The policy never nominates a victim on capacity pressure. A background sweeper thread owned by the policy finds
/// expired keys and asks the shard to evict them through the asynchronous eviction channel. The thread is stopped
/// and joined when the policy is dropped.
pub struct ExpirationPolicy<K> {
    deadlines: Arc<Mutex<HashMap<K, Instant>>>,
    ttl: Duration,

    stop_tx: Option<flume::Sender<()>>,
    sweeper: Option<JoinHandle<()>>,
}

impl<K> Debug for ExpirationPolicy<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpirationPolicy")
            .field("ttl", &self.ttl)
            .field("len", &self.deadlines.lock().len())
            .finish()
    }
}

impl<K> ExpirationPolicy<K>
where
    K: Key,
{
    /// Create an expiration policy and start its sweeper.
    pub fn new(config: ExpirationConfig, requester: EvictionRequester<K>) -> Result<Self> {
        config.validate()?;

        let deadlines = Arc::new(Mutex::new(HashMap::new()));
        let (stop_tx, stop_rx) = flume::bounded(1);

        let shard = requester.shard();
        let sweeper = Sweeper {
            deadlines: deadlines.clone(),
            requester,
            interval: config.sweep_interval,
            stop_rx,
        };
        let handle = std::thread::Builder::new()
            .name(format!("shardset-sweeper-{shard}"))
            .spawn(move || sweeper.run())
            .map_err(|e| {
                Error::new(ErrorKind::Join, "spawn expiration sweeper failed")
                    .with_context("shard", shard)
                    .with_source(e)
            })?;

        tracing::debug!(
            "[expiration]: sweeper started for shard {shard}, ttl: {:?}, interval: {:?}",
            config.ttl,
            config.sweep_interval
        );

        Ok(Self {
            deadlines,
            ttl: config.ttl,
            stop_tx: Some(stop_tx),
            sweeper: Some(handle),
        })
    }

    /// The time-to-live of idle keys.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The instant after which `key` is considered expired, if it is tracked.
    pub fn deadline(&self, key: &K) -> Option<Instant> {
        self.deadlines.lock().get(key).copied()
    }

    /// Count of tracked keys.
    pub fn len(&self) -> usize {
        self.deadlines.lock().len()
    }

    /// Returns `true` if no key is tracked.
    pub fn is_empty(&self) -> bool {
        self.deadlines.lock().is_empty()
    }
}

impl<K, V> EvictionPolicy<K, V> for ExpirationPolicy<K>
where
    K: Key,
    V: Value,
{
    fn notify(&self, action: Action, key: &K, _: &V) {
        let mut deadlines = self.deadlines.lock();
        match action {
            Action::Added | Action::Get => match Instant::now().checked_add(self.ttl) {
                Some(deadline) => {
                    deadlines.insert(key.clone(), deadline);
                }
                // A ttl too large to be represented never expires.
                None => {
                    deadlines.remove(key);
                }
            },
            Action::Evicted => {
                deadlines.remove(key);
            }
        }
    }

    fn next_victim(&self) -> Option<K> {
        None
    }

    fn confirm_request(&self, key: &K) -> bool {
        self.deadlines
            .lock()
            .get(key)
            .is_some_and(|deadline| *deadline <= Instant::now())
    }
}

impl<K> Drop for ExpirationPolicy<K> {
    fn drop(&mut self) {
        // Disconnecting the stop channel wakes the sweeper up.
        drop(self.stop_tx.take());
        if let Some(handle) = self.sweeper.take() {
            if handle.join().is_err() {
                tracing::warn!("[expiration]: sweeper panicked");
            }
        }
    }
}

struct Sweeper<K> {
    deadlines: Arc<Mutex<HashMap<K, Instant>>>,
    requester: EvictionRequester<K>,
    interval: Duration,
    stop_rx: flume::Receiver<()>,
}

impl<K> Sweeper<K>
where
    K: Key,
{
    fn run(self) {
        loop {
            match self.stop_rx.recv_timeout(self.interval) {
                Err(flume::RecvTimeoutError::Timeout) => self.sweep(),
                Ok(()) | Err(flume::RecvTimeoutError::Disconnected) => break,
            }
        }
        tracing::debug!("[expiration]: sweeper stopped for shard {}", self.requester.shard());
    }

    fn sweep(&self) {
        let now = Instant::now();
        // Collect under the lock, request without it.
        let expired = self
            .deadlines
            .lock()
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(key, _)| key.clone())
            .collect_vec();

        if expired.is_empty() {
            return;
        }
        tracing::trace!(
            "[expiration]: shard {} found {} expired keys",
            self.requester.shard(),
            expired.len()
        );

        for key in expired {
            if let Err(e) = self.requester.request(key) {
                tracing::warn!("[expiration]: request eviction failed: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread::sleep;

    use super::*;
    use crate::eviction::test_utils::RequestRecorder;

    fn notify(policy: &ExpirationPolicy<u64>, action: Action, key: u64) {
        EvictionPolicy::<u64, ()>::notify(policy, action, &key, &());
    }

    fn config(ttl: u64, interval: u64) -> ExpirationConfig {
        ExpirationConfig::new(Duration::from_millis(ttl)).with_sweep_interval(Duration::from_millis(interval))
    }

    #[test]
    fn test_expiration_config() {
        let config = ExpirationConfig::default();
        assert_eq!(config.ttl, Duration::from_secs(3600));
        assert_eq!(config.sweep_interval, Duration::from_secs(3600));
        assert!(config.validate().is_ok());

        let err = ExpirationConfig::new(Duration::ZERO).validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);

        let err = ExpirationConfig::new(Duration::from_secs(1))
            .with_sweep_interval(Duration::ZERO)
            .validate()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_expiration_config_serde() {
        let config: ExpirationConfig = serde_json::from_str(
            r#"{"ttl":{"secs":2,"nanos":0},"sweep_interval":{"secs":0,"nanos":500000000}}"#,
        )
        .unwrap();
        assert_eq!(config, config_from_secs(2, 0.5));
    }

    fn config_from_secs(ttl: u64, interval: f64) -> ExpirationConfig {
        ExpirationConfig::new(Duration::from_secs(ttl)).with_sweep_interval(Duration::from_secs_f64(interval))
    }

    #[test]
    fn test_expiration_rejects_invalid_config() {
        let recorder = RequestRecorder::<u64>::new();
        let res = ExpirationPolicy::new(config(0, 10), recorder.context(0, 10).requester());
        assert_eq!(res.unwrap_err().kind(), ErrorKind::Config);
    }

    #[test]
    fn test_expiration_tracking() {
        let recorder = RequestRecorder::<u64>::new();
        let policy = ExpirationPolicy::new(config(60_000, 60_000), recorder.context(0, 10).requester()).unwrap();
        assert_eq!(policy.ttl(), Duration::from_secs(60));

        notify(&policy, Action::Added, 1);
        let first = policy.deadline(&1).unwrap();
        sleep(Duration::from_millis(5));
        notify(&policy, Action::Get, 1);
        assert!(policy.deadline(&1).unwrap() > first);

        notify(&policy, Action::Added, 2);
        assert_eq!(policy.len(), 2);
        assert_eq!(EvictionPolicy::<u64, ()>::next_victim(&policy), None);
        assert!(!EvictionPolicy::<u64, ()>::confirm_request(&policy, &1));

        notify(&policy, Action::Evicted, 1);
        notify(&policy, Action::Evicted, 1);
        assert_eq!(policy.deadline(&1), None);
        assert_eq!(policy.len(), 1);
    }

    #[test_log::test]
    fn test_expiration_sweep() {
        let recorder = RequestRecorder::<u64>::new();
        let policy = ExpirationPolicy::new(config(200, 10), recorder.context(3, 10).requester()).unwrap();

        notify(&policy, Action::Added, 1);
        notify(&policy, Action::Added, 2);
        sleep(Duration::from_millis(100));
        // Refresh key 1, only key 2 expires in the first round.
        notify(&policy, Action::Get, 1);

        let key = recorder.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(key, 2);
        assert!(EvictionPolicy::<u64, ()>::confirm_request(&policy, &2));
        assert!(!EvictionPolicy::<u64, ()>::confirm_request(&policy, &1));

        // The sweeper keeps asking until the shard reports the eviction.
        notify(&policy, Action::Evicted, 2);

        // Requests for key 2 may still be in flight.
        let key = loop {
            let key = recorder.recv_timeout(Duration::from_secs(5)).unwrap();
            if key != 2 {
                break key;
            }
        };
        assert_eq!(key, 1);
        assert!(EvictionPolicy::<u64, ()>::confirm_request(&policy, &1));
    }

    #[test]
    fn test_sweeper_stops_on_drop() {
        let recorder = RequestRecorder::<u64>::new();
        assert_eq!(recorder.requesters(), 0);

        let policy = ExpirationPolicy::new(config(10, 10), recorder.context(0, 10).requester()).unwrap();
        assert_eq!(recorder.requesters(), 1);

        drop(policy);
        assert_eq!(recorder.requesters(), 0);
    }
}
