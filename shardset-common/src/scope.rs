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

/// Run a closure over a value in an explicit scope, so the lifetime of a lock guard reads as a block.
///
/// ```
/// use parking_lot::Mutex;
/// # use shardset_common::scope::Scope;
///
/// let numbers = Mutex::new(vec![1, 2]);
/// let len = numbers.lock().with(|mut numbers| {
///     numbers.push(3);
///     numbers.len()
/// });
/// assert_eq!(len, 3);
/// ```
pub trait Scope {
    /// Scoped with ownership.
    fn with<F, R>(self, f: F) -> R
    where
        Self: Sized,
        F: FnOnce(Self) -> R,
    {
        f(self)
    }
}
impl<T> Scope for T {}
