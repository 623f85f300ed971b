// Copyright 2024 Felix Engl
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

//! The Work Queue & Scheduler (component C4).
//!
//! The teacher's `queue::url::queue` is a disk-backed aging queue built for
//! crawls that outlive a single process. This spec has no persistent-queue
//! requirement, so the disk layer is dropped (noted in `DESIGN.md`) and the
//! part that *is* grounded on it — one FIFO subqueue per host, permits
//! handed out respecting two independent caps — is kept and generalized to
//! the explicit global+per-host dual-cap design `SPEC_FULL.md` §4.4 calls
//! for.

use crate::url::UrlWithDepth;
use indexmap::IndexMap;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{Mutex, Notify};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct QueuedUrl {
    pub url: UrlWithDepth,
}

struct SchedulerState {
    /// Insertion-ordered so host selection during dequeue is deterministic
    /// in tests; the spec makes no ordering promise across hosts.
    host_queues: IndexMap<String, VecDeque<QueuedUrl>>,
    in_flight_per_host: IndexMap<String, usize>,
    total_queued: usize,
    total_in_flight: usize,
}

/// A bounded, multi-host FIFO work queue with independent global and
/// per-host concurrency caps.
pub struct WorkQueue {
    state: Mutex<SchedulerState>,
    notify: Notify,
    global_parallelism: usize,
    per_host_parallelism: usize,
    capacity: usize,
    cancel: CancellationToken,
}

impl WorkQueue {
    pub fn new(global_parallelism: usize, per_host_parallelism: usize, capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(SchedulerState {
                host_queues: IndexMap::new(),
                in_flight_per_host: IndexMap::new(),
                total_queued: 0,
                total_in_flight: 0,
            }),
            notify: Notify::new(),
            global_parallelism: global_parallelism.max(1),
            per_host_parallelism: per_host_parallelism.max(1),
            capacity,
            cancel: CancellationToken::new(),
        })
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
        self.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Non-blocking submission. Returns `Err(())` (mapped by the caller to
    /// [`crate::error::CrawlError::Backpressure`]) when the queue is at
    /// capacity; the discovery mechanism that called this is expected to
    /// retry the URL on its next extraction pass.
    pub async fn submit(&self, host: &str, item: QueuedUrl) -> Result<(), ()> {
        let mut state = self.state.lock().await;
        if state.total_queued >= self.capacity {
            return Err(());
        }
        state
            .host_queues
            .entry(host.to_string())
            .or_default()
            .push_back(item);
        state.total_queued += 1;
        drop(state);
        self.notify.notify_waiters();
        Ok(())
    }

    /// Waits until a work item is ready under both caps, or the queue is
    /// cancelled / permanently idle per `is_idle`. Returns `None` once
    /// cancelled.
    pub async fn dequeue(self: &Arc<Self>) -> Option<WorkPermit> {
        loop {
            if self.cancel.is_cancelled() {
                return None;
            }
            {
                let mut state = self.state.lock().await;
                if state.total_in_flight < self.global_parallelism {
                    let ready_host = state
                        .host_queues
                        .iter()
                        .find(|(host, queue)| {
                            !queue.is_empty()
                                && state
                                    .in_flight_per_host
                                    .get(*host)
                                    .copied()
                                    .unwrap_or(0)
                                    < self.per_host_parallelism
                        })
                        .map(|(host, _)| host.clone());

                    if let Some(host) = ready_host {
                        let item = state
                            .host_queues
                            .get_mut(&host)
                            .and_then(|q| q.pop_front())
                            .expect("checked non-empty above");
                        state.total_queued -= 1;
                        state.total_in_flight += 1;
                        *state.in_flight_per_host.entry(host.clone()).or_insert(0) += 1;
                        return Some(WorkPermit {
                            queue: self.clone(),
                            host,
                            item: Some(item),
                        });
                    }
                }
            }
            let notified = self.notify.notified();
            tokio::select! {
                _ = notified => {}
                _ = self.cancel.cancelled() => return None,
            }
        }
    }

    /// `true` iff there is nothing queued and nothing in flight — one half
    /// of the controller's completion condition.
    pub async fn is_idle(&self) -> bool {
        let state = self.state.lock().await;
        state.total_queued == 0 && state.total_in_flight == 0
    }

    pub async fn queued_len(&self) -> usize {
        self.state.lock().await.total_queued
    }

    pub async fn in_flight_len(&self) -> usize {
        self.state.lock().await.total_in_flight
    }

    async fn release(&self, host: &str) {
        let mut state = self.state.lock().await;
        state.total_in_flight = state.total_in_flight.saturating_sub(1);
        if let Some(count) = state.in_flight_per_host.get_mut(host) {
            *count = count.saturating_sub(1);
        }
        drop(state);
        self.notify.notify_waiters();
    }
}

/// Ownership of one dequeued item plus the global+per-host slot it
/// occupies. Dropping it (after the fetch completes, however it
/// completes) releases both slots and wakes other dequeuers.
pub struct WorkPermit {
    queue: Arc<WorkQueue>,
    host: String,
    item: Option<QueuedUrl>,
}

impl WorkPermit {
    pub fn item(&self) -> &QueuedUrl {
        self.item.as_ref().expect("item taken only on drop")
    }

    pub fn into_item(mut self) -> QueuedUrl {
        self.item.take().expect("item taken only once")
    }
}

impl Drop for WorkPermit {
    fn drop(&mut self) {
        let queue = self.queue.clone();
        let host = std::mem::take(&mut self.host);
        tokio::spawn(async move {
            queue.release(&host).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::url::{CanonicalUrl, UrlWithDepth};

    fn item(raw: &str, depth: u32) -> (String, QueuedUrl) {
        let url = CanonicalUrl::parse(raw, None, &[]).unwrap();
        let host = url.host().to_string();
        (host, QueuedUrl { url: UrlWithDepth::new(url, depth) })
    }

    #[tokio::test]
    async fn fifo_within_host() {
        let queue = WorkQueue::new(10, 10, 100);
        let (host, a) = item("http://example.com/a", 1);
        let (_, b) = item("http://example.com/b", 1);
        queue.submit(&host, a.clone()).await.unwrap();
        queue.submit(&host, b.clone()).await.unwrap();
        let first = queue.dequeue().await.unwrap();
        assert_eq!(first.item().url.canonical().as_url().path(), "/a");
        let second = queue.dequeue().await.unwrap();
        assert_eq!(second.item().url.canonical().as_url().path(), "/b");
    }

    #[tokio::test]
    async fn backpressure_when_full() {
        let queue = WorkQueue::new(10, 10, 1);
        let (host, a) = item("http://example.com/a", 1);
        let (_, b) = item("http://example.com/b", 1);
        queue.submit(&host, a).await.unwrap();
        assert!(queue.submit(&host, b).await.is_err());
    }

    #[tokio::test]
    async fn global_parallelism_one_caps_in_flight() {
        let queue = WorkQueue::new(1, 10, 100);
        let (host_a, a) = item("http://a.test/x", 1);
        let (host_b, b) = item("http://b.test/x", 1);
        queue.submit(&host_a, a).await.unwrap();
        queue.submit(&host_b, b).await.unwrap();
        let first = queue.dequeue().await.unwrap();
        assert_eq!(queue.in_flight_len().await, 1);
        // Second dequeue must not resolve while the first permit is held.
        let race = tokio::time::timeout(std::time::Duration::from_millis(50), queue.dequeue()).await;
        assert!(race.is_err(), "dequeue should block while at global cap");
        drop(first);
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert!(queue.dequeue().await.is_some());
    }

    #[tokio::test]
    async fn per_host_cap_starves_busy_host_not_others() {
        let queue = WorkQueue::new(10, 1, 100);
        let (host, a) = item("http://example.com/a", 1);
        let (_, b) = item("http://example.com/b", 1);
        let (other_host, c) = item("http://other.test/c", 1);
        queue.submit(&host, a).await.unwrap();
        queue.submit(&host, b).await.unwrap();
        queue.submit(&other_host, c).await.unwrap();

        let first = queue.dequeue().await.unwrap();
        assert_eq!(first.host, host);
        // example.com is saturated; other.test must still be servable.
        let second = queue.dequeue().await.unwrap();
        assert_eq!(second.host, other_host);
    }

    #[tokio::test]
    async fn idle_when_drained() {
        let queue = WorkQueue::new(5, 5, 10);
        assert!(queue.is_idle().await);
        let (host, a) = item("http://example.com/a", 1);
        queue.submit(&host, a).await.unwrap();
        assert!(!queue.is_idle().await);
        let permit = queue.dequeue().await.unwrap();
        assert!(!queue.is_idle().await);
        drop(permit);
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert!(queue.is_idle().await);
    }

    #[tokio::test]
    async fn cancel_unblocks_waiting_dequeue() {
        let queue = WorkQueue::new(1, 1, 10);
        let queue2 = queue.clone();
        let handle = tokio::spawn(async move { queue2.dequeue().await });
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        queue.cancel();
        let result = tokio::time::timeout(std::time::Duration::from_millis(200), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_none());
    }
}
