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

//! The Result Sink (component C10): result data types plus the
//! `Persistence`/`EventEmitter` collaborator traits the Controller drives.
//! Grounded on the teacher's `contexts::traits` pattern of narrow,
//! single-purpose `Supports*` traits, flattened here into two plain
//! `async_trait`s since this spec names exactly two collaborators instead
//! of the teacher's dozen-trait context composition.

mod test_impls;

pub use test_impls::{RecordedEvent, RecordingEventEmitter, RecordingPersistence};

use crate::error::RecordedError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum LinkType {
    Anchor,
    Image,
    Script,
    Stylesheet,
    Font,
    Modulepreload,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum LinkPosition {
    Content,
    Boilerplate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum Indexable {
    Yes,
    No,
    #[strum(serialize = "-")]
    NotApplicable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    pub url: String,
    pub link_type: LinkType,
    pub anchor_text: Option<String>,
    pub context: Option<String>,
    pub is_internal: bool,
    pub position: LinkPosition,
    pub dom_path: String,
    pub rel: Vec<String>,
    pub status: Option<u16>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkInventory {
    pub internal: Vec<Link>,
    pub external: Vec<Link>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResult {
    pub url: String,
    pub final_url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub title: Option<String>,
    pub meta_description: Option<String>,
    pub canonical_url: Option<String>,
    pub indexable: Indexable,
    pub content_hash: Option<String>,
    /// Normalized visible text, present for every successfully-parsed HTML
    /// page — the source a `Persistence` implementation writes to the
    /// on-disk text artifact.
    pub text: Option<String>,
    pub links: LinkInventory,
    pub word_count: usize,
    /// URLs of every redirect hop that led to `final_url`, in order,
    /// including hops that were separately discovered and merged in after
    /// racing to redirect here while another fetch already owned it.
    pub redirect_chain: Vec<String>,
    pub error: Option<RecordedError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceResult {
    pub url: String,
    pub status: Option<u16>,
    pub content_type: Option<String>,
    pub error: Option<RecordedError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub project_id: String,
    pub crawl_id: String,
    pub domain: String,
    pub seed_url: String,
    pub discovered: u64,
    pub crawled: u64,
    pub in_flight: u64,
    pub queued: u64,
    pub is_crawling: bool,
}

/// §9's open question resolution: tracked and exposed, never folded into
/// `on_crawl_complete`'s own signature.
#[derive(Debug, Default)]
pub struct HealthCounters {
    pub persistence_failures: AtomicU64,
    pub fetch_errors: AtomicU64,
    pub parse_failures: AtomicU64,
}

impl HealthCounters {
    pub fn record_persistence_failure(&self) {
        self.persistence_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fetch_error(&self) {
        self.fetch_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_parse_failure(&self) {
        self.parse_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        HealthSnapshot {
            persistence_failures: self.persistence_failures.load(Ordering::Relaxed),
            fetch_errors: self.fetch_errors.load(Ordering::Relaxed),
            parse_failures: self.parse_failures.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub persistence_failures: u64,
    pub fetch_errors: u64,
    pub parse_failures: u64,
}

/// The persistence collaborator. A failure here is logged and counted via
/// [`HealthCounters`] but never aborts the crawl (§7).
#[async_trait]
pub trait Persistence: Send + Sync {
    async fn save_crawled_url(&self, crawl_id: &str, result: &PageResult) -> Result<(), String>;
    async fn save_resource(&self, crawl_id: &str, result: &ResourceResult) -> Result<(), String>;
    async fn save_page_links(
        &self,
        crawl_id: &str,
        source_url: &str,
        links: &[Link],
    ) -> Result<(), String>;
    async fn update_crawl_stats(
        &self,
        crawl_id: &str,
        duration_ms: u64,
        pages_crawled: u64,
    ) -> Result<(), String>;
    async fn get_domain_framework(&self, project_id: &str, host: &str) -> Option<String>;
    async fn save_domain_framework(&self, project_id: &str, host: &str, tag: &str);
}

/// The event emitter collaborator. Event names are indicational only
/// (`crawl:started`, `crawl:completed`, `crawl:stopped`).
#[async_trait]
pub trait EventEmitter: Send + Sync {
    async fn emit(&self, event_name: &str, payload: Option<serde_json::Value>);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_counters_start_at_zero_and_accumulate() {
        let counters = HealthCounters::default();
        assert_eq!(counters.snapshot().persistence_failures, 0);
        counters.record_persistence_failure();
        counters.record_persistence_failure();
        assert_eq!(counters.snapshot().persistence_failures, 2);
    }
}
