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

//! In-memory `Persistence`/`EventEmitter` doubles for tests, mirroring the
//! teacher's `test_impls::inmemory::TestContext` (an in-memory stand-in for
//! every collaborator the engine talks to, recorded into plain `Vec`s
//! instead of backed by real storage).

use super::{EventEmitter, Link, PageResult, Persistence, ResourceResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub struct RecordedEvent {
    pub name: String,
    pub payload: Option<serde_json::Value>,
}

#[derive(Debug, Default)]
pub struct RecordingPersistence {
    pub crawled: Mutex<Vec<PageResult>>,
    pub resources: Mutex<Vec<ResourceResult>>,
    pub links: Mutex<Vec<(String, String, Vec<Link>)>>,
    pub stats_updates: Mutex<Vec<(String, u64, u64)>>,
    pub frameworks: Mutex<HashMap<(String, String), String>>,
}

#[async_trait]
impl Persistence for RecordingPersistence {
    async fn save_crawled_url(&self, _crawl_id: &str, result: &PageResult) -> Result<(), String> {
        self.crawled.lock().unwrap().push(result.clone());
        Ok(())
    }

    async fn save_resource(&self, _crawl_id: &str, result: &ResourceResult) -> Result<(), String> {
        self.resources.lock().unwrap().push(result.clone());
        Ok(())
    }

    async fn save_page_links(
        &self,
        crawl_id: &str,
        source_url: &str,
        links: &[Link],
    ) -> Result<(), String> {
        self.links
            .lock()
            .unwrap()
            .push((crawl_id.to_string(), source_url.to_string(), links.to_vec()));
        Ok(())
    }

    async fn update_crawl_stats(
        &self,
        crawl_id: &str,
        duration_ms: u64,
        pages_crawled: u64,
    ) -> Result<(), String> {
        self.stats_updates
            .lock()
            .unwrap()
            .push((crawl_id.to_string(), duration_ms, pages_crawled));
        Ok(())
    }

    async fn get_domain_framework(&self, project_id: &str, host: &str) -> Option<String> {
        self.frameworks
            .lock()
            .unwrap()
            .get(&(project_id.to_string(), host.to_string()))
            .cloned()
    }

    async fn save_domain_framework(&self, project_id: &str, host: &str, tag: &str) {
        self.frameworks
            .lock()
            .unwrap()
            .insert((project_id.to_string(), host.to_string()), tag.to_string());
    }
}

#[derive(Debug, Default)]
pub struct RecordingEventEmitter {
    pub events: Mutex<Vec<RecordedEvent>>,
}

#[async_trait]
impl EventEmitter for RecordingEventEmitter {
    async fn emit(&self, event_name: &str, payload: Option<serde_json::Value>) {
        self.events.lock().unwrap().push(RecordedEvent {
            name: event_name.to_string(),
            payload,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn recording_persistence_keeps_insertion_order() {
        let persistence = RecordingPersistence::default();
        let make = |url: &str| PageResult {
            url: url.to_string(),
            final_url: url.to_string(),
            status: 200,
            content_type: Some("text/html".to_string()),
            title: None,
            meta_description: None,
            canonical_url: None,
            indexable: super::super::Indexable::Yes,
            content_hash: None,
            text: None,
            links: Default::default(),
            word_count: 0,
            redirect_chain: Vec::new(),
            error: None,
        };
        persistence.save_crawled_url("c1", &make("http://test/a")).await.unwrap();
        persistence.save_crawled_url("c1", &make("http://test/b")).await.unwrap();
        let crawled = persistence.crawled.lock().unwrap();
        assert_eq!(crawled[0].url, "http://test/a");
        assert_eq!(crawled[1].url, "http://test/b");
    }

    #[tokio::test]
    async fn framework_round_trips() {
        let persistence = RecordingPersistence::default();
        assert!(persistence.get_domain_framework("p", "example.com").await.is_none());
        persistence.save_domain_framework("p", "example.com", "nextjs").await;
        assert_eq!(
            persistence.get_domain_framework("p", "example.com").await,
            Some("nextjs".to_string())
        );
    }

    #[tokio::test]
    async fn event_emitter_records_events() {
        let emitter = RecordingEventEmitter::default();
        emitter.emit("crawl:started", None).await;
        assert_eq!(emitter.events.lock().unwrap().len(), 1);
        assert_eq!(emitter.events.lock().unwrap()[0].name, "crawl:started");
    }
}
