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

//! The reference `Persistence`/`EventEmitter` pair the CLI binary wires up,
//! standing in for whatever real storage a host application would bring.
//! Mirrors the teacher's `test_impls` shape (in-memory where it's cheap)
//! but actually writes the on-disk text artifacts the CLI promises.

use crate::sink::{EventEmitter, Link, PageResult, Persistence, ResourceResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

pub struct FilePersistence {
    base: PathBuf,
    frameworks: Mutex<HashMap<(String, String), String>>,
}

impl FilePersistence {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            frameworks: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl Persistence for FilePersistence {
    async fn save_crawled_url(&self, crawl_id: &str, result: &PageResult) -> Result<(), String> {
        let Some(text) = &result.text else {
            return Ok(());
        };
        let domain = url::Url::parse(&result.url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| "unknown-host".to_string());
        let dir = self.base.join(&domain).join(crawl_id);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|err| format!("failed to create {}: {err}", dir.display()))?;
        let path = dir.join(sanitize_filename(&result.url));
        tokio::fs::write(&path, text.as_bytes())
            .await
            .map_err(|err| format!("failed to write {}: {err}", path.display()))
    }

    async fn save_resource(&self, _crawl_id: &str, _result: &ResourceResult) -> Result<(), String> {
        Ok(())
    }

    async fn save_page_links(&self, _crawl_id: &str, _source_url: &str, _links: &[Link]) -> Result<(), String> {
        Ok(())
    }

    async fn update_crawl_stats(&self, crawl_id: &str, duration_ms: u64, pages_crawled: u64) -> Result<(), String> {
        println!("crawl {crawl_id} finished in {duration_ms}ms, {pages_crawled} pages crawled");
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

pub struct StdoutEventEmitter;

#[async_trait]
impl EventEmitter for StdoutEventEmitter {
    async fn emit(&self, event_name: &str, payload: Option<serde_json::Value>) {
        match payload {
            Some(payload) => println!("[{event_name}] {payload}"),
            None => println!("[{event_name}]"),
        }
    }
}

/// `<sanitized-url>.txt` per the on-disk artifact mapping: strip the
/// scheme, replace `/ ? = & # : * " < > | space` with `_`, ensure a `.txt`
/// suffix, and map an empty/root path to `index.txt`.
fn sanitize_filename(raw_url: &str) -> String {
    let parsed = url::Url::parse(raw_url).ok();
    let path_and_query = match &parsed {
        Some(u) => match u.query() {
            Some(q) => format!("{}?{}", u.path(), q),
            None => u.path().to_string(),
        },
        None => raw_url.to_string(),
    };
    if path_and_query.is_empty() || path_and_query == "/" {
        return "index.txt".to_string();
    }
    let host = parsed.as_ref().and_then(|u| u.host_str()).unwrap_or("");
    let combined = format!("{host}{path_and_query}");
    let sanitized: String = combined
        .chars()
        .map(|c| if "/?=&#:*\"<>| ".contains(c) { '_' } else { c })
        .collect();
    if sanitized.ends_with(".txt") {
        sanitized
    } else {
        format!("{sanitized}.txt")
    }
}
