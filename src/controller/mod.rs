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

//! The Crawl Controller (component C11): lifecycle, completion detection,
//! and the `AlreadyCrawling` refusal the teacher's `WebsiteCrawlerBuilder`
//! leaves to its caller — here it is the controller's job since this crate
//! runs many site crawls from one process instead of one `WebsiteCrawler`
//! per invocation.

mod worker;

use crate::config::{CrawlConfig, DiscoveryMechanism, RobotsTxtMode};
use crate::error::CrawlError;
use crate::fetch::{CookieJar, Fetcher};
use crate::framework::{self, HostFrameworkRegistry};
use crate::queue::{QueuedUrl, WorkQueue};
use crate::render::Renderer;
use crate::robots::RobotsCache;
use crate::scope::ScopePolicy;
use crate::sink::{EventEmitter, HealthCounters, HealthSnapshot, Persistence, ProgressSnapshot};
use crate::url::{fingerprint, CanonicalUrl, UrlWithDepth};
use crate::visit::VisitStore;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

pub(crate) struct ActiveCrawl {
    pub(crate) project_id: String,
    pub(crate) crawl_id: String,
    pub(crate) scheme: String,
    pub(crate) domain: String,
    pub(crate) seed_url: String,
    pub(crate) queue: Arc<WorkQueue>,
    pub(crate) visit: Arc<VisitStore>,
    pub(crate) scope: Arc<RwLock<ScopePolicy>>,
    pub(crate) fetcher: Arc<Fetcher>,
    pub(crate) renderer: Option<Arc<Renderer>>,
    pub(crate) robots: Arc<RobotsCache>,
    pub(crate) frameworks: Arc<HostFrameworkRegistry>,
    pub(crate) persistence: Arc<dyn Persistence>,
    pub(crate) events: Arc<dyn EventEmitter>,
    pub(crate) health: Arc<HealthCounters>,
    pub(crate) config: CrawlConfig,
    pub(crate) discovered: AtomicU64,
    pub(crate) crawled: AtomicU64,
    started_at: Instant,
}

/// Owns every in-progress crawl. Constructed once per process and shared
/// behind an `Arc` since completion-watcher tasks need to reach back into
/// it to tear down finished crawls.
pub struct CrawlController {
    persistence: Arc<dyn Persistence>,
    events: Arc<dyn EventEmitter>,
    frameworks: Arc<HostFrameworkRegistry>,
    active: Mutex<HashMap<String, Arc<ActiveCrawl>>>,
    workers: Mutex<HashMap<String, Vec<JoinHandle<()>>>>,
    hosts_in_progress: Mutex<HashMap<String, String>>,
}

impl CrawlController {
    pub fn new(persistence: Arc<dyn Persistence>, events: Arc<dyn EventEmitter>) -> Arc<Self> {
        Arc::new(Self {
            persistence,
            events,
            frameworks: Arc::new(HostFrameworkRegistry::new()),
            active: Mutex::new(HashMap::new()),
            workers: Mutex::new(HashMap::new()),
            hosts_in_progress: Mutex::new(HashMap::new()),
        })
    }

    /// Starts a new crawl rooted at `seed_url`. Refuses with
    /// `AlreadyCrawling` when another crawl already owns the seed's host.
    pub async fn start_crawl(
        self: &Arc<Self>,
        project_id: &str,
        seed_url: &str,
        config: CrawlConfig,
    ) -> Result<String, CrawlError> {
        config.validate()?;

        let mut deny_patterns = framework::baseline_deny_patterns();
        deny_patterns.extend(config.url_deny_patterns.clone());
        let mut deny_params = framework::baseline_query_params();
        deny_params.extend(config.query_param_deny_list.clone());
        deny_params.sort();
        deny_params.dedup();

        let seed = CanonicalUrl::parse(seed_url, None, &deny_params)?;
        let host = seed.host().to_string();

        {
            let mut hosts = self.hosts_in_progress.lock().await;
            if let Some(existing) = hosts.get(&host) {
                return Err(CrawlError::AlreadyCrawling(existing.clone()));
            }
            hosts.insert(host.clone(), String::new());
        }

        let scope = ScopePolicy::new(
            &host,
            config.include_subdomains,
            &deny_patterns,
            deny_params,
            config.effective_max_depth(),
        )
        .map_err(|source| CrawlError::ParseFailure {
            url: seed.to_string(),
            reason: source.to_string(),
        })?;
        let scope = Arc::new(RwLock::new(scope));

        let visit = Arc::new(VisitStore::new());
        let queue = WorkQueue::new(config.global_parallelism, config.per_host_parallelism, config.queue_capacity);
        let cookie_jar = CookieJar::new();
        let fetcher = Arc::new(
            Fetcher::new(
                &config.user_agent,
                config.request_timeout(),
                config.connect_timeout(),
                false,
                cookie_jar,
                scope.clone(),
                visit.clone(),
            )
            .map_err(|source| CrawlError::NetworkError {
                url: seed.to_string(),
                source,
            })?,
        );

        let renderer = if config.js_rendering_enabled {
            match Renderer::launch(
                Duration::from_millis(config.initial_wait_ms),
                Duration::from_millis(config.scroll_wait_ms),
                Duration::from_millis(config.final_wait_ms),
            )
            .await
            {
                Ok(renderer) => Some(Arc::new(renderer)),
                Err(err) => {
                    log::warn!("headless renderer unavailable, falling back to raw fetches: {err}");
                    None
                }
            }
        } else {
            None
        };

        let crawl_id = uuid::Uuid::new_v4().to_string();
        self.hosts_in_progress.lock().await.insert(host.clone(), crawl_id.clone());

        let active = Arc::new(ActiveCrawl {
            project_id: project_id.to_string(),
            crawl_id: crawl_id.clone(),
            scheme: seed.scheme().to_string(),
            domain: host.clone(),
            seed_url: seed.to_string(),
            queue: queue.clone(),
            visit: visit.clone(),
            scope,
            fetcher,
            renderer,
            robots: Arc::new(RobotsCache::new()),
            frameworks: self.frameworks.clone(),
            persistence: self.persistence.clone(),
            events: self.events.clone(),
            health: Arc::new(HealthCounters::default()),
            config: config.clone(),
            discovered: AtomicU64::new(1),
            crawled: AtomicU64::new(0),
            started_at: Instant::now(),
        });

        let seed_fp = fingerprint("GET", &seed, None);
        active.visit.mark_if_absent(seed_fp);
        queue
            .submit(&host, QueuedUrl { url: UrlWithDepth::new(seed, 0) })
            .await
            .map_err(|_| CrawlError::Backpressure)?;

        self.active.lock().await.insert(crawl_id.clone(), active.clone());

        let worker_count = config.global_parallelism.max(1);
        let mut handles = Vec::with_capacity(worker_count + 1);
        for _ in 0..worker_count {
            let active = active.clone();
            handles.push(tokio::spawn(async move {
                while let Some(permit) = active.queue.dequeue().await {
                    let item = permit.item().url.clone();
                    worker::process_item(&active, item).await;
                    drop(permit);
                }
            }));
        }
        // The watcher below treats `queue.is_idle()` as "nothing left to
        // do", but `seed_sitemaps` submits to the queue from outside it
        // (its own robots.txt/sitemap.xml fetches happen before it ever
        // calls `queue.submit`). Track its completion separately so the
        // watcher can't finalize (and cancel the queue) while it's still
        // in flight, which would silently drop whatever it was about to
        // submit.
        let sitemap_done = Arc::new(std::sync::atomic::AtomicBool::new(true));
        if config.discovery_enabled(DiscoveryMechanism::Sitemap) {
            sitemap_done.store(false, Ordering::Relaxed);
            let active = active.clone();
            let sitemap_done = sitemap_done.clone();
            handles.push(tokio::spawn(async move {
                seed_sitemaps(active).await;
                sitemap_done.store(true, Ordering::Relaxed);
            }));
        }
        self.workers.lock().await.insert(crawl_id.clone(), handles);

        let watcher_controller = self.clone();
        let watcher_crawl_id = crawl_id.clone();
        let watcher_active = active.clone();
        tokio::spawn(async move {
            loop {
                if watcher_active.queue.is_cancelled() {
                    break;
                }
                if sitemap_done.load(Ordering::Relaxed) && watcher_active.queue.is_idle().await {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
            watcher_controller.finalize_crawl(&watcher_crawl_id, false).await;
        });

        self.events
            .emit("crawl:started", Some(json!({ "crawlId": crawl_id, "seedUrl": active.seed_url })))
            .await;

        Ok(crawl_id)
    }

    /// Cancels dispatch immediately and gives in-flight workers a 2s grace
    /// window to return before forcing completion regardless.
    pub async fn stop_crawl(self: &Arc<Self>, crawl_id: &str) -> Result<(), CrawlError> {
        let active = self
            .active
            .lock()
            .await
            .get(crawl_id)
            .cloned()
            .ok_or_else(|| CrawlError::UnknownCrawl(crawl_id.to_string()))?;
        active.queue.cancel();

        let handles = self.workers.lock().await.remove(crawl_id).unwrap_or_default();
        if tokio::time::timeout(Duration::from_secs(2), futures::future::join_all(handles))
            .await
            .is_err()
        {
            log::warn!("crawl {crawl_id} did not stop within the grace window, forcing stop");
        }

        self.finalize_crawl(crawl_id, true).await;
        Ok(())
    }

    pub async fn get_active_progress(&self) -> Vec<ProgressSnapshot> {
        let active = self.active.lock().await;
        let mut snapshots = Vec::with_capacity(active.len());
        for crawl in active.values() {
            snapshots.push(ProgressSnapshot {
                project_id: crawl.project_id.clone(),
                crawl_id: crawl.crawl_id.clone(),
                domain: crawl.domain.clone(),
                seed_url: crawl.seed_url.clone(),
                discovered: crawl.discovered.load(Ordering::Relaxed),
                crawled: crawl.crawled.load(Ordering::Relaxed),
                in_flight: crawl.queue.in_flight_len().await as u64,
                queued: crawl.queue.queued_len().await as u64,
                is_crawling: !crawl.queue.is_cancelled(),
            });
        }
        snapshots
    }

    pub async fn get_health(&self, crawl_id: &str) -> Option<HealthSnapshot> {
        self.active.lock().await.get(crawl_id).map(|a| a.health.snapshot())
    }

    async fn finalize_crawl(self: &Arc<Self>, crawl_id: &str, was_stopped: bool) {
        let active = match self.active.lock().await.remove(crawl_id) {
            Some(active) => active,
            None => return,
        };
        active.queue.cancel();
        self.hosts_in_progress.lock().await.remove(&active.domain);
        self.workers.lock().await.remove(crawl_id);

        let discovered = active.discovered.load(Ordering::Relaxed);
        let crawled = active.crawled.load(Ordering::Relaxed);
        let duration_ms = active.started_at.elapsed().as_millis() as u64;

        if let Err(err) = active.persistence.update_crawl_stats(crawl_id, duration_ms, crawled).await {
            active.health.record_persistence_failure();
            log::error!("failed to update crawl stats for {crawl_id}: {err}");
        }

        active
            .events
            .emit(
                "crawl:completed",
                Some(json!({
                    "crawlId": crawl_id,
                    "wasStopped": was_stopped,
                    "totalPages": crawled,
                    "totalDiscovered": discovered,
                })),
            )
            .await;

        log::info!("crawl {crawl_id} finished (stopped={was_stopped}, pages={crawled}, discovered={discovered})");
    }
}

/// Seeds the queue from `sitemap_urls` plus `/sitemap.xml`, and from
/// whatever sitemaps the host's robots.txt declares — fetched once here,
/// cached by [`RobotsCache`] for every later per-URL robots check.
async fn seed_sitemaps(active: Arc<ActiveCrawl>) {
    active
        .robots
        .is_allowed(active.fetcher.http_client(), &active.scheme, &active.domain, &active.config.user_agent, "/")
        .await;

    let mut candidates = active.config.sitemap_urls.clone();
    candidates.extend(active.robots.sitemaps_for(&active.domain).await);
    if candidates.is_empty() {
        candidates.push(format!("{}://{}/sitemap.xml", active.scheme, active.domain));
    }

    for candidate in candidates {
        match crate::discovery::fetch_sitemap_urls(active.fetcher.http_client(), &candidate).await {
            Ok(urls) => {
                for raw in urls {
                    submit_discovered(&active, &raw).await;
                }
            }
            Err(err) => log::debug!("sitemap fetch failed for {candidate}: {err}"),
        }
    }
}

async fn submit_discovered(active: &Arc<ActiveCrawl>, raw: &str) {
    let deny_params = active.scope.read().unwrap().query_param_deny.clone();
    let canon = match CanonicalUrl::parse(raw, None, &deny_params) {
        Ok(canon) => canon,
        Err(_) => return,
    };
    let decision = active.scope.read().unwrap().classify(&canon, 1);
    if !decision.is_crawl() {
        return;
    }
    let fp = fingerprint("GET", &canon, None);
    if !active.visit.mark_if_absent(fp) {
        return;
    }
    let host = canon.host().to_string();
    if active
        .queue
        .submit(&host, QueuedUrl { url: UrlWithDepth::new(canon, 1) })
        .await
        .is_ok()
    {
        active.discovered.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{RecordingEventEmitter, RecordingPersistence};

    #[tokio::test]
    async fn second_crawl_on_same_host_is_refused() {
        let controller = CrawlController::new(Arc::new(RecordingPersistence::default()), Arc::new(RecordingEventEmitter::default()));
        let config = CrawlConfig {
            global_parallelism: 1,
            per_host_parallelism: 1,
            ..Default::default()
        };
        let first = controller
            .start_crawl("proj", "http://127.0.0.1:9/", config.clone())
            .await
            .unwrap();

        let second = controller.start_crawl("proj", "http://127.0.0.1:9/other", config).await;
        assert!(matches!(second, Err(CrawlError::AlreadyCrawling(id)) if id == first));

        controller.stop_crawl(&first).await.unwrap();
    }

    #[tokio::test]
    async fn unknown_crawl_id_is_rejected() {
        let controller = CrawlController::new(Arc::new(RecordingPersistence::default()), Arc::new(RecordingEventEmitter::default()));
        let result = controller.stop_crawl("does-not-exist").await;
        assert!(matches!(result, Err(CrawlError::UnknownCrawl(_))));
    }

    #[tokio::test]
    async fn start_crawl_rejects_out_of_range_parallelism() {
        let controller = CrawlController::new(Arc::new(RecordingPersistence::default()), Arc::new(RecordingEventEmitter::default()));
        let config = CrawlConfig {
            global_parallelism: 0,
            ..Default::default()
        };
        let result = controller.start_crawl("proj", "http://127.0.0.1:9/", config).await;
        assert!(matches!(result, Err(CrawlError::InvalidConfig(_))));
    }
}
