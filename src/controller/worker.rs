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

//! Per-URL processing, grounded on the shape of the teacher's
//! `WebsiteCrawler::crawl` loop body: fetch, extract, handle links, store —
//! just one item at a time here instead of one loop iteration, since
//! dispatch and concurrency already live in [`crate::queue::WorkQueue`].

use super::ActiveCrawl;
use crate::config::RobotsTxtMode;
use crate::extract::{self, LinkPosition as ExtractLinkPosition};
use crate::fetch::{is_html, FetchedResponse};
use crate::framework::{self, FrameworkTag};
use crate::queue::QueuedUrl;
use crate::scope::Decision;
use crate::sink::{Indexable, Link, LinkInventory, LinkPosition, PageResult, ResourceResult};
use crate::url::{fingerprint, CanonicalUrl, UrlWithDepth};
use scraper::Html;
use serde_json::json;
use std::str::FromStr;
use std::sync::Arc;

pub async fn process_item(active: &Arc<ActiveCrawl>, item: UrlWithDepth) {
    let url = item.canonical().clone();
    eprintln!("DEBUG process_item called for {}", url);
    let depth = item.depth();
    let host = url.host().to_string();

    if active.config.robots_txt_mode == RobotsTxtMode::Respect {
        let allowed = active
            .robots
            .is_allowed(
                active.fetcher.http_client(),
                url.scheme(),
                &host,
                &active.config.user_agent,
                url.path(),
            )
            .await;
        if !allowed {
            log::debug!("robots.txt disallows {url}");
            return;
        }
    }

    let fetch_result = active.fetcher.fetch(&url).await;
    eprintln!("DEBUG fetch result is_ok={} : {:?}", fetch_result.is_ok(), fetch_result.as_ref().err());
    match fetch_result {
        Ok(response) => handle_response(active, &url, depth, response).await,
        Err(crate::error::CrawlError::RedirectTargetOwnedElsewhere { from, to }) => {
            log::debug!("redirect from {from} to {to} is owned by another fetch, not duplicating it");
        }
        Err(err) => {
            active.health.record_fetch_error();
            log::warn!("fetch failed for {url}: {err}");
            let recorded = err.to_recorded();
            let result = PageResult {
                url: url.to_string(),
                final_url: url.to_string(),
                status: 0,
                content_type: None,
                title: None,
                meta_description: None,
                canonical_url: None,
                indexable: Indexable::No,
                content_hash: None,
                text: None,
                links: LinkInventory::default(),
                word_count: 0,
                redirect_chain: Vec::new(),
                error: recorded,
            };
            store_page(active, &result).await;
        }
    }
}

async fn handle_response(active: &Arc<ActiveCrawl>, requested: &CanonicalUrl, depth: u32, response: FetchedResponse) {
    eprintln!("DEBUG handle_response content_type={:?} is_html={}", response.content_type, is_html(response.content_type.as_ref()));
    if !is_html(response.content_type.as_ref()) {
        let result = ResourceResult {
            url: requested.to_string(),
            status: Some(response.status.as_u16()),
            content_type: response.content_type.as_ref().map(|m| m.to_string()),
            error: None,
        };
        if let Err(err) = active.persistence.save_resource(&active.crawl_id, &result).await {
            active.health.record_persistence_failure();
            log::error!("failed to save resource {}: {}", result.url, err);
        }
        active.crawled.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        return;
    }

    let mut rendered_network_urls: Vec<String> = Vec::new();
    let body = match &active.renderer {
        Some(renderer) => match renderer.render(response.final_url.as_url().as_str()).await {
            Ok(rendered) => {
                rendered_network_urls = rendered.network_urls;
                rendered.html
            }
            Err(err) => {
                log::warn!("render failed for {}, falling back to raw response: {err}", response.final_url);
                String::from_utf8_lossy(&response.body).into_owned()
            }
        },
        None => String::from_utf8_lossy(&response.body).into_owned(),
    };
    let x_robots_noindex = response
        .headers
        .get("x-robots-tag")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_ascii_lowercase().contains("noindex"))
        .unwrap_or(false);

    let (meta, raw_links, content_hash, text, word_count, document_html) = {
        let document = Html::parse_document(&body);
        let meta = extract::extract_meta(&document, x_robots_noindex);
        let raw_links = extract::extract_links(&document);
        let content_hash = extract::content_hash(&document);
        let text = extract::extracted_text(&document);
        let word_count = extract::visible_word_count(&document);
        let document_html = document.root_element().html();
        (meta, raw_links, content_hash, text, word_count, document_html)
    };

    let host = response.final_url.host().to_string();
    ensure_framework_applied(active, &host, &document_html, &raw_links, &rendered_network_urls, &response).await;

    let deny_params = active.scope.read().unwrap().query_param_deny.clone();
    let canonical_matches_request = match &meta.canonical_url {
        None => true,
        Some(raw) => CanonicalUrl::parse(raw, Some(response.final_url.as_url()), &deny_params)
            .map(|canon| canon == response.final_url)
            .unwrap_or(false),
    };

    let indexable = extract::compute_indexable(
        response.status.as_u16(),
        true,
        &meta.robots,
        canonical_matches_request,
        active.config.respect_meta_robots_noindex,
        active.config.respect_x_robots_tag_noindex,
    );

    let mut inventory = LinkInventory::default();
    let mut all_links = Vec::with_capacity(raw_links.len());
    let page_nofollow = meta.robots.meta_robots_nofollow;

    for raw in raw_links {
        let Ok(canon) = CanonicalUrl::parse(&raw.raw_url, Some(response.final_url.as_url()), &deny_params) else {
            continue;
        };
        let decision = active.scope.read().unwrap().classify(&canon, depth + 1);
        let is_internal = active.scope.read().unwrap().is_internal_host(canon.host());
        let position = match raw.position {
            ExtractLinkPosition::Content => LinkPosition::Content,
            ExtractLinkPosition::Boilerplate => LinkPosition::Boilerplate,
        };

        let link = Link {
            url: canon.to_string(),
            link_type: raw.link_type,
            anchor_text: raw.anchor_text,
            context: raw.context,
            is_internal,
            position,
            dom_path: raw.dom_path.clone(),
            rel: raw.rel.clone(),
            status: None,
        };

        let is_anchor = link.link_type == crate::sink::LinkType::Anchor;
        let rel_nofollow = raw.rel.iter().any(|r| r == "nofollow" || r == "sponsored" || r == "ugc");
        let nofollow = rel_nofollow || page_nofollow;
        let follow_allowed = if is_internal {
            active.config.follow_internal_nofollow || !nofollow
        } else {
            active.config.follow_external_nofollow || !nofollow
        };

        if is_anchor && decision.is_crawl() && follow_allowed {
            let fp = fingerprint("GET", &canon, None);
            if active.visit.mark_if_absent(fp) {
                let submit_host = canon.host().to_string();
                let queued = QueuedUrl {
                    url: UrlWithDepth::new(canon.clone(), depth + 1),
                };
                if active.queue.submit(&submit_host, queued).await.is_ok() {
                    active.discovered.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                }
            }
        } else if !is_anchor && active.config.check_external_resources && matches!(decision, Decision::Crawl | Decision::RecordOnly { .. }) {
            validate_resource(active, &canon).await;
        }

        if is_internal {
            inventory.internal.push(link.clone());
        } else {
            inventory.external.push(link.clone());
        }
        all_links.push(link);
    }

    let result = PageResult {
        url: requested.to_string(),
        final_url: response.final_url.to_string(),
        status: response.status.as_u16(),
        content_type: response.content_type.as_ref().map(|m| m.to_string()),
        title: meta.title,
        meta_description: meta.meta_description,
        canonical_url: meta.canonical_url,
        indexable,
        content_hash: Some(content_hash),
        text: Some(text),
        links: inventory,
        word_count,
        redirect_chain: response.redirect_chain.clone(),
        error: None,
    };

    if let Err(err) = active
        .persistence
        .save_page_links(&active.crawl_id, &result.url, &all_links)
        .await
    {
        active.health.record_persistence_failure();
        log::error!("failed to save links for {}: {}", result.url, err);
    }

    active
        .events
        .emit(
            "crawl:page",
            Some(json!({ "crawlId": active.crawl_id, "url": result.url, "status": result.status })),
        )
        .await;

    store_page(active, &result).await;
}

async fn store_page(active: &Arc<ActiveCrawl>, result: &PageResult) {
    eprintln!("DEBUG store_page called for {}", result.url);
    if let Err(err) = active.persistence.save_crawled_url(&active.crawl_id, result).await {
        active.health.record_persistence_failure();
        log::error!("failed to persist page {}: {}", result.url, err);
    }
    active.crawled.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
}

/// Fetches a non-anchor resource once (deduplicated via the Visit Store)
/// purely to validate its status, per §4.8's "validated" resource result.
async fn validate_resource(active: &Arc<ActiveCrawl>, url: &CanonicalUrl) {
    let fp = fingerprint("GET", url, None);
    if !active.visit.mark_if_absent(fp) {
        return;
    }
    let result = match active.fetcher.fetch(url).await {
        Ok(response) => ResourceResult {
            url: url.to_string(),
            status: Some(response.status.as_u16()),
            content_type: response.content_type.as_ref().map(|m| m.to_string()),
            error: None,
        },
        Err(err) => {
            active.health.record_fetch_error();
            ResourceResult {
                url: url.to_string(),
                status: None,
                content_type: None,
                error: err.to_recorded(),
            }
        }
    };
    if let Err(err) = active.persistence.save_resource(&active.crawl_id, &result).await {
        active.health.record_persistence_failure();
        log::error!("failed to save resource {}: {}", result.url, err);
    }
}

/// Runs framework detection on the first HTML page seen for `host`,
/// reusing a previously persisted verdict when one exists, then widens the
/// live scope policy with that framework's known-useless URL patterns.
async fn ensure_framework_applied(
    active: &Arc<ActiveCrawl>,
    host: &str,
    document_html: &str,
    raw_links: &[extract::RawLink],
    rendered_network_urls: &[String],
    response: &FetchedResponse,
) {
    if active.frameworks.state_for(host).tag().is_some() {
        return;
    }

    if let Some(saved) = active.persistence.get_domain_framework(&active.project_id, host).await {
        if let Ok(tag) = FrameworkTag::from_str(&saved) {
            active.frameworks.record_detected(host, tag);
            apply_framework_filter(active, tag);
            return;
        }
    }

    if !active.frameworks.begin_detecting(host) {
        return;
    }

    let mut network_urls: Vec<String> = raw_links
        .iter()
        .filter(|l| l.link_type != crate::sink::LinkType::Anchor)
        .map(|l| l.raw_url.clone())
        .collect();
    network_urls.extend(rendered_network_urls.iter().cloned());
    let tag = framework::detect(document_html, &network_urls);
    active.frameworks.record_detected(host, tag);
    active
        .persistence
        .save_domain_framework(&active.project_id, host, &tag.to_string())
        .await;
    log::info!("detected framework {tag} for host {host} ({})", response.final_url);
    apply_framework_filter(active, tag);
}

fn apply_framework_filter(active: &Arc<ActiveCrawl>, tag: FrameworkTag) {
    let filter = framework::framework_filter(tag);
    if filter.url_deny_patterns.is_empty() && filter.query_param_deny.is_empty() {
        return;
    }
    let mut guard = active.scope.write().unwrap();
    match guard.with_additional_deny(&filter.url_deny_patterns, &filter.query_param_deny) {
        Ok(extended) => *guard = extended,
        Err(err) => log::warn!("failed to extend scope with {tag} filter: {err}"),
    }
}
