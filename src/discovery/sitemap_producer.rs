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

//! Sitemap discovery, grounded on the teacher's
//! `crawl::crawler::sitemaps::retrieve_and_parse`: fetch candidate sitemap
//! URLs, feed the body through `sitemap::reader::SiteMapReader`, and
//! recursively expand `<sitemapindex>` entries. Gzipped sitemaps are
//! inflated with `flate2` before parsing.

use sitemap::reader::SiteMapEntity;
use std::io::{Cursor, Read};
use thiserror::Error;

const MAX_SITEMAP_INDEX_DEPTH: u8 = 5;

#[derive(Debug, Error)]
pub enum SitemapError {
    #[error("failed to fetch sitemap {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Fetches `sitemap_url`, recursively expanding any `<sitemapindex>`
/// entries up to [`MAX_SITEMAP_INDEX_DEPTH`], and returns every `<loc>`
/// URL found across the whole expansion.
pub async fn fetch_sitemap_urls(
    client: &reqwest::Client,
    sitemap_url: &str,
) -> Result<Vec<String>, SitemapError> {
    let mut collected = Vec::new();
    let mut pending = vec![(sitemap_url.to_string(), 0u8)];

    while let Some((url, depth)) = pending.pop() {
        if depth > MAX_SITEMAP_INDEX_DEPTH {
            continue;
        }
        let body = match fetch_body(client, &url).await {
            Ok(body) => body,
            Err(_) => continue,
        };
        let reader = sitemap::reader::SiteMapReader::new(Cursor::new(body));
        for entity in reader {
            match entity {
                SiteMapEntity::Url(entry) => {
                    if let Some(loc) = entry.loc.get_url() {
                        collected.push(loc.to_string());
                    }
                }
                SiteMapEntity::SiteMap(entry) => {
                    if let Some(loc) = entry.loc.get_url() {
                        pending.push((loc.to_string(), depth + 1));
                    }
                }
                SiteMapEntity::Err(_) => {}
            }
        }
    }

    Ok(collected)
}

async fn fetch_body(client: &reqwest::Client, url: &str) -> Result<String, SitemapError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|source| SitemapError::Fetch {
            url: url.to_string(),
            source,
        })?;
    let is_gzip = url.ends_with(".gz")
        || response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.contains("gzip"))
            .unwrap_or(false);
    let bytes = response.bytes().await.map_err(|source| SitemapError::Fetch {
        url: url.to_string(),
        source,
    })?;
    if is_gzip {
        let mut decoder = flate2::read::GzDecoder::new(&bytes[..]);
        let mut text = String::new();
        if decoder.read_to_string(&mut text).is_ok() {
            return Ok(text);
        }
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unreachable_sitemap_returns_empty_without_erroring() {
        let client = reqwest::Client::new();
        let urls = fetch_sitemap_urls(&client, "http://127.0.0.1:1/sitemap.xml")
            .await
            .unwrap();
        assert!(urls.is_empty());
    }
}
