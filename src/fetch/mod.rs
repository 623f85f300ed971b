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

//! The Fetcher (component C5).
//!
//! The teacher builds its client with `reqwest`'s own `redirect::Policy`
//! (`client::classic::build_classic_client`), a sync closure shared by
//! every concurrent request on that client. That shape cannot satisfy the
//! redirect-race-safety contract here: each hop must consult the *current*
//! [`crate::scope::ScopePolicy`] (which the Framework Detector mutates
//! mid-crawl) and accumulate a chain scoped to *this* request only, not a
//! closure shared across every in-flight fetch. So redirects are followed
//! manually in an explicit loop instead of delegated to `reqwest` — kept
//! otherwise as close to the teacher's client construction (timeouts,
//! user agent, cookie jar) as the rest of this module shows.

mod cookies;

pub use cookies::CookieJar;

use crate::error::CrawlError;
use crate::scope::Decision;
use crate::url::{fingerprint, CanonicalUrl};
use crate::visit::VisitStore;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, LOCATION};
use reqwest::StatusCode;
use std::sync::{Arc, RwLock};
use std::time::Duration;

pub const MAX_REDIRECTS: u8 = 10;

#[derive(Debug, Clone)]
pub struct FetchedResponse {
    pub requested_url: CanonicalUrl,
    pub final_url: CanonicalUrl,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub content_type: Option<mime::Mime>,
    /// URLs of every intermediate redirect hop that led to `final_url`, in
    /// order: the hops this fetch itself followed, plus any hop that was
    /// separately discovered and redirected here while owned by a
    /// different fetch (merged in via [`VisitStore::take_redirect_chain`]).
    pub redirect_chain: Vec<String>,
}

pub struct Fetcher {
    client: reqwest::Client,
    scope: Arc<RwLock<crate::scope::ScopePolicy>>,
    visit: Arc<VisitStore>,
    request_timeout: Duration,
}

impl Fetcher {
    pub fn new(
        user_agent: &str,
        request_timeout: Duration,
        connect_timeout: Duration,
        accept_invalid_certs: bool,
        cookie_jar: Arc<CookieJar>,
        scope: Arc<RwLock<crate::scope::ScopePolicy>>,
        visit: Arc<VisitStore>,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .connect_timeout(connect_timeout)
            .redirect(reqwest::redirect::Policy::none())
            .cookie_provider(cookie_jar)
            .build()?;
        Ok(Self {
            client,
            scope,
            visit,
            request_timeout,
        })
    }

    /// Performs one logical HTTP transaction: the initial request plus up
    /// to [`MAX_REDIRECTS`] redirect hops. `requested_url`'s fingerprint is
    /// assumed already marked seen by the caller (the discovery pipeline
    /// marks a URL before it ever reaches the queue); this function only
    /// marks *redirect destinations*, per the race-safety contract.
    pub async fn fetch(&self, requested_url: &CanonicalUrl) -> Result<FetchedResponse, CrawlError> {
        let mut current = requested_url.clone();
        let mut intermediates: Vec<String> = Vec::new();

        for hop in 0..=MAX_REDIRECTS {
            let response = tokio::time::timeout(self.request_timeout, self.client.get(current.as_url().clone()).send())
                .await
                .map_err(|_| CrawlError::Timeout {
                    url: current.to_string(),
                })?
                .map_err(|source| CrawlError::NetworkError {
                    url: current.to_string(),
                    source,
                })?;

            if !response.status().is_redirection() {
                let final_fp = fingerprint("GET", &current, None);
                for intermediate in &intermediates {
                    self.visit.link_redirect(final_fp, intermediate.clone());
                }
                let mut redirect_chain = intermediates;
                redirect_chain.extend(self.visit.take_redirect_chain(final_fp));
                let status = response.status();
                let headers = response.headers().clone();
                let content_type = content_type_of(&headers);
                let body = response
                    .bytes()
                    .await
                    .map_err(|source| CrawlError::NetworkError {
                        url: current.to_string(),
                        source,
                    })?;
                return Ok(FetchedResponse {
                    requested_url: requested_url.clone(),
                    final_url: current,
                    status,
                    headers,
                    body,
                    content_type,
                    redirect_chain,
                });
            }

            if hop == MAX_REDIRECTS {
                return Err(CrawlError::TooManyRedirects {
                    url: requested_url.to_string(),
                });
            }

            let destination = match extract_location(&current, response.headers()) {
                Some(dest) => dest,
                None => {
                    return Err(CrawlError::ParseFailure {
                        url: current.to_string(),
                        reason: "redirect response carried no Location header".to_string(),
                    })
                }
            };

            let destination = CanonicalUrl::from_url(destination, &self.deny_params())
                .map_err(CrawlError::InvalidUrl)?;

            let decision = self.scope.read().unwrap().classify(&destination, 0);
            let reason = match decision {
                Decision::Crawl => None,
                Decision::RecordOnly { reason } | Decision::Skip { reason } => Some(reason),
            };
            if let Some(reason) = reason {
                return Err(CrawlError::RedirectBlockedByScope {
                    from: current.to_string(),
                    to: destination.to_string(),
                    reason: reason.to_string(),
                });
            }

            let destination_fp = fingerprint("GET", &destination, None);
            // Redirect-race-safety contract: mark BEFORE following. If
            // someone else already owns this destination (another hop's
            // fetch, or the destination's own top-level queue item), hand
            // off every hop seen so far as its intermediate chain instead
            // of issuing a second GET for the same final URL.
            if !self.visit.mark_if_absent(destination_fp) {
                self.visit.link_redirect(destination_fp, current.to_string());
                for intermediate in &intermediates {
                    self.visit.link_redirect(destination_fp, intermediate.clone());
                }
                return Err(CrawlError::RedirectTargetOwnedElsewhere {
                    from: requested_url.to_string(),
                    to: destination.to_string(),
                });
            }
            intermediates.push(current.to_string());
            current = destination;
        }

        unreachable!("loop always returns by hop == MAX_REDIRECTS")
    }

    fn deny_params(&self) -> Vec<String> {
        self.scope.read().unwrap().query_param_deny.clone()
    }

    /// The underlying transport, shared with the robots.txt and sitemap
    /// fetchers so a crawl uses exactly one connection pool.
    pub fn http_client(&self) -> &reqwest::Client {
        &self.client
    }
}

fn extract_location(base: &CanonicalUrl, headers: &HeaderMap) -> Option<url::Url> {
    let location = headers.get(LOCATION)?.to_str().ok()?;
    url::Url::options()
        .base_url(Some(base.as_url()))
        .parse(location)
        .ok()
}

fn content_type_of(headers: &HeaderMap) -> Option<mime::Mime> {
    headers
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<mime::Mime>().ok())
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher").finish_non_exhaustive()
    }
}

/// Classifies a fetched response's content type for C5's dispatch rule:
/// HTML goes to the Extractor, everything else becomes a resource result.
pub fn is_html(content_type: Option<&mime::Mime>) -> bool {
    content_type
        .map(|m| m.type_() == mime::TEXT && m.subtype() == mime::HTML)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_of_parses_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            reqwest::header::CONTENT_TYPE,
            HeaderValue::from_static("text/html; charset=utf-8"),
        );
        let parsed = content_type_of(&headers).unwrap();
        assert!(is_html(Some(&parsed)));
    }

    #[test]
    fn non_html_content_type_is_not_html() {
        let mut headers = HeaderMap::new();
        headers.insert(
            reqwest::header::CONTENT_TYPE,
            HeaderValue::from_static("image/png"),
        );
        let parsed = content_type_of(&headers).unwrap();
        assert!(!is_html(Some(&parsed)));
    }

    #[test]
    fn missing_content_type_is_not_html() {
        assert!(!is_html(None));
    }
}
