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

//! The Scope Filter (component C2): a pure, I/O-free decision function.
//!
//! Modeled on the teacher's regex-set blacklist (`blacklist::lists`), but
//! generalized into a full policy: host pattern, deny patterns, deny query
//! params, and depth, each contributing a distinct [`SkipReason`].

mod deny_list;

pub use deny_list::UrlDenyList;

use crate::url::CanonicalUrl;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// The outcome of classifying a discovered URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    /// Fetch this URL.
    Crawl,
    /// Out of scope but link-graph relevant (e.g. an external link): keep
    /// it in the page's link inventory, never fetch it.
    RecordOnly { reason: SkipReason },
    /// Drop entirely; not even recorded as a link.
    Skip { reason: SkipReason },
}

impl Decision {
    pub fn is_crawl(&self) -> bool {
        matches!(self, Decision::Crawl)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum SkipReason {
    UnsupportedScheme,
    OutOfHost,
    DeniedUrlPattern,
    DeniedQueryParam,
    DepthExceeded,
}

/// `{ hostPattern, includeSubdomains, urlDenyPatterns, queryParamDenyList,
/// maxDepth }` from the data model, plus the compiled forms needed to
/// evaluate them without allocating on every call.
#[derive(Debug, Clone)]
pub struct ScopePolicy {
    host: String,
    include_subdomains: bool,
    url_deny: UrlDenyList,
    pub query_param_deny: Vec<String>,
    /// 0 = unlimited, 1 = seed only.
    max_depth: u32,
}

impl ScopePolicy {
    pub fn new(
        host: impl Into<String>,
        include_subdomains: bool,
        url_deny_patterns: &[String],
        query_param_deny: Vec<String>,
        max_depth: u32,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            host: host.into().to_ascii_lowercase(),
            include_subdomains,
            url_deny: UrlDenyList::new(url_deny_patterns)?,
            query_param_deny,
            max_depth,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Appends more deny patterns (e.g. framework-specific ones detected by
    /// [`crate::framework`] after the policy was first created) without
    /// losing the baseline set. Returns a new policy since [`UrlDenyList`]
    /// is a compiled `RegexSet` and cannot be mutated in place.
    pub fn with_additional_deny(
        &self,
        extra_url_patterns: &[String],
        extra_query_params: &[String],
    ) -> Result<Self, regex::Error> {
        let mut patterns = self.url_deny.patterns().to_vec();
        patterns.extend(extra_url_patterns.iter().cloned());
        let mut query_param_deny = self.query_param_deny.clone();
        query_param_deny.extend(extra_query_params.iter().cloned());
        query_param_deny.sort();
        query_param_deny.dedup();
        Ok(Self {
            host: self.host.clone(),
            include_subdomains: self.include_subdomains,
            url_deny: UrlDenyList::new(&patterns)?,
            query_param_deny,
            max_depth: self.max_depth,
        })
    }

    /// Whether `candidate_host` belongs to this policy's site, independent
    /// of any deny-pattern/depth verdict — used to label a link
    /// internal/external in the link inventory even when the link itself
    /// is denied or depth-exceeded.
    pub fn is_internal_host(&self, candidate_host: &str) -> bool {
        self.host_in_scope(candidate_host)
    }

    fn host_in_scope(&self, candidate_host: &str) -> bool {
        let candidate_host = candidate_host.to_ascii_lowercase();
        if candidate_host == self.host {
            return true;
        }
        self.include_subdomains
            && candidate_host
                .strip_suffix(&format!(".{}", self.host))
                .is_some()
    }

    /// Classifies `url` discovered at `depth` (0 = the seed itself).
    pub fn classify(&self, url: &CanonicalUrl, depth: u32) -> Decision {
        if url.scheme() != "http" && url.scheme() != "https" {
            return Decision::Skip {
                reason: SkipReason::UnsupportedScheme,
            };
        }

        if !self.host_in_scope(url.host()) {
            // Out-of-host links are still interesting for the link graph.
            return Decision::RecordOnly {
                reason: SkipReason::OutOfHost,
            };
        }

        if self.url_deny.is_match(url.as_url().as_str()) {
            return Decision::Skip {
                reason: SkipReason::DeniedUrlPattern,
            };
        }

        if url_has_denied_param(url, &self.query_param_deny) {
            return Decision::Skip {
                reason: SkipReason::DeniedQueryParam,
            };
        }

        if self.max_depth != 0 && depth > self.max_depth.saturating_sub(1) {
            return Decision::Skip {
                reason: SkipReason::DepthExceeded,
            };
        }

        Decision::Crawl
    }
}

fn url_has_denied_param(url: &CanonicalUrl, deny: &[String]) -> bool {
    if deny.is_empty() {
        return false;
    }
    url.as_url()
        .query_pairs()
        .any(|(k, _)| deny.iter().any(|d| d.eq_ignore_ascii_case(&k)))
}

/// Helper used by tests and by `host_pattern` style configuration that
/// supplies a regex instead of a literal host; only exact-match regexes
/// are supported here — full regex host matching belongs to the
/// collaborator-facing config layer, not this pure decision function.
pub fn host_matches_pattern(pattern: &Regex, host: &str) -> bool {
    pattern.is_match(host)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> ScopePolicy {
        ScopePolicy::new("example.com", false, &[], vec![], 0).unwrap()
    }

    fn url(raw: &str) -> CanonicalUrl {
        CanonicalUrl::parse(raw, None, &[]).unwrap()
    }

    #[test]
    fn in_host_is_crawled() {
        assert_eq!(policy().classify(&url("http://example.com/x"), 1), Decision::Crawl);
    }

    #[test]
    fn subdomain_excluded_by_default() {
        let decision = policy().classify(&url("http://blog.example.com/x"), 1);
        assert_eq!(
            decision,
            Decision::RecordOnly {
                reason: SkipReason::OutOfHost
            }
        );
    }

    #[test]
    fn subdomain_included_when_configured() {
        let policy = ScopePolicy::new("example.com", true, &[], vec![], 0).unwrap();
        assert_eq!(
            policy.classify(&url("http://blog.example.com/x"), 1),
            Decision::Crawl
        );
    }

    #[test]
    fn other_host_is_record_only() {
        assert_eq!(
            policy().classify(&url("https://other.test/x"), 1),
            Decision::RecordOnly {
                reason: SkipReason::OutOfHost
            }
        );
    }

    #[test]
    fn deny_pattern_skips() {
        let policy =
            ScopePolicy::new("example.com", false, &["/admin".to_string()], vec![], 0).unwrap();
        assert_eq!(
            policy.classify(&url("http://example.com/admin/x"), 1),
            Decision::Skip {
                reason: SkipReason::DeniedUrlPattern
            }
        );
    }

    #[test]
    fn deny_pattern_is_case_insensitive() {
        let policy =
            ScopePolicy::new("example.com", false, &["/admin".to_string()], vec![], 0).unwrap();
        assert_eq!(
            policy.classify(&url("http://example.com/ADMIN/x"), 1),
            Decision::Skip {
                reason: SkipReason::DeniedUrlPattern
            }
        );
    }

    #[test]
    fn deny_query_param_skips() {
        let policy =
            ScopePolicy::new("example.com", false, &[], vec!["utm_source".to_string()], 0)
                .unwrap();
        assert_eq!(
            policy.classify(&url("http://example.com/x?utm_source=a"), 1),
            Decision::Skip {
                reason: SkipReason::DeniedQueryParam
            }
        );
    }

    #[test]
    fn max_depth_one_is_seed_only() {
        let policy = ScopePolicy::new("example.com", false, &[], vec![], 1).unwrap();
        assert_eq!(policy.classify(&url("http://example.com/"), 0), Decision::Crawl);
        assert_eq!(
            policy.classify(&url("http://example.com/x"), 1),
            Decision::Skip {
                reason: SkipReason::DepthExceeded
            }
        );
    }

    #[test]
    fn max_depth_zero_is_unlimited() {
        let policy = policy();
        assert_eq!(policy.classify(&url("http://example.com/x"), 9999), Decision::Crawl);
    }

    #[test]
    fn is_internal_host_respects_subdomain_setting() {
        let policy = policy();
        assert!(policy.is_internal_host("example.com"));
        assert!(!policy.is_internal_host("blog.example.com"));
        let with_subdomains = ScopePolicy::new("example.com", true, &[], vec![], 0).unwrap();
        assert!(with_subdomains.is_internal_host("blog.example.com"));
    }

    #[test]
    fn with_additional_deny_keeps_baseline() {
        let policy =
            ScopePolicy::new("example.com", false, &["/admin".to_string()], vec![], 0).unwrap();
        let extended = policy
            .with_additional_deny(&["/_next/static".to_string()], &["fbclid".to_string()])
            .unwrap();
        assert_eq!(
            extended.classify(&url("http://example.com/admin"), 1),
            Decision::Skip {
                reason: SkipReason::DeniedUrlPattern
            }
        );
        assert_eq!(
            extended.classify(&url("http://example.com/_next/static/chunk.js"), 1),
            Decision::Skip {
                reason: SkipReason::DeniedUrlPattern
            }
        );
    }
}
