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

//! The full error taxonomy for the crawl engine.
//!
//! Per-URL errors (`NetworkError`, `Timeout`, `TooManyRedirects`, ...) never
//! unwind a worker task; they are captured into the relevant result and
//! handed to the sink. Only `InvalidUrl` at crawl-start time and
//! `AlreadyCrawling`/`UnknownCrawl` are propagated to the caller of the
//! public API.

use crate::url::InvalidUrlError;
use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum CrawlError {
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] InvalidUrlError),

    #[error("network error fetching {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("timed out fetching {url}")]
    Timeout { url: String },

    #[error("too many redirects starting at {url}")]
    TooManyRedirects { url: String },

    #[error("redirect from {from} to {to} blocked by scope: {reason}")]
    RedirectBlockedByScope {
        from: String,
        to: String,
        reason: String,
    },

    /// A redirect's destination is already owned by another in-flight or
    /// already-queued fetch (its fingerprint was marked seen before this
    /// hop tried to claim it). The caller must not treat this as a page
    /// error: the destination's own fetch is responsible for the result,
    /// and this hop has already been linked into its redirect chain.
    #[error("redirect from {from} to {to} is already owned by another fetch")]
    RedirectTargetOwnedElsewhere { from: String, to: String },

    #[error("headless renderer unavailable: {0}")]
    RendererUnavailable(String),

    #[error("failed to parse response from {url}: {reason}")]
    ParseFailure { url: String, reason: String },

    #[error("queue is full, retry on next discovery pass")]
    Backpressure,

    #[error("invalid crawl configuration: {0}")]
    InvalidConfig(String),

    #[error("a crawl for this host is already running (crawl id {0})")]
    AlreadyCrawling(String),

    #[error("no active crawl with id {0}")]
    UnknownCrawl(String),

    #[error("persistence collaborator failed: {0}")]
    PersistenceFailure(String),
}

/// A narrow, `Display`-only projection of [`CrawlError`] suitable for
/// embedding in [`crate::sink::PageResult`]/[`crate::sink::ResourceResult`]
/// without forcing those types to carry non-`Clone` sources.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RecordedError {
    pub kind: RecordedErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, strum::Display)]
pub enum RecordedErrorKind {
    NetworkError,
    Timeout,
    TooManyRedirects,
    RedirectBlockedByScope,
    RendererUnavailable,
    ParseFailure,
}

impl fmt::Display for RecordedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl CrawlError {
    /// Projects a per-URL error into the [`RecordedError`] embedded in
    /// result records. Returns `None` for the crawl-start-only variants
    /// that are never attached to a [`crate::sink::PageResult`].
    pub fn to_recorded(&self) -> Option<RecordedError> {
        let kind = match self {
            CrawlError::NetworkError { .. } => RecordedErrorKind::NetworkError,
            CrawlError::Timeout { .. } => RecordedErrorKind::Timeout,
            CrawlError::TooManyRedirects { .. } => RecordedErrorKind::TooManyRedirects,
            CrawlError::RedirectBlockedByScope { .. } => RecordedErrorKind::RedirectBlockedByScope,
            CrawlError::RendererUnavailable(_) => RecordedErrorKind::RendererUnavailable,
            CrawlError::ParseFailure { .. } => RecordedErrorKind::ParseFailure,
            _ => return None,
        };
        Some(RecordedError {
            kind,
            message: self.to_string(),
        })
    }
}
