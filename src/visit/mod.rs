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

//! The Visit Store (component C3).
//!
//! The teacher crate splits link-state tracking (`link_state::manager`)
//! from the HTTP transport, which is exactly the seam the design notes
//! (`SPEC_FULL.md` §9) call out as the source of the canonical redirect
//! race: a destination discovered independently while a redirect to it is
//! in flight must not be fetched twice. This module consolidates
//! mark-as-seen into a single, strictly synchronous, mutex-guarded
//! structure so the [`crate::fetch`] redirect callback — which `reqwest`
//! invokes synchronously — can call [`VisitStore::mark_if_absent`]
//! directly, with no `await` between "redirect observed" and "destination
//! marked".

use crate::url::Fingerprint;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

#[derive(Debug, Default)]
struct Inner {
    seen: HashSet<Fingerprint>,
    /// final fingerprint -> intermediate URLs that redirected to it, in the
    /// order they were observed. Keyed by fingerprint (the dedup identity)
    /// but valued by URL string since a [`crate::sink::PageResult`] needs
    /// the actual chain, not an opaque hash.
    redirect_chains: HashMap<Fingerprint, Vec<String>>,
}

/// Per-crawl, created on [`crate::controller::CrawlController::start_crawl`]
/// and dropped on completion, per the data model's lifecycle rule.
#[derive(Debug, Default)]
pub struct VisitStore {
    inner: Mutex<Inner>,
}

impl VisitStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically marks `fingerprint` as seen. Returns `true` the first
    /// time this is called for a given fingerprint, `false` on every
    /// subsequent call. This is the entire redirect-race-safety contract:
    /// callers MUST treat a `false` return as "someone else owns this
    /// fetch" and must not fetch again.
    pub fn mark_if_absent(&self, fingerprint: Fingerprint) -> bool {
        self.inner.lock().unwrap().seen.insert(fingerprint)
    }

    pub fn is_seen(&self, fingerprint: Fingerprint) -> bool {
        self.inner.lock().unwrap().seen.contains(&fingerprint)
    }

    /// Binds an intermediate redirect hop's URL to the final URL it
    /// eventually resolves to. Idempotent under repeated calls for the same
    /// pair. Called both by the fetch that followed the hop itself and, for
    /// a hop whose destination turned out to be owned by a different
    /// in-flight or already-queued fetch, by the fetch that detected the
    /// race (see [`crate::fetch::Fetcher::fetch`]) so the chain still
    /// reaches whichever fetch ultimately produces the final result.
    pub fn link_redirect(&self, final_fp: Fingerprint, intermediate_url: String) {
        let mut guard = self.inner.lock().unwrap();
        let chain = guard.redirect_chains.entry(final_fp).or_default();
        if !chain.contains(&intermediate_url) {
            chain.push(intermediate_url);
        }
    }

    /// Consumes and returns the redirect chain recorded for `final_fp`.
    /// Consume-once: a second call for the same fingerprint returns an
    /// empty vec, which is what makes "exactly one page result per chain"
    /// achievable even if two workers raced to extract the same final URL
    /// (only one of them will see the chain).
    pub fn take_redirect_chain(&self, final_fp: Fingerprint) -> Vec<String> {
        self.inner
            .lock()
            .unwrap()
            .redirect_chains
            .remove(&final_fp)
            .unwrap_or_default()
    }

    pub fn seen_count(&self) -> usize {
        self.inner.lock().unwrap().seen.len()
    }
}
