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

//! A per-crawl cookie jar.
//!
//! The teacher keeps its own domain-keyed `InMemoryCookieManager`
//! (`cookies::manager`) because it needs cookies configurable per host from
//! static config. Nothing in this spec configures cookies ahead of time —
//! the only requirement is that cookies set by one response are sent back
//! on later requests to the same host for the lifetime of a single crawl,
//! which is exactly `reqwest::cookie::Jar`'s RFC 6265 behaviour. One `Jar`
//! is created per crawl and handed to the [`crate::fetch::Fetcher`] it
//! backs; it is dropped, not reused, once the crawl ends.

use reqwest::cookie::Jar;
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct CookieJar(Jar);

impl CookieJar {
    pub fn new() -> Arc<Self> {
        Arc::new(Self(Jar::default()))
    }
}

impl reqwest::cookie::CookieStore for CookieJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &reqwest::header::HeaderValue>, url: &url::Url) {
        self.0.set_cookies(cookie_headers, url)
    }

    fn cookies(&self, url: &url::Url) -> Option<reqwest::header::HeaderValue> {
        self.0.cookies(url)
    }
}
