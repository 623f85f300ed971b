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

//! The optional headless Renderer (component C6), gated behind the
//! `render` feature and backed by `chromiumoxide`, grounded on the pack's
//! browser-instrumentation example (`Browser::launch`, a spawned handler
//! loop draining the event stream, `Page::event_listener`). Without the
//! feature, [`Renderer::launch`] always returns `RendererUnavailable` so
//! the Crawl Controller's fallback-to-raw-fetch path is the only path.

#[cfg(feature = "render")]
mod live;

use crate::error::CrawlError;
use std::time::Duration;

pub struct RenderedPage {
    pub html: String,
    pub network_urls: Vec<String>,
}

#[cfg(feature = "render")]
pub use live::Renderer;

#[cfg(not(feature = "render"))]
pub struct Renderer;

#[cfg(not(feature = "render"))]
impl Renderer {
    pub async fn launch(_initial_wait: Duration, _scroll_wait: Duration, _final_wait: Duration) -> Result<Self, CrawlError> {
        Err(CrawlError::RendererUnavailable(
            "built without the render feature".to_string(),
        ))
    }

    pub async fn render(&self, _url: &str) -> Result<RenderedPage, CrawlError> {
        Err(CrawlError::RendererUnavailable(
            "built without the render feature".to_string(),
        ))
    }
}
