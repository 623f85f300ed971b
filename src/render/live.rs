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

//! The `render`-feature-enabled implementation. One `Browser` per crawl,
//! reused across pages: launching a fresh Chromium process per page would
//! dwarf the per-request timeouts the rest of the engine works within.

use super::RenderedPage;
use crate::error::CrawlError;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::EventResponseReceived;
use futures::StreamExt;
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::Mutex;

pub struct Renderer {
    browser: Mutex<Browser>,
    _handler: tokio::task::JoinHandle<()>,
    initial_wait: Duration,
    scroll_wait: Duration,
    final_wait: Duration,
}

impl Renderer {
    pub async fn launch(initial_wait: Duration, scroll_wait: Duration, final_wait: Duration) -> Result<Self, CrawlError> {
        let config = BrowserConfig::builder()
            .build()
            .map_err(|err| CrawlError::RendererUnavailable(err))?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|err| CrawlError::RendererUnavailable(err.to_string()))?;
        let handler_task = tokio::spawn(async move {
            while handler.next().await.is_some() {}
        });
        Ok(Self {
            browser: Mutex::new(browser),
            _handler: handler_task,
            initial_wait,
            scroll_wait,
            final_wait,
        })
    }

    /// Navigates to `url`, waits for the DOM, scrolls to the bottom and
    /// back (to trigger lazy-loaded content and infinite-scroll fetches),
    /// then captures the rendered HTML plus every URL the page requested.
    pub async fn render(&self, url: &str) -> Result<RenderedPage, CrawlError> {
        let browser = self.browser.lock().await;
        let page = browser
            .new_page(url)
            .await
            .map_err(|err| CrawlError::RendererUnavailable(err.to_string()))?;

        let mut events = page
            .event_listener::<EventResponseReceived>()
            .await
            .map_err(|err| CrawlError::RendererUnavailable(err.to_string()))?;
        let collector = tokio::spawn(async move {
            let mut seen = HashSet::new();
            while let Some(event) = events.next().await {
                seen.insert(event.response.url.clone());
            }
            seen
        });

        page.wait_for_navigation()
            .await
            .map_err(|err| CrawlError::RendererUnavailable(err.to_string()))?;
        tokio::time::sleep(self.initial_wait).await;
        let _ = page.evaluate("window.scrollTo(0, document.body.scrollHeight)").await;
        tokio::time::sleep(self.scroll_wait).await;
        let _ = page.evaluate("window.scrollTo(0, 0)").await;
        tokio::time::sleep(self.final_wait).await;

        let html = page
            .content()
            .await
            .map_err(|err| CrawlError::RendererUnavailable(err.to_string()))?;
        let _ = page.close().await;

        let network_urls = collector.await.unwrap_or_default().into_iter().collect();
        Ok(RenderedPage { html, network_urls })
    }
}
