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

//! Per-crawl robots.txt cache, grounded on the teacher's
//! `robots::cached::CachedRobots`: one entry per host, fetched at most
//! once, either `HasRobots` or `NoRobots`. Consultation is gated entirely
//! by [`crate::config::RobotsTxtMode`] — when set to `Ignore`, callers
//! skip this module altogether.

use std::collections::HashMap;
use texting_robots::Robot;
use tokio::sync::Mutex;

enum CachedRobots {
    HasRobots(Robot),
    NoRobots,
}

impl CachedRobots {
    fn allowed(&self, path: &str) -> bool {
        match self {
            CachedRobots::HasRobots(robot) => robot.allowed(path),
            CachedRobots::NoRobots => true,
        }
    }

    fn sitemaps(&self) -> &[String] {
        match self {
            CachedRobots::HasRobots(robot) => &robot.sitemaps,
            CachedRobots::NoRobots => &[],
        }
    }
}

#[derive(Default)]
pub struct RobotsCache {
    by_host: Mutex<HashMap<String, CachedRobots>>,
}

impl RobotsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetches `http(s)://<host>/robots.txt` once per host for the
    /// lifetime of this cache (i.e. per crawl); subsequent calls reuse the
    /// cached verdict even if the fetch failed.
    pub async fn is_allowed(
        &self,
        client: &reqwest::Client,
        scheme: &str,
        host: &str,
        user_agent: &str,
        path: &str,
    ) -> bool {
        let mut guard = self.by_host.lock().await;
        if !guard.contains_key(host) {
            let fetched = fetch(client, scheme, host, user_agent).await;
            guard.insert(host.to_string(), fetched);
        }
        guard.get(host).unwrap().allowed(path)
    }

    pub async fn sitemaps_for(&self, host: &str) -> Vec<String> {
        self.by_host
            .lock()
            .await
            .get(host)
            .map(|c| c.sitemaps().to_vec())
            .unwrap_or_default()
    }
}

async fn fetch(client: &reqwest::Client, scheme: &str, host: &str, user_agent: &str) -> CachedRobots {
    let url = format!("{scheme}://{host}/robots.txt");
    match client.get(&url).send().await {
        Ok(response) if response.status().is_success() => match response.bytes().await {
            Ok(body) => match Robot::new(user_agent, &body) {
                Ok(robot) => CachedRobots::HasRobots(robot),
                Err(_) => CachedRobots::NoRobots,
            },
            Err(_) => CachedRobots::NoRobots,
        },
        _ => CachedRobots::NoRobots,
    }
}
