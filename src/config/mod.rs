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

//! Layered crawl configuration, modeled on the teacher's `app::config`
//! `try_load_from_path`/`discover_or_default` split: defaults, then an
//! optional file, then `CRAWLER_`-prefixed environment variables.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RobotsTxtMode {
    Respect,
    Ignore,
}

impl Default for RobotsTxtMode {
    fn default() -> Self {
        RobotsTxtMode::Respect
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryMechanism {
    Spider,
    Sitemap,
}

/// Every option enumerated in the external-interfaces configuration surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    pub js_rendering_enabled: bool,
    pub initial_wait_ms: u64,
    pub scroll_wait_ms: u64,
    pub final_wait_ms: u64,
    pub global_parallelism: usize,
    pub per_host_parallelism: usize,
    pub user_agent: String,
    pub include_subdomains: bool,
    pub discovery_mechanisms: Vec<DiscoveryMechanism>,
    pub sitemap_urls: Vec<String>,
    pub check_external_resources: bool,
    pub single_page_mode: bool,
    pub robots_txt_mode: RobotsTxtMode,
    pub follow_internal_nofollow: bool,
    pub follow_external_nofollow: bool,
    pub respect_meta_robots_noindex: bool,
    pub respect_x_robots_tag_noindex: bool,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub queue_capacity: usize,
    pub url_deny_patterns: Vec<String>,
    pub query_param_deny_list: Vec<String>,
    pub max_depth: u32,
    pub log_to_file: bool,
    pub log_level: String,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            js_rendering_enabled: false,
            initial_wait_ms: 1500,
            scroll_wait_ms: 2000,
            final_wait_ms: 1000,
            global_parallelism: 5,
            per_host_parallelism: 2,
            user_agent: concat!("sitecrawl/", env!("CARGO_PKG_VERSION")).to_string(),
            include_subdomains: false,
            discovery_mechanisms: vec![DiscoveryMechanism::Spider, DiscoveryMechanism::Sitemap],
            sitemap_urls: Vec::new(),
            check_external_resources: false,
            single_page_mode: false,
            robots_txt_mode: RobotsTxtMode::Respect,
            follow_internal_nofollow: true,
            follow_external_nofollow: false,
            respect_meta_robots_noindex: true,
            respect_x_robots_tag_noindex: true,
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
            queue_capacity: 10_000,
            url_deny_patterns: Vec::new(),
            query_param_deny_list: baseline_tracking_params(),
            max_depth: 0,
            log_to_file: false,
            log_level: "info".to_string(),
        }
    }
}

/// Inclusive bounds on `global_parallelism`/`per_host_parallelism`.
pub const PARALLELISM_RANGE: std::ops::RangeInclusive<usize> = 1..=100;

impl CrawlConfig {
    /// Rejects out-of-range parallelism rather than silently clamping it,
    /// since a config of e.g. 100000 spawning that many worker tasks is a
    /// caller mistake worth surfacing, not absorbing.
    pub fn validate(&self) -> Result<(), crate::error::CrawlError> {
        if !PARALLELISM_RANGE.contains(&self.global_parallelism) {
            return Err(crate::error::CrawlError::InvalidConfig(format!(
                "global_parallelism must be in {}..={}, got {}",
                PARALLELISM_RANGE.start(),
                PARALLELISM_RANGE.end(),
                self.global_parallelism
            )));
        }
        if !PARALLELISM_RANGE.contains(&self.per_host_parallelism) {
            return Err(crate::error::CrawlError::InvalidConfig(format!(
                "per_host_parallelism must be in {}..={}, got {}",
                PARALLELISM_RANGE.start(),
                PARALLELISM_RANGE.end(),
                self.per_host_parallelism
            )));
        }
        Ok(())
    }

    pub fn effective_max_depth(&self) -> u32 {
        if self.single_page_mode {
            1
        } else {
            self.max_depth
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn discovery_enabled(&self, mechanism: DiscoveryMechanism) -> bool {
        self.discovery_mechanisms.contains(&mechanism)
    }

    /// Loads config from `path` (no extension — `config::File::with_name`
    /// probes `.toml`/`.yaml`/`.json`), falling back to a file-less
    /// environment-only load when `path` does not exist.
    pub fn try_load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?)
            .add_source(config::File::with_name(&path.as_ref().to_string_lossy()).required(false))
            .add_source(config::Environment::with_prefix("CRAWLER").separator("__"))
            .build()?
            .try_deserialize()
    }

    /// Discovers `./crawler.{toml,yaml,json}` if present, else defaults
    /// overridden only by environment variables.
    pub fn discover_or_default() -> Self {
        match config::Config::builder()
            .add_source(config::File::with_name("./crawler").required(false))
            .add_source(config::Environment::with_prefix("CRAWLER").separator("__"))
            .build()
            .and_then(|c| c.try_deserialize())
        {
            Ok(cfg) => cfg,
            Err(_) => Self::default(),
        }
    }
}

fn baseline_tracking_params() -> Vec<String> {
    [
        "utm_source",
        "utm_medium",
        "utm_campaign",
        "utm_term",
        "utm_content",
        "gclid",
        "fbclid",
        "msclkid",
        "mc_eid",
        "_ga",
        "_gl",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
