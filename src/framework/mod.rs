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

//! The Framework Detector (component C9).
//!
//! A closed tagged variant, not a plugin surface — the teacher's
//! `blacklist` module shows the same shape (a fixed enum resolving to a
//! static filter configuration) for its blacklist types, and §9's design
//! note asks for exactly that discipline here: no arbitrary behavior
//! injection, only URL patterns and query-param names per tag.

mod rules;
mod state;

pub use rules::{baseline_deny_patterns, baseline_query_params, detect, framework_filter};
pub use state::{FrameworkState, HostFrameworkRegistry};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum FrameworkTag {
    Nextjs,
    React,
    Vue,
    Angular,
    Nuxtjs,
    Gatsby,
    Wordpress,
    Shopify,
    Webflow,
    Wix,
    Drupal,
    Joomla,
    Other,
}

/// The static per-tag filter configuration fed into
/// [`crate::scope::ScopePolicy::with_additional_deny`].
#[derive(Debug, Clone, Default)]
pub struct FrameworkFilter {
    pub url_deny_patterns: Vec<String>,
    pub query_param_deny: Vec<String>,
}
