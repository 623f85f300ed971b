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

//! Per-host framework state, read-mostly after first detection — the
//! teacher guards its comparable per-host maps (`blacklist::manager`,
//! `link_state`) behind a `RwLock`-backed map for the same access pattern.

use super::FrameworkTag;
use std::collections::HashMap;
use std::sync::RwLock;

/// `unknown -> detecting -> detected(tag)`, with a sticky `manual(tag)`
/// override that auto-detection can never overwrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameworkState {
    Unknown,
    Detecting,
    Detected(FrameworkTag),
    Manual(FrameworkTag),
}

impl FrameworkState {
    pub fn tag(&self) -> Option<FrameworkTag> {
        match self {
            FrameworkState::Detected(tag) | FrameworkState::Manual(tag) => Some(*tag),
            _ => None,
        }
    }

    pub fn is_manual(&self) -> bool {
        matches!(self, FrameworkState::Manual(_))
    }
}

#[derive(Debug, Default)]
pub struct HostFrameworkRegistry {
    hosts: RwLock<HashMap<String, FrameworkState>>,
}

impl HostFrameworkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state_for(&self, host: &str) -> FrameworkState {
        self.hosts
            .read()
            .unwrap()
            .get(host)
            .copied()
            .unwrap_or(FrameworkState::Unknown)
    }

    /// Marks `host` as currently being detected, returning `true` iff this
    /// call performed the transition (i.e. the caller should run
    /// detection); concurrent callers racing on the same never-seen host
    /// all but one get `false` and should wait for the result elsewhere.
    pub fn begin_detecting(&self, host: &str) -> bool {
        let mut hosts = self.hosts.write().unwrap();
        match hosts.get(host) {
            None => {
                hosts.insert(host.to_string(), FrameworkState::Detecting);
                true
            }
            Some(_) => false,
        }
    }

    pub fn record_detected(&self, host: &str, tag: FrameworkTag) {
        let mut hosts = self.hosts.write().unwrap();
        if !matches!(hosts.get(host), Some(FrameworkState::Manual(_))) {
            hosts.insert(host.to_string(), FrameworkState::Detected(tag));
        }
    }

    /// A user-set override. Permanent: once manual, auto-detection never
    /// overwrites it again.
    pub fn set_manual(&self, host: &str, tag: FrameworkTag) {
        self.hosts
            .write()
            .unwrap()
            .insert(host.to_string(), FrameworkState::Manual(tag));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_host_transitions_to_detecting_once() {
        let registry = HostFrameworkRegistry::new();
        assert!(registry.begin_detecting("example.com"));
        assert!(!registry.begin_detecting("example.com"));
        assert_eq!(registry.state_for("example.com"), FrameworkState::Detecting);
    }

    #[test]
    fn manual_override_is_sticky_against_detection() {
        let registry = HostFrameworkRegistry::new();
        registry.set_manual("example.com", FrameworkTag::Wordpress);
        registry.record_detected("example.com", FrameworkTag::Nextjs);
        assert_eq!(
            registry.state_for("example.com").tag(),
            Some(FrameworkTag::Wordpress)
        );
    }

    #[test]
    fn detection_result_is_retained() {
        let registry = HostFrameworkRegistry::new();
        registry.begin_detecting("example.com");
        registry.record_detected("example.com", FrameworkTag::React);
        assert_eq!(
            registry.state_for("example.com").tag(),
            Some(FrameworkTag::React)
        );
    }
}
