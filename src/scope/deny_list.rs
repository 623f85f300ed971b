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

use regex::{RegexSet, RegexSetBuilder};

/// A case-insensitive substring deny-list backed by a single compiled
/// `RegexSet`, mirroring the teacher's `blacklist::lists::RegexBlackList`.
/// A pattern is compiled as a literal substring unless it already contains
/// regex metacharacters, so operators can write either plain substrings
/// (per the spec's "case-insensitive substring" rule) or precise patterns
/// for things like hashed asset paths.
#[derive(Debug, Clone)]
pub struct UrlDenyList {
    patterns: Vec<String>,
    set: RegexSet,
}

impl UrlDenyList {
    pub fn new(patterns: &[String]) -> Result<Self, regex::Error> {
        let compiled: Vec<String> = patterns.iter().map(|p| escape_if_literal(p)).collect();
        let set = RegexSetBuilder::new(&compiled)
            .case_insensitive(true)
            .build()?;
        Ok(Self {
            patterns: patterns.to_vec(),
            set,
        })
    }

    pub fn is_match(&self, url: &str) -> bool {
        self.set.is_match(url)
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

const SPECIAL: &[char] = &[
    '\\', '.', '+', '*', '?', '(', ')', '|', '[', ']', '{', '}', '^', '$',
];

fn looks_like_regex(pattern: &str) -> bool {
    pattern.chars().any(|c| SPECIAL.contains(&c))
}

fn escape_if_literal(pattern: &str) -> String {
    if looks_like_regex(pattern) {
        pattern.to_string()
    } else {
        regex::escape(pattern)
    }
}
