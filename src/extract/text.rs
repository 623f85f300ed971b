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

use super::selectors;
use scraper::{ElementRef, Html, Node};
use sha1::{Digest, Sha1};

/// Visible text: every text node not nested under `<script>`, `<style>`,
/// or `<noscript>`, lowercased and whitespace-collapsed.
fn visible_text(document: &Html) -> String {
    let mut pieces = Vec::new();
    for node_ref in document.tree.nodes() {
        if let Node::Text(text) = node_ref.value() {
            let excluded = node_ref
                .ancestors()
                .filter_map(ElementRef::wrap)
                .any(|ancestor| selectors::SCRIPT_STYLE_NOSCRIPT.matches(&ancestor));
            if !excluded {
                pieces.push(text.text.to_string());
            }
        }
    }
    pieces.join(" ")
}

fn canonicalized_visible_text(document: &Html) -> String {
    visible_text(document)
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn visible_word_count(document: &Html) -> usize {
    canonicalized_visible_text(document)
        .split_whitespace()
        .filter(|w| !w.is_empty())
        .count()
}

/// The same normalized text `content_hash` is derived from, for callers
/// (the on-disk text artifact writer) that need the text itself rather
/// than its digest.
pub fn extracted_text(document: &Html) -> String {
    canonicalized_visible_text(document)
}

pub fn content_hash(document: &Html) -> String {
    let mut hasher = Sha1::new();
    hasher.update(canonicalized_visible_text(document).as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excludes_script_and_style_content() {
        let doc = Html::parse_document(
            r#"<html><body><p>Hello World</p><script>var x = 1;</script><style>.a{}</style></body></html>"#,
        );
        assert_eq!(visible_word_count(&doc), 2);
    }

    #[test]
    fn content_hash_is_stable_across_whitespace_variation() {
        let a = Html::parse_document("<html><body><p>Hello   World</p></body></html>");
        let b = Html::parse_document("<html><body><p>Hello\nWorld</p></body></html>");
        assert_eq!(content_hash(&a), content_hash(&b));
    }

    #[test]
    fn content_hash_is_case_insensitive() {
        let a = Html::parse_document("<html><body><p>HELLO</p></body></html>");
        let b = Html::parse_document("<html><body><p>hello</p></body></html>");
        assert_eq!(content_hash(&a), content_hash(&b));
    }

    #[test]
    fn content_hash_differs_for_different_text() {
        let a = Html::parse_document("<html><body><p>Hello</p></body></html>");
        let b = Html::parse_document("<html><body><p>Goodbye</p></body></html>");
        assert_ne!(content_hash(&a), content_hash(&b));
    }
}
