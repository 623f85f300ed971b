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

//! The Extractor (component C7).
//!
//! Link discovery follows the shape of the teacher's
//! `extraction::html::extract_links`: one `scraper::Selector` per element
//! class, matched once over a parsed `Html` document. Everything about
//! *what* counts as a link and how it's classified is new — the teacher
//! extracts origins (href/embedded/form/js) for its own extraction
//! pipeline, this extracts the typed link inventory and boilerplate
//! classification this spec's `PageResult` needs.

mod links;
mod selectors;
mod text;

pub use links::{extract_links, LinkPosition, RawLink};
pub use text::{content_hash, extracted_text, visible_word_count};

use crate::sink::Indexable;
use scraper::Html;

pub struct RobotsDirectives {
    pub meta_robots_noindex: bool,
    pub meta_robots_nofollow: bool,
    pub x_robots_tag_noindex: bool,
}

pub struct ExtractedMeta {
    pub title: Option<String>,
    pub meta_description: Option<String>,
    pub canonical_url: Option<String>,
    pub robots: RobotsDirectives,
    pub first_h1: Option<String>,
    pub first_h2: Option<String>,
}

pub fn extract_meta(document: &Html, x_robots_tag_noindex: bool) -> ExtractedMeta {
    let title = document
        .select(&selectors::TITLE)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty());

    let meta_description = document
        .select(&selectors::META_DESCRIPTION)
        .next()
        .and_then(|el| el.attr("content"))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    let canonical_url = document
        .select(&selectors::LINK_CANONICAL)
        .next()
        .and_then(|el| el.attr("href"))
        .map(|s| s.to_string());

    let robots_content = document
        .select(&selectors::META_ROBOTS)
        .next()
        .and_then(|el| el.attr("content"))
        .unwrap_or_default()
        .to_ascii_lowercase();

    let first_h1 = document
        .select(&selectors::H1)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty());

    let first_h2 = document
        .select(&selectors::H2)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty());

    ExtractedMeta {
        title,
        meta_description,
        canonical_url,
        robots: RobotsDirectives {
            meta_robots_noindex: robots_content.contains("noindex"),
            meta_robots_nofollow: robots_content.contains("nofollow"),
            x_robots_tag_noindex,
        },
        first_h1,
        first_h2,
    }
}

/// Invariant 4: `Yes` iff 2xx + HTML + no noindex directive + canonical
/// absent or equal to the request URL modulo canonicalization.
pub fn compute_indexable(
    status: u16,
    is_html: bool,
    robots: &RobotsDirectives,
    canonical_matches_request: bool,
    respect_meta_robots_noindex: bool,
    respect_x_robots_tag_noindex: bool,
) -> Indexable {
    if !is_html {
        return Indexable::NotApplicable;
    }
    let noindex = (respect_meta_robots_noindex && robots.meta_robots_noindex)
        || (respect_x_robots_tag_noindex && robots.x_robots_tag_noindex);
    if (200..300).contains(&status) && !noindex && canonical_matches_request {
        Indexable::Yes
    } else {
        Indexable::No
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(html: &str) -> Html {
        Html::parse_document(html)
    }

    #[test]
    fn extracts_title_and_description() {
        let d = doc(r#"<html><head><title>Hi</title><meta name="description" content="desc"></head></html>"#);
        let meta = extract_meta(&d, false);
        assert_eq!(meta.title.as_deref(), Some("Hi"));
        assert_eq!(meta.meta_description.as_deref(), Some("desc"));
    }

    #[test]
    fn extracts_canonical_and_robots_noindex() {
        let d = doc(
            r#"<html><head><link rel="canonical" href="https://x.test/"><meta name="robots" content="noindex, nofollow"></head></html>"#,
        );
        let meta = extract_meta(&d, false);
        assert_eq!(meta.canonical_url.as_deref(), Some("https://x.test/"));
        assert!(meta.robots.meta_robots_noindex);
        assert!(meta.robots.meta_robots_nofollow);
    }

    #[test]
    fn indexable_yes_for_clean_html_page() {
        let robots = RobotsDirectives {
            meta_robots_noindex: false,
            meta_robots_nofollow: false,
            x_robots_tag_noindex: false,
        };
        assert_eq!(
            compute_indexable(200, true, &robots, true, true, true),
            Indexable::Yes
        );
    }

    #[test]
    fn indexable_no_when_noindex_present() {
        let robots = RobotsDirectives {
            meta_robots_noindex: true,
            meta_robots_nofollow: false,
            x_robots_tag_noindex: false,
        };
        assert_eq!(
            compute_indexable(200, true, &robots, true, true, true),
            Indexable::No
        );
    }

    #[test]
    fn indexable_not_applicable_for_non_html() {
        let robots = RobotsDirectives {
            meta_robots_noindex: false,
            meta_robots_nofollow: false,
            x_robots_tag_noindex: false,
        };
        assert_eq!(
            compute_indexable(200, false, &robots, true, true, true),
            Indexable::NotApplicable
        );
    }
}
