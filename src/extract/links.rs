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
use crate::sink::LinkType;
use regex::Regex;
use scraper::{ElementRef, Html};
use std::sync::LazyLock;

const CONTEXT_CHARS: usize = 120;

/// Matches one `@font-face { ... }` rule body, case-insensitively.
static FONT_FACE_RULE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)@font-face\s*\{([^}]*)\}").unwrap());

/// Matches a `url(...)` reference inside a rule body, with or without
/// surrounding quotes.
static CSS_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)url\(\s*['"]?([^'")]+)['"]?\s*\)"#).unwrap());

/// One link as extracted from the DOM, before canonicalization/scope
/// classification (§4.7 feeds this into C1 then C2 per link).
#[derive(Debug, Clone)]
pub struct RawLink {
    pub raw_url: String,
    pub link_type: LinkType,
    pub anchor_text: Option<String>,
    pub context: Option<String>,
    pub position: LinkPosition,
    pub dom_path: String,
    pub rel: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkPosition {
    Content,
    Boilerplate,
}

pub fn extract_links(document: &Html) -> Vec<RawLink> {
    let mut links = Vec::new();

    for el in document.select(&selectors::ANCHOR) {
        if let Some(href) = el.value().attr("href") {
            links.push(build_link(el, href, LinkType::Anchor, Some(anchor_text(el))));
        }
    }
    for el in document.select(&selectors::IMAGE) {
        for src in image_sources(el) {
            links.push(build_link(el, &src, LinkType::Image, None));
        }
    }
    for el in document.select(&selectors::SCRIPT) {
        if let Some(src) = el.value().attr("src") {
            links.push(build_link(el, src, LinkType::Script, None));
        }
    }
    for el in document.select(&selectors::STYLESHEET) {
        if let Some(href) = el.value().attr("href") {
            links.push(build_link(el, href, LinkType::Stylesheet, None));
        }
    }
    for el in document.select(&selectors::FONT_PRELOAD) {
        if let Some(href) = el.value().attr("href") {
            links.push(build_link(el, href, LinkType::Font, None));
        }
    }
    for el in document.select(&selectors::STYLE) {
        let css = el.text().collect::<String>();
        for font_url in font_face_urls(&css) {
            links.push(build_link(el, &font_url, LinkType::Font, None));
        }
    }
    for el in document.select(&selectors::MODULEPRELOAD) {
        if let Some(href) = el.value().attr("href") {
            links.push(build_link(el, href, LinkType::Modulepreload, None));
        }
    }

    links
}

/// Every `url(...)` referenced by a `src` inside an `@font-face` rule in
/// `css`, in source order. A rule with `src: url(a.woff2) format("woff2"),
/// url(a.woff) format("woff");` yields both URLs.
fn font_face_urls(css: &str) -> Vec<String> {
    let mut urls = Vec::new();
    for rule in FONT_FACE_RULE.captures_iter(css) {
        let body = &rule[1];
        for url_match in CSS_URL.captures_iter(body) {
            urls.push(url_match[1].trim().to_string());
        }
    }
    urls
}

fn anchor_text(el: ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn image_sources(el: ElementRef) -> Vec<String> {
    let mut sources = Vec::new();
    if let Some(src) = el.value().attr("src") {
        sources.push(src.to_string());
    }
    if let Some(srcset) = el.value().attr("srcset") {
        for candidate in srcset.split(',') {
            if let Some(url) = candidate.trim().split_whitespace().next() {
                sources.push(url.to_string());
            }
        }
    }
    sources
}

fn build_link(
    el: ElementRef,
    raw_url: &str,
    link_type: LinkType,
    anchor_text: Option<String>,
) -> RawLink {
    let rel = el
        .value()
        .attr("rel")
        .map(|r| r.split_whitespace().map(|s| s.to_ascii_lowercase()).collect())
        .unwrap_or_default();

    RawLink {
        raw_url: raw_url.to_string(),
        link_type,
        anchor_text,
        context: surrounding_context(el),
        position: classify_position(el),
        dom_path: dom_path(el),
        rel,
    }
}

/// A link is `content` iff no ancestor is a nav/header/footer/aside element
/// or carries a navigational/structural ARIA role.
fn classify_position(el: ElementRef) -> LinkPosition {
    for ancestor in el.ancestors() {
        if let Some(ancestor_el) = ElementRef::wrap(ancestor) {
            if selectors::BOILERPLATE_ANCESTOR.matches(&ancestor_el) {
                return LinkPosition::Boilerplate;
            }
        }
    }
    LinkPosition::Content
}

fn dom_path(el: ElementRef) -> String {
    let mut segments: Vec<String> = el
        .ancestors()
        .filter_map(ElementRef::wrap)
        .map(|e| e.value().name().to_string())
        .collect();
    segments.reverse();
    segments.push(el.value().name().to_string());
    segments.join(" > ")
}

/// ~120 chars of the nearest enclosing block's text, used as link context.
fn surrounding_context(el: ElementRef) -> Option<String> {
    let parent = ElementRef::wrap(el.parent()?)?;
    let text: String = parent.text().collect::<String>();
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return None;
    }
    Some(if collapsed.chars().count() > CONTEXT_CHARS {
        collapsed.chars().take(CONTEXT_CHARS).collect::<String>() + "…"
    } else {
        collapsed
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_anchor_with_text_and_rel() {
        let doc = Html::parse_document(r#"<html><body><a href="/x" rel="nofollow">Click</a></body></html>"#);
        let links = extract_links(&doc);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].raw_url, "/x");
        assert_eq!(links[0].anchor_text.as_deref(), Some("Click"));
        assert_eq!(links[0].rel, vec!["nofollow".to_string()]);
    }

    #[test]
    fn nav_link_is_boilerplate() {
        let doc = Html::parse_document(r#"<html><body><nav><a href="/x">Home</a></nav></body></html>"#);
        let links = extract_links(&doc);
        assert_eq!(links[0].position, LinkPosition::Boilerplate);
    }

    #[test]
    fn article_link_is_content() {
        let doc = Html::parse_document(r#"<html><body><article><a href="/x">Home</a></article></body></html>"#);
        let links = extract_links(&doc);
        assert_eq!(links[0].position, LinkPosition::Content);
    }

    #[test]
    fn srcset_expands_to_multiple_image_links() {
        let doc = Html::parse_document(
            r#"<html><body><img src="/a.png" srcset="/b.png 1x, /c.png 2x"></body></html>"#,
        );
        let links = extract_links(&doc);
        let urls: Vec<_> = links.iter().map(|l| l.raw_url.as_str()).collect();
        assert!(urls.contains(&"/a.png"));
        assert!(urls.contains(&"/b.png"));
        assert!(urls.contains(&"/c.png"));
    }

    #[test]
    fn font_face_rule_in_style_block_yields_font_link() {
        let doc = Html::parse_document(
            r#"<html><head><style>
                @font-face { font-family: "Body"; src: url("/fonts/body.woff2") format("woff2"), url(/fonts/body.woff) format("woff"); }
            </style></head><body></body></html>"#,
        );
        let links = extract_links(&doc);
        let fonts: Vec<_> = links.iter().filter(|l| l.link_type == LinkType::Font).map(|l| l.raw_url.as_str()).collect();
        assert_eq!(fonts, vec!["/fonts/body.woff2", "/fonts/body.woff"]);
    }

    #[test]
    fn style_block_without_font_face_yields_no_font_links() {
        let doc = Html::parse_document(r#"<html><head><style>body { color: red; }</style></head><body></body></html>"#);
        let links = extract_links(&doc);
        assert!(!links.iter().any(|l| l.link_type == LinkType::Font));
    }

    #[test]
    fn role_navigation_is_boilerplate() {
        let doc = Html::parse_document(
            r#"<html><body><div role="navigation"><a href="/x">Home</a></div></body></html>"#,
        );
        let links = extract_links(&doc);
        assert_eq!(links[0].position, LinkPosition::Boilerplate);
    }
}
