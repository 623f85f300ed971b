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

use crate::extract::RawLink;
use crate::sink::LinkType;
use crate::url::CanonicalUrl;

/// Resolves every anchor link extracted from a page against that page's
/// final URL. Non-anchor links (images, scripts, ...) are link-graph
/// metadata only and never spidered, per §4.8 ("every internal link").
pub fn spider_links<'a, 'b>(
    page_url: &'b CanonicalUrl,
    links: &'a [RawLink],
) -> impl Iterator<Item = (&'a RawLink, Option<CanonicalUrl>)> + use<'a, 'b> {
    links.iter().filter(|l| l.link_type == LinkType::Anchor).map(move |link| {
        let resolved = CanonicalUrl::parse(&link.raw_url, Some(page_url.as_url()), &[]).ok();
        (link, resolved)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::LinkPosition;

    fn link(url: &str, ty: LinkType) -> RawLink {
        RawLink {
            raw_url: url.to_string(),
            link_type: ty,
            anchor_text: None,
            context: None,
            position: LinkPosition::Content,
            dom_path: String::new(),
            rel: vec![],
        }
    }

    #[test]
    fn only_anchors_are_spidered() {
        let page = CanonicalUrl::parse("http://example.com/", None, &[]).unwrap();
        let links = vec![link("/a", LinkType::Anchor), link("/style.css", LinkType::Stylesheet)];
        let resolved: Vec<_> = spider_links(&page, &links).collect();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].0.raw_url, "/a");
    }

    #[test]
    fn relative_anchors_resolve_against_page_url() {
        let page = CanonicalUrl::parse("http://example.com/dir/page.html", None, &[]).unwrap();
        let links = vec![link("../x", LinkType::Anchor)];
        let resolved: Vec<_> = spider_links(&page, &links).collect();
        assert_eq!(
            resolved[0].1.as_ref().unwrap().to_string(),
            "http://example.com/x"
        );
    }
}
