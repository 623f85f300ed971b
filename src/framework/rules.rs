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

//! Static signal rules and per-tag filter configs (§4.9).

use super::{FrameworkFilter, FrameworkTag};

struct Signal {
    tag: FrameworkTag,
    html_needles: &'static [&'static str],
    url_needles: &'static [&'static str],
}

const SIGNALS: &[Signal] = &[
    Signal {
        tag: FrameworkTag::Nextjs,
        html_needles: &["__NEXT_DATA__", "/_next/static/"],
        url_needles: &["/_next/"],
    },
    Signal {
        tag: FrameworkTag::Nuxtjs,
        html_needles: &["__NUXT__", "/_nuxt/"],
        url_needles: &["/_nuxt/"],
    },
    Signal {
        tag: FrameworkTag::Gatsby,
        html_needles: &["___gatsby", "/page-data/"],
        url_needles: &["/page-data/"],
    },
    Signal {
        tag: FrameworkTag::Angular,
        html_needles: &["ng-version"],
        url_needles: &[],
    },
    Signal {
        tag: FrameworkTag::Vue,
        html_needles: &["data-v-app", "__VUE__"],
        url_needles: &[],
    },
    Signal {
        tag: FrameworkTag::Wordpress,
        html_needles: &["wp-content", "wp-includes"],
        url_needles: &["/wp-content/", "/wp-json/"],
    },
    Signal {
        tag: FrameworkTag::Shopify,
        html_needles: &["cdn.shopify.com", "Shopify.theme"],
        url_needles: &["cdn.shopify.com"],
    },
    Signal {
        tag: FrameworkTag::Webflow,
        html_needles: &["data-wf-site", "webflow.js"],
        url_needles: &[],
    },
    Signal {
        tag: FrameworkTag::Wix,
        html_needles: &["wix-dedicated-viewer", "wixstatic.com"],
        url_needles: &["wixstatic.com"],
    },
    Signal {
        tag: FrameworkTag::Drupal,
        html_needles: &["Drupal.settings", "/sites/default/files/"],
        url_needles: &["/sites/default/files/"],
    },
    Signal {
        tag: FrameworkTag::Joomla,
        html_needles: &["/media/jui/", "Joomla!"],
        url_needles: &["/media/jui/"],
    },
    // React is checked after the meta-frameworks built on it (Next/Gatsby),
    // since their pages also ship a React runtime signature.
    Signal {
        tag: FrameworkTag::React,
        html_needles: &["data-reactroot", "react-dom"],
        url_needles: &[],
    },
];

/// Matches `html` and `network_urls` against the static signal rules,
/// returning the first tag that fires or `Other` if none do.
pub fn detect(html: &str, network_urls: &[String]) -> FrameworkTag {
    for signal in SIGNALS {
        if signal.html_needles.iter().any(|needle| html.contains(needle)) {
            return signal.tag;
        }
        if signal
            .url_needles
            .iter()
            .any(|needle| network_urls.iter().any(|url| url.contains(needle)))
        {
            return signal.tag;
        }
    }
    FrameworkTag::Other
}

/// Analytics/tracking deny patterns applied regardless of framework.
pub fn baseline_deny_patterns() -> Vec<String> {
    [
        "google-analytics.com",
        "googletagmanager.com",
        "doubleclick.net",
        "facebook.com/tr",
        "connect.facebook.net",
        "hotjar.com",
        "segment.io",
        "/collect",
        "/beacon",
        "/telemetry",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

pub fn baseline_query_params() -> Vec<String> {
    vec![
        "utm_source".to_string(),
        "utm_medium".to_string(),
        "utm_campaign".to_string(),
        "fbclid".to_string(),
        "gclid".to_string(),
    ]
}

/// The per-tag known-useless URL patterns / query parameters (build-hash
/// asset paths, RSC/HMR query parameters, etc).
pub fn framework_filter(tag: FrameworkTag) -> FrameworkFilter {
    match tag {
        FrameworkTag::Nextjs => FrameworkFilter {
            url_deny_patterns: vec!["/_next/static/chunks/".to_string(), "/_next/image".to_string()],
            query_param_deny: vec!["_rsc".to_string()],
        },
        FrameworkTag::Nuxtjs => FrameworkFilter {
            url_deny_patterns: vec!["/_nuxt/".to_string()],
            query_param_deny: vec![],
        },
        FrameworkTag::Gatsby => FrameworkFilter {
            url_deny_patterns: vec!["/page-data/".to_string(), "/static/".to_string()],
            query_param_deny: vec![],
        },
        FrameworkTag::Wordpress => FrameworkFilter {
            url_deny_patterns: vec!["/wp-json/".to_string(), "?replytocom=".to_string()],
            query_param_deny: vec!["replytocom".to_string()],
        },
        FrameworkTag::Shopify => FrameworkFilter {
            url_deny_patterns: vec!["/cart/".to_string(), "/cdn/shop/t/".to_string()],
            query_param_deny: vec!["variant".to_string()],
        },
        FrameworkTag::Webflow => FrameworkFilter {
            url_deny_patterns: vec!["webflow.js".to_string()],
            query_param_deny: vec![],
        },
        FrameworkTag::Wix => FrameworkFilter {
            url_deny_patterns: vec!["wixstatic.com".to_string()],
            query_param_deny: vec![],
        },
        FrameworkTag::Drupal => FrameworkFilter {
            url_deny_patterns: vec!["?destination=".to_string()],
            query_param_deny: vec!["destination".to_string()],
        },
        FrameworkTag::Joomla => FrameworkFilter {
            url_deny_patterns: vec!["/media/jui/".to_string()],
            query_param_deny: vec![],
        },
        FrameworkTag::Angular | FrameworkTag::Vue | FrameworkTag::React | FrameworkTag::Other => {
            FrameworkFilter::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_nextjs_from_html_marker() {
        let html = "<html><script>__NEXT_DATA__ = {}</script></html>";
        assert_eq!(detect(html, &[]), FrameworkTag::Nextjs);
    }

    #[test]
    fn detects_nextjs_from_network_url_when_html_silent() {
        let urls = vec!["http://example.com/_next/static/chunk.js".to_string()];
        assert_eq!(detect("<html></html>", &urls), FrameworkTag::Nextjs);
    }

    #[test]
    fn meta_framework_wins_over_plain_react_signature() {
        let html = "<html>__NEXT_DATA__ data-reactroot react-dom</html>";
        assert_eq!(detect(html, &[]), FrameworkTag::Nextjs);
    }

    #[test]
    fn falls_back_to_other() {
        assert_eq!(detect("<html><body>hi</body></html>", &[]), FrameworkTag::Other);
    }

    #[test]
    fn nextjs_filter_denies_rsc_param() {
        let filter = framework_filter(FrameworkTag::Nextjs);
        assert!(filter.query_param_deny.contains(&"_rsc".to_string()));
    }
}
