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

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;
use url::Url;

#[derive(Debug, Clone, Error, Eq, PartialEq)]
pub enum InvalidUrlError {
    #[error("could not parse url: {0}")]
    Unparseable(#[from] url::ParseError),
    #[error("url has no host")]
    NoHost,
    #[error("unsupported scheme '{0}', only http/https are accepted")]
    UnsupportedScheme(String),
}

/// A URL in the canonical form used for scope decisions, fingerprinting,
/// and as the dedup key's source string.
///
/// Canonicalization: lowercase scheme + host (performed by the `url` crate
/// during parsing), strip the default port for the scheme, drop the
/// fragment, percent-decode then re-encode the path in `url`'s fixed
/// canonical form, sort query parameters lexicographically, and drop any
/// parameter whose key appears in the active deny-list.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalUrl(Url);

impl CanonicalUrl {
    /// Parses `raw`, resolving against `base` when `raw` is relative, and
    /// canonicalizes the result. `deny_params` lists query-parameter keys
    /// (already lowercased) to strip, e.g. the baseline analytics list
    /// plus any framework-specific additions from [`crate::framework`].
    pub fn parse(
        raw: &str,
        base: Option<&Url>,
        deny_params: &[String],
    ) -> Result<Self, InvalidUrlError> {
        let parsed = match base {
            Some(base) => Url::options().base_url(Some(base)).parse(raw)?,
            None => Url::parse(raw)?,
        };
        Self::from_url(parsed, deny_params)
    }

    pub fn from_url(mut url: Url, deny_params: &[String]) -> Result<Self, InvalidUrlError> {
        match url.scheme() {
            "http" | "https" => {}
            other => return Err(InvalidUrlError::UnsupportedScheme(other.to_string())),
        }
        if url.host_str().is_none() {
            return Err(InvalidUrlError::NoHost);
        }

        url.set_fragment(None);
        strip_default_port(&mut url);
        sort_and_filter_query(&mut url, deny_params);
        normalize_path(&mut url);

        Ok(Self(url))
    }

    pub fn as_url(&self) -> &Url {
        &self.0
    }

    pub fn into_url(self) -> Url {
        self.0
    }

    pub fn host(&self) -> &str {
        self.0.host_str().expect("validated non-empty host")
    }

    pub fn scheme(&self) -> &str {
        self.0.scheme()
    }

    pub fn path(&self) -> &str {
        self.0.path()
    }

    /// Re-canonicalizes an already-canonical URL string. Used to prove
    /// idempotence: `canon(canon(u)) == canon(u)`.
    pub fn reparse(&self, deny_params: &[String]) -> Result<Self, InvalidUrlError> {
        Self::from_url(self.0.clone(), deny_params)
    }
}

fn strip_default_port(url: &mut Url) {
    let default = match url.scheme() {
        "http" => Some(80),
        "https" => Some(443),
        _ => None,
    };
    if url.port() == default {
        let _ = url.set_port(None);
    }
}

fn sort_and_filter_query(url: &mut Url, deny_params: &[String]) {
    if url.query().is_none() {
        return;
    }
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !deny_params.iter().any(|d| d.eq_ignore_ascii_case(k)))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    pairs.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
    if pairs.is_empty() {
        url.set_query(None);
    } else {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (k, v) in &pairs {
            serializer.append_pair(k, v);
        }
        url.set_query(Some(&serializer.finish()));
    }
}

fn normalize_path(url: &mut Url) {
    // `url` already stores the path percent-encoded in its canonical form;
    // re-parsing each segment collapses any redundant escaping a caller
    // might have supplied (e.g. `%2F` vs `/`) save for reserved characters.
    let decoded_segments: Vec<String> = url
        .path_segments()
        .map(|segments| {
            segments
                .map(|segment| {
                    percent_encoding::percent_decode_str(segment)
                        .decode_utf8_lossy()
                        .into_owned()
                })
                .collect()
        })
        .unwrap_or_default();
    if !decoded_segments.is_empty() {
        if let Ok(mut path_mut) = url.path_segments_mut() {
            path_mut.clear();
            for segment in &decoded_segments {
                path_mut.push(segment);
            }
        }
    }
}

impl Display for CanonicalUrl {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl FromStr for CanonicalUrl {
    type Err = InvalidUrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s, None, &[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canon(raw: &str) -> String {
        CanonicalUrl::parse(raw, None, &[]).unwrap().to_string()
    }

    #[test]
    fn lowercases_scheme_and_host() {
        assert_eq!(canon("HTTP://Example.COM/Path"), "http://example.com/Path");
    }

    #[test]
    fn strips_default_port() {
        assert_eq!(canon("http://example.com:80/x"), "http://example.com/x");
        assert_eq!(canon("https://example.com:443/x"), "https://example.com/x");
        assert_eq!(
            canon("http://example.com:8080/x"),
            "http://example.com:8080/x"
        );
    }

    #[test]
    fn drops_fragment() {
        assert_eq!(canon("http://example.com/x#section"), "http://example.com/x");
    }

    #[test]
    fn sorts_query_params() {
        assert_eq!(
            canon("http://example.com/x?b=2&a=1"),
            "http://example.com/x?a=1&b=2"
        );
    }

    #[test]
    fn drops_denied_query_params() {
        let result = CanonicalUrl::parse(
            "http://example.com/x?a=1&utm_source=foo",
            None,
            &["utm_source".to_string()],
        )
        .unwrap();
        assert_eq!(result.to_string(), "http://example.com/x?a=1");
    }

    #[test]
    fn rejects_unsupported_scheme() {
        assert!(matches!(
            CanonicalUrl::parse("ftp://example.com/x", None, &[]),
            Err(InvalidUrlError::UnsupportedScheme(_))
        ));
    }

    #[test]
    fn idempotent() {
        let once = CanonicalUrl::parse("HTTP://Example.com:80/a?b=2&a=1#frag", None, &[]).unwrap();
        let twice = once.reparse(&[]).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn resolves_relative_against_base() {
        let base = Url::parse("http://example.com/dir/page.html").unwrap();
        let result = CanonicalUrl::parse("../other", Some(&base), &[]).unwrap();
        assert_eq!(result.to_string(), "http://example.com/other");
    }
}
