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

use crate::url::CanonicalUrl;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::hash::Hasher;
use twox_hash::XxHash64;

/// A 64-bit non-cryptographic identifier for (method, canonical URL,
/// body hash). Two requests with the same fingerprint are treated as the
/// same request by the [`crate::visit::VisitStore`].
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(pub u64);

impl Display for Fingerprint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

const SEED: u64 = 0;

/// Computes the fingerprint of `method url body_sha1_hex_or_empty`,
/// NUL-separated, as specified by the canonicalizer.
pub fn fingerprint(method: &str, url: &CanonicalUrl, body_sha1_hex: Option<&str>) -> Fingerprint {
    let mut hasher = XxHash64::with_seed(SEED);
    hasher.write(method.as_bytes());
    hasher.write_u8(0);
    hasher.write(url.to_string().as_bytes());
    hasher.write_u8(0);
    if let Some(body) = body_sha1_hex {
        hasher.write(body.as_bytes());
    }
    Fingerprint(hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(raw: &str) -> CanonicalUrl {
        CanonicalUrl::parse(raw, None, &[]).unwrap()
    }

    #[test]
    fn same_canonical_url_same_fingerprint() {
        let a = fingerprint("GET", &url("http://example.com/x?b=2&a=1"), None);
        let b = fingerprint("GET", &url("HTTP://Example.com/x?a=1&b=2"), None);
        assert_eq!(a, b);
    }

    #[test]
    fn different_method_different_fingerprint() {
        let u = url("http://example.com/x");
        assert_ne!(fingerprint("GET", &u, None), fingerprint("POST", &u, None));
    }

    #[test]
    fn different_body_different_fingerprint() {
        let u = url("http://example.com/x");
        assert_ne!(
            fingerprint("POST", &u, Some("aaa")),
            fingerprint("POST", &u, Some("bbb"))
        );
    }

    #[test]
    fn different_url_different_fingerprint() {
        assert_ne!(
            fingerprint("GET", &url("http://example.com/x"), None),
            fingerprint("GET", &url("http://example.com/y"), None)
        );
    }
}
