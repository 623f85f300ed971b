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

/// A canonical URL paired with the link-depth at which it was discovered
/// (0 = the seed). Carried through the queue so the Scope Filter can
/// enforce `maxDepth` without a separate lookup, mirroring the teacher's
/// `url::url_with_depth::UrlWithDepth`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlWithDepth {
    url: CanonicalUrl,
    depth: u32,
}

impl UrlWithDepth {
    pub fn new(url: CanonicalUrl, depth: u32) -> Self {
        Self { url, depth }
    }

    pub fn canonical(&self) -> &CanonicalUrl {
        &self.url
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn into_canonical(self) -> CanonicalUrl {
        self.url
    }
}
