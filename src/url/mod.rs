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

//! URL canonicalization and fingerprinting (component C1).
//!
//! A [`CanonicalUrl`] is the normalized form used everywhere else in the
//! engine; a [`Fingerprint`] is the 64-bit dedup key derived from it.

mod canonical;
mod fingerprint;
mod with_depth;

pub use canonical::{CanonicalUrl, InvalidUrlError};
pub use fingerprint::{fingerprint, Fingerprint};
pub use with_depth::UrlWithDepth;
