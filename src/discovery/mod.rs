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

//! Discovery Mechanisms (component C8): Spider and Sitemap producers.
//!
//! Both feed through the same canonicalize -> scope -> visit pipeline as
//! every other discovered URL; neither checks for duplicates itself, per
//! §4.8 — the Visit Store is the only dedup authority.

mod sitemap_producer;
mod spider;

pub use sitemap_producer::{fetch_sitemap_urls, SitemapError};
pub use spider::spider_links;
