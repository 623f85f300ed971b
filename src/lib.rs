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

//! A site-scoped web crawler engine: given one seed URL, crawl everything
//! reachable within that site's scope, extract link graphs and visible
//! text, and hand results to a caller-supplied [`sink::Persistence`] /
//! [`sink::EventEmitter`] pair.
//!
//! The public surface is [`controller::CrawlController`]: `start_crawl`,
//! `stop_crawl`, `get_active_progress`. Everything else is an internal
//! component wired up behind it.

pub mod app;
pub mod config;
pub mod controller;
pub mod discovery;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod framework;
pub mod queue;
pub mod render;
pub mod robots;
pub mod scope;
pub mod sink;
pub mod url;
pub mod visit;

pub use config::CrawlConfig;
pub use controller::CrawlController;
pub use error::CrawlError;
