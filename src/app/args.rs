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

//! The CLI surface, modeled on the teacher's `AtraArgs`/`RunMode` split —
//! narrowed to the one thing this binary needs to do: run a single
//! site-scoped crawl to completion and report on it.

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Crawl a single site starting from a seed URL, to completion.
    Crawl {
        /// The seed URL; its host becomes the crawl's scope.
        seed_url: String,

        /// Path (without extension) to a crawler.{toml,yaml,json} config file.
        #[arg(long)]
        config: Option<String>,

        /// Overrides the configured global concurrency cap.
        #[arg(long)]
        global_parallelism: Option<usize>,

        /// Overrides the configured per-host concurrency cap.
        #[arg(long)]
        per_host_parallelism: Option<usize>,

        /// Enables the headless-render path for JS-rendered pages.
        #[arg(long)]
        js_rendering: bool,

        /// Crawls only the seed URL, ignoring discovered links.
        #[arg(long)]
        single_page: bool,
    },
}
