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

//! Wires the CLI surface to the engine, mirroring the teacher's
//! `args`/`exec_args` split — deliberately thin, since the core crate is
//! the deliverable and this binary exists only to drive it end-to-end.

pub mod args;
mod logging;
mod persistence;

pub use args::{CliArgs, Command};

use crate::config::CrawlConfig;
use crate::controller::CrawlController;
use persistence::{FilePersistence, StdoutEventEmitter};
use std::sync::Arc;
use std::time::Duration;

/// Executes a parsed [`CliArgs`], blocking until the crawl it describes
/// completes.
pub fn exec_args(args: CliArgs) {
    let Command::Crawl {
        seed_url,
        config,
        global_parallelism,
        per_host_parallelism,
        js_rendering,
        single_page,
    } = args.command;

    let mut crawl_config = match &config {
        Some(path) => CrawlConfig::try_load_from_path(path).unwrap_or_default(),
        None => CrawlConfig::discover_or_default(),
    };
    if let Some(n) = global_parallelism {
        crawl_config.global_parallelism = n;
    }
    if let Some(n) = per_host_parallelism {
        crawl_config.per_host_parallelism = n;
    }
    crawl_config.js_rendering_enabled = js_rendering;
    crawl_config.single_page_mode = single_page;

    logging::configure_logging(&crawl_config);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to start the tokio runtime");
    runtime.block_on(run_crawl(seed_url, crawl_config));
}

async fn run_crawl(seed_url: String, config: CrawlConfig) {
    let persistence = Arc::new(FilePersistence::new("./crawl-output"));
    let events = Arc::new(StdoutEventEmitter);
    let controller = CrawlController::new(persistence, events);

    let crawl_id = match controller.start_crawl("cli", &seed_url, config).await {
        Ok(id) => id,
        Err(err) => {
            eprintln!("failed to start crawl: {err}");
            return;
        }
    };

    loop {
        tokio::time::sleep(Duration::from_millis(500)).await;
        let snapshots = controller.get_active_progress().await;
        let Some(snapshot) = snapshots.iter().find(|s| s.crawl_id == crawl_id) else {
            break;
        };
        println!(
            "{} discovered={} crawled={} queued={} in_flight={}",
            snapshot.domain, snapshot.discovered, snapshot.crawled, snapshot.queued, snapshot.in_flight
        );
    }

    println!("crawl {crawl_id} complete");
}
