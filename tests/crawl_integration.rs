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

//! End-to-end crawls against a mocked site, driving the public
//! `CrawlController` API the way a real caller would instead of reaching
//! into any internal module.

use sitecrawl::config::{CrawlConfig, DiscoveryMechanism, RobotsTxtMode};
use sitecrawl::sink::{RecordingEventEmitter, RecordingPersistence};
use sitecrawl::CrawlController;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn html_with_links(links: &[String]) -> String {
    let anchors: String = links
        .iter()
        .enumerate()
        .map(|(i, href)| format!("<a href=\"{href}\">link {i}</a>"))
        .collect();
    format!("<html><body>{anchors}</body></html>")
}

fn plain_page() -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string("<html><body>no links here</body></html>")
        .insert_header("content-type", "text/html")
}

fn base_config() -> CrawlConfig {
    CrawlConfig {
        global_parallelism: 2,
        per_host_parallelism: 2,
        robots_txt_mode: RobotsTxtMode::Ignore,
        discovery_mechanisms: vec![DiscoveryMechanism::Spider],
        ..Default::default()
    }
}

async fn wait_for_completion(controller: &Arc<CrawlController>, crawl_id: &str) {
    for _ in 0..500 {
        let still_active = controller
            .get_active_progress()
            .await
            .iter()
            .any(|snapshot| snapshot.crawl_id == crawl_id);
        if !still_active {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("crawl {crawl_id} did not finish within the test's wait budget");
}

#[tokio::test]
async fn seed_with_two_links_yields_three_page_results() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(html_with_links(&["/x".to_string(), "/y".to_string()]))
                .insert_header("content-type", "text/html"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET")).and(path("/x")).respond_with(plain_page()).mount(&server).await;
    Mock::given(method("GET")).and(path("/y")).respond_with(plain_page()).mount(&server).await;

    let persistence = Arc::new(RecordingPersistence::default());
    let controller = CrawlController::new(persistence.clone(), Arc::new(RecordingEventEmitter::default()));
    let seed_url = format!("{}/", server.uri());
    let crawl_id = controller.start_crawl("proj", &seed_url, base_config()).await.unwrap();

    wait_for_completion(&controller, &crawl_id).await;

    let crawled = persistence.crawled.lock().unwrap();
    assert_eq!(crawled.len(), 3);
    assert!(crawled.iter().all(|page| page.status == 200));
}

#[tokio::test]
async fn single_redirect_chain_collapses_to_two_page_results() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(html_with_links(&["/a".to_string()]))
                .insert_header("content-type", "text/html"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/b"))
        .mount(&server)
        .await;
    Mock::given(method("GET")).and(path("/b")).respond_with(plain_page()).mount(&server).await;

    let persistence = Arc::new(RecordingPersistence::default());
    let controller = CrawlController::new(persistence.clone(), Arc::new(RecordingEventEmitter::default()));
    let seed_url = format!("{}/", server.uri());
    let crawl_id = controller.start_crawl("proj", &seed_url, base_config()).await.unwrap();

    wait_for_completion(&controller, &crawl_id).await;

    let crawled = persistence.crawled.lock().unwrap();
    assert_eq!(crawled.len(), 2);
    let redirected = crawled.iter().find(|page| page.url.ends_with("/a")).expect("redirected page present");
    assert!(redirected.final_url.ends_with("/b"));
    assert_eq!(redirected.status, 200);
}

#[tokio::test]
async fn shared_redirect_target_is_fetched_exactly_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(html_with_links(&["/a".to_string(), "/b".to_string()]))
                .insert_header("content-type", "text/html"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/b"))
        .mount(&server)
        .await;
    Mock::given(method("GET")).and(path("/b")).respond_with(plain_page()).mount(&server).await;

    let persistence = Arc::new(RecordingPersistence::default());
    let controller = CrawlController::new(persistence.clone(), Arc::new(RecordingEventEmitter::default()));
    let seed_url = format!("{}/", server.uri());
    let crawl_id = controller.start_crawl("proj", &seed_url, base_config()).await.unwrap();

    wait_for_completion(&controller, &crawl_id).await;

    let b_requests = server.received_requests().await.unwrap().iter().filter(|r| r.url.path() == "/b").count();
    assert_eq!(b_requests, 1, "/b must be fetched exactly once even though two URLs lead to it");

    let crawled = persistence.crawled.lock().unwrap();
    // seed + the single surviving /b result; the /a queue item that lost
    // the redirect race produces no page result of its own.
    assert_eq!(crawled.len(), 2);
    let landed = crawled.iter().find(|page| page.final_url.ends_with("/b")).expect("/b result present");
    assert_eq!(landed.status, 200);
    assert!(
        landed.redirect_chain.iter().any(|hop| hop.ends_with("/a")),
        "redirect_chain should carry /a's url, got {:?}",
        landed.redirect_chain
    );
}

#[tokio::test]
async fn external_link_is_recorded_but_never_fetched() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(html_with_links(&[
                    "/p".to_string(),
                    "http://192.0.2.1/elsewhere".to_string(),
                ]))
                .insert_header("content-type", "text/html"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET")).and(path("/p")).respond_with(plain_page()).mount(&server).await;

    let persistence = Arc::new(RecordingPersistence::default());
    let controller = CrawlController::new(persistence.clone(), Arc::new(RecordingEventEmitter::default()));
    let seed_url = format!("{}/", server.uri());
    let crawl_id = controller.start_crawl("proj", &seed_url, base_config()).await.unwrap();

    wait_for_completion(&controller, &crawl_id).await;

    let crawled = persistence.crawled.lock().unwrap();
    assert_eq!(crawled.len(), 2);
    let seed_result = crawled.iter().find(|page| page.url == seed_url).expect("seed page present");
    assert_eq!(seed_result.links.external.len(), 1);
    assert_eq!(seed_result.links.external[0].url, "http://192.0.2.1/elsewhere");
    assert!(crawled.iter().all(|page| !page.url.contains("192.0.2.1")));
}

#[tokio::test]
async fn single_page_mode_fetches_only_the_seed() {
    let server = MockServer::start().await;
    let links: Vec<String> = (0..50).map(|i| format!("/page-{i}")).collect();
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(html_with_links(&links))
                .insert_header("content-type", "text/html"),
        )
        .mount(&server)
        .await;

    let persistence = Arc::new(RecordingPersistence::default());
    let controller = CrawlController::new(persistence.clone(), Arc::new(RecordingEventEmitter::default()));
    let seed_url = format!("{}/", server.uri());
    let config = CrawlConfig {
        single_page_mode: true,
        ..base_config()
    };
    let crawl_id = controller.start_crawl("proj", &seed_url, config).await.unwrap();

    wait_for_completion(&controller, &crawl_id).await;

    let crawled = persistence.crawled.lock().unwrap();
    assert_eq!(crawled.len(), 1);
    assert_eq!(crawled[0].links.internal.len(), 50);
}

#[tokio::test]
async fn stopping_a_crawl_completes_within_the_grace_window_and_flags_was_stopped() {
    struct EverGrowingPage;
    impl wiremock::Respond for EverGrowingPage {
        fn respond(&self, request: &wiremock::Request) -> ResponseTemplate {
            let next = format!("{}/x", request.url.path());
            ResponseTemplate::new(200)
                .set_body_string(format!("<html><body><a href=\"{next}\">next</a></body></html>"))
                .insert_header("content-type", "text/html")
        }
    }

    let server = MockServer::start().await;
    Mock::given(method("GET")).respond_with(EverGrowingPage).mount(&server).await;

    let events = Arc::new(RecordingEventEmitter::default());
    let controller = CrawlController::new(Arc::new(RecordingPersistence::default()), events.clone());
    let seed_url = format!("{}/", server.uri());
    let crawl_id = controller.start_crawl("proj", &seed_url, base_config()).await.unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;

    let started = std::time::Instant::now();
    controller.stop_crawl(&crawl_id).await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(3), "stop_crawl exceeded its grace window");

    let recorded = events.events.lock().unwrap();
    let completed = recorded
        .iter()
        .find(|event| event.name == "crawl:completed")
        .expect("crawl:completed event emitted");
    let payload = completed.payload.as_ref().expect("completion payload present");
    assert_eq!(payload["wasStopped"], true);
}
