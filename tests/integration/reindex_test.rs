// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{test_stack, wait_for_terminal};
use shopcrawl::application::dto::reindex_request::ReindexRequest;
use shopcrawl::domain::models::document::FetchStatus;
use shopcrawl::domain::repositories::document_repository::DocumentRepository;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_reindex_bypasses_discovery() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nAllow: /\n"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/shop/accessories/belt-1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><head><title>Belt</title></head><body><span class="price">$59</span></body></html>"#,
        ))
        .mount(&server)
        .await;
    // A page no URL rule recognizes; reindex fetches it anyway.
    Mock::given(method("GET"))
        .and(path("/pages/size-guide"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<html><head><title>Size guide</title></head><body>sizes</body></html>",
        ))
        .mount(&server)
        .await;

    let stack = test_stack();
    let job_id = stack
        .use_case
        .reindex(ReindexRequest {
            shop_id: "shop-1".to_string(),
            urls: vec![
                format!("{}/shop/accessories/belt-1", server.uri()),
                format!("{}/pages/size-guide", server.uri()),
            ],
        })
        .await
        .expect("reindex");

    let status = wait_for_terminal(&stack.use_case, job_id, Duration::from_secs(30)).await;
    assert_eq!(status.status, "completed");
    assert_eq!(status.crawled_count, 2);

    let documents = DocumentRepository::find_by_job(stack.store.as_ref(), job_id)
        .await
        .unwrap();
    assert_eq!(documents.len(), 2);
    assert!(documents.iter().all(|d| d.fetch_status == FetchStatus::Success));

    // Discovery never ran: only robots.txt and the two targets were hit.
    let requests = server.received_requests().await.unwrap();
    assert!(requests.iter().all(|r| {
        let p = r.url.path();
        p == "/robots.txt" || p == "/shop/accessories/belt-1" || p == "/pages/size-guide"
    }));
}

#[tokio::test]
async fn test_reindex_still_honors_exclusions() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\n"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/shop/accessories/belt-1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>ok</body></html>"))
        .mount(&server)
        .await;

    let stack = test_stack();
    let job_id = stack
        .use_case
        .reindex(ReindexRequest {
            shop_id: "shop-1".to_string(),
            urls: vec![
                format!("{}/shop/accessories/belt-1", server.uri()),
                format!("{}/checkout/session-9", server.uri()),
            ],
        })
        .await
        .expect("reindex");

    let status = wait_for_terminal(&stack.use_case, job_id, Duration::from_secs(30)).await;
    assert_eq!(status.status, "completed");
    assert_eq!(status.crawled_count, 1);

    let requests = server.received_requests().await.unwrap();
    assert!(
        requests.iter().all(|r| !r.url.path().starts_with("/checkout")),
        "excluded reindex targets must never be fetched"
    );
}
