// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{test_stack, wait_for_terminal};
use shopcrawl::application::dto::crawl_request::StartCrawlRequest;
use shopcrawl::domain::repositories::document_repository::DocumentRepository;
use std::time::Duration;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A shop with many slow product pages, so the job is reliably still
/// mid-crawl when the cancellation lands.
async fn mount_slow_shop(server: &MockServer) {
    let product_links: String = (0..20)
        .map(|i| format!(r#"<a href="/shop/accessories/belt-{}">Belt {}</a>"#, i, i))
        .collect();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body><nav><a href="/shop/accessories">Accessories</a></nav></body></html>"#,
        ))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nAllow: /\n"))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/shop/accessories"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            "<html><body><main>{}</main></body></html>",
            product_links
        )))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/shop/accessories/belt-\d+$"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(
                    "<html><head><title>Belt</title></head><body><h1>Belt</h1></body></html>",
                )
                .set_delay(Duration::from_millis(200)),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_cancellation_mid_crawl() {
    let server = MockServer::start().await;
    mount_slow_shop(&server).await;

    let stack = test_stack();
    let job_id = stack
        .use_case
        .start_crawl(StartCrawlRequest {
            shop_id: "shop-1".to_string(),
            shop_url: server.uri(),
            include: vec![],
            exclude: vec![],
            max_products: Some(100),
            worker_count: Some(2),
        })
        .await
        .expect("start_crawl");

    // Wait until the job has crawled something, then cancel.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(20);
    loop {
        let status = stack.use_case.get_crawl_status(job_id).await.unwrap();
        if status.crawled_count >= 1 {
            break;
        }
        assert!(tokio::time::Instant::now() < deadline, "job never made progress");
        tokio::time::sleep(Duration::from_millis(25)).await;
    }

    stack.use_case.cancel_crawl(job_id).await.expect("cancel");

    let status = wait_for_terminal(&stack.use_case, job_id, Duration::from_secs(30)).await;
    assert_eq!(status.status, "cancelled");

    // No increments after the cancellation point.
    let frozen = status.crawled_count;
    tokio::time::sleep(Duration::from_millis(500)).await;
    let after = stack.use_case.get_crawl_status(job_id).await.unwrap();
    assert_eq!(after.crawled_count, frozen);

    // Documents recorded before cancellation stay in the store.
    let documents = DocumentRepository::find_by_job(stack.store.as_ref(), job_id)
        .await
        .unwrap();
    assert!(!documents.is_empty());

    // The job slot frees up for a fresh run.
    assert!(!stack.scheduler.is_active(job_id));
}

#[tokio::test]
async fn test_cancel_finished_job_is_noop() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body></body></html>"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\n"))
        .mount(&server)
        .await;

    let stack = test_stack();
    let job_id = stack
        .use_case
        .start_crawl(StartCrawlRequest {
            shop_id: "shop-1".to_string(),
            shop_url: server.uri(),
            include: vec![],
            exclude: vec![],
            max_products: None,
            worker_count: Some(1),
        })
        .await
        .expect("start_crawl");

    wait_for_terminal(&stack.use_case, job_id, Duration::from_secs(30)).await;
    stack.use_case.cancel_crawl(job_id).await.expect("cancel of finished job");
}
