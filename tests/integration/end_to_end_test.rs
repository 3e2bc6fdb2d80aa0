// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{test_stack, wait_for_terminal};
use shopcrawl::application::dto::crawl_request::StartCrawlRequest;
use shopcrawl::application::use_cases::CrawlUseCaseError;
use shopcrawl::domain::models::discovered_url::{Classification, UrlState};
use shopcrawl::domain::models::document::FetchStatus;
use shopcrawl::domain::repositories::document_repository::DocumentRepository;
use shopcrawl::domain::repositories::url_repository::UrlRepository;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_string(body.to_string())
}

/// A small shop: sitemap lists two categories and an admin page, the
/// accessories category links to one product.
async fn mount_shop(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><body>
                <nav>
                    <a href="/shop/accessories">Accessories</a>
                    <a href="/shop/shirts">Shirts</a>
                    <a href="/admin/login">Admin</a>
                </nav>
            </body></html>"#,
        ))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nAllow: /\n"))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(html(
            r#"<?xml version="1.0"?>
            <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
                <url><loc>{BASE}/shop/accessories</loc></url>
                <url><loc>{BASE}/shop/shirts</loc></url>
                <url><loc>{BASE}/admin/login</loc></url>
            </urlset>"#
                .replace("{BASE}", &server.uri())
                .as_str(),
        ))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/shop/accessories"))
        .respond_with(html(
            r#"<html><body><main>
                <a href="/shop/accessories/belt-1">Leather belt</a>
            </main></body></html>"#,
        ))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/shop/shirts"))
        .respond_with(html("<html><body><main>No stock today.</main></body></html>"))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/shop/accessories/belt-1"))
        .respond_with(html(
            r#"<html><head><title>Leather belt</title></head><body>
                <h1>Leather belt</h1>
                <span class="price">$59.00</span>
            </body></html>"#,
        ))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_crawl_of_small_shop() {
    let server = MockServer::start().await;
    mount_shop(&server).await;

    let stack = test_stack();
    let job_id = stack
        .use_case
        .start_crawl(StartCrawlRequest {
            shop_id: "shop-1".to_string(),
            shop_url: server.uri(),
            include: vec![],
            exclude: vec![],
            max_products: Some(10),
            worker_count: Some(2),
        })
        .await
        .expect("start_crawl");

    let status = wait_for_terminal(&stack.use_case, job_id, Duration::from_secs(30)).await;

    assert_eq!(status.status, "completed");
    assert!(
        status.discovered_count >= 3,
        "expected at least 3 discoveries, got {}",
        status.discovered_count
    );
    assert!(
        status.crawled_count >= 1,
        "expected at least the product crawled, got {}",
        status.crawled_count
    );
    assert_eq!(status.error_count, 0);

    // Classifications recorded as specified.
    let accessories = format!("{}/shop/accessories", server.uri());
    let belt = format!("{}/shop/accessories/belt-1", server.uri());

    let record = stack.store.find(job_id, &accessories).await.unwrap().unwrap();
    assert_eq!(record.classification, Classification::Category);

    let record = stack.store.find(job_id, &belt).await.unwrap().unwrap();
    assert_eq!(record.classification, Classification::Product);
    assert_eq!(record.state, UrlState::Indexed);

    // The product document went through extraction and indexing.
    let doc = DocumentRepository::find_by_url(stack.store.as_ref(), job_id, &belt)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(doc.fetch_status, FetchStatus::Success);
    assert_eq!(doc.extracted_fields["title"], serde_json::json!("Leather belt"));
    assert_eq!(doc.extracted_fields["price"], serde_json::json!(59.0));
    assert!(stack.indexer.indexed_urls().contains(&belt));
}

#[tokio::test]
async fn test_admin_pages_classified_excluded_and_never_fetched() {
    let server = MockServer::start().await;
    mount_shop(&server).await;

    let stack = test_stack();
    let job_id = stack
        .use_case
        .start_crawl(StartCrawlRequest {
            shop_id: "shop-1".to_string(),
            shop_url: server.uri(),
            include: vec![],
            exclude: vec![],
            max_products: Some(10),
            worker_count: Some(2),
        })
        .await
        .expect("start_crawl");

    wait_for_terminal(&stack.use_case, job_id, Duration::from_secs(30)).await;

    // Present in both sitemap and navigation, classified excluded...
    let admin = format!("{}/admin/login", server.uri());
    let record = stack.store.find(job_id, &admin).await.unwrap().unwrap();
    assert_eq!(record.classification, Classification::Excluded);
    assert_eq!(record.state, UrlState::Discovered);

    // ...and no request ever reached the server for it.
    let requests = server.received_requests().await.unwrap();
    assert!(
        requests.iter().all(|r| !r.url.path().starts_with("/admin")),
        "excluded URL must never be fetched"
    );
}

#[tokio::test]
async fn test_product_limit_triggers_graceful_early_completion() {
    let server = MockServer::start().await;

    // A minimal shop whose category page links two products, so a limit
    // of one actually bites.
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><body><nav><a href="/shop/accessories">Accessories</a></nav></body></html>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nAllow: /\n"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/shop/accessories"))
        .respond_with(html(
            r#"<html><body><main>
                <a href="/shop/accessories/belt-1">Belt one</a>
                <a href="/shop/accessories/belt-2">Belt two</a>
            </main></body></html>"#,
        ))
        .mount(&server)
        .await;
    for product in ["belt-1", "belt-2"] {
        Mock::given(method("GET"))
            .and(path(format!("/shop/accessories/{}", product)))
            .respond_with(html(
                "<html><head><title>Belt</title></head><body><h1>Belt</h1></body></html>",
            ))
            .mount(&server)
            .await;
    }

    let stack = test_stack();
    let job_id = stack
        .use_case
        .start_crawl(StartCrawlRequest {
            shop_id: "shop-1".to_string(),
            shop_url: server.uri(),
            include: vec![],
            exclude: vec![],
            max_products: Some(1),
            worker_count: Some(1),
        })
        .await
        .expect("start_crawl");

    let status = wait_for_terminal(&stack.use_case, job_id, Duration::from_secs(30)).await;
    assert_eq!(status.status, "completed");

    let products: Vec<_> = DocumentRepository::find_by_job(stack.store.as_ref(), job_id)
        .await
        .unwrap()
        .into_iter()
        .filter(|d| d.is_product())
        .collect();
    assert_eq!(products.len(), 1, "at most max_products product documents");
}

#[tokio::test]
async fn test_unreachable_root_fails_job() {
    let stack = test_stack();
    let job_id = stack
        .use_case
        .start_crawl(StartCrawlRequest {
            shop_id: "shop-1".to_string(),
            // Nothing listens here.
            shop_url: "http://127.0.0.1:1".to_string(),
            include: vec![],
            exclude: vec![],
            max_products: None,
            worker_count: None,
        })
        .await
        .expect("start_crawl");

    let status = wait_for_terminal(&stack.use_case, job_id, Duration::from_secs(30)).await;
    assert_eq!(status.status, "failed");
}

#[tokio::test]
async fn test_second_crawl_for_same_shop_conflicts() {
    let server = MockServer::start().await;
    mount_shop(&server).await;

    let stack = test_stack();
    let request = StartCrawlRequest {
        shop_id: "shop-1".to_string(),
        shop_url: server.uri(),
        include: vec![],
        exclude: vec![],
        max_products: Some(10),
        worker_count: Some(1),
    };

    let job_id = stack.use_case.start_crawl(request.clone()).await.expect("first start");
    let second = stack.use_case.start_crawl(request).await;
    assert!(matches!(second, Err(CrawlUseCaseError::Conflict(id)) if id == job_id));

    // After the first finishes the shop is free again.
    wait_for_terminal(&stack.use_case, job_id, Duration::from_secs(30)).await;
}
