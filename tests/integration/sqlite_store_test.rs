// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use shopcrawl::domain::models::discovered_url::{
    Classification, DiscoveredUrl, SourceStrategy, UrlState,
};
use shopcrawl::domain::models::job::{CrawlJob, JobStatus};
use shopcrawl::domain::repositories::job_repository::JobRepository;
use shopcrawl::domain::repositories::url_repository::UrlRepository;
use shopcrawl::infrastructure::repositories::sqlite_store::SqliteStore;
use std::sync::Arc;

fn db_url(dir: &tempfile::TempDir) -> String {
    format!("sqlite://{}/crawl.db", dir.path().display())
}

#[tokio::test]
async fn test_job_roundtrip_survives_reconnect() {
    let dir = tempfile::tempdir().unwrap();
    let url = db_url(&dir);

    let mut job = CrawlJob::new("shop-1", "https://shop.test");
    job.include_patterns = vec!["/shop".to_string()];

    {
        let store = SqliteStore::connect(&url).await.unwrap();
        store.create(&job).await.unwrap();
        store
            .update_status(job.id, JobStatus::Discovering, Some(chrono::Utc::now()), None)
            .await
            .unwrap();
    }

    // A fresh connection sees the same state: status queries and reindex
    // stay consistent across process restarts.
    let store = SqliteStore::connect(&url).await.unwrap();
    let loaded = store.find_by_id(job.id).await.unwrap().unwrap();
    assert_eq!(loaded.shop_id, "shop-1");
    assert_eq!(loaded.status, JobStatus::Discovering);
    assert_eq!(loaded.include_patterns, vec!["/shop".to_string()]);
    assert!(loaded.started_at.is_some());

    let active = store.find_active_by_shop("shop-1").await.unwrap();
    assert_eq!(active.unwrap().id, job.id);
}

#[tokio::test]
async fn test_concurrent_counter_increments_lose_no_updates() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SqliteStore::connect(&db_url(&dir)).await.unwrap());

    let job = CrawlJob::new("shop-1", "https://shop.test");
    let job_id = job.id;
    store.create(&job).await.unwrap();

    let workers: u64 = 16;
    let mut handles = Vec::new();
    for _ in 0..workers {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store.increment_crawled(job_id).await.unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let job = store.find_by_id(job_id).await.unwrap().unwrap();
    assert_eq!(job.crawled_count, workers);
}

#[tokio::test]
async fn test_url_upsert_merges_and_state_never_regresses() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::connect(&db_url(&dir)).await.unwrap();

    let job = CrawlJob::new("shop-1", "https://shop.test");
    store.create(&job).await.unwrap();

    let record = DiscoveredUrl::new(
        job.id,
        "https://shop.test/shop/accessories",
        SourceStrategy::Sitemap,
        Classification::Category,
        0,
    );
    store.record(&record).await.unwrap();
    // Second discovery of the same URL merges, no duplicate row.
    store.record(&record).await.unwrap();
    store
        .merge_strategy(job.id, &record.url, SourceStrategy::Navigation)
        .await
        .unwrap();
    store
        .merge_strategy(job.id, &record.url, SourceStrategy::Navigation)
        .await
        .unwrap();

    let all = UrlRepository::find_by_job(&store, job.id).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].source_strategies.len(), 2);

    store
        .advance_state(job.id, &record.url, UrlState::Classified)
        .await
        .unwrap();
    store
        .advance_state(job.id, &record.url, UrlState::Queued)
        .await
        .unwrap();

    let loaded = UrlRepository::find(&store, job.id, &record.url)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded.state, UrlState::Classified);
}
