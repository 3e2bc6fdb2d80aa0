// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use shopcrawl::application::dto::crawl_status::CrawlStatusDto;
use shopcrawl::application::use_cases::CrawlUseCase;
use shopcrawl::domain::models::document::CrawledDocument;
use shopcrawl::domain::repositories::indexer::{DocumentIndexer, IndexError};
use shopcrawl::engines::fetcher::RateLimitedFetcher;
use shopcrawl::engines::reqwest_engine::ReqwestEngine;
use shopcrawl::engines::router::EngineRouter;
use shopcrawl::infrastructure::repositories::memory_store::MemoryStore;
use shopcrawl::queue::scheduler::{CrawlScheduler, SchedulerConfig};
use shopcrawl::utils::retry_policy::RetryPolicy;
use shopcrawl::utils::robots::RobotsChecker;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

/// Indexer double that remembers every handed-off document.
#[derive(Default)]
pub struct RecordingIndexer {
    documents: Mutex<Vec<CrawledDocument>>,
}

impl RecordingIndexer {
    pub fn indexed_urls(&self) -> Vec<String> {
        self.documents
            .lock()
            .unwrap()
            .iter()
            .map(|d| d.url.clone())
            .collect()
    }
}

#[async_trait]
impl DocumentIndexer for RecordingIndexer {
    async fn index(&self, document: &CrawledDocument) -> Result<(), IndexError> {
        self.documents.lock().unwrap().push(document.clone());
        Ok(())
    }
}

pub struct TestStack {
    pub store: Arc<MemoryStore>,
    pub indexer: Arc<RecordingIndexer>,
    pub scheduler: Arc<CrawlScheduler>,
    pub use_case: CrawlUseCase,
}

/// Full crawl stack over an in-memory store, the HTTP engine only and
/// near-zero retry/rate-limit delays.
pub fn test_stack() -> TestStack {
    shopcrawl::utils::telemetry::init_telemetry();

    let store = Arc::new(MemoryStore::new());
    let indexer = Arc::new(RecordingIndexer::default());

    let engines: Vec<Arc<dyn shopcrawl::engines::traits::FetchEngine>> =
        vec![Arc::new(ReqwestEngine::new())];
    let router = Arc::new(EngineRouter::new(engines));
    let robots = Arc::new(RobotsChecker::with_retry_policy(RetryPolicy::near_zero()));
    let fetcher = Arc::new(RateLimitedFetcher::new(
        router,
        robots,
        Duration::ZERO,
        RetryPolicy::near_zero(),
        "shopcrawl-bot/1.0",
        Duration::from_secs(10),
    ));

    let scheduler = Arc::new(CrawlScheduler::new(
        store.clone(),
        store.clone(),
        store.clone(),
        indexer.clone(),
        fetcher,
        SchedulerConfig {
            render_js: false,
            cancel_grace: Duration::from_secs(5),
            ..Default::default()
        },
    ));

    let use_case = CrawlUseCase::new(store.clone(), scheduler.clone());

    TestStack {
        store,
        indexer,
        scheduler,
        use_case,
    }
}

/// Poll job status until it reaches a terminal state.
pub async fn wait_for_terminal(
    use_case: &CrawlUseCase,
    job_id: Uuid,
    timeout: Duration,
) -> CrawlStatusDto {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let status = use_case.get_crawl_status(job_id).await.expect("status query");
        if ["completed", "failed", "cancelled"].contains(&status.status.as_str()) {
            return status;
        }
        if tokio::time::Instant::now() > deadline {
            panic!("job {} did not finish in {:?}: {:?}", job_id, timeout, status);
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}
