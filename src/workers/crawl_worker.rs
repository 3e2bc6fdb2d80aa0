// Copyright 2025 Kirky.X
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

use anyhow::Result;
use metrics::counter;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use url::Url;
use uuid::Uuid;

use crate::discovery::extract_anchors;
use crate::domain::models::discovered_url::{Classification, SourceStrategy, UrlState};
use crate::domain::models::document::{CrawledDocument, FetchStatus};
use crate::domain::repositories::document_repository::DocumentRepository;
use crate::domain::repositories::indexer::DocumentIndexer;
use crate::domain::repositories::job_repository::JobRepository;
use crate::domain::repositories::url_repository::UrlRepository;
use crate::domain::services::extraction::FieldExtractor;
use crate::engines::fetcher::{FetchError, RateLimitedFetcher};
use crate::queue::frontier::{Candidate, Frontier, QueuedUrl};

const ALL_ANCHORS: &[&str] = &["a[href]"];

// Poll interval while the frontier is empty but discovery still runs.
const IDLE_POLL: Duration = Duration::from_millis(50);

/// 工作器上下文
///
/// 一个作业的全部工作器共享的不可变环境。
#[derive(Clone)]
pub struct WorkerContext {
    /// 所属作业ID
    pub job_id: Uuid,
    /// 前沿队列
    pub frontier: Arc<Frontier>,
    /// 限速抓取器
    pub fetcher: Arc<RateLimitedFetcher>,
    /// URL仓库
    pub urls: Arc<dyn UrlRepository>,
    /// 作业仓库
    pub jobs: Arc<dyn JobRepository>,
    /// 文档仓库
    pub documents: Arc<dyn DocumentRepository>,
    /// 索引协作方
    pub indexer: Arc<dyn DocumentIndexer>,
    /// 作业级取消令牌
    pub cancel: CancellationToken,
    /// 成功产品文档计数（作业内共享）
    pub products_indexed: Arc<AtomicUsize>,
    /// 产品数量上限
    pub max_products: usize,
    /// 最大发现递归深度（抓取分类页时的站内扩展受此约束）
    pub max_depth: u32,
    /// 是否渲染JavaScript
    pub render_js: bool,
}

/// 爬取工作器
///
/// 循环：检查取消令牌 → 从前沿队列出队 → 抓取 → 分类提取 →
/// 交付索引 → 更新计数。达到产品上限时关闭队列，在途抓取
/// 正常结束，不再出队新项。
pub struct CrawlWorker {
    ctx: WorkerContext,
    worker_id: Uuid,
}

impl CrawlWorker {
    pub fn new(ctx: WorkerContext) -> Self {
        Self {
            ctx,
            worker_id: Uuid::new_v4(),
        }
    }

    /// 运行工作器直到队列耗尽、达到上限或被取消
    pub async fn run(self) {
        info!("Crawl worker {} started", self.worker_id);

        loop {
            // Cancellation is observed before each dequeue and dispatch.
            if self.ctx.cancel.is_cancelled() {
                break;
            }
            if self.limit_reached() {
                self.ctx.frontier.close();
                break;
            }

            let item = match self.ctx.frontier.next() {
                Some(item) => item,
                None => {
                    if self.ctx.frontier.is_closed() || self.ctx.frontier.is_exhausted() {
                        break;
                    }
                    sleep(IDLE_POLL).await;
                    continue;
                }
            };

            if let Err(e) = self.process(&item).await {
                error!("Error processing {}: {}", item.url, e);
            }
            self.ctx.frontier.task_done();
        }

        debug!("Crawl worker {} stopped", self.worker_id);
    }

    fn limit_reached(&self) -> bool {
        self.ctx.products_indexed.load(Ordering::SeqCst) >= self.ctx.max_products
    }

    #[instrument(skip(self, item), fields(worker_id = %self.worker_id, url = %item.url))]
    async fn process(&self, item: &QueuedUrl) -> Result<()> {
        match self.ctx.fetcher.fetch(&item.url, self.ctx.render_js).await {
            Ok(page) => {
                // A cancellation that raced the fetch discards the result.
                if self.ctx.cancel.is_cancelled() {
                    let doc = CrawledDocument::unfetched(
                        self.ctx.job_id,
                        &item.url,
                        FetchStatus::Skipped,
                        item.classification,
                        page.attempts,
                    );
                    self.ctx.documents.save(&doc).await?;
                    return Ok(());
                }
                self.handle_success(item, page.content, page.attempts).await
            }
            Err(e) => self.handle_failure(item, e).await,
        }
    }

    async fn handle_success(&self, item: &QueuedUrl, content: String, attempts: u32) -> Result<()> {
        self.ctx
            .urls
            .advance_state(self.ctx.job_id, &item.url, UrlState::Fetched)
            .await?;

        let fields = FieldExtractor::extract(&content);
        let document = CrawledDocument::success(
            self.ctx.job_id,
            &item.url,
            content,
            fields,
            item.classification,
            attempts,
        );

        self.ctx
            .urls
            .advance_state(self.ctx.job_id, &item.url, UrlState::Classified)
            .await?;
        self.ctx.documents.save(&document).await?;
        self.ctx.jobs.increment_crawled(self.ctx.job_id).await?;
        counter!("shopcrawl_documents_total", "status" => "success").increment(1);

        // Hand off to the indexing collaborator. Failures are reported,
        // never retried here and never fatal to the job.
        match self.ctx.indexer.index(&document).await {
            Ok(()) => {
                self.ctx
                    .urls
                    .advance_state(self.ctx.job_id, &item.url, UrlState::Indexed)
                    .await?;
            }
            Err(e) => {
                warn!("Index handoff failed for {}: {}", item.url, e);
                counter!("shopcrawl_index_failures_total").increment(1);
            }
        }

        if document.is_product() {
            let indexed = self.ctx.products_indexed.fetch_add(1, Ordering::SeqCst) + 1;
            if indexed >= self.ctx.max_products {
                info!("Product limit reached ({}), closing frontier", self.ctx.max_products);
                self.ctx.frontier.close();
            }
        }

        // Fetched category pages are themselves discovery surfaces.
        if item.classification == Classification::Category && item.depth < self.ctx.max_depth {
            self.expand_category(item, &document.raw_content).await;
        }

        Ok(())
    }

    async fn expand_category(&self, item: &QueuedUrl, content: &str) {
        let base = match Url::parse(&item.url) {
            Ok(u) => u,
            Err(_) => return,
        };

        let links = extract_anchors(content, &base, ALL_ANCHORS, item.depth + 1);
        debug!("Found {} candidate links on {}", links.len(), item.url);

        for link in links {
            if self.ctx.cancel.is_cancelled() {
                return;
            }
            let mut candidate = Candidate::at_depth(link.url, link.depth);
            candidate.anchor_text = link.anchor_text;
            self.ctx
                .frontier
                .submit(candidate, SourceStrategy::CrawlExpansion, None)
                .await;
        }
    }

    async fn handle_failure(&self, item: &QueuedUrl, error: FetchError) -> Result<()> {
        warn!("Fetch failed for {}: {}", item.url, error);

        let document = CrawledDocument::unfetched(
            self.ctx.job_id,
            &item.url,
            FetchStatus::Failed,
            item.classification,
            error.attempts(),
        );
        self.ctx.documents.save(&document).await?;
        self.ctx
            .urls
            .advance_state(self.ctx.job_id, &item.url, UrlState::Failed)
            .await?;
        self.ctx.jobs.increment_errors(self.ctx.job_id).await?;
        counter!("shopcrawl_documents_total", "status" => "failed").increment(1);

        Ok(())
    }
}
