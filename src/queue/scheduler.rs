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

use crate::config::settings::CrawlerSettings;
use crate::discovery::deep_explorer::DeepExplorerStrategy;
use crate::discovery::footer::FooterStrategy;
use crate::discovery::navigation::NavigationStrategy;
use crate::discovery::page_content::PageContentStrategy;
use crate::discovery::robots::RobotsStrategy;
use crate::discovery::sitemap::SitemapStrategy;
use crate::discovery::{DiscoveryContext, DiscoveryStrategy};
use crate::domain::models::discovered_url::SourceStrategy;
use crate::domain::models::job::{CrawlJob, JobStatus};
use crate::domain::repositories::document_repository::DocumentRepository;
use crate::domain::repositories::indexer::DocumentIndexer;
use crate::domain::repositories::job_repository::JobRepository;
use crate::domain::repositories::url_repository::UrlRepository;
use crate::domain::services::classifier::PatternClassifier;
use crate::engines::fetcher::RateLimitedFetcher;
use crate::queue::frontier::{Candidate, Frontier, FrontierConfig};
use crate::workers::{WorkerContext, WorkerPool};
use chrono::Utc;
use dashmap::DashMap;
use metrics::counter;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use url::Url;
use uuid::Uuid;

// Poll interval for the streaming discovering -> crawling transition.
const STREAM_POLL: Duration = Duration::from_millis(25);

/// 调度器配置
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// 最大发现递归深度
    pub max_depth: u32,
    /// 深度探索每层页面预算
    pub pages_per_level: usize,
    /// 是否渲染JavaScript
    pub render_js: bool,
    /// 取消宽限期
    pub cancel_grace: Duration,
    /// 工作器数量下限
    pub min_workers: usize,
    /// 工作器数量上限
    pub max_workers: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            pages_per_level: 5,
            render_js: true,
            cancel_grace: Duration::from_secs(30),
            min_workers: 1,
            max_workers: 8,
        }
    }
}

impl From<&CrawlerSettings> for SchedulerConfig {
    fn from(settings: &CrawlerSettings) -> Self {
        Self {
            max_depth: settings.max_depth,
            pages_per_level: settings.pages_per_level,
            render_js: settings.render_js,
            cancel_grace: Duration::from_secs(settings.cancel_grace_secs),
            min_workers: settings.min_workers,
            max_workers: settings.max_workers,
        }
    }
}

/// 爬取调度器
///
/// 驱动作业状态机：pending → discovering → crawling →
/// completed，failed/cancelled 可从中间状态到达。
///
/// 一次作业执行的编排：根URL预检（不可达即作业级失败）、
/// 并发运行发现策略并将产出流入前沿队列（流式启动，抓取在
/// 慢策略结束前就开始）、固定大小工作器池消费队列直至耗尽、
/// 达到产品上限或被取消。
///
/// 不同店铺的多个作业可以并发运行，除作业存储外不共享任何
/// 可变状态。
pub struct CrawlScheduler {
    jobs: Arc<dyn JobRepository>,
    urls: Arc<dyn UrlRepository>,
    documents: Arc<dyn DocumentRepository>,
    indexer: Arc<dyn DocumentIndexer>,
    fetcher: Arc<RateLimitedFetcher>,
    config: SchedulerConfig,
    active: DashMap<Uuid, CancellationToken>,
}

impl CrawlScheduler {
    pub fn new(
        jobs: Arc<dyn JobRepository>,
        urls: Arc<dyn UrlRepository>,
        documents: Arc<dyn DocumentRepository>,
        indexer: Arc<dyn DocumentIndexer>,
        fetcher: Arc<RateLimitedFetcher>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            jobs,
            urls,
            documents,
            indexer,
            fetcher,
            config,
            active: DashMap::new(),
        }
    }

    /// 启动一个发现式爬取作业（后台执行）
    pub fn start(self: Arc<Self>, job: CrawlJob) {
        let cancel = CancellationToken::new();
        self.active.insert(job.id, cancel.clone());
        tokio::spawn(async move {
            self.execute(job, cancel, None).await;
        });
    }

    /// 启动一个重索引作业：目标URL直接给定，跳过发现阶段
    pub fn start_reindex(self: Arc<Self>, job: CrawlJob, targets: Vec<String>) {
        let cancel = CancellationToken::new();
        self.active.insert(job.id, cancel.clone());
        tokio::spawn(async move {
            self.execute(job, cancel, Some(targets)).await;
        });
    }

    /// 触发作业取消
    ///
    /// 返回 `false` 表示该作业当前不在执行中。
    pub fn cancel(&self, job_id: Uuid) -> bool {
        match self.active.get(&job_id) {
            Some(token) => {
                info!(%job_id, "Cancellation requested");
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// 作业是否仍在执行
    pub fn is_active(&self, job_id: Uuid) -> bool {
        self.active.contains_key(&job_id)
    }

    async fn execute(
        self: Arc<Self>,
        job: CrawlJob,
        cancel: CancellationToken,
        reindex_targets: Option<Vec<String>>,
    ) {
        let job_id = job.id;
        info!(%job_id, shop = %job.shop_id, "Starting crawl job");

        let job = match job.begin_discovery() {
            Ok(job) => job,
            Err(e) => {
                error!(%job_id, "Refusing to start job: {}", e);
                self.active.remove(&job_id);
                return;
            }
        };
        self.persist_status(job_id, JobStatus::Discovering, true).await;

        let root = match Url::parse(&job.root_url) {
            Ok(root) => root,
            Err(e) => {
                error!(%job_id, "Invalid root URL {}: {}", job.root_url, e);
                self.fail_job(job_id).await;
                return;
            }
        };

        // Preflight: an unreachable root is the one job-fatal condition.
        if reindex_targets.is_none() {
            if let Err(e) = self.fetcher.fetch_raw(root.as_str(), false).await {
                error!(%job_id, "Root URL unreachable, failing job: {}", e);
                self.fail_job(job_id).await;
                return;
            }
        }

        let classifier = PatternClassifier::new();
        let frontier = Arc::new(Frontier::new(
            job_id,
            root.clone(),
            FrontierConfig {
                include_patterns: job.include_patterns.clone(),
                exclude_patterns: job.exclude_patterns.clone(),
                max_depth: self.config.max_depth,
                queue_unknown: job.reindex,
            },
            classifier.clone(),
            self.urls.clone(),
            self.jobs.clone(),
        ));

        let discovery_cancel = cancel.child_token();
        let mut discovery_handles = Vec::new();

        match &reindex_targets {
            Some(targets) => {
                // Reindex bypasses discovery: targets enter the frontier
                // directly and reuse the fetch/classify/index path.
                for target in targets {
                    frontier
                        .submit(Candidate::new(target.clone()), SourceStrategy::Reindex, None)
                        .await;
                }
            }
            None => {
                // The root page is the first entry point to explore.
                frontier
                    .submit(
                        Candidate::new(job.root_url.clone()),
                        SourceStrategy::Seed,
                        Some(crate::domain::models::discovered_url::Classification::Category),
                    )
                    .await;

                let ctx = Arc::new(DiscoveryContext {
                    root_url: root.clone(),
                    fetcher: self.fetcher.clone(),
                    classifier,
                    render_js: self.config.render_js,
                    max_depth: self.config.max_depth,
                    pages_per_level: self.config.pages_per_level,
                    cancel: discovery_cancel.clone(),
                });

                let strategies: Vec<Arc<dyn DiscoveryStrategy>> = vec![
                    Arc::new(SitemapStrategy),
                    Arc::new(RobotsStrategy),
                    Arc::new(NavigationStrategy),
                    Arc::new(FooterStrategy),
                    Arc::new(PageContentStrategy),
                    Arc::new(DeepExplorerStrategy),
                ];

                // Register every producer before any of them runs, so the
                // frontier cannot look exhausted while discovery is still
                // starting up.
                for _ in &strategies {
                    frontier.producer_opened();
                }

                for strategy in strategies {
                    let frontier = frontier.clone();
                    let ctx = ctx.clone();
                    discovery_handles.push(tokio::spawn(async move {
                        let name = strategy.name();
                        match strategy.discover(&ctx).await {
                            Ok(output) => {
                                if !output.exclude_patterns.is_empty() {
                                    frontier.add_exclusions(&output.exclude_patterns);
                                }
                                let found = output.candidates.len();
                                for link in output.candidates {
                                    let mut candidate = Candidate::at_depth(link.url, link.depth);
                                    candidate.anchor_text = link.anchor_text;
                                    frontier.submit(candidate, strategy.source(), None).await;
                                }
                                info!(strategy = name, found, "Discovery strategy finished");
                            }
                            Err(e) => {
                                // Strategy failures are isolated; the job
                                // carries on with the other producers.
                                warn!(strategy = name, "Discovery strategy failed: {}", e);
                                counter!("shopcrawl_strategy_failures_total", "strategy" => name)
                                    .increment(1);
                            }
                        }
                        frontier.producer_closed();
                    }));
                }
            }
        }

        // Streaming start: begin crawling as soon as the frontier has a
        // queued URL; discovery keeps feeding it in the background.
        while !cancel.is_cancelled()
            && frontier.queued_len() == 0
            && !frontier.is_exhausted()
        {
            sleep(STREAM_POLL).await;
        }

        if !cancel.is_cancelled() {
            self.persist_status(job_id, JobStatus::Crawling, false).await;
            info!(%job_id, queued = frontier.queued_len(), "Crawling started");

            let worker_count = job
                .worker_count
                .clamp(self.config.min_workers, self.config.max_workers);
            let pool = WorkerPool::start(
                worker_count,
                WorkerContext {
                    job_id,
                    frontier: frontier.clone(),
                    fetcher: self.fetcher.clone(),
                    urls: self.urls.clone(),
                    jobs: self.jobs.clone(),
                    documents: self.documents.clone(),
                    indexer: self.indexer.clone(),
                    cancel: cancel.clone(),
                    products_indexed: Arc::new(AtomicUsize::new(0)),
                    max_products: job.max_products,
                    max_depth: if job.reindex { 0 } else { self.config.max_depth },
                    render_js: self.config.render_js,
                },
            );
            pool.join(cancel.clone(), self.config.cancel_grace).await;
        }

        // Stop any still-running discovery (product limit reached or
        // cancellation) and wait for it to wind down.
        discovery_cancel.cancel();
        for handle in discovery_handles {
            let _ = handle.await;
        }

        let final_status = if cancel.is_cancelled() {
            JobStatus::Cancelled
        } else {
            JobStatus::Completed
        };
        self.finish_job(job_id, final_status).await;
        self.active.remove(&job_id);
    }

    async fn persist_status(&self, job_id: Uuid, status: JobStatus, mark_started: bool) {
        let started_at = mark_started.then(Utc::now);
        if let Err(e) = self.jobs.update_status(job_id, status, started_at, None).await {
            warn!(%job_id, "Failed to persist status {}: {}", status, e);
        }
    }

    async fn fail_job(&self, job_id: Uuid) {
        if let Err(e) = self
            .jobs
            .update_status(job_id, JobStatus::Failed, None, Some(Utc::now()))
            .await
        {
            warn!(%job_id, "Failed to persist failed status: {}", e);
        }
        counter!("shopcrawl_jobs_total", "status" => "failed").increment(1);
        self.active.remove(&job_id);
    }

    async fn finish_job(&self, job_id: Uuid, status: JobStatus) {
        if let Err(e) = self
            .jobs
            .update_status(job_id, status, None, Some(Utc::now()))
            .await
        {
            warn!(%job_id, "Failed to persist final status: {}", e);
        }
        counter!("shopcrawl_jobs_total", "status" => status.to_string()).increment(1);
        info!(%job_id, %status, "Crawl job finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_settings() {
        let settings = crate::config::Settings::new().expect("defaults");
        let config = SchedulerConfig::from(&settings.crawler);

        assert_eq!(config.max_depth, 3);
        assert_eq!(config.max_workers, 8);
        assert_eq!(config.cancel_grace, Duration::from_secs(30));
    }
}
