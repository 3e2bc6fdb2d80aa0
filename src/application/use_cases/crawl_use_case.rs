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

use crate::application::dto::crawl_request::StartCrawlRequest;
use crate::application::dto::crawl_status::CrawlStatusDto;
use crate::application::dto::reindex_request::ReindexRequest;
use crate::domain::models::job::CrawlJob;
use crate::domain::repositories::job_repository::{JobRepository, RepositoryError};
use crate::queue::scheduler::CrawlScheduler;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

#[derive(Error, Debug)]
pub enum CrawlUseCaseError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("A crawl is already active for this shop (job {0})")]
    Conflict(Uuid),
    #[error("Crawl not found")]
    NotFound,
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// 爬取用例
///
/// 网关协作方消费的边界操作。启动对每个店铺是幂等的：
/// 店铺已有活跃作业时返回冲突而不是第二个作业。
pub struct CrawlUseCase {
    jobs: Arc<dyn JobRepository>,
    scheduler: Arc<CrawlScheduler>,
    default_max_products: usize,
    default_worker_count: usize,
}

impl CrawlUseCase {
    pub fn new(jobs: Arc<dyn JobRepository>, scheduler: Arc<CrawlScheduler>) -> Self {
        Self {
            jobs,
            scheduler,
            default_max_products: 100,
            default_worker_count: 4,
        }
    }

    /// 启动一次店铺爬取
    ///
    /// # 返回值
    ///
    /// * `Ok(Uuid)` - 新作业ID
    /// * `Err(Conflict)` - 该店铺已有活跃作业
    pub async fn start_crawl(&self, request: StartCrawlRequest) -> Result<Uuid, CrawlUseCaseError> {
        request
            .validate()
            .map_err(|e| CrawlUseCaseError::ValidationError(e.to_string()))?;

        if let Some(active) = self.jobs.find_active_by_shop(&request.shop_id).await? {
            return Err(CrawlUseCaseError::Conflict(active.id));
        }

        let mut job = CrawlJob::new(request.shop_id, request.shop_url);
        job.include_patterns = request.include;
        job.exclude_patterns = request.exclude;
        job.max_products = request.max_products.unwrap_or(self.default_max_products);
        job.worker_count = request.worker_count.unwrap_or(self.default_worker_count);

        let job_id = job.id;
        self.jobs.create(&job).await?;
        self.scheduler.clone().start(job);
        Ok(job_id)
    }

    /// 查询作业状态
    pub async fn get_crawl_status(&self, job_id: Uuid) -> Result<CrawlStatusDto, CrawlUseCaseError> {
        let job = self
            .jobs
            .find_by_id(job_id)
            .await?
            .ok_or(CrawlUseCaseError::NotFound)?;
        Ok(CrawlStatusDto::from(&job))
    }

    /// 针对指定URL集的重索引
    ///
    /// 创建专用的临时作业记录，复用抓取/分类/索引路径。
    /// 重索引是增量定向的，不会销毁既有结果。
    pub async fn reindex(&self, request: ReindexRequest) -> Result<Uuid, CrawlUseCaseError> {
        request
            .validate()
            .map_err(|e| CrawlUseCaseError::ValidationError(e.to_string()))?;

        // The targets' origin stands in for the root URL.
        let root_url = request.urls[0].clone();

        let mut job = CrawlJob::new(request.shop_id, root_url);
        job.reindex = true;
        // Product limits do not apply to targeted refreshes.
        job.max_products = u32::MAX as usize;
        job.worker_count = self.default_worker_count;

        let job_id = job.id;
        self.jobs.create(&job).await?;
        self.scheduler.clone().start_reindex(job, request.urls);
        Ok(job_id)
    }

    /// 取消作业
    ///
    /// 已结束的作业取消是无操作成功。
    pub async fn cancel_crawl(&self, job_id: Uuid) -> Result<(), CrawlUseCaseError> {
        if self.scheduler.cancel(job_id) {
            return Ok(());
        }
        // Not running: fine if it exists (already finished), otherwise 404.
        match self.jobs.find_by_id(job_id).await? {
            Some(_) => Ok(()),
            None => Err(CrawlUseCaseError::NotFound),
        }
    }
}
