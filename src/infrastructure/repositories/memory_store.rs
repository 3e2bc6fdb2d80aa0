// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::discovered_url::{DiscoveredUrl, SourceStrategy, UrlState};
use crate::domain::models::document::CrawledDocument;
use crate::domain::models::job::{CrawlJob, JobStatus};
use crate::domain::repositories::document_repository::DocumentRepository;
use crate::domain::repositories::job_repository::{JobRepository, RepositoryError};
use crate::domain::repositories::url_repository::UrlRepository;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

/// 进程内并发存储
///
/// 以分片并发映射承载三类记录。计数器递增在分片锁内完成，
/// 对调用方而言是原子操作，不存在应用层读-改-写窗口，
/// W个工作器各递增一次后计数恰为W。
#[derive(Default)]
pub struct MemoryStore {
    jobs: DashMap<Uuid, CrawlJob>,
    urls: DashMap<(Uuid, String), DiscoveredUrl>,
    documents: DashMap<(Uuid, String), CrawledDocument>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobRepository for MemoryStore {
    async fn create(&self, job: &CrawlJob) -> Result<(), RepositoryError> {
        self.jobs.insert(job.id, job.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CrawlJob>, RepositoryError> {
        Ok(self.jobs.get(&id).map(|j| j.clone()))
    }

    async fn find_active_by_shop(
        &self,
        shop_id: &str,
    ) -> Result<Option<CrawlJob>, RepositoryError> {
        Ok(self
            .jobs
            .iter()
            .find(|j| j.shop_id == shop_id && !j.status.is_terminal())
            .map(|j| j.clone()))
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: JobStatus,
        started_at: Option<DateTime<Utc>>,
        finished_at: Option<DateTime<Utc>>,
    ) -> Result<(), RepositoryError> {
        let mut job = self.jobs.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        job.status = status;
        if started_at.is_some() {
            job.started_at = started_at;
        }
        if finished_at.is_some() {
            job.finished_at = finished_at;
        }
        Ok(())
    }

    async fn increment_discovered(&self, id: Uuid, by: u64) -> Result<(), RepositoryError> {
        let mut job = self.jobs.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        job.discovered_count += by;
        Ok(())
    }

    async fn increment_crawled(&self, id: Uuid) -> Result<(), RepositoryError> {
        let mut job = self.jobs.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        job.crawled_count += 1;
        Ok(())
    }

    async fn increment_errors(&self, id: Uuid) -> Result<(), RepositoryError> {
        let mut job = self.jobs.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        job.error_count += 1;
        Ok(())
    }
}

#[async_trait]
impl UrlRepository for MemoryStore {
    async fn record(&self, url: &DiscoveredUrl) -> Result<(), RepositoryError> {
        self.urls
            .entry((url.job_id, url.url.clone()))
            .and_modify(|existing| {
                existing
                    .source_strategies
                    .extend(url.source_strategies.iter().copied());
            })
            .or_insert_with(|| url.clone());
        Ok(())
    }

    async fn merge_strategy(
        &self,
        job_id: Uuid,
        url: &str,
        strategy: SourceStrategy,
    ) -> Result<(), RepositoryError> {
        let mut record = self
            .urls
            .get_mut(&(job_id, url.to_string()))
            .ok_or(RepositoryError::NotFound)?;
        record.source_strategies.insert(strategy);
        Ok(())
    }

    async fn advance_state(
        &self,
        job_id: Uuid,
        url: &str,
        state: UrlState,
    ) -> Result<(), RepositoryError> {
        let mut record = self
            .urls
            .get_mut(&(job_id, url.to_string()))
            .ok_or(RepositoryError::NotFound)?;
        // Lifecycle states only move forward.
        if state > record.state {
            record.state = state;
        }
        Ok(())
    }

    async fn find(
        &self,
        job_id: Uuid,
        url: &str,
    ) -> Result<Option<DiscoveredUrl>, RepositoryError> {
        Ok(self.urls.get(&(job_id, url.to_string())).map(|r| r.clone()))
    }

    async fn find_by_job(&self, job_id: Uuid) -> Result<Vec<DiscoveredUrl>, RepositoryError> {
        Ok(self
            .urls
            .iter()
            .filter(|r| r.key().0 == job_id)
            .map(|r| r.clone())
            .collect())
    }
}

#[async_trait]
impl DocumentRepository for MemoryStore {
    async fn save(&self, document: &CrawledDocument) -> Result<(), RepositoryError> {
        self.documents
            .insert((document.job_id, document.url.clone()), document.clone());
        Ok(())
    }

    async fn find_by_url(
        &self,
        job_id: Uuid,
        url: &str,
    ) -> Result<Option<CrawledDocument>, RepositoryError> {
        Ok(self
            .documents
            .get(&(job_id, url.to_string()))
            .map(|d| d.clone()))
    }

    async fn find_by_job(
        &self,
        job_id: Uuid,
    ) -> Result<Vec<CrawledDocument>, RepositoryError> {
        Ok(self
            .documents
            .iter()
            .filter(|d| d.key().0 == job_id)
            .map(|d| d.clone())
            .collect())
    }
}
