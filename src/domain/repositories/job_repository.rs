// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::job::{CrawlJob, JobStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

/// 仓库错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// 数据库错误
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    /// 记录未找到
    #[error("Record not found")]
    NotFound,
    /// 记录损坏或无法解码
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

/// 作业仓库特质
///
/// 定义爬取作业的数据访问接口。计数器更新是原子递增，
/// 可由任意数量的工作器并发调用而不丢失更新。
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// 创建新作业
    async fn create(&self, job: &CrawlJob) -> Result<(), RepositoryError>;
    /// 根据ID查找作业
    async fn find_by_id(&self, id: Uuid) -> Result<Option<CrawlJob>, RepositoryError>;
    /// 查找店铺当前活跃（非终止状态）的作业
    async fn find_active_by_shop(&self, shop_id: &str)
        -> Result<Option<CrawlJob>, RepositoryError>;
    /// 更新作业状态与时间戳
    async fn update_status(
        &self,
        id: Uuid,
        status: JobStatus,
        started_at: Option<DateTime<Utc>>,
        finished_at: Option<DateTime<Utc>>,
    ) -> Result<(), RepositoryError>;
    /// 原子递增已发现计数
    async fn increment_discovered(&self, id: Uuid, by: u64) -> Result<(), RepositoryError>;
    /// 原子递增已抓取计数
    async fn increment_crawled(&self, id: Uuid) -> Result<(), RepositoryError>;
    /// 原子递增失败计数
    async fn increment_errors(&self, id: Uuid) -> Result<(), RepositoryError>;
}
