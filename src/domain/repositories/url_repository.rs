// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::discovered_url::{DiscoveredUrl, SourceStrategy, UrlState};
use crate::domain::repositories::job_repository::RepositoryError;
use async_trait::async_trait;
use uuid::Uuid;

/// URL仓库特质
///
/// 维护每个作业的已发现URL记录。`record` 是幂等的 upsert：
/// 同一规范化URL的后续发现只会把新策略并入已有记录的
/// `source_strategies` 集合。
#[async_trait]
pub trait UrlRepository: Send + Sync {
    /// 记录一个已发现URL（存在时合并来源策略）
    async fn record(&self, url: &DiscoveredUrl) -> Result<(), RepositoryError>;
    /// 合并一个来源策略到已有记录
    async fn merge_strategy(
        &self,
        job_id: Uuid,
        url: &str,
        strategy: SourceStrategy,
    ) -> Result<(), RepositoryError>;
    /// 推进URL生命周期状态（只允许前进，不允许回退）
    async fn advance_state(
        &self,
        job_id: Uuid,
        url: &str,
        state: UrlState,
    ) -> Result<(), RepositoryError>;
    /// 查找单条记录
    async fn find(&self, job_id: Uuid, url: &str)
        -> Result<Option<DiscoveredUrl>, RepositoryError>;
    /// 列出作业的全部URL记录
    async fn find_by_job(&self, job_id: Uuid) -> Result<Vec<DiscoveredUrl>, RepositoryError>;
}
