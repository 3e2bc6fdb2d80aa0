// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::document::CrawledDocument;
use crate::domain::repositories::job_repository::RepositoryError;
use async_trait::async_trait;
use uuid::Uuid;

/// 文档仓库特质
///
/// 文档记录创建后不可变；仅允许尝试计数递增。
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// 保存文档记录
    async fn save(&self, document: &CrawledDocument) -> Result<(), RepositoryError>;
    /// 根据作业和URL查找文档
    async fn find_by_url(
        &self,
        job_id: Uuid,
        url: &str,
    ) -> Result<Option<CrawledDocument>, RepositoryError>;
    /// 列出作业的全部文档
    async fn find_by_job(&self, job_id: Uuid)
        -> Result<Vec<CrawledDocument>, RepositoryError>;
}
