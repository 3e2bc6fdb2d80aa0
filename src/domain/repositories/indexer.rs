// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::document::CrawledDocument;
use async_trait::async_trait;
use thiserror::Error;

/// 索引错误类型
#[derive(Error, Debug)]
pub enum IndexError {
    /// 协作方请求失败
    #[error("Index request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    /// 协作方拒绝了文档
    #[error("Document rejected: {0}")]
    Rejected(String),
}

/// 索引协作方端口
///
/// 每个成功分类的文档被交付一次。索引写入失败只记录上报，
/// 不在本核心重试：重试与退避策略属于索引协作方自身。
#[async_trait]
pub trait DocumentIndexer: Send + Sync {
    /// 将文档交付索引协作方
    async fn index(&self, document: &CrawledDocument) -> Result<(), IndexError>;
}
