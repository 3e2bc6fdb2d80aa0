// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::document::CrawledDocument;
use crate::domain::repositories::indexer::{DocumentIndexer, IndexError};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// HTTP索引器
///
/// 把文档POST到嵌入/向量存储协作方的摄入端点。交付是
/// 一次性的：写入失败由调用方记录上报，重试与退避策略
/// 属于协作方自身。
pub struct HttpIndexer {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpIndexer {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl DocumentIndexer for HttpIndexer {
    async fn index(&self, document: &CrawledDocument) -> Result<(), IndexError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(document)
            .timeout(Duration::from_secs(10))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(IndexError::Rejected(format!(
                "collaborator returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

/// 空索引器
///
/// 丢弃全部文档。用于测试和只产出存储记录的试运行。
#[derive(Default)]
pub struct NullIndexer;

#[async_trait]
impl DocumentIndexer for NullIndexer {
    async fn index(&self, document: &CrawledDocument) -> Result<(), IndexError> {
        debug!(url = %document.url, "NullIndexer dropping document");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::discovered_url::Classification;
    use std::collections::HashMap;
    use uuid::Uuid;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn document() -> CrawledDocument {
        CrawledDocument::success(
            Uuid::new_v4(),
            "https://shop.test/p/belt-1",
            "<html></html>".to_string(),
            HashMap::new(),
            Classification::Product,
            1,
        )
    }

    #[tokio::test]
    async fn test_http_indexer_posts_document() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ingest"))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let indexer = HttpIndexer::new(format!("{}/ingest", server.uri()));
        indexer.index(&document()).await.expect("handoff");
    }

    #[tokio::test]
    async fn test_http_indexer_reports_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ingest"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let indexer = HttpIndexer::new(format!("{}/ingest", server.uri()));
        let err = indexer.index(&document()).await.unwrap_err();
        assert!(matches!(err, IndexError::Rejected(_)));
    }
}
