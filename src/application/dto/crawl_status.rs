// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::job::CrawlJob;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 爬取状态响应
///
/// 任何时刻都反映部分进度：error_count非零而状态为
/// completed 表示带部分损失的成功，区别于 failed。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlStatusDto {
    pub job_id: Uuid,
    pub shop_id: String,
    pub status: String,
    pub discovered_count: u64,
    pub crawled_count: u64,
    pub error_count: u64,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl From<&CrawlJob> for CrawlStatusDto {
    fn from(job: &CrawlJob) -> Self {
        Self {
            job_id: job.id,
            shop_id: job.shop_id.clone(),
            status: job.status.to_string(),
            discovered_count: job.discovered_count,
            crawled_count: job.crawled_count,
            error_count: job.error_count,
            started_at: job.started_at,
            finished_at: job.finished_at,
        }
    }
}
