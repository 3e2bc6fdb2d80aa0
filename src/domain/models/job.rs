// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// 爬取作业实体
///
/// 表示一个店铺的一次完整爬取运行，包含作业的配置参数、
/// 执行状态、统计计数和生命周期时间戳。
///
/// 作业由调度器独占持有，状态仅通过状态机转换方法变更。
/// 同一店铺同时只允许一个活跃作业；新作业取代旧作业，
/// 但不会销毁旧作业已产出的结果。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlJob {
    /// 作业唯一标识符
    pub id: Uuid,
    /// 所属店铺ID，用于作业互斥和结果归属
    pub shop_id: String,
    /// 根URL，爬取的起始地址
    pub root_url: String,
    /// 调用方提供的包含模式，命中之一才会入队
    pub include_patterns: Vec<String>,
    /// 调用方提供的排除模式，命中即丢弃
    pub exclude_patterns: Vec<String>,
    /// 产品数量上限，达到后作业优雅提前结束
    pub max_products: usize,
    /// 工作器数量（1-8）
    pub worker_count: usize,
    /// 是否为重索引作业（跳过发现阶段的临时作业）
    pub reindex: bool,
    /// 作业状态，跟踪作业的执行进度
    pub status: JobStatus,
    /// 已发现URL数量
    pub discovered_count: u64,
    /// 已抓取文档数量
    pub crawled_count: u64,
    /// 文档级失败数量
    pub error_count: u64,
    /// 创建时间
    pub created_at: DateTime<Utc>,
    /// 开始执行时间
    pub started_at: Option<DateTime<Utc>>,
    /// 结束时间（完成、失败或取消）
    pub finished_at: Option<DateTime<Utc>>,
}

/// 作业状态枚举
///
/// 状态转换遵循以下流程：
/// Pending → Discovering → Crawling → Completed
/// Failed/Cancelled 可从 Discovering 或 Crawling 到达
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// 已接受，尚未开始
    #[default]
    Pending,
    /// 发现阶段，发现策略并发运行中
    Discovering,
    /// 抓取阶段，工作器正在消费前沿队列
    Crawling,
    /// 已完成（error_count 非零时表示部分损失的成功）
    Completed,
    /// 作业级致命失败（如根URL不可达）
    Failed,
    /// 已取消
    Cancelled,
}

impl JobStatus {
    /// 判断作业是否已处于终止状态
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Discovering => write!(f, "discovering"),
            JobStatus::Crawling => write!(f, "crawling"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
            JobStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for JobStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "discovering" => Ok(JobStatus::Discovering),
            "crawling" => Ok(JobStatus::Crawling),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            "cancelled" => Ok(JobStatus::Cancelled),
            _ => Err(()),
        }
    }
}

/// 领域错误类型
#[derive(Error, Debug)]
pub enum DomainError {
    /// 无效的状态转换
    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    /// 验证错误
    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl CrawlJob {
    /// 创建一个新的爬取作业
    ///
    /// # 参数
    ///
    /// * `shop_id` - 所属店铺ID
    /// * `root_url` - 根URL
    ///
    /// # 返回值
    ///
    /// 返回处于 Pending 状态的新作业实例
    pub fn new(shop_id: impl Into<String>, root_url: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            shop_id: shop_id.into(),
            root_url: root_url.into(),
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
            max_products: 100,
            worker_count: 4,
            reindex: false,
            status: JobStatus::Pending,
            discovered_count: 0,
            crawled_count: 0,
            error_count: 0,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    fn transition(mut self, from: &[JobStatus], to: JobStatus) -> Result<Self, DomainError> {
        if !from.contains(&self.status) {
            return Err(DomainError::InvalidStateTransition {
                from: self.status.to_string(),
                to: to.to_string(),
            });
        }
        self.status = to;
        Ok(self)
    }

    /// 进入发现阶段
    ///
    /// 将作业状态从 Pending 变更为 Discovering，并记录开始时间
    pub fn begin_discovery(self) -> Result<Self, DomainError> {
        let mut job = self.transition(&[JobStatus::Pending], JobStatus::Discovering)?;
        job.started_at = Some(Utc::now());
        Ok(job)
    }

    /// 进入抓取阶段
    ///
    /// 前沿队列中出现第一个可抓取URL后即可转换（流式启动，
    /// 发现策略继续在后台填充前沿队列）
    pub fn begin_crawling(self) -> Result<Self, DomainError> {
        self.transition(&[JobStatus::Discovering], JobStatus::Crawling)
    }

    /// 完成作业
    pub fn complete(self) -> Result<Self, DomainError> {
        let mut job =
            self.transition(&[JobStatus::Discovering, JobStatus::Crawling], JobStatus::Completed)?;
        job.finished_at = Some(Utc::now());
        Ok(job)
    }

    /// 标记作业失败
    ///
    /// 仅用于作业级致命条件；单个文档失败不会导致作业失败
    pub fn fail(self) -> Result<Self, DomainError> {
        let mut job = self.transition(
            &[JobStatus::Pending, JobStatus::Discovering, JobStatus::Crawling],
            JobStatus::Failed,
        )?;
        job.finished_at = Some(Utc::now());
        Ok(job)
    }

    /// 取消作业
    pub fn cancel(self) -> Result<Self, DomainError> {
        let mut job = self.transition(
            &[JobStatus::Pending, JobStatus::Discovering, JobStatus::Crawling],
            JobStatus::Cancelled,
        )?;
        job.finished_at = Some(Utc::now());
        Ok(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_happy_path() {
        let job = CrawlJob::new("shop-1", "https://shop.test");
        assert_eq!(job.status, JobStatus::Pending);

        let job = job.begin_discovery().unwrap();
        assert_eq!(job.status, JobStatus::Discovering);
        assert!(job.started_at.is_some());

        let job = job.begin_crawling().unwrap();
        assert_eq!(job.status, JobStatus::Crawling);

        let job = job.complete().unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.finished_at.is_some());
    }

    #[test]
    fn test_no_regression_from_terminal_states() {
        let job = CrawlJob::new("shop-1", "https://shop.test")
            .begin_discovery()
            .unwrap()
            .cancel()
            .unwrap();

        assert!(job.status.is_terminal());
        assert!(job.begin_crawling().is_err());
    }

    #[test]
    fn test_cancel_reachable_from_crawling() {
        let job = CrawlJob::new("shop-1", "https://shop.test")
            .begin_discovery()
            .unwrap()
            .begin_crawling()
            .unwrap()
            .cancel()
            .unwrap();
        assert_eq!(job.status, JobStatus::Cancelled);
    }

    #[test]
    fn test_crawling_requires_discovery() {
        let job = CrawlJob::new("shop-1", "https://shop.test");
        assert!(job.begin_crawling().is_err());
    }
}
