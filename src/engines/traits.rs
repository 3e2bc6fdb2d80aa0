// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// 引擎错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    /// 请求失败
    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    /// 所有引擎都失败
    #[error("All engines failed")]
    AllEnginesFailed,
    /// 超时
    #[error("Timeout")]
    Timeout,
    /// 浏览器引擎错误
    #[error("Browser error: {0}")]
    Browser(String),
    /// 其他错误
    #[error("Other error: {0}")]
    Other(String),
}

impl EngineError {
    /// 判断错误是否可重试
    ///
    /// 超时、连接错误和服务端错误可重试；其余按永久处理。
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::RequestFailed(e) => {
                e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
            }
            EngineError::Timeout => true,
            EngineError::Browser(_) => true,
            _ => false,
        }
    }
}

/// 抓取请求
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// 目标URL
    pub url: String,
    /// 超时时间
    pub timeout: Duration,
    /// 是否需要JavaScript渲染（客户端构建的导航等）
    pub needs_js: bool,
    /// User-Agent
    pub user_agent: String,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: Duration::from_secs(30),
            needs_js: false,
            user_agent: "shopcrawl-bot/1.0".to_string(),
        }
    }
}

/// 抓取响应
///
/// HTTP层面的失败状态码（404、500等）以正常响应返回，
/// 由限速抓取器负责归类为瞬时或永久失败。
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// HTTP状态码
    pub status_code: u16,
    /// 响应内容
    pub content: String,
    /// 内容类型
    pub content_type: String,
    /// 响应时间（毫秒）
    pub response_time_ms: u64,
}

/// 抓取引擎特质
#[async_trait]
pub trait FetchEngine: Send + Sync {
    /// 执行抓取
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, EngineError>;

    /// 计算对请求的支持分数（0-100）
    fn support_score(&self, request: &FetchRequest) -> u8;

    /// 引擎名称
    fn name(&self) -> &'static str;
}
