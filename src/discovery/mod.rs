// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 发现策略模块
///
/// 每个策略是一个独立的一次性生产者：给定不可变的作业上下文，
/// 产出一批候选URL（robots策略额外产出排除模式）。策略之间
/// 不共享任何可变状态，由调度器并发运行并在各自完成时把输出
/// 流入前沿队列。
///
/// 单个策略的失败是隔离的：记录并计数，不会中断其他策略或
/// 整个作业（站点地图缺失是常态而不是错误）。
pub mod deep_explorer;
pub mod footer;
pub mod navigation;
pub mod page_content;
pub mod robots;
pub mod sitemap;

use crate::domain::services::classifier::PatternClassifier;
use crate::engines::fetcher::{FetchError, RateLimitedFetcher};
use crate::utils::url_utils;
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use url::Url;

/// 发现错误类型
#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// 抓取失败
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),
    /// 作业被取消
    #[error("Discovery cancelled")]
    Cancelled,
}

/// 候选链接
#[derive(Debug, Clone)]
pub struct CandidateLink {
    /// 绝对URL
    pub url: String,
    /// 锚文本
    pub anchor_text: Option<String>,
    /// 发现递归深度
    pub depth: u32,
}

/// 策略输出
#[derive(Debug, Default)]
pub struct StrategyOutput {
    /// 候选链接
    pub candidates: Vec<CandidateLink>,
    /// 提供给分类器的排除模式（仅robots策略产出）
    pub exclude_patterns: Vec<String>,
}

impl StrategyOutput {
    pub fn from_candidates(candidates: Vec<CandidateLink>) -> Self {
        Self {
            candidates,
            exclude_patterns: Vec::new(),
        }
    }
}

/// 发现上下文
///
/// 策略运行所需的不可变作业环境。
pub struct DiscoveryContext {
    /// 根URL
    pub root_url: Url,
    /// 限速抓取器
    pub fetcher: Arc<RateLimitedFetcher>,
    /// 分类器（深度探索需要识别分类页）
    pub classifier: PatternClassifier,
    /// 是否渲染JavaScript
    pub render_js: bool,
    /// 深度探索的最大递归深度
    pub max_depth: u32,
    /// 每层探索的页面预算
    pub pages_per_level: usize,
    /// 作业级取消令牌，页面加载之间检查
    pub cancel: CancellationToken,
}

/// 发现策略特质
///
/// `discover` 产出的序列是有限的且每次调用完整重新推导，
/// 不支持中途续传。
#[async_trait]
pub trait DiscoveryStrategy: Send + Sync {
    /// 策略名称
    fn name(&self) -> &'static str;

    /// 该策略在URL记录中登记的来源标识
    fn source(&self) -> crate::domain::models::discovered_url::SourceStrategy;

    /// 执行发现
    async fn discover(&self, ctx: &DiscoveryContext) -> Result<StrategyOutput, DiscoveryError>;
}

/// 从HTML中按选择器列表提取同域锚链接
///
/// 跳过片段、mailto和javascript链接，相对路径基于 `base`
/// 解析为绝对URL，并过滤掉跨域链接。
pub(crate) fn extract_anchors(
    html_content: &str,
    base: &Url,
    selectors: &[&str],
    depth: u32,
) -> Vec<CandidateLink> {
    let document = Html::parse_document(html_content);
    let mut out: Vec<CandidateLink> = Vec::new();

    for sel in selectors {
        let selector = match Selector::parse(sel) {
            Ok(s) => s,
            Err(_) => continue,
        };

        for element in document.select(&selector) {
            let href = match element.value().attr("href") {
                Some(h) => h,
                None => continue,
            };
            if href.starts_with('#') || href.starts_with("mailto:") || href.starts_with("javascript:")
            {
                continue;
            }

            let absolute = match url_utils::resolve_url(base, href) {
                Ok(u) => u,
                Err(_) => continue,
            };
            if absolute.scheme() != "http" && absolute.scheme() != "https" {
                continue;
            }
            if !url_utils::is_same_domain(&absolute, base) {
                continue;
            }

            let text = element.text().collect::<Vec<_>>().join(" ");
            let text = text.trim().to_string();

            if out.iter().any(|c| c.url == absolute.as_str()) {
                continue;
            }
            out.push(CandidateLink {
                url: absolute.to_string(),
                anchor_text: if text.is_empty() { None } else { Some(text) },
                depth,
            });
        }
    }

    out
}
