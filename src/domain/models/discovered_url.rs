// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// URL分类
///
/// 决定一个URL是被继续探索（category）、作为叶子文档抓取
/// （product）、直接忽略（excluded）还是留作观察（unknown）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// 分类页/集合页，作为入口继续探索
    Category,
    /// 产品详情页，作为叶子文档抓取
    Product,
    /// 被排除（购物车、结账、账户、后台等）
    Excluded,
    /// 无法判断
    #[default]
    Unknown,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Classification::Category => write!(f, "category"),
            Classification::Product => write!(f, "product"),
            Classification::Excluded => write!(f, "excluded"),
            Classification::Unknown => write!(f, "unknown"),
        }
    }
}

impl FromStr for Classification {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "category" => Ok(Classification::Category),
            "product" => Ok(Classification::Product),
            "excluded" => Ok(Classification::Excluded),
            "unknown" => Ok(Classification::Unknown),
            _ => Err(()),
        }
    }
}

/// URL来源策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStrategy {
    /// 作业种子（根URL）
    Seed,
    /// 站点地图解析
    Sitemap,
    /// robots.txt引用提取
    Robots,
    /// 渲染页导航菜单扫描
    Navigation,
    /// 页脚扫描
    Footer,
    /// 正文内容扫描
    PageContent,
    /// 深度分类探索
    DeepExplorer,
    /// 抓取分类页时的站内扩展
    CrawlExpansion,
    /// 重索引请求直接指定
    Reindex,
}

impl fmt::Display for SourceStrategy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SourceStrategy::Seed => write!(f, "seed"),
            SourceStrategy::Sitemap => write!(f, "sitemap"),
            SourceStrategy::Robots => write!(f, "robots"),
            SourceStrategy::Navigation => write!(f, "navigation"),
            SourceStrategy::Footer => write!(f, "footer"),
            SourceStrategy::PageContent => write!(f, "page_content"),
            SourceStrategy::DeepExplorer => write!(f, "deep_explorer"),
            SourceStrategy::CrawlExpansion => write!(f, "crawl_expansion"),
            SourceStrategy::Reindex => write!(f, "reindex"),
        }
    }
}

impl FromStr for SourceStrategy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "seed" => Ok(SourceStrategy::Seed),
            "sitemap" => Ok(SourceStrategy::Sitemap),
            "robots" => Ok(SourceStrategy::Robots),
            "navigation" => Ok(SourceStrategy::Navigation),
            "footer" => Ok(SourceStrategy::Footer),
            "page_content" => Ok(SourceStrategy::PageContent),
            "deep_explorer" => Ok(SourceStrategy::DeepExplorer),
            "crawl_expansion" => Ok(SourceStrategy::CrawlExpansion),
            "reindex" => Ok(SourceStrategy::Reindex),
            _ => Err(()),
        }
    }
}

/// 已发现URL的生命周期状态
///
/// 状态只能单向推进：
/// Discovered → Queued → Fetched → Classified → Indexed | Failed
/// 抓取失败可在尝试次数上限内重试，但绝不会退回 Discovered。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UrlState {
    /// 已发现，记录在案（被排除或超深度的URL停留在此）
    #[default]
    Discovered,
    /// 已入队等待抓取
    Queued,
    /// 已抓取
    Fetched,
    /// 已分类并提取字段
    Classified,
    /// 已交付索引协作方
    Indexed,
    /// 文档级失败
    Failed,
}

impl fmt::Display for UrlState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            UrlState::Discovered => write!(f, "discovered"),
            UrlState::Queued => write!(f, "queued"),
            UrlState::Fetched => write!(f, "fetched"),
            UrlState::Classified => write!(f, "classified"),
            UrlState::Indexed => write!(f, "indexed"),
            UrlState::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for UrlState {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "discovered" => Ok(UrlState::Discovered),
            "queued" => Ok(UrlState::Queued),
            "fetched" => Ok(UrlState::Fetched),
            "classified" => Ok(UrlState::Classified),
            "indexed" => Ok(UrlState::Indexed),
            "failed" => Ok(UrlState::Failed),
            _ => Err(()),
        }
    }
}

/// 已发现URL记录
///
/// 唯一性不变式：每个作业中每个规范化URL至多存在一条记录；
/// 同一URL被多个策略发现时，合并 `source_strategies` 集合，
/// 不产生重复记录。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredUrl {
    /// 所属作业ID
    pub job_id: Uuid,
    /// 规范化后的URL
    pub url: String,
    /// 发现该URL的策略集合
    pub source_strategies: BTreeSet<SourceStrategy>,
    /// URL分类
    pub classification: Classification,
    /// 距根URL的发现递归深度
    pub depth: u32,
    /// 生命周期状态
    pub state: UrlState,
    /// 发现时间
    pub discovered_at: DateTime<Utc>,
}

impl DiscoveredUrl {
    /// 创建新的已发现URL记录
    pub fn new(
        job_id: Uuid,
        url: impl Into<String>,
        source: SourceStrategy,
        classification: Classification,
        depth: u32,
    ) -> Self {
        let mut source_strategies = BTreeSet::new();
        source_strategies.insert(source);
        Self {
            job_id,
            url: url.into(),
            source_strategies,
            classification,
            depth,
            state: UrlState::Discovered,
            discovered_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_ordering_forbids_regression() {
        // UrlState derives Ord in lifecycle order so stores can refuse
        // regressions with a single comparison.
        assert!(UrlState::Discovered < UrlState::Queued);
        assert!(UrlState::Queued < UrlState::Fetched);
        assert!(UrlState::Fetched < UrlState::Classified);
        assert!(UrlState::Classified < UrlState::Indexed);
    }

    #[test]
    fn test_roundtrip_strategy_names() {
        for s in [
            SourceStrategy::Seed,
            SourceStrategy::Sitemap,
            SourceStrategy::Robots,
            SourceStrategy::Navigation,
            SourceStrategy::Footer,
            SourceStrategy::PageContent,
            SourceStrategy::DeepExplorer,
            SourceStrategy::CrawlExpansion,
            SourceStrategy::Reindex,
        ] {
            assert_eq!(s.to_string().parse::<SourceStrategy>().unwrap(), s);
        }
    }
}
