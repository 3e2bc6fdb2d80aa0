// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::discovery::{extract_anchors, CandidateLink, DiscoveryContext, DiscoveryError, DiscoveryStrategy, StrategyOutput};
use crate::domain::models::discovered_url::Classification;
use crate::utils::url_utils;
use async_trait::async_trait;
use std::collections::HashSet;
use tracing::debug;

const ALL_ANCHORS: &[&str] = &["a[href]"];

/// 深度分类探索策略
///
/// 从根页面识别分类页链接，逐层抓取分类页寻找子分类和
/// 产品链接。递归不走调用栈：深度计数显式携带在候选记录
/// 中，受最大深度、已访问集和每层页面预算约束，病态站点
/// 不会导致无界展开。页面加载之间检查取消令牌。
pub struct DeepExplorerStrategy;

#[async_trait]
impl DiscoveryStrategy for DeepExplorerStrategy {
    fn name(&self) -> &'static str {
        "deep_explorer"
    }

    fn source(&self) -> crate::domain::models::discovered_url::SourceStrategy {
        crate::domain::models::discovered_url::SourceStrategy::DeepExplorer
    }

    async fn discover(&self, ctx: &DiscoveryContext) -> Result<StrategyOutput, DiscoveryError> {
        let root_page = ctx
            .fetcher
            .fetch(ctx.root_url.as_str(), ctx.render_js)
            .await?;

        let mut visited: HashSet<String> = HashSet::new();
        let mut output: Vec<CandidateLink> = Vec::new();

        // Level 1: category candidates on the root page.
        let mut current_level: Vec<CandidateLink> =
            extract_anchors(&root_page.content, &ctx.root_url, ALL_ANCHORS, 1)
                .into_iter()
                .filter(|link| {
                    ctx.classifier.classify(&link.url, link.anchor_text.as_deref())
                        == Classification::Category
                })
                .collect();
        output.extend(current_level.clone());

        let mut depth = 1;
        while depth < ctx.max_depth && !current_level.is_empty() {
            let mut next_level: Vec<CandidateLink> = Vec::new();

            for category in current_level.iter().take(ctx.pages_per_level) {
                if ctx.cancel.is_cancelled() {
                    return Err(DiscoveryError::Cancelled);
                }

                let normalized = match url_utils::normalize_url(&category.url) {
                    Ok(n) => n,
                    Err(_) => continue,
                };
                if !visited.insert(normalized) {
                    continue;
                }

                let page = match ctx.fetcher.fetch(&category.url, ctx.render_js).await {
                    Ok(p) => p,
                    Err(e) => {
                        debug!("Deep exploration skipping {}: {}", category.url, e);
                        continue;
                    }
                };

                for link in extract_anchors(&page.content, &ctx.root_url, ALL_ANCHORS, depth + 1) {
                    match ctx.classifier.classify(&link.url, link.anchor_text.as_deref()) {
                        Classification::Category => {
                            next_level.push(link.clone());
                            output.push(link);
                        }
                        Classification::Product => output.push(link),
                        _ => {}
                    }
                }
            }

            current_level = next_level;
            depth += 1;
        }

        Ok(StrategyOutput::from_candidates(output))
    }
}
