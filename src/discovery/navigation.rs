// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::discovery::{extract_anchors, DiscoveryContext, DiscoveryError, DiscoveryStrategy, StrategyOutput};
use async_trait::async_trait;

// Navigation is frequently built client-side, hence the rendered fetch.
const NAV_SELECTORS: &[&str] = &[
    "nav a[href]",
    ".navigation a[href]",
    ".nav a[href]",
    ".menu a[href]",
    ".main-menu a[href]",
    ".primary-menu a[href]",
    ".header-menu a[href]",
    ".mega-menu a[href]",
    "[role=\"navigation\"] a[href]",
    ".navbar a[href]",
    ".main-nav a[href]",
];

/// 导航菜单发现策略
///
/// 渲染根页面后扫描导航容器中的同域锚链接。导航是
/// 分类入口最密集的来源。
pub struct NavigationStrategy;

#[async_trait]
impl DiscoveryStrategy for NavigationStrategy {
    fn name(&self) -> &'static str {
        "navigation"
    }

    fn source(&self) -> crate::domain::models::discovered_url::SourceStrategy {
        crate::domain::models::discovered_url::SourceStrategy::Navigation
    }

    async fn discover(&self, ctx: &DiscoveryContext) -> Result<StrategyOutput, DiscoveryError> {
        let page = ctx
            .fetcher
            .fetch(ctx.root_url.as_str(), ctx.render_js)
            .await?;
        let candidates = extract_anchors(&page.content, &ctx.root_url, NAV_SELECTORS, 1);
        Ok(StrategyOutput::from_candidates(candidates))
    }
}
