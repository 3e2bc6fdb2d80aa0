// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::discovery::{extract_anchors, DiscoveryContext, DiscoveryError, DiscoveryStrategy, StrategyOutput};
use async_trait::async_trait;

const CONTENT_SELECTORS: &[&str] = &[
    "main a[href]",
    ".main-content a[href]",
    ".content a[href]",
    ".page-content a[href]",
    ".category-grid a[href]",
    ".product-grid a[href]",
    ".collection-list a[href]",
    ".category-list a[href]",
    ".featured-products a[href]",
    ".product-carousel a[href]",
    ".category-carousel a[href]",
];

/// 正文内容发现策略
///
/// 扫描根页面主内容区的同域链接，覆盖首页上的精选分类和
/// 促销产品入口。
pub struct PageContentStrategy;

#[async_trait]
impl DiscoveryStrategy for PageContentStrategy {
    fn name(&self) -> &'static str {
        "page_content"
    }

    fn source(&self) -> crate::domain::models::discovered_url::SourceStrategy {
        crate::domain::models::discovered_url::SourceStrategy::PageContent
    }

    async fn discover(&self, ctx: &DiscoveryContext) -> Result<StrategyOutput, DiscoveryError> {
        let page = ctx
            .fetcher
            .fetch(ctx.root_url.as_str(), ctx.render_js)
            .await?;
        let candidates = extract_anchors(&page.content, &ctx.root_url, CONTENT_SELECTORS, 1);
        Ok(StrategyOutput::from_candidates(candidates))
    }
}
