// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::discovery::{extract_anchors, DiscoveryContext, DiscoveryError, DiscoveryStrategy, StrategyOutput};
use crate::domain::models::discovered_url::Classification;
use async_trait::async_trait;

const FOOTER_SELECTORS: &[&str] = &[
    "footer a[href]",
    ".footer a[href]",
    ".site-footer a[href]",
    ".page-footer a[href]",
    ".main-footer a[href]",
    "#footer a[href]",
];

/// 页脚发现策略
///
/// 页脚链接混杂着大量帮助与法务页面，只保留分类页形状的
/// 链接。
pub struct FooterStrategy;

#[async_trait]
impl DiscoveryStrategy for FooterStrategy {
    fn name(&self) -> &'static str {
        "footer"
    }

    fn source(&self) -> crate::domain::models::discovered_url::SourceStrategy {
        crate::domain::models::discovered_url::SourceStrategy::Footer
    }

    async fn discover(&self, ctx: &DiscoveryContext) -> Result<StrategyOutput, DiscoveryError> {
        let page = ctx
            .fetcher
            .fetch(ctx.root_url.as_str(), ctx.render_js)
            .await?;
        let candidates = extract_anchors(&page.content, &ctx.root_url, FOOTER_SELECTORS, 1)
            .into_iter()
            .filter(|link| {
                ctx.classifier.classify(&link.url, link.anchor_text.as_deref())
                    == Classification::Category
            })
            .collect();
        Ok(StrategyOutput::from_candidates(candidates))
    }
}
