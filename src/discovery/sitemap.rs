// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::discovery::{CandidateLink, DiscoveryContext, DiscoveryError, DiscoveryStrategy, StrategyOutput};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use tracing::debug;

// Well-known sitemap locations probed in order.
const SITEMAP_LOCATIONS: &[&str] = &[
    "/sitemap.xml",
    "/sitemap_index.xml",
    "/product-sitemap.xml",
    "/category-sitemap.xml",
    "/sitemaps/sitemap.xml",
];

// How many nested sitemaps a sitemap index may fan out to.
const MAX_NESTED_SITEMAPS: usize = 10;

static LOC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<loc>\s*(.*?)\s*</loc>").expect("invalid loc pattern"));

/// 站点地图发现策略
///
/// 依次探测常见的站点地图位置，解析全部 `<loc>` 条目；
/// 遇到站点地图索引时继续抓取其引用的子地图（有界）。
/// 站点地图缺失或格式损坏产出空序列，不是错误。
pub struct SitemapStrategy;

#[async_trait]
impl DiscoveryStrategy for SitemapStrategy {
    fn name(&self) -> &'static str {
        "sitemap"
    }

    fn source(&self) -> crate::domain::models::discovered_url::SourceStrategy {
        crate::domain::models::discovered_url::SourceStrategy::Sitemap
    }

    async fn discover(&self, ctx: &DiscoveryContext) -> Result<StrategyOutput, DiscoveryError> {
        let base = ctx.root_url.origin().ascii_serialization();
        let mut urls: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for location in SITEMAP_LOCATIONS {
            if ctx.cancel.is_cancelled() {
                return Err(DiscoveryError::Cancelled);
            }
            let sitemap_url = format!("{}{}", base, location);
            match ctx.fetcher.fetch_raw(&sitemap_url, false).await {
                Ok(page) => {
                    collect_sitemap_urls(ctx, &page.content, &mut urls, &mut seen).await;
                }
                Err(e) => {
                    // Absent sitemaps are expected and non-fatal.
                    debug!("No sitemap at {}: {}", sitemap_url, e);
                }
            }
        }

        let candidates = urls
            .into_iter()
            .map(|url| CandidateLink {
                url,
                anchor_text: None,
                depth: 0,
            })
            .collect();
        Ok(StrategyOutput::from_candidates(candidates))
    }
}

/// 解析站点地图内容，索引条目继续展开为子地图
async fn collect_sitemap_urls(
    ctx: &DiscoveryContext,
    content: &str,
    urls: &mut Vec<String>,
    seen: &mut HashSet<String>,
) {
    let locs = parse_locs(content);

    if content.contains("<sitemapindex") {
        for nested in locs.into_iter().take(MAX_NESTED_SITEMAPS) {
            if ctx.cancel.is_cancelled() || !seen.insert(nested.clone()) {
                continue;
            }
            if let Ok(page) = ctx.fetcher.fetch_raw(&nested, false).await {
                // One level of nesting; nested indexes are not expanded again.
                for url in parse_locs(&page.content) {
                    if seen.insert(url.clone()) {
                        urls.push(url);
                    }
                }
            }
        }
    } else {
        for url in locs {
            if seen.insert(url.clone()) {
                urls.push(url);
            }
        }
    }
}

fn parse_locs(content: &str) -> Vec<String> {
    LOC_RE
        .captures_iter(content)
        .map(|c| c[1].to_string())
        .filter(|u| !u.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_locs() {
        let xml = r#"<?xml version="1.0"?>
            <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
                <url><loc>https://shop.test/shop/accessories</loc></url>
                <url><loc> https://shop.test/shop/shirts </loc></url>
            </urlset>"#;
        assert_eq!(
            parse_locs(xml),
            vec![
                "https://shop.test/shop/accessories".to_string(),
                "https://shop.test/shop/shirts".to_string()
            ]
        );
    }

    #[test]
    fn test_parse_locs_tolerates_malformed_xml() {
        // Truncated document; the regex pass still recovers what it can.
        let xml = "<urlset><url><loc>https://shop.test/a</loc></url><url><loc>https://shop";
        assert_eq!(parse_locs(xml), vec!["https://shop.test/a".to_string()]);
    }
}
