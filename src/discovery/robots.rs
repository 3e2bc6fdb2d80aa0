// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::discovery::{CandidateLink, DiscoveryContext, DiscoveryError, DiscoveryStrategy, StrategyOutput};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static SITEMAP_DIRECTIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^\s*Sitemap:\s*(https?://\S+)").expect("invalid pattern"));
static ALLOW_DIRECTIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^\s*Allow:\s*(\S+)").expect("invalid pattern"));
static DISALLOW_DIRECTIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^\s*Disallow:\s*(\S+)").expect("invalid pattern"));

// Allow: paths worth following must look like catalog entries.
const CATALOG_MARKERS: &[&str] = &["/product", "/shop", "/category", "/collection"];

static LOC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<loc>\s*(.*?)\s*</loc>").expect("invalid loc pattern"));

/// robots.txt引用提取策略
///
/// robots.txt自身不是爬取目标，但它引用的资源是三类输入：
/// `Sitemap:` 指令指向的地图被抓取并解析为候选URL；
/// 指向目录结构的 `Allow:` 路径成为候选URL；
/// `Disallow:` 规则成为分类器的排除模式。
pub struct RobotsStrategy;

#[async_trait]
impl DiscoveryStrategy for RobotsStrategy {
    fn name(&self) -> &'static str {
        "robots"
    }

    fn source(&self) -> crate::domain::models::discovered_url::SourceStrategy {
        crate::domain::models::discovered_url::SourceStrategy::Robots
    }

    async fn discover(&self, ctx: &DiscoveryContext) -> Result<StrategyOutput, DiscoveryError> {
        let base = ctx.root_url.origin().ascii_serialization();
        let robots_url = format!("{}/robots.txt", base);

        let content = match ctx.fetcher.fetch_raw(&robots_url, false).await {
            Ok(page) => page.content,
            Err(e) => {
                debug!("No robots.txt at {}: {}", robots_url, e);
                return Ok(StrategyOutput::default());
            }
        };

        let mut candidates: Vec<CandidateLink> = Vec::new();

        for cap in SITEMAP_DIRECTIVE.captures_iter(&content) {
            if ctx.cancel.is_cancelled() {
                return Err(DiscoveryError::Cancelled);
            }
            let sitemap_url = cap[1].to_string();
            if let Ok(page) = ctx.fetcher.fetch_raw(&sitemap_url, false).await {
                for loc in LOC_RE.captures_iter(&page.content) {
                    candidates.push(CandidateLink {
                        url: loc[1].to_string(),
                        anchor_text: None,
                        depth: 0,
                    });
                }
            }
        }

        for cap in ALLOW_DIRECTIVE.captures_iter(&content) {
            let path = cap[1].to_string();
            if CATALOG_MARKERS.iter().any(|m| path.contains(m)) {
                candidates.push(CandidateLink {
                    url: format!("{}{}", base, path),
                    anchor_text: None,
                    depth: 0,
                });
            }
        }

        let exclude_patterns: Vec<String> = DISALLOW_DIRECTIVE
            .captures_iter(&content)
            .map(|cap| cap[1].to_string())
            // A bare "/" disallows everything; the allow-check at fetch
            // time owns that case, it is not a classifier pattern.
            .filter(|p| p != "/")
            .map(|p| format!("^{}", regex::escape(p.trim_end_matches('*'))))
            .collect();

        Ok(StrategyOutput {
            candidates,
            exclude_patterns,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directive_parsing() {
        let content = "User-agent: *\nDisallow: /admin/\nDisallow: /cart\nAllow: /shop/\nSitemap: https://shop.test/sitemap.xml\n";

        let sitemaps: Vec<String> = SITEMAP_DIRECTIVE
            .captures_iter(content)
            .map(|c| c[1].to_string())
            .collect();
        assert_eq!(sitemaps, vec!["https://shop.test/sitemap.xml".to_string()]);

        let allows: Vec<String> = ALLOW_DIRECTIVE
            .captures_iter(content)
            .map(|c| c[1].to_string())
            .collect();
        assert_eq!(allows, vec!["/shop/".to_string()]);

        let disallows: Vec<String> = DISALLOW_DIRECTIVE
            .captures_iter(content)
            .map(|c| c[1].to_string())
            .collect();
        assert_eq!(disallows, vec!["/admin/".to_string(), "/cart".to_string()]);
    }
}
