// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::discovered_url::Classification;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

/// 模式规则
///
/// 规则是数据而非代码：运营方可以在不触碰调度器的情况下
/// 扩展规则覆盖面。`precedence` 数值越小优先级越高。
#[derive(Debug, Clone)]
pub struct PatternRule {
    /// URL路径匹配器
    pub matcher: Regex,
    /// 命中后的分类
    pub classification: Classification,
    /// 优先级（小者先评估）
    pub precedence: u32,
}

impl PatternRule {
    pub fn new(pattern: &str, classification: Classification, precedence: u32) -> Self {
        Self {
            matcher: Regex::new(pattern).expect("invalid built-in pattern"),
            classification,
            precedence,
        }
    }
}

// Built-in pattern sets, lifted from the production pattern lists.
//
// Exclusions always win. Category rules beat product rules when both
// match: category pages are entry points that must be explored even when
// their URL superficially resembles a product URL, so a listing page like
// /collections/linen-shirts stays a category despite its slug-shaped tail.
static DEFAULT_RULES: Lazy<Vec<PatternRule>> = Lazy::new(|| {
    let mut rules = Vec::new();

    // Exclusions: transactional, account and non-catalog surfaces plus
    // static assets.
    for p in [
        r"(?i)/(cart|checkout|basket|account|login|logout|register|signin|signup)(/|$)",
        r"(?i)/(admin|api|wp-admin|wp-json)(/|$)",
        r"(?i)/(about|contact|help|faq|support|blog|news|press|careers)(/|$)",
        r"(?i)/(policy|policies|terms|privacy|legal)(/|$)",
        r"(?i)\.(jpg|jpeg|png|gif|webp|svg|pdf|css|js|ico|woff2?)(\?|$)",
    ] {
        rules.push(PatternRule::new(p, Classification::Excluded, 0));
    }

    // Category: terminal merchandise segment...
    rules.push(PatternRule::new(
        r"(?i)/(men|women|kids|accessories|clothing|shoes|bags|jewelry|shirts|pants|dresses|jackets|knitwear|outerwear|casual|formal|business|sale|new-arrivals)/?$",
        Classification::Category,
        10,
    ));
    // ...a listing page directly under a structural segment...
    rules.push(PatternRule::new(
        r"(?i)/(collections?|categor(?:y|ies)|shop|browse|store|catalog|departments?|sections?)/[^/]+/?$",
        Classification::Category,
        11,
    ));
    // ...or a bare structural root.
    rules.push(PatternRule::new(
        r"(?i)/(collections?|categor(?:y|ies)|shop|browse|store|catalog|products)/?$",
        Classification::Category,
        12,
    ));

    // Product: explicit detail segments, then slug- and id-shaped tails.
    rules.push(PatternRule::new(
        r"(?i)/(products?|items?|p|buy|detail|details|sku)/[^/]+",
        Classification::Product,
        20,
    ));
    rules.push(PatternRule::new(
        r"(?i)/[a-z0-9]+(?:-[a-z0-9]+)+/?$",
        Classification::Product,
        21,
    ));
    rules.push(PatternRule::new(r"/\d{3,}/?$", Classification::Product, 22));

    rules.sort_by_key(|r| r.precedence);
    rules
});

// Anchor text naming a merchandise section is a weak category signal for
// URLs no URL rule matched.
static CATEGORY_ANCHOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(shop|collection|category|men|women|kids|accessories|clothing|shoes|sale)\b",
    )
    .expect("invalid anchor pattern")
});

/// URL模式分类器
///
/// 纯函数式分类器：相同输入永远得到相同输出，无副作用。
/// 评估顺序为排除规则 → 分类页规则 → 产品规则，均按优先级
/// 短路返回第一条命中规则的分类，否则回退 Unknown。
#[derive(Clone)]
pub struct PatternClassifier {
    rules: Arc<Vec<PatternRule>>,
    /// 运行期追加的排除模式（来自robots Disallow等）
    extra_exclusions: Arc<Vec<Regex>>,
}

impl Default for PatternClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternClassifier {
    /// 使用内置规则集创建分类器
    pub fn new() -> Self {
        Self {
            rules: Arc::new(DEFAULT_RULES.clone()),
            extra_exclusions: Arc::new(Vec::new()),
        }
    }

    /// 使用自定义规则集创建分类器
    pub fn with_rules(mut rules: Vec<PatternRule>) -> Self {
        rules.sort_by_key(|r| r.precedence);
        Self {
            rules: Arc::new(rules),
            extra_exclusions: Arc::new(Vec::new()),
        }
    }

    /// 返回追加了排除模式的新分类器
    ///
    /// robots.txt 的 Disallow 规则经由此进入分类器，而不是
    /// 成为爬取目标。无法编译的模式按字面量转义处理。
    pub fn with_exclusions(&self, patterns: &[String]) -> Self {
        let mut extra: Vec<Regex> = (*self.extra_exclusions).clone();
        for p in patterns {
            let compiled =
                Regex::new(p).or_else(|_| Regex::new(&regex::escape(p)));
            if let Ok(re) = compiled {
                extra.push(re);
            }
        }
        Self {
            rules: self.rules.clone(),
            extra_exclusions: Arc::new(extra),
        }
    }

    /// 对URL进行分类
    ///
    /// # 参数
    ///
    /// * `url` - 待分类的URL（完整或路径均可）
    /// * `anchor_text` - 可选的链接锚文本
    ///
    /// # 返回值
    ///
    /// URL的分类结果
    pub fn classify(&self, url: &str, anchor_text: Option<&str>) -> Classification {
        // Match against the path + query only, so host names containing
        // keywords (shop.test) do not trip the rules.
        let path = url
            .find("://")
            .and_then(|i| url[i + 3..].find('/').map(|j| &url[i + 3 + j..]))
            .unwrap_or(url);

        for re in self.extra_exclusions.iter() {
            if re.is_match(path) {
                return Classification::Excluded;
            }
        }

        for rule in self.rules.iter() {
            if rule.classification == Classification::Excluded && rule.matcher.is_match(path) {
                return Classification::Excluded;
            }
        }
        for rule in self.rules.iter() {
            if rule.classification == Classification::Category && rule.matcher.is_match(path) {
                return Classification::Category;
            }
        }
        for rule in self.rules.iter() {
            if rule.classification == Classification::Product && rule.matcher.is_match(path) {
                return Classification::Product;
            }
        }

        if let Some(text) = anchor_text {
            if CATEGORY_ANCHOR.is_match(text) {
                return Classification::Category;
            }
        }

        Classification::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> PatternClassifier {
        PatternClassifier::new()
    }

    #[test]
    fn test_category_detection() {
        let c = classifier();
        assert_eq!(
            c.classify("https://shop.test/shop/accessories", None),
            Classification::Category
        );
        assert_eq!(
            c.classify("https://shop.test/shop/shirts", None),
            Classification::Category
        );
        assert_eq!(
            c.classify("https://shop.test/collections/linen-shirts", None),
            Classification::Category
        );
        assert_eq!(
            c.classify("https://shop.test/shop", None),
            Classification::Category
        );
    }

    #[test]
    fn test_product_detection() {
        let c = classifier();
        assert_eq!(
            c.classify("https://shop.test/shop/accessories/belt-1", None),
            Classification::Product
        );
        assert_eq!(
            c.classify("https://shop.test/products/10482", None),
            Classification::Product
        );
        assert_eq!(
            c.classify("https://shop.test/p/sku-123", None),
            Classification::Product
        );
    }

    #[test]
    fn test_exclusion_beats_everything() {
        let c = classifier();
        // /admin/login would otherwise look slug-ish; exclusion wins.
        assert_eq!(
            c.classify("https://shop.test/admin/login", None),
            Classification::Excluded
        );
        assert_eq!(
            c.classify("https://shop.test/checkout/linen-shirt", None),
            Classification::Excluded
        );
        assert_eq!(
            c.classify("https://shop.test/shop/image.jpg", None),
            Classification::Excluded
        );
    }

    #[test]
    fn test_category_beats_product_on_hybrid_match() {
        let c = classifier();
        // Slug-shaped tail under a structural segment stays a category.
        assert_eq!(
            c.classify("https://shop.test/collections/summer-linen", None),
            Classification::Category
        );
    }

    #[test]
    fn test_anchor_text_promotes_unknown() {
        let c = classifier();
        assert_eq!(
            c.classify("https://shop.test/ss24", Some("Shop the collection")),
            Classification::Category
        );
        assert_eq!(c.classify("https://shop.test/ss24", None), Classification::Unknown);
    }

    #[test]
    fn test_dynamic_exclusions_from_robots() {
        let c = classifier().with_exclusions(&["/private".to_string()]);
        assert_eq!(
            c.classify("https://shop.test/private/collections/x", None),
            Classification::Excluded
        );
    }

    #[test]
    fn test_host_keywords_do_not_leak() {
        let c = classifier();
        // "shop" in the host must not classify the root as category.
        assert_eq!(c.classify("https://shop.test/", None), Classification::Unknown);
    }

    #[test]
    fn test_determinism() {
        let c = classifier();
        let url = "https://shop.test/shop/accessories/belt-1";
        let first = c.classify(url, None);
        for _ in 0..10 {
            assert_eq!(c.classify(url, None), first);
        }
    }
}
