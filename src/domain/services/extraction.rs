// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::{json, Value};
use std::collections::HashMap;

static PRICE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d[\d,]*\.?\d*").expect("invalid price pattern"));

const PRICE_SELECTORS: &[&str] = &["[data-price]", ".price", ".cost", "[class*=\"price\"]"];

const BREADCRUMB_SELECTORS: &[&str] = &[
    "[data-breadcrumb]",
    ".breadcrumb a",
    "nav[aria-label=\"breadcrumb\"] a",
];

const IMAGE_SELECTORS: &[&str] = &[
    "img[src*=\"product\"]",
    "img[alt*=\"product\"]",
    ".product-image img",
];

const DESCRIPTION_SELECTORS: &[&str] = &[
    "meta[name=\"description\"]",
    ".product-description",
    "[itemprop=\"description\"]",
];

/// 字段提取服务
///
/// 从抓取到的HTML中尽力提取结构化字段（标题、价格、描述、
/// 面包屑、图片）。提取是尽力而为的：字段缺失不是错误，
/// 字段映射的具体形状对核心不透明，由索引协作方解释。
pub struct FieldExtractor;

impl FieldExtractor {
    /// 提取结构化字段
    ///
    /// # 参数
    ///
    /// * `html_content` - 页面HTML内容
    ///
    /// # 返回值
    ///
    /// 字段名到值的映射，仅包含成功提取到的字段
    pub fn extract(html_content: &str) -> HashMap<String, Value> {
        let document = Html::parse_document(html_content);
        let mut fields = HashMap::new();

        if let Some(title) = Self::extract_title(&document) {
            fields.insert("title".to_string(), Value::String(title));
        }

        if let Some(price) = Self::extract_price(&document) {
            fields.insert("price".to_string(), json!(price));
        }

        if let Some(description) = Self::first_text(&document, DESCRIPTION_SELECTORS) {
            fields.insert("description".to_string(), Value::String(description));
        }

        let breadcrumbs = Self::collect_texts(&document, BREADCRUMB_SELECTORS, 5);
        if !breadcrumbs.is_empty() {
            fields.insert("breadcrumbs".to_string(), json!(breadcrumbs));
        }

        let images = Self::collect_attrs(&document, IMAGE_SELECTORS, "src", 3);
        if !images.is_empty() {
            fields.insert("images".to_string(), json!(images));
        }

        fields
    }

    fn extract_title(document: &Html) -> Option<String> {
        for sel in ["meta[property=\"og:title\"]", "title", "h1"] {
            let selector = match Selector::parse(sel) {
                Ok(s) => s,
                Err(_) => continue,
            };
            if let Some(element) = document.select(&selector).next() {
                let text = if sel.starts_with("meta") {
                    element.value().attr("content").unwrap_or("").to_string()
                } else {
                    element.text().collect::<Vec<_>>().join(" ")
                };
                let text = text.trim().to_string();
                if !text.is_empty() {
                    return Some(text);
                }
            }
        }
        None
    }

    fn extract_price(document: &Html) -> Option<f64> {
        for sel in PRICE_SELECTORS {
            let selector = match Selector::parse(sel) {
                Ok(s) => s,
                Err(_) => continue,
            };
            if let Some(element) = document.select(&selector).next() {
                let text = element.text().collect::<Vec<_>>().join(" ");
                if let Some(m) = PRICE_RE.find(&text) {
                    if let Ok(price) = m.as_str().replace(',', "").parse::<f64>() {
                        return Some(price);
                    }
                }
            }
        }
        None
    }

    fn first_text(document: &Html, selectors: &[&str]) -> Option<String> {
        for sel in selectors {
            let selector = match Selector::parse(sel) {
                Ok(s) => s,
                Err(_) => continue,
            };
            if let Some(element) = document.select(&selector).next() {
                let text = if sel.starts_with("meta") {
                    element.value().attr("content").unwrap_or("").to_string()
                } else {
                    element.text().collect::<Vec<_>>().join(" ")
                };
                let text = text.trim().to_string();
                if !text.is_empty() {
                    return Some(text);
                }
            }
        }
        None
    }

    fn collect_texts(document: &Html, selectors: &[&str], cap: usize) -> Vec<String> {
        let mut out = Vec::new();
        for sel in selectors {
            let selector = match Selector::parse(sel) {
                Ok(s) => s,
                Err(_) => continue,
            };
            for element in document.select(&selector) {
                let text = element.text().collect::<Vec<_>>().join(" ").trim().to_string();
                if !text.is_empty() && !out.contains(&text) {
                    out.push(text);
                }
                if out.len() >= cap {
                    return out;
                }
            }
            if !out.is_empty() {
                break;
            }
        }
        out
    }

    fn collect_attrs(document: &Html, selectors: &[&str], attr: &str, cap: usize) -> Vec<String> {
        let mut out = Vec::new();
        for sel in selectors {
            let selector = match Selector::parse(sel) {
                Ok(s) => s,
                Err(_) => continue,
            };
            for element in document.select(&selector) {
                if let Some(v) = element.value().attr(attr) {
                    let v = v.to_string();
                    if !v.is_empty() && !out.contains(&v) {
                        out.push(v);
                    }
                }
                if out.len() >= cap {
                    return out;
                }
            }
            if !out.is_empty() {
                break;
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_product_fields() {
        let html = r#"
            <html><head><title>Linen Shirt | Shop</title>
            <meta name="description" content="A breezy linen shirt."></head>
            <body>
                <h1>Linen Shirt</h1>
                <span class="price">$149.00</span>
                <nav aria-label="breadcrumb"><a>Home</a><a>Shirts</a></nav>
                <img src="/img/product-123.jpg" alt="product shot">
            </body></html>
        "#;

        let fields = FieldExtractor::extract(html);
        assert_eq!(fields["title"], "Linen Shirt | Shop");
        assert_eq!(fields["price"], json!(149.0));
        assert_eq!(fields["description"], "A breezy linen shirt.");
        assert_eq!(fields["breadcrumbs"], json!(["Home", "Shirts"]));
        assert_eq!(fields["images"], json!(["/img/product-123.jpg"]));
    }

    #[test]
    fn test_missing_fields_are_absent_not_errors() {
        let fields = FieldExtractor::extract("<html><body><p>nothing here</p></body></html>");
        assert!(!fields.contains_key("price"));
        assert!(!fields.contains_key("breadcrumbs"));
    }

    #[test]
    fn test_price_with_thousands_separator() {
        let html = r#"<div class="price">USD 1,249.50</div>"#;
        let fields = FieldExtractor::extract(html);
        assert_eq!(fields["price"], json!(1249.5));
    }
}
