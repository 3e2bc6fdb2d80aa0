// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use url::{ParseError, Url};

// Query parameters that only identify marketing campaigns; two URLs that
// differ only in these are the same page for dedup purposes.
const TRACKING_PARAMS: &[&str] = &[
    "gclid", "fbclid", "msclkid", "mc_cid", "mc_eid", "igshid", "ref", "ref_src",
];

fn is_tracking_param(name: &str) -> bool {
    name.starts_with("utm_") || TRACKING_PARAMS.contains(&name)
}

/// 规范化URL
///
/// scheme与host小写、去掉fragment与默认端口、去除跟踪查询参数、
/// 尾部斜杠规范化。前沿队列的去重键即为此规范化结果。
///
/// # 参数
///
/// * `input` - 原始URL字符串
///
/// # 返回值
///
/// * `Ok(String)` - 规范化后的URL
/// * `Err(ParseError)` - URL无法解析
pub fn normalize_url(input: &str) -> Result<String, ParseError> {
    // Url::parse already lowercases scheme and host and drops default ports.
    let mut url = Url::parse(input.trim())?;
    url.set_fragment(None);

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !is_tracking_param(k))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }

    let path = url.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        url.set_path(path.trim_end_matches('/'));
    }

    Ok(url.to_string())
}

/// 将可能为相对路径的URL转换为绝对路径URL
pub fn resolve_url(base_url: &Url, path: &str) -> Result<Url, ParseError> {
    base_url.join(path)
}

/// 判断URL是否与根域名同域（忽略www前缀）
pub fn is_same_domain(url: &Url, root: &Url) -> bool {
    match (url.host_str(), root.host_str()) {
        (Some(a), Some(b)) => {
            a.trim_start_matches("www.") == b.trim_start_matches("www.")
        }
        _ => false,
    }
}
