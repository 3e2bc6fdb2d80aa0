// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// 启动爬取请求
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StartCrawlRequest {
    /// 店铺ID
    #[validate(length(min = 1, message = "shop_id must not be empty"))]
    pub shop_id: String,

    /// 店铺根URL
    #[validate(url(message = "shop_url must be a valid URL"))]
    pub shop_url: String,

    /// 包含路径模式（空表示全部）
    #[serde(default)]
    pub include: Vec<String>,

    /// 排除路径模式
    #[serde(default)]
    pub exclude: Vec<String>,

    /// 产品数量上限
    pub max_products: Option<usize>,

    /// 工作器数量（1-8）
    #[validate(range(min = 1, max = 8, message = "worker_count must be between 1 and 8"))]
    pub worker_count: Option<usize>,
}
