// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// 重索引请求
///
/// 直接指定目标URL，绕过发现阶段。
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReindexRequest {
    /// 店铺ID
    #[validate(length(min = 1, message = "shop_id must not be empty"))]
    pub shop_id: String,

    /// 目标URL列表
    #[validate(length(min = 1, message = "urls must not be empty"))]
    pub urls: Vec<String>,
}
