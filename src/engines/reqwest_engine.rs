// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::engines::traits::{EngineError, FetchEngine, FetchRequest, FetchResponse};
use async_trait::async_trait;
use std::time::Instant;

/// 抓取引擎
///
/// 基于reqwest实现的基本HTTP抓取引擎，处理不需要
/// JavaScript渲染的页面（站点地图、robots.txt、服务端
/// 渲染的店铺页面）。
pub struct ReqwestEngine {
    client: reqwest::Client,
}

impl ReqwestEngine {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for ReqwestEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FetchEngine for ReqwestEngine {
    /// 执行HTTP抓取
    ///
    /// # 参数
    ///
    /// * `request` - 抓取请求
    ///
    /// # 返回值
    ///
    /// * `Ok(FetchResponse)` - 抓取响应（含非2xx状态码）
    /// * `Err(EngineError)` - 网络层面的失败
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, EngineError> {
        let start = Instant::now();
        let response = self
            .client
            .get(&request.url)
            .header("User-Agent", &request.user_agent)
            .timeout(request.timeout)
            .send()
            .await?;

        let status_code = response.status().as_u16();
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("text/html")
            .to_string();

        let content = response.text().await?;

        Ok(FetchResponse {
            status_code,
            content,
            content_type,
            response_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// 计算对请求的支持分数
    ///
    /// 不需要JS渲染的请求返回最高分；需要渲染的请求只在
    /// 浏览器引擎不可用时作为降级路径。
    fn support_score(&self, request: &FetchRequest) -> u8 {
        if request.needs_js {
            return 10;
        }
        100
    }

    fn name(&self) -> &'static str {
        "reqwest"
    }
}
