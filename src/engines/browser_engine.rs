// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::engines::traits::{EngineError, FetchEngine, FetchRequest, FetchResponse};
use async_trait::async_trait;
use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;

// Global browser instance to avoid re-launching Chrome on every request.
static BROWSER_INSTANCE: OnceCell<Browser> = OnceCell::const_new();

// Asynchronously gets or initializes the shared browser instance.
// This function ensures that the browser is launched only once.
async fn get_browser() -> Result<&'static Browser, EngineError> {
    BROWSER_INSTANCE
        .get_or_try_init(|| async {
            let remote_debugging_url = std::env::var("CHROMIUM_REMOTE_DEBUGGING_URL").ok();

            let (browser, mut handler) = if let Some(ref url) = remote_debugging_url {
                tracing::info!("Connecting to remote Chrome instance at: {}", url);
                Browser::connect(url).await.map_err(|e| {
                    EngineError::Browser(format!("Failed to connect to remote Chrome: {}", e))
                })?
            } else {
                let mut builder = BrowserConfig::builder()
                    .no_sandbox()
                    .request_timeout(Duration::from_secs(30));

                builder = builder.arg("--disable-gpu").arg("--disable-dev-shm-usage");

                Browser::launch(
                    builder
                        .build()
                        .map_err(|e| EngineError::Browser(e.to_string()))?,
                )
                .await
                .map_err(|e| EngineError::Browser(e.to_string()))?
            };

            // Spawn a handler to process browser events
            tokio::spawn(async move {
                while let Some(h) = handler.next().await {
                    if h.is_err() {
                        break;
                    }
                }
            });

            Ok(browser)
        })
        .await
}

/// 浏览器渲染引擎
///
/// 基于chromiumoxide的抓取引擎。许多店铺的导航和页脚由
/// 客户端JavaScript构建，这类页面必须在真实DOM渲染后提取。
pub struct BrowserEngine {
    /// goto之后的额外静置时间，等待客户端渲染收敛
    settle: Duration,
}

impl BrowserEngine {
    pub fn new() -> Self {
        Self {
            settle: Duration::from_millis(1500),
        }
    }
}

impl Default for BrowserEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FetchEngine for BrowserEngine {
    /// 执行浏览器渲染抓取
    ///
    /// # 参数
    ///
    /// * `request` - 抓取请求
    ///
    /// # 返回值
    ///
    /// * `Ok(FetchResponse)` - 渲染后的DOM内容
    /// * `Err(EngineError)` - 渲染过程中出现的错误
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, EngineError> {
        let start = Instant::now();

        tokio::time::timeout(request.timeout, async {
            let browser = get_browser().await?;

            let page = browser
                .new_page("about:blank")
                .await
                .map_err(|e| EngineError::Browser(e.to_string()))?;

            page.set_user_agent(&request.user_agent)
                .await
                .map_err(|e| EngineError::Browser(e.to_string()))?;

            // goto waits for the load event; give client-side rendering a
            // moment to settle before reading the DOM.
            page.goto(&request.url)
                .await
                .map_err(|e| EngineError::Browser(e.to_string()))?;
            tokio::time::sleep(self.settle).await;

            let content = page
                .content()
                .await
                .map_err(|e| EngineError::Browser(e.to_string()))?;

            Ok(FetchResponse {
                status_code: 200,
                content,
                content_type: "text/html".to_string(),
                response_time_ms: start.elapsed().as_millis() as u64,
            })
        })
        .await
        .map_err(|_| EngineError::Timeout)?
    }

    /// 计算对请求的支持分数
    ///
    /// 需要JS渲染的请求返回最高分；静态请求走HTTP引擎更快。
    fn support_score(&self, request: &FetchRequest) -> u8 {
        if request.needs_js {
            return 100;
        }
        10
    }

    fn name(&self) -> &'static str {
        "browser"
    }
}
