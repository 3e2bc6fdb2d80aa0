// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::engines::traits::{EngineError, FetchEngine, FetchRequest, FetchResponse};
use std::sync::Arc;
use tracing::{debug, warn};

/// 引擎路由器
///
/// 根据请求特征选择合适的抓取引擎。按支持分数从高到低
/// 尝试；引擎以可重试错误失败时回退到下一个引擎（浏览器
/// 不可用时渲染请求降级到HTTP引擎），不可重试错误直接
/// 返回。
pub struct EngineRouter {
    /// 引擎列表
    engines: Vec<Arc<dyn FetchEngine>>,
}

impl EngineRouter {
    /// 创建新的引擎路由器
    ///
    /// # 参数
    ///
    /// * `engines` - 引擎列表
    pub fn new(engines: Vec<Arc<dyn FetchEngine>>) -> Self {
        Self { engines }
    }

    /// 创建带默认引擎集的路由器
    ///
    /// HTTP引擎始终可用；浏览器引擎按特性开关加入。
    pub fn with_default_engines() -> Self {
        #[allow(unused_mut)]
        let mut engines: Vec<Arc<dyn FetchEngine>> =
            vec![Arc::new(crate::engines::reqwest_engine::ReqwestEngine::new())];
        #[cfg(feature = "browser")]
        engines.push(Arc::new(crate::engines::browser_engine::BrowserEngine::new()));
        Self { engines }
    }

    /// 路由请求到合适的引擎
    ///
    /// # 参数
    ///
    /// * `request` - 抓取请求
    ///
    /// # 返回值
    ///
    /// * `Ok(FetchResponse)` - 抓取响应
    /// * `Err(EngineError)` - 所有候选引擎都失败
    pub async fn route(&self, request: &FetchRequest) -> Result<FetchResponse, EngineError> {
        let mut candidates: Vec<(u8, &Arc<dyn FetchEngine>)> = self
            .engines
            .iter()
            .map(|e| (e.support_score(request), e))
            .filter(|(score, _)| *score > 0)
            .collect();
        candidates.sort_by(|a, b| b.0.cmp(&a.0));

        if candidates.is_empty() {
            warn!("No suitable engines available for request");
            return Err(EngineError::AllEnginesFailed);
        }

        let mut last_error = None;
        for (score, engine) in candidates {
            debug!(
                engine = engine.name(),
                score, url = %request.url, "Dispatching fetch"
            );
            match engine.fetch(request).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() => {
                    warn!(
                        engine = engine.name(),
                        "Engine failed with retryable error: {}, trying next engine", e
                    );
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or(EngineError::AllEnginesFailed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct StubEngine {
        name: &'static str,
        score: u8,
        fail_retryable: bool,
        calls: AtomicU32,
    }

    impl StubEngine {
        fn new(name: &'static str, score: u8, fail_retryable: bool) -> Self {
            Self {
                name,
                score,
                fail_retryable,
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl FetchEngine for StubEngine {
        async fn fetch(&self, _request: &FetchRequest) -> Result<FetchResponse, EngineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_retryable {
                return Err(EngineError::Timeout);
            }
            Ok(FetchResponse {
                status_code: 200,
                content: format!("from {}", self.name),
                content_type: "text/html".to_string(),
                response_time_ms: 1,
            })
        }

        fn support_score(&self, _request: &FetchRequest) -> u8 {
            self.score
        }

        fn name(&self) -> &'static str {
            self.name
        }
    }

    #[tokio::test]
    async fn test_highest_score_wins() {
        let engines: Vec<Arc<dyn FetchEngine>> = vec![
            Arc::new(StubEngine::new("low", 10, false)),
            Arc::new(StubEngine::new("high", 100, false)),
        ];
        let router = EngineRouter::new(engines);

        let response = router.route(&FetchRequest::new("http://shop.test")).await.unwrap();
        assert_eq!(response.content, "from high");
    }

    #[tokio::test]
    async fn test_falls_back_on_retryable_failure() {
        let engines: Vec<Arc<dyn FetchEngine>> = vec![
            Arc::new(StubEngine::new("flaky", 100, true)),
            Arc::new(StubEngine::new("stable", 10, false)),
        ];
        let router = EngineRouter::new(engines);

        let response = router.route(&FetchRequest::new("http://shop.test")).await.unwrap();
        assert_eq!(response.content, "from stable");
    }

    #[test]
    fn test_default_engine_set_builds() {
        // Browser engine construction is lazy; nothing is launched here.
        let _router = EngineRouter::with_default_engines();
    }

    #[tokio::test]
    async fn test_all_failed() {
        let engines: Vec<Arc<dyn FetchEngine>> =
            vec![Arc::new(StubEngine::new("flaky", 100, true))];
        let router = EngineRouter::new(engines);
        let err = router.route(&FetchRequest::new("http://shop.test")).await.unwrap_err();
        assert!(matches!(err, EngineError::Timeout));
    }
}
