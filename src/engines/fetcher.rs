// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::engines::router::EngineRouter;
use crate::engines::traits::FetchRequest;
use crate::utils::retry_policy::RetryPolicy;
use crate::utils::robots::{RobotsChecker, RobotsCheckerTrait};
use dashmap::DashMap;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use metrics::counter;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// 抓取错误类型
///
/// 瞬时失败（超时、5xx、连接重置）在退避重试耗尽后降级为
/// `Exhausted`；永久失败（4xx、robots禁止）不重试。
#[derive(Error, Debug)]
pub enum FetchError {
    /// robots.txt禁止访问该URL
    #[error("URL disallowed by robots.txt")]
    Disallowed,
    /// 永久失败，不重试
    #[error("Permanent fetch failure (status {status:?}) after {attempts} attempt(s)")]
    Permanent { status: Option<u16>, attempts: u32 },
    /// 瞬时失败重试耗尽
    #[error("Retry budget exhausted after {attempts} attempt(s): {last}")]
    Exhausted { attempts: u32, last: String },
}

impl FetchError {
    /// 该错误消耗的抓取尝试次数
    pub fn attempts(&self) -> u32 {
        match self {
            FetchError::Disallowed => 0,
            FetchError::Permanent { attempts, .. } => *attempts,
            FetchError::Exhausted { attempts, .. } => *attempts,
        }
    }
}

/// 成功抓取的页面
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// HTTP状态码
    pub status_code: u16,
    /// 页面内容
    pub content: String,
    /// 内容类型
    pub content_type: String,
    /// 消耗的尝试次数
    pub attempts: u32,
}

/// 按域限速器
///
/// 每个域一个令牌桶，桶由该域上所有工作器共享：约束的是
/// 目标服务器的负载，而不是单个工作器的节奏。桶的周期来自
/// robots.txt的Crawl-delay，缺省时使用配置的默认间隔。
pub struct DomainRateLimiter {
    limiters: DashMap<String, Arc<DirectLimiter>>,
    default_delay: Duration,
}

impl DomainRateLimiter {
    pub fn new(default_delay: Duration) -> Self {
        Self {
            limiters: DashMap::new(),
            default_delay,
        }
    }

    /// 等待直到该域允许下一次请求
    pub async fn acquire(&self, host: &str, crawl_delay: Option<Duration>) {
        let delay = crawl_delay.unwrap_or(self.default_delay);
        if delay.is_zero() {
            return;
        }
        let limiter = {
            let entry = self.limiters.entry(host.to_string()).or_insert_with(|| {
                let quota = Quota::with_period(delay)
                    .expect("non-zero crawl delay")
                    .allow_burst(std::num::NonZeroU32::new(1).expect("non-zero burst"));
                Arc::new(RateLimiter::direct(quota))
            });
            entry.clone()
        };
        limiter.until_ready().await;
    }
}

/// 限速抓取器
///
/// 工作器与发现策略共用的抓取入口：robots合规检查、按域
/// 限速、指数退避重试，底层通过引擎路由器分发到HTTP或
/// 浏览器引擎。
pub struct RateLimitedFetcher {
    router: Arc<EngineRouter>,
    robots: Arc<RobotsChecker>,
    limiter: DomainRateLimiter,
    retry_policy: RetryPolicy,
    user_agent: String,
    timeout: Duration,
}

impl RateLimitedFetcher {
    pub fn new(
        router: Arc<EngineRouter>,
        robots: Arc<RobotsChecker>,
        default_delay: Duration,
        retry_policy: RetryPolicy,
        user_agent: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            router,
            robots,
            limiter: DomainRateLimiter::new(default_delay),
            retry_policy,
            user_agent: user_agent.into(),
            timeout,
        }
    }

    /// 抓取一个文档URL（含robots合规检查）
    ///
    /// # 参数
    ///
    /// * `url` - 目标URL
    /// * `needs_js` - 是否需要JavaScript渲染
    ///
    /// # 返回值
    ///
    /// * `Ok(FetchedPage)` - 抓取成功的页面
    /// * `Err(FetchError)` - 永久失败或重试耗尽
    pub async fn fetch(&self, url: &str, needs_js: bool) -> Result<FetchedPage, FetchError> {
        match self.robots.is_allowed(url, &self.user_agent).await {
            Ok(false) => {
                counter!("shopcrawl_fetch_total", "outcome" => "disallowed").increment(1);
                return Err(FetchError::Disallowed);
            }
            Ok(true) => {}
            Err(e) => {
                // An unreadable robots.txt never blocks the crawl.
                debug!("Robots check failed for {}: {}", url, e);
            }
        }
        self.dispatch(url, needs_js).await
    }

    /// 抓取基础设施文件（sitemap.xml、robots.txt等）
    ///
    /// 跳过robots合规检查，限速与重试照常生效。
    pub async fn fetch_raw(&self, url: &str, needs_js: bool) -> Result<FetchedPage, FetchError> {
        self.dispatch(url, needs_js).await
    }

    async fn dispatch(&self, url: &str, needs_js: bool) -> Result<FetchedPage, FetchError> {
        let host = Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_string()))
            .unwrap_or_default();

        let crawl_delay = self
            .robots
            .get_crawl_delay(url, &self.user_agent)
            .await
            .unwrap_or(None);

        let mut attempt = 0;
        loop {
            attempt += 1;
            self.limiter.acquire(&host, crawl_delay).await;

            let mut request = FetchRequest::new(url);
            request.needs_js = needs_js;
            request.user_agent = self.user_agent.clone();
            request.timeout = self.timeout;

            let transient_reason = match self.router.route(&request).await {
                Ok(resp) if (200..300).contains(&resp.status_code) => {
                    counter!("shopcrawl_fetch_total", "outcome" => "success").increment(1);
                    return Ok(FetchedPage {
                        status_code: resp.status_code,
                        content: resp.content,
                        content_type: resp.content_type,
                        attempts: attempt,
                    });
                }
                // 429 and 5xx are the server pushing back; retry with backoff.
                Ok(resp) if resp.status_code == 429 || resp.status_code >= 500 => {
                    format!("status {}", resp.status_code)
                }
                Ok(resp) => {
                    counter!("shopcrawl_fetch_total", "outcome" => "permanent").increment(1);
                    return Err(FetchError::Permanent {
                        status: Some(resp.status_code),
                        attempts: attempt,
                    });
                }
                Err(e) if e.is_retryable() => e.to_string(),
                Err(_) => {
                    counter!("shopcrawl_fetch_total", "outcome" => "permanent").increment(1);
                    return Err(FetchError::Permanent {
                        status: None,
                        attempts: attempt,
                    });
                }
            };

            if !self.retry_policy.should_retry(attempt) {
                warn!(url, attempts = attempt, "Retry budget exhausted: {}", transient_reason);
                counter!("shopcrawl_fetch_total", "outcome" => "exhausted").increment(1);
                return Err(FetchError::Exhausted {
                    attempts: attempt,
                    last: transient_reason,
                });
            }

            let backoff = self.retry_policy.calculate_backoff(attempt);
            debug!(
                url,
                attempt, "Transient failure ({}), backing off {:?}", transient_reason, backoff
            );
            tokio::time::sleep(backoff).await;
        }
    }
}
