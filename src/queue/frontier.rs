// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::discovered_url::{
    Classification, DiscoveredUrl, SourceStrategy, UrlState,
};
use crate::domain::repositories::job_repository::JobRepository;
use crate::domain::repositories::url_repository::UrlRepository;
use crate::domain::services::classifier::PatternClassifier;
use crate::utils::url_utils;
use parking_lot::Mutex;
use regex::Regex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

/// 提交给前沿队列的候选URL
#[derive(Debug, Clone)]
pub struct Candidate {
    /// 原始URL（提交时规范化）
    pub url: String,
    /// 链接锚文本
    pub anchor_text: Option<String>,
    /// 发现递归深度
    pub depth: u32,
}

impl Candidate {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            anchor_text: None,
            depth: 0,
        }
    }

    pub fn at_depth(url: impl Into<String>, depth: u32) -> Self {
        Self {
            url: url.into(),
            anchor_text: None,
            depth,
        }
    }
}

/// 提交结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submitted {
    /// 新URL，已入队等待抓取
    Queued,
    /// 新URL，仅记录不入队（被排除、未知或超出深度）
    Recorded,
    /// 重复URL，仅合并了来源策略
    Duplicate,
    /// 被调用方过滤器或域边界拒绝
    Filtered,
}

/// 已入队待抓取的URL
#[derive(Debug, Clone)]
pub struct QueuedUrl {
    pub url: String,
    pub classification: Classification,
    pub depth: u32,
}

struct CallerFilter {
    regex: Option<Regex>,
    literal: String,
}

impl CallerFilter {
    fn compile(patterns: &[String]) -> Vec<CallerFilter> {
        patterns
            .iter()
            .map(|p| CallerFilter {
                regex: Regex::new(p).ok(),
                literal: p.clone(),
            })
            .collect()
    }

    fn matches(&self, url: &str) -> bool {
        match &self.regex {
            Some(re) => re.is_match(url),
            None => url.contains(&self.literal),
        }
    }
}

struct FrontierState {
    seen: HashMap<String, Classification>,
    category_queue: VecDeque<QueuedUrl>,
    product_queue: VecDeque<QueuedUrl>,
    in_flight: usize,
    open_producers: usize,
    closed: bool,
    classifier: PatternClassifier,
}

/// 前沿队列配置
#[derive(Debug, Clone)]
pub struct FrontierConfig {
    /// 调用方包含模式（空表示全部允许）
    pub include_patterns: Vec<String>,
    /// 调用方排除模式
    pub exclude_patterns: Vec<String>,
    /// 最大发现递归深度
    pub max_depth: u32,
    /// 是否抓取未知分类（重索引作业的目标是显式给出的）
    pub queue_unknown: bool,
}

impl Default for FrontierConfig {
    fn default() -> Self {
        Self {
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
            max_depth: 3,
            queue_unknown: false,
        }
    }
}

/// 前沿与去重管理器
///
/// 汇聚所有发现策略的候选URL：按规范化URL去重、分类页
/// 优先于产品页出队（先建立探索广度，再消耗工作器预算抓取
/// 详情页）、限制递归深度、跟踪在途与生产者状态。
///
/// `submit` 是幂等的：重复提交同一规范化URL只会把新来源
/// 策略并入已有记录。调用方过滤器是硬边界，先于内置分类器
/// 评估。
///
/// 这是作业内唯一被多工作器并发修改的结构之一（另一个是
/// 按域限速器的令牌状态），内部以互斥锁保护。
pub struct Frontier {
    job_id: Uuid,
    root: Url,
    state: Mutex<FrontierState>,
    includes: Vec<CallerFilter>,
    excludes: Vec<CallerFilter>,
    max_depth: u32,
    queue_unknown: bool,
    urls: Arc<dyn UrlRepository>,
    jobs: Arc<dyn JobRepository>,
}

impl Frontier {
    pub fn new(
        job_id: Uuid,
        root: Url,
        config: FrontierConfig,
        classifier: PatternClassifier,
        urls: Arc<dyn UrlRepository>,
        jobs: Arc<dyn JobRepository>,
    ) -> Self {
        Self {
            job_id,
            root,
            state: Mutex::new(FrontierState {
                seen: HashMap::new(),
                category_queue: VecDeque::new(),
                product_queue: VecDeque::new(),
                in_flight: 0,
                open_producers: 0,
                closed: false,
                classifier,
            }),
            includes: CallerFilter::compile(&config.include_patterns),
            excludes: CallerFilter::compile(&config.exclude_patterns),
            max_depth: config.max_depth,
            queue_unknown: config.queue_unknown,
            urls,
            jobs,
        }
    }

    /// 追加运行期排除模式（robots Disallow规则）
    ///
    /// 只影响后续提交；已入队URL由抓取器的robots检查兜底。
    pub fn add_exclusions(&self, patterns: &[String]) {
        let mut state = self.state.lock();
        state.classifier = state.classifier.with_exclusions(patterns);
    }

    /// 提交一个候选URL
    ///
    /// # 参数
    ///
    /// * `candidate` - 候选URL
    /// * `source` - 发现该URL的策略
    /// * `forced_classification` - 跳过分类器的强制分类（根URL按分类页入队）
    ///
    /// # 返回值
    ///
    /// 提交结果
    pub async fn submit(
        &self,
        candidate: Candidate,
        source: SourceStrategy,
        forced_classification: Option<Classification>,
    ) -> Submitted {
        let normalized = match url_utils::normalize_url(&candidate.url) {
            Ok(n) => n,
            Err(e) => {
                debug!("Dropping unparsable candidate {}: {}", candidate.url, e);
                return Submitted::Filtered;
            }
        };

        // Domain boundary.
        match Url::parse(&normalized) {
            Ok(u) if url_utils::is_same_domain(&u, &self.root) => {}
            _ => return Submitted::Filtered,
        }

        // Caller filters are a hard boundary, evaluated before the
        // built-in pattern set.
        if !self.includes.is_empty() && !self.includes.iter().any(|f| f.matches(&normalized)) {
            return Submitted::Filtered;
        }
        if self.excludes.iter().any(|f| f.matches(&normalized)) {
            return Submitted::Filtered;
        }

        let (outcome, classification) = {
            let mut state = self.state.lock();

            if state.seen.contains_key(&normalized) {
                (Submitted::Duplicate, Classification::Unknown)
            } else {
                let classification = forced_classification.unwrap_or_else(|| {
                    state
                        .classifier
                        .classify(&normalized, candidate.anchor_text.as_deref())
                });
                state.seen.insert(normalized.clone(), classification);

                let queueable = match classification {
                    Classification::Category | Classification::Product => true,
                    Classification::Unknown => self.queue_unknown,
                    Classification::Excluded => false,
                };

                if queueable && candidate.depth <= self.max_depth && !state.closed {
                    let item = QueuedUrl {
                        url: normalized.clone(),
                        classification,
                        depth: candidate.depth,
                    };
                    if classification == Classification::Category {
                        state.category_queue.push_back(item);
                    } else {
                        state.product_queue.push_back(item);
                    }
                    (Submitted::Queued, classification)
                } else {
                    (Submitted::Recorded, classification)
                }
            }
        };

        // Store bookkeeping happens outside the queue lock.
        match outcome {
            Submitted::Duplicate => {
                if let Err(e) = self.urls.merge_strategy(self.job_id, &normalized, source).await {
                    warn!("Failed to merge source strategy for {}: {}", normalized, e);
                }
            }
            Submitted::Queued | Submitted::Recorded => {
                let mut record = DiscoveredUrl::new(
                    self.job_id,
                    normalized.clone(),
                    source,
                    classification,
                    candidate.depth,
                );
                if outcome == Submitted::Queued {
                    record.state = UrlState::Queued;
                }
                if let Err(e) = self.urls.record(&record).await {
                    warn!("Failed to record discovered URL {}: {}", normalized, e);
                }
                if let Err(e) = self.jobs.increment_discovered(self.job_id, 1).await {
                    warn!("Failed to bump discovered count: {}", e);
                }
            }
            Submitted::Filtered => {}
        }

        outcome
    }

    /// 取出下一个待抓取URL（分类页优先）
    ///
    /// 返回 `None` 表示当前没有可出队项，不代表作业结束；
    /// 结束判定见 [`Frontier::is_exhausted`]。
    pub fn next(&self) -> Option<QueuedUrl> {
        let mut state = self.state.lock();
        if state.closed {
            return None;
        }
        let item = state
            .category_queue
            .pop_front()
            .or_else(|| state.product_queue.pop_front());
        if item.is_some() {
            state.in_flight += 1;
        }
        item
    }

    /// 标记一个在途项处理完毕
    pub fn task_done(&self) {
        let mut state = self.state.lock();
        state.in_flight = state.in_flight.saturating_sub(1);
    }

    /// 注册一个发现生产者
    pub fn producer_opened(&self) {
        self.state.lock().open_producers += 1;
    }

    /// 注销一个发现生产者
    pub fn producer_closed(&self) {
        let mut state = self.state.lock();
        state.open_producers = state.open_producers.saturating_sub(1);
    }

    /// 队列耗尽判定：无排队项、无在途项且所有发现策略已结束
    pub fn is_exhausted(&self) -> bool {
        let state = self.state.lock();
        state.category_queue.is_empty()
            && state.product_queue.is_empty()
            && state.in_flight == 0
            && state.open_producers == 0
    }

    /// 关闭队列：不再出队（产品上限或取消触发）
    pub fn close(&self) {
        self.state.lock().closed = true;
    }

    /// 是否已关闭
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// 当前排队项数量
    pub fn queued_len(&self) -> usize {
        let state = self.state.lock();
        state.category_queue.len() + state.product_queue.len()
    }
}
