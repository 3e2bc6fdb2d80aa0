// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::discovered_url::Classification;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// 抓取结果状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStatus {
    /// 抓取成功
    Success,
    /// 抓取失败（瞬时错误重试耗尽或永久错误）
    Failed,
    /// 被跳过（取消后在途结果被丢弃等）
    Skipped,
}

impl fmt::Display for FetchStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FetchStatus::Success => write!(f, "success"),
            FetchStatus::Failed => write!(f, "failed"),
            FetchStatus::Skipped => write!(f, "skipped"),
        }
    }
}

impl FromStr for FetchStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(FetchStatus::Success),
            "failed" => Ok(FetchStatus::Failed),
            "skipped" => Ok(FetchStatus::Skipped),
            _ => Err(()),
        }
    }
}

/// 爬取文档实体
///
/// 每个进入抓取阶段的已发现URL至多产生一条文档记录。
/// 记录创建后不可变，仅重试时的尝试计数可以递增。
///
/// `extracted_fields` 的形状依站点而定，对本核心而言是
/// 不透明的字段名到值的映射，由索引协作方解释。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawledDocument {
    /// 文档唯一标识符
    pub id: Uuid,
    /// 所属作业ID
    pub job_id: Uuid,
    /// 规范化URL
    pub url: String,
    /// 原始HTML内容（失败文档为空）
    pub raw_content: String,
    /// 提取出的结构化字段（标题、价格、描述等）
    pub extracted_fields: HashMap<String, Value>,
    /// 抓取结果状态
    pub fetch_status: FetchStatus,
    /// 抓取尝试次数
    pub fetch_attempts: u32,
    /// URL分类
    pub classification: Classification,
    /// 抓取时间
    pub fetched_at: DateTime<Utc>,
}

impl CrawledDocument {
    /// 创建一条成功的文档记录
    pub fn success(
        job_id: Uuid,
        url: impl Into<String>,
        raw_content: String,
        extracted_fields: HashMap<String, Value>,
        classification: Classification,
        fetch_attempts: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            job_id,
            url: url.into(),
            raw_content,
            extracted_fields,
            fetch_status: FetchStatus::Success,
            fetch_attempts,
            classification,
            fetched_at: Utc::now(),
        }
    }

    /// 创建一条失败或跳过的文档记录
    pub fn unfetched(
        job_id: Uuid,
        url: impl Into<String>,
        status: FetchStatus,
        classification: Classification,
        fetch_attempts: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            job_id,
            url: url.into(),
            raw_content: String::new(),
            extracted_fields: HashMap::new(),
            fetch_status: status,
            fetch_attempts,
            classification,
            fetched_at: Utc::now(),
        }
    }

    /// 是否为成功抓取的产品文档（计入产品上限）
    pub fn is_product(&self) -> bool {
        self.fetch_status == FetchStatus::Success
            && self.classification == Classification::Product
    }
}
