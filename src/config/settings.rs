// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// 应用程序配置设置
///
/// 爬取、存储与索引协作方的所有配置项。配置对单个作业是
/// 静态的，运行期不可变。
#[derive(Debug, Deserialize)]
pub struct Settings {
    /// 爬取配置
    pub crawler: CrawlerSettings,
    /// 存储配置
    #[serde(default)]
    pub store: StoreSettings,
    /// 索引协作方配置
    #[serde(default)]
    pub indexing: IndexingSettings,
}

/// 爬取配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerSettings {
    /// User-Agent
    pub user_agent: String,
    /// 默认按域最小请求间隔（毫秒），robots Crawl-delay优先
    pub default_crawl_delay_ms: u64,
    /// 单次抓取超时（秒）
    pub fetch_timeout_secs: u64,
    /// 抓取尝试次数上限（含首次）
    pub max_fetch_attempts: u32,
    /// 最大发现递归深度
    pub max_depth: u32,
    /// 深度探索每层的页面预算
    pub pages_per_level: usize,
    /// 工作器数量下限
    pub min_workers: usize,
    /// 工作器数量上限
    pub max_workers: usize,
    /// 默认产品数量上限
    pub default_max_products: usize,
    /// 是否用浏览器引擎渲染页面（客户端构建的导航）
    pub render_js: bool,
    /// 取消后等待在途抓取结束的宽限期（秒）
    pub cancel_grace_secs: u64,
}

/// 存储配置设置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreSettings {
    /// SQLite连接串；为空时使用进程内存储
    pub database_url: Option<String>,
}

/// 索引协作方配置设置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IndexingSettings {
    /// 摄入端点；为空时丢弃文档（试运行）
    pub endpoint: Option<String>,
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 从默认值、可选配置文件和环境变量加载配置
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        let builder = Config::builder()
            // Crawler defaults
            .set_default("crawler.user_agent", "shopcrawl-bot/1.0")?
            .set_default("crawler.default_crawl_delay_ms", 1000)?
            .set_default("crawler.fetch_timeout_secs", 30)?
            .set_default("crawler.max_fetch_attempts", 3)?
            .set_default("crawler.max_depth", 3)?
            .set_default("crawler.pages_per_level", 5)?
            .set_default("crawler.min_workers", 1)?
            .set_default("crawler.max_workers", 8)?
            .set_default("crawler.default_max_products", 100)?
            .set_default("crawler.render_js", true)?
            .set_default("crawler.cancel_grace_secs", 30)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("SHOPCRAWL").separator("__"));

        builder.build()?.try_deserialize()
    }
}
