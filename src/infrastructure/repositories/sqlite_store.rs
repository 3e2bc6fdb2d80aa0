// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::discovered_url::{
    Classification, DiscoveredUrl, SourceStrategy, UrlState,
};
use crate::domain::models::document::{CrawledDocument, FetchStatus};
use crate::domain::models::job::{CrawlJob, JobStatus};
use crate::domain::repositories::document_repository::DocumentRepository;
use crate::domain::repositories::job_repository::{JobRepository, RepositoryError};
use crate::domain::repositories::url_repository::UrlRepository;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS crawl_jobs (
    id               TEXT PRIMARY KEY,
    shop_id          TEXT NOT NULL,
    root_url         TEXT NOT NULL,
    include_patterns TEXT NOT NULL DEFAULT '[]',
    exclude_patterns TEXT NOT NULL DEFAULT '[]',
    max_products     INTEGER NOT NULL DEFAULT 100,
    worker_count     INTEGER NOT NULL DEFAULT 4,
    reindex          INTEGER NOT NULL DEFAULT 0,
    status           TEXT NOT NULL,
    discovered_count INTEGER NOT NULL DEFAULT 0,
    crawled_count    INTEGER NOT NULL DEFAULT 0,
    error_count      INTEGER NOT NULL DEFAULT 0,
    created_at       TEXT NOT NULL,
    started_at       TEXT,
    finished_at      TEXT
);
CREATE INDEX IF NOT EXISTS idx_crawl_jobs_shop ON crawl_jobs (shop_id, status);

CREATE TABLE IF NOT EXISTS discovered_urls (
    job_id            TEXT NOT NULL,
    url               TEXT NOT NULL,
    source_strategies TEXT NOT NULL,
    classification    TEXT NOT NULL,
    depth             INTEGER NOT NULL DEFAULT 0,
    state             TEXT NOT NULL,
    state_rank        INTEGER NOT NULL DEFAULT 0,
    discovered_at     TEXT NOT NULL,
    PRIMARY KEY (job_id, url)
);

CREATE TABLE IF NOT EXISTS crawled_documents (
    id               TEXT PRIMARY KEY,
    job_id           TEXT NOT NULL,
    url              TEXT NOT NULL,
    raw_content      TEXT NOT NULL DEFAULT '',
    extracted_fields TEXT NOT NULL DEFAULT '{}',
    fetch_status     TEXT NOT NULL,
    fetch_attempts   INTEGER NOT NULL DEFAULT 0,
    classification   TEXT NOT NULL,
    fetched_at       TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_crawled_documents_job ON crawled_documents (job_id, url);
"#;

fn state_rank(state: UrlState) -> i64 {
    match state {
        UrlState::Discovered => 0,
        UrlState::Queued => 1,
        UrlState::Fetched => 2,
        UrlState::Classified => 3,
        UrlState::Indexed => 4,
        UrlState::Failed => 5,
    }
}

fn corrupt(what: &str, value: &str) -> RepositoryError {
    RepositoryError::Corrupt(format!("{}: {}", what, value))
}

/// SQLite持久化存储
///
/// 作业存储契约的持久化实现：进程重启后状态查询与重索引
/// 操作保持一致。计数器更新下推为SQL端的原子递增
/// （`SET n = n + 1`），并发工作器不会丢失更新。
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// 打开（必要时创建）数据库并确保表结构存在
    ///
    /// # 参数
    ///
    /// * `url` - SQLite连接串（`sqlite::memory:` 或 `sqlite://path`）
    pub async fn connect(url: &str) -> Result<Self, RepositoryError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(RepositoryError::Database)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        sqlx::raw_sql(SCHEMA).execute(&pool).await?;

        Ok(Self { pool })
    }

    fn job_from_row(row: &SqliteRow) -> Result<CrawlJob, RepositoryError> {
        let id: String = row.try_get("id")?;
        let status: String = row.try_get("status")?;
        let include_patterns: String = row.try_get("include_patterns")?;
        let exclude_patterns: String = row.try_get("exclude_patterns")?;

        Ok(CrawlJob {
            id: Uuid::parse_str(&id).map_err(|_| corrupt("job id", &id))?,
            shop_id: row.try_get("shop_id")?,
            root_url: row.try_get("root_url")?,
            include_patterns: serde_json::from_str(&include_patterns)
                .map_err(|_| corrupt("include_patterns", &include_patterns))?,
            exclude_patterns: serde_json::from_str(&exclude_patterns)
                .map_err(|_| corrupt("exclude_patterns", &exclude_patterns))?,
            max_products: row.try_get::<i64, _>("max_products")? as usize,
            worker_count: row.try_get::<i64, _>("worker_count")? as usize,
            reindex: row.try_get::<i64, _>("reindex")? != 0,
            status: status.parse().map_err(|_| corrupt("job status", &status))?,
            discovered_count: row.try_get::<i64, _>("discovered_count")? as u64,
            crawled_count: row.try_get::<i64, _>("crawled_count")? as u64,
            error_count: row.try_get::<i64, _>("error_count")? as u64,
            created_at: parse_ts(row, "created_at")?,
            started_at: parse_opt_ts(row, "started_at")?,
            finished_at: parse_opt_ts(row, "finished_at")?,
        })
    }

    fn url_from_row(row: &SqliteRow) -> Result<DiscoveredUrl, RepositoryError> {
        let job_id: String = row.try_get("job_id")?;
        let strategies: String = row.try_get("source_strategies")?;
        let classification: String = row.try_get("classification")?;
        let state: String = row.try_get("state")?;

        Ok(DiscoveredUrl {
            job_id: Uuid::parse_str(&job_id).map_err(|_| corrupt("job id", &job_id))?,
            url: row.try_get("url")?,
            source_strategies: strategies
                .split(',')
                .filter(|s| !s.is_empty())
                .map(|s| {
                    s.parse::<SourceStrategy>()
                        .map_err(|_| corrupt("source strategy", s))
                })
                .collect::<Result<_, _>>()?,
            classification: classification
                .parse::<Classification>()
                .map_err(|_| corrupt("classification", &classification))?,
            depth: row.try_get::<i64, _>("depth")? as u32,
            state: state.parse::<UrlState>().map_err(|_| corrupt("url state", &state))?,
            discovered_at: parse_ts(row, "discovered_at")?,
        })
    }

    fn document_from_row(row: &SqliteRow) -> Result<CrawledDocument, RepositoryError> {
        let id: String = row.try_get("id")?;
        let job_id: String = row.try_get("job_id")?;
        let fields: String = row.try_get("extracted_fields")?;
        let fetch_status: String = row.try_get("fetch_status")?;
        let classification: String = row.try_get("classification")?;

        Ok(CrawledDocument {
            id: Uuid::parse_str(&id).map_err(|_| corrupt("document id", &id))?,
            job_id: Uuid::parse_str(&job_id).map_err(|_| corrupt("job id", &job_id))?,
            url: row.try_get("url")?,
            raw_content: row.try_get("raw_content")?,
            extracted_fields: serde_json::from_str(&fields)
                .map_err(|_| corrupt("extracted_fields", &fields))?,
            fetch_status: fetch_status
                .parse::<FetchStatus>()
                .map_err(|_| corrupt("fetch status", &fetch_status))?,
            fetch_attempts: row.try_get::<i64, _>("fetch_attempts")? as u32,
            classification: classification
                .parse::<Classification>()
                .map_err(|_| corrupt("classification", &classification))?,
            fetched_at: parse_ts(row, "fetched_at")?,
        })
    }
}

fn parse_ts(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>, RepositoryError> {
    let raw: String = row.try_get(column)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| corrupt(column, &raw))
}

fn parse_opt_ts(row: &SqliteRow, column: &str) -> Result<Option<DateTime<Utc>>, RepositoryError> {
    let raw: Option<String> = row.try_get(column)?;
    match raw {
        None => Ok(None),
        Some(raw) => DateTime::parse_from_rfc3339(&raw)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|_| corrupt(column, &raw)),
    }
}

#[async_trait]
impl JobRepository for SqliteStore {
    async fn create(&self, job: &CrawlJob) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO crawl_jobs (id, shop_id, root_url, include_patterns, exclude_patterns, \
             max_products, worker_count, reindex, status, discovered_count, crawled_count, \
             error_count, created_at, started_at, finished_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(job.id.to_string())
        .bind(&job.shop_id)
        .bind(&job.root_url)
        .bind(serde_json::to_string(&job.include_patterns).unwrap_or_else(|_| "[]".into()))
        .bind(serde_json::to_string(&job.exclude_patterns).unwrap_or_else(|_| "[]".into()))
        .bind(job.max_products as i64)
        .bind(job.worker_count as i64)
        .bind(job.reindex as i64)
        .bind(job.status.to_string())
        .bind(job.discovered_count as i64)
        .bind(job.crawled_count as i64)
        .bind(job.error_count as i64)
        .bind(job.created_at.to_rfc3339())
        .bind(job.started_at.map(|t| t.to_rfc3339()))
        .bind(job.finished_at.map(|t| t.to_rfc3339()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CrawlJob>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM crawl_jobs WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::job_from_row).transpose()
    }

    async fn find_active_by_shop(
        &self,
        shop_id: &str,
    ) -> Result<Option<CrawlJob>, RepositoryError> {
        let row = sqlx::query(
            "SELECT * FROM crawl_jobs WHERE shop_id = ? \
             AND status NOT IN ('completed', 'failed', 'cancelled') LIMIT 1",
        )
        .bind(shop_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::job_from_row).transpose()
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: JobStatus,
        started_at: Option<DateTime<Utc>>,
        finished_at: Option<DateTime<Utc>>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE crawl_jobs SET status = ?, \
             started_at = COALESCE(?, started_at), \
             finished_at = COALESCE(?, finished_at) WHERE id = ?",
        )
        .bind(status.to_string())
        .bind(started_at.map(|t| t.to_rfc3339()))
        .bind(finished_at.map(|t| t.to_rfc3339()))
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn increment_discovered(&self, id: Uuid, by: u64) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE crawl_jobs SET discovered_count = discovered_count + ? WHERE id = ?")
            .bind(by as i64)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn increment_crawled(&self, id: Uuid) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE crawl_jobs SET crawled_count = crawled_count + 1 WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn increment_errors(&self, id: Uuid) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE crawl_jobs SET error_count = error_count + 1 WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl UrlRepository for SqliteStore {
    async fn record(&self, url: &DiscoveredUrl) -> Result<(), RepositoryError> {
        let strategies = url
            .source_strategies
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(",");
        sqlx::query(
            "INSERT INTO discovered_urls (job_id, url, source_strategies, classification, \
             depth, state, state_rank, discovered_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(job_id, url) DO UPDATE SET source_strategies = \
             CASE WHEN instr(source_strategies, excluded.source_strategies) = 0 \
             THEN source_strategies || ',' || excluded.source_strategies \
             ELSE source_strategies END",
        )
        .bind(url.job_id.to_string())
        .bind(&url.url)
        .bind(strategies)
        .bind(url.classification.to_string())
        .bind(url.depth as i64)
        .bind(url.state.to_string())
        .bind(state_rank(url.state))
        .bind(url.discovered_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn merge_strategy(
        &self,
        job_id: Uuid,
        url: &str,
        strategy: SourceStrategy,
    ) -> Result<(), RepositoryError> {
        // Single atomic statement; no read-modify-write window.
        sqlx::query(
            "UPDATE discovered_urls SET source_strategies = source_strategies || ',' || ? \
             WHERE job_id = ? AND url = ? AND instr(source_strategies, ?) = 0",
        )
        .bind(strategy.to_string())
        .bind(job_id.to_string())
        .bind(url)
        .bind(strategy.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn advance_state(
        &self,
        job_id: Uuid,
        url: &str,
        state: UrlState,
    ) -> Result<(), RepositoryError> {
        // The rank guard makes regression a no-op at the SQL level.
        sqlx::query(
            "UPDATE discovered_urls SET state = ?, state_rank = ? \
             WHERE job_id = ? AND url = ? AND state_rank < ?",
        )
        .bind(state.to_string())
        .bind(state_rank(state))
        .bind(job_id.to_string())
        .bind(url)
        .bind(state_rank(state))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find(
        &self,
        job_id: Uuid,
        url: &str,
    ) -> Result<Option<DiscoveredUrl>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM discovered_urls WHERE job_id = ? AND url = ?")
            .bind(job_id.to_string())
            .bind(url)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::url_from_row).transpose()
    }

    async fn find_by_job(&self, job_id: Uuid) -> Result<Vec<DiscoveredUrl>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM discovered_urls WHERE job_id = ?")
            .bind(job_id.to_string())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::url_from_row).collect()
    }
}

#[async_trait]
impl DocumentRepository for SqliteStore {
    async fn save(&self, document: &CrawledDocument) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO crawled_documents (id, job_id, url, raw_content, extracted_fields, \
             fetch_status, fetch_attempts, classification, fetched_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(document.id.to_string())
        .bind(document.job_id.to_string())
        .bind(&document.url)
        .bind(&document.raw_content)
        .bind(
            serde_json::to_string(&document.extracted_fields)
                .unwrap_or_else(|_| "{}".into()),
        )
        .bind(document.fetch_status.to_string())
        .bind(document.fetch_attempts as i64)
        .bind(document.classification.to_string())
        .bind(document.fetched_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_url(
        &self,
        job_id: Uuid,
        url: &str,
    ) -> Result<Option<CrawledDocument>, RepositoryError> {
        let row = sqlx::query(
            "SELECT * FROM crawled_documents WHERE job_id = ? AND url = ? \
             ORDER BY fetched_at DESC LIMIT 1",
        )
        .bind(job_id.to_string())
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::document_from_row).transpose()
    }

    async fn find_by_job(
        &self,
        job_id: Uuid,
    ) -> Result<Vec<CrawledDocument>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM crawled_documents WHERE job_id = ?")
            .bind(job_id.to_string())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::document_from_row).collect()
    }
}
