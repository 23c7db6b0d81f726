// ==========================================
// 产品目录门户 - 检索来源
// ==========================================
// 职责: 统一检索的各个子来源（每个品类表 / 文章 / 下载文件）
// 约定: 每个来源最多返回 limit 条，同时报告实际命中总数
// ==========================================

use crate::domain::category::{CategoryDescriptor, NATURAL_KEY_COLUMN};
use crate::domain::product::ProductRecord;
use crate::domain::search::SearchResult;
use crate::domain::types::{MatchRank, SourceKind};
use crate::engine::ranking::{best_rank, truncate_snippet};
use crate::repository::category_table_repo::ProductTableStore;
use crate::repository::content_repo::ContentRepository;
use crate::repository::error::RepositoryResult;
use crate::repository::text_query::TextQuery;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// 文章来源标识
pub const ARTICLES_SOURCE: &str = "articles";

/// 下载文件来源标识（无集合时）
pub const FILES_SOURCE: &str = "files";

/// 子来源错误（聚合器据此降级该来源）
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("来源 {source_name} 查询失败: {message}")]
    Query {
        source_name: String,
        message: String,
    },

    #[error("来源 {0} 不可用")]
    Unavailable(String),
}

/// 单个来源的命中
#[derive(Debug, Clone, Default)]
pub struct SourceHits {
    pub total: usize,
    pub results: Vec<SearchResult>,
}

// ==========================================
// SearchSource Trait
// ==========================================
#[async_trait]
pub trait SearchSource: Send + Sync {
    /// 来源标识（品类 id / articles / files）
    fn name(&self) -> String;

    fn kind(&self) -> SourceKind;

    /// query 已 trim 且非空
    async fn search(&self, query: &str, limit: usize) -> Result<SourceHits, SourceError>;
}

/// 在阻塞线程池执行仓储查询
async fn run_blocking<T, F>(source_name: String, f: F) -> Result<T, SourceError>
where
    T: Send + 'static,
    F: FnOnce() -> RepositoryResult<T> + Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(SourceError::Query {
            source_name,
            message: e.to_string(),
        }),
        Err(e) => Err(SourceError::Query {
            source_name,
            message: format!("查询任务异常: {}", e),
        }),
    }
}

// ==========================================
// ProductFamilySource - 单个品类表
// ==========================================
pub struct ProductFamilySource {
    desc: Arc<CategoryDescriptor>,
    store: Arc<dyn ProductTableStore>,
    text_fields: usize,
    snippet_max_chars: usize,
}

impl ProductFamilySource {
    pub fn new(
        desc: Arc<CategoryDescriptor>,
        store: Arc<dyn ProductTableStore>,
        text_fields: usize,
        snippet_max_chars: usize,
    ) -> Self {
        Self {
            desc,
            store,
            text_fields,
            snippet_max_chars,
        }
    }

    /// 参与检索的字段: 自然键 + 前 N 个顶层文本列
    fn search_fields(&self) -> Vec<String> {
        let mut fields = vec![NATURAL_KEY_COLUMN.to_string()];
        fields.extend(
            self.desc
                .searchable_text_columns(self.text_fields)
                .into_iter()
                .map(|c| c.name.clone()),
        );
        fields
    }

    fn to_result(&self, record: ProductRecord, fields: &[String], query_lower: &str) -> SearchResult {
        let texts: Vec<&str> = fields
            .iter()
            .skip(1)
            .filter_map(|f| record.fields.get(f).and_then(|v| v.as_text()))
            .filter(|s| !s.trim().is_empty())
            .collect();

        let rank = best_rank(
            std::iter::once(record.part_number.as_str()).chain(texts.iter().copied()),
            query_lower,
        )
        .unwrap_or(MatchRank::Substring);

        SearchResult {
            source_kind: SourceKind::Product,
            identifier: record.part_number.clone(),
            title: record.part_number.clone(),
            snippet: truncate_snippet(&texts.join(" | "), self.snippet_max_chars),
            score: rank.score(),
            rank,
            source: self.desc.id.clone(),
            updated_at: record.last_touched(),
        }
    }
}

#[async_trait]
impl SearchSource for ProductFamilySource {
    fn name(&self) -> String {
        self.desc.id.clone()
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Product
    }

    async fn search(&self, query: &str, limit: usize) -> Result<SourceHits, SourceError> {
        let fields = self.search_fields();
        let text_query = TextQuery::new(query);
        let store = Arc::clone(&self.store);
        let desc = Arc::clone(&self.desc);
        let sql_fields = fields.clone();

        let (records, total) = run_blocking(self.name(), move || {
            let refs: Vec<&str> = sql_fields.iter().map(|s| s.as_str()).collect();
            let records = store.search_text(&desc, &refs, &text_query, limit)?;
            let total = store.count_text(&desc, &refs, &text_query)?;
            Ok((records, total))
        })
        .await?;

        let query_lower = query.trim().to_lowercase();
        let results: Vec<SearchResult> = records
            .into_iter()
            .map(|r| self.to_result(r, &fields, &query_lower))
            .collect();
        Ok(SourceHits {
            total: total.max(results.len()),
            results,
        })
    }
}

// ==========================================
// ArticleSource - 文章（标题）
// ==========================================
pub struct ArticleSource {
    repo: Arc<ContentRepository>,
    snippet_max_chars: usize,
}

impl ArticleSource {
    pub fn new(repo: Arc<ContentRepository>, snippet_max_chars: usize) -> Self {
        Self {
            repo,
            snippet_max_chars,
        }
    }
}

#[async_trait]
impl SearchSource for ArticleSource {
    fn name(&self) -> String {
        ARTICLES_SOURCE.to_string()
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Article
    }

    async fn search(&self, query: &str, limit: usize) -> Result<SourceHits, SourceError> {
        let repo = Arc::clone(&self.repo);
        let text_query = TextQuery::new(query);
        let (articles, total) = run_blocking(self.name(), move || {
            let articles = repo.search_articles(&text_query, limit)?;
            let total = repo.count_articles(&text_query)?;
            Ok((articles, total))
        })
        .await?;

        let query_lower = query.trim().to_lowercase();
        let results: Vec<SearchResult> = articles
            .into_iter()
            .map(|a| {
                let rank = best_rank([a.title.as_str()], &query_lower)
                    .unwrap_or(MatchRank::Substring);
                SearchResult {
                    source_kind: SourceKind::Article,
                    identifier: a.slug.clone(),
                    snippet: truncate_snippet(
                        a.excerpt.as_deref().unwrap_or_default(),
                        self.snippet_max_chars,
                    ),
                    title: a.title,
                    score: rank.score(),
                    rank,
                    source: ARTICLES_SOURCE.to_string(),
                    updated_at: Some(a.updated_at),
                }
            })
            .collect();
        Ok(SourceHits {
            total: total.max(results.len()),
            results,
        })
    }
}

// ==========================================
// DownloadFileSource - 下载文件（标题 + 文件名）
// ==========================================
pub struct DownloadFileSource {
    repo: Arc<ContentRepository>,
}

impl DownloadFileSource {
    pub fn new(repo: Arc<ContentRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl SearchSource for DownloadFileSource {
    fn name(&self) -> String {
        FILES_SOURCE.to_string()
    }

    fn kind(&self) -> SourceKind {
        SourceKind::DownloadableFile
    }

    async fn search(&self, query: &str, limit: usize) -> Result<SourceHits, SourceError> {
        let repo = Arc::clone(&self.repo);
        let text_query = TextQuery::new(query);
        let (files, total) = run_blocking(self.name(), move || {
            let files = repo.search_files(&text_query, limit)?;
            let total = repo.count_files(&text_query)?;
            Ok((files, total))
        })
        .await?;

        let query_lower = query.trim().to_lowercase();
        let results: Vec<SearchResult> = files
            .into_iter()
            .map(|f| {
                let rank = best_rank([f.title.as_str(), f.filename.as_str()], &query_lower)
                    .unwrap_or(MatchRank::Substring);
                SearchResult {
                    source_kind: SourceKind::DownloadableFile,
                    identifier: f.id,
                    title: f.title,
                    snippet: f.filename,
                    score: rank.score(),
                    rank,
                    source: f.collection.unwrap_or_else(|| FILES_SOURCE.to_string()),
                    updated_at: Some(f.updated_at),
                }
            })
            .collect();
        Ok(SourceHits {
            total: total.max(results.len()),
            results,
        })
    }
}
