// ==========================================
// 产品目录门户 - 内容集合仓储（文章 / 下载文件）
// ==========================================
// 职责: 非产品内容的写入与文本检索
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::content::{Article, DownloadFile};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::text_query::TextQuery;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex};

/// 文章参与检索的字段
pub const ARTICLE_SEARCH_FIELDS: [&str; 1] = ["title"];

/// 下载文件参与检索的字段
pub const FILE_SEARCH_FIELDS: [&str; 2] = ["title", "filename"];

// ==========================================
// ContentRepository
// ==========================================
pub struct ContentRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ContentRepository {
    /// 创建新的 ContentRepository 实例
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ===== 文章 =====

    /// 写入文章（按 id 覆盖）
    pub fn upsert_article(&self, article: &Article) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO article (id, title, slug, excerpt, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                slug = excluded.slug,
                excerpt = excluded.excerpt,
                updated_at = excluded.updated_at
            "#,
            params![
                article.id,
                article.title,
                article.slug,
                article.excerpt,
                article.updated_at.to_rfc3339()
            ],
        )?;
        Ok(())
    }

    pub fn search_articles(&self, query: &TextQuery, limit: usize) -> RepositoryResult<Vec<Article>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT id, title, slug, excerpt, updated_at FROM article WHERE {} ORDER BY {}, updated_at DESC, id LIMIT ?4",
            TextQuery::where_clause(&ARTICLE_SEARCH_FIELDS),
            TextQuery::rank_expr(&ARTICLE_SEARCH_FIELDS)
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![query.contains, query.exact, query.prefix, limit as i64],
            map_article,
        )?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn count_articles(&self, query: &TextQuery) -> RepositoryResult<usize> {
        self.count_matching("article", &ARTICLE_SEARCH_FIELDS, query)
    }

    // ===== 下载文件 =====

    /// 写入下载文件元数据（按 id 覆盖）
    pub fn upsert_file(&self, file: &DownloadFile) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO download_file (id, title, filename, collection, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                filename = excluded.filename,
                collection = excluded.collection,
                updated_at = excluded.updated_at
            "#,
            params![
                file.id,
                file.title,
                file.filename,
                file.collection,
                file.updated_at.to_rfc3339()
            ],
        )?;
        Ok(())
    }

    pub fn search_files(
        &self,
        query: &TextQuery,
        limit: usize,
    ) -> RepositoryResult<Vec<DownloadFile>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT id, title, filename, collection, updated_at FROM download_file WHERE {} ORDER BY {}, updated_at DESC, id LIMIT ?4",
            TextQuery::where_clause(&FILE_SEARCH_FIELDS),
            TextQuery::rank_expr(&FILE_SEARCH_FIELDS)
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![query.contains, query.exact, query.prefix, limit as i64],
            map_file,
        )?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn count_files(&self, query: &TextQuery) -> RepositoryResult<usize> {
        self.count_matching("download_file", &FILE_SEARCH_FIELDS, query)
    }

    fn count_matching(
        &self,
        table: &str,
        fields: &[&str],
        query: &TextQuery,
    ) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE {}",
            table,
            TextQuery::where_clause(fields)
        );
        let count: i64 = conn.query_row(&sql, [&query.contains], |row| row.get(0))?;
        Ok(count as usize)
    }
}

fn parse_updated_at(raw: String, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                idx,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
}

fn map_article(row: &Row<'_>) -> rusqlite::Result<Article> {
    Ok(Article {
        id: row.get(0)?,
        title: row.get(1)?,
        slug: row.get(2)?,
        excerpt: row.get(3)?,
        updated_at: parse_updated_at(row.get(4)?, 4)?,
    })
}

fn map_file(row: &Row<'_>) -> rusqlite::Result<DownloadFile> {
    Ok(DownloadFile {
        id: row.get(0)?,
        title: row.get(1)?,
        filename: row.get(2)?,
        collection: row.get(3)?,
        updated_at: parse_updated_at(row.get(4)?, 4)?,
    })
}
