// ==========================================
// 产品目录门户 - 导入批次仓储
// ==========================================
// 职责: import_batch 表（每次 CSV 导入一条审计记录）
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::import::ImportBatch;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

pub struct ImportBatchRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ImportBatchRepository {
    /// 创建新的 ImportBatchRepository 实例
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

    pub fn insert(&self, batch: &ImportBatch) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO import_batch (
                batch_id, category_id, total_rows, inserted, updated, unchanged,
                failed, elapsed_ms, failures_json, imported_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                batch.batch_id,
                batch.category,
                batch.total_rows,
                batch.inserted,
                batch.updated,
                batch.unchanged,
                batch.failed,
                batch.elapsed_ms,
                batch.failures_json,
                batch.imported_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// 最近的导入批次（可按品类过滤，按导入时间倒序）
    pub fn list_recent(
        &self,
        category: Option<&str>,
        limit: usize,
    ) -> RepositoryResult<Vec<ImportBatch>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT batch_id, category_id, total_rows, inserted, updated, unchanged,
                   failed, elapsed_ms, failures_json, imported_at
            FROM import_batch
            WHERE (?1 IS NULL OR category_id = ?1)
            ORDER BY imported_at DESC, batch_id
            LIMIT ?2
            "#,
        )?;
        let rows = stmt.query_map(params![category, limit as i64], |row| {
            let imported_at: String = row.get(9)?;
            Ok(ImportBatch {
                batch_id: row.get(0)?,
                category: row.get(1)?,
                total_rows: row.get(2)?,
                inserted: row.get(3)?,
                updated: row.get(4)?,
                unchanged: row.get(5)?,
                failed: row.get(6)?,
                elapsed_ms: row.get(7)?,
                failures_json: row.get(8)?,
                imported_at: DateTime::parse_from_rfc3339(&imported_at)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(
                            9,
                            rusqlite::types::Type::Text,
                            Box::new(e),
                        )
                    })?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}
