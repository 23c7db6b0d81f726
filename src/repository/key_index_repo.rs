// ==========================================
// 产品目录门户 - 自然键索引仓储
// ==========================================
// 职责: product_key_index 持久化（part_number → 写入过的品类）
// 说明: 内存索引由引擎层维护，本表用于启动预热
// ==========================================

use crate::db::open_sqlite_connection;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

/// 索引条目
#[derive(Debug, Clone, PartialEq)]
pub struct KeyIndexEntry {
    pub part_number: String,
    pub category_id: String,
    pub written_at: DateTime<Utc>,
    pub write_seq: u64,
}

// ==========================================
// KeyIndexRepository
// ==========================================
pub struct KeyIndexRepository {
    conn: Arc<Mutex<Connection>>,
}

impl KeyIndexRepository {
    /// 创建新的 KeyIndexRepository 实例
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

    /// 记录一次写入（同键同品类覆盖）
    pub fn record(&self, entry: &KeyIndexEntry) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO product_key_index (part_number, category_id, written_at, write_seq)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(part_number, category_id) DO UPDATE SET
                written_at = excluded.written_at,
                write_seq = excluded.write_seq
            "#,
            params![
                entry.part_number,
                entry.category_id,
                entry.written_at.to_rfc3339(),
                entry.write_seq as i64
            ],
        )?;
        Ok(())
    }

    /// 删除失效条目
    pub fn remove(&self, part_number: &str, category_id: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "DELETE FROM product_key_index WHERE part_number = ?1 AND category_id = ?2",
            params![part_number, category_id],
        )?;
        Ok(affected > 0)
    }

    /// 读取全部条目（按 write_seq 升序，便于按写入顺序回放）
    pub fn load_all(&self) -> RepositoryResult<Vec<KeyIndexEntry>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT part_number, category_id, written_at, write_seq
            FROM product_key_index
            ORDER BY write_seq, part_number, category_id
            "#,
        )?;
        let rows = stmt.query_map([], |row| {
            let written_at: String = row.get(2)?;
            let seq: i64 = row.get(3)?;
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, written_at, seq))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (part_number, category_id, written_at, seq) = row?;
            let written_at = DateTime::parse_from_rfc3339(&written_at)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now());
            entries.push(KeyIndexEntry {
                part_number,
                category_id,
                written_at,
                write_seq: seq.max(0) as u64,
            });
        }
        Ok(entries)
    }
}
