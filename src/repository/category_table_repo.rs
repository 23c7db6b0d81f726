// ==========================================
// 产品目录门户 - 品类物理表仓储
// ==========================================
// 职责: 按描述符读写各品类物理表（part_number 主键 + basic 列 + specifications JSON）
// 红线: 表名/列名只来自已校验的描述符，取值一律参数化
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::category::{is_safe_identifier, CategoryDescriptor, NATURAL_KEY_COLUMN};
use crate::domain::product::{CellValue, ProductRecord};
use crate::domain::types::ColumnDataType;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::text_query::TextQuery;
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OptionalExtension, Row};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};

/// 单条写入结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Inserted,
    Updated,
    /// 键已存在且内容一致，未改写
    Unchanged,
}

// ==========================================
// ProductTableStore Trait
// ==========================================
// 用途: 品类物理表的统一访问能力，按描述符参数化
// 实现者: CategoryTableRepository（rusqlite）
pub trait ProductTableStore: Send + Sync {
    /// 创建物理表（幂等）
    fn ensure_table(&self, desc: &CategoryDescriptor) -> RepositoryResult<()>;

    /// 按自然键查找
    fn find_by_key(
        &self,
        desc: &CategoryDescriptor,
        part_number: &str,
    ) -> RepositoryResult<Option<ProductRecord>>;

    /// 按自然键写入（插入或整行覆盖）
    fn upsert(
        &self,
        desc: &CategoryDescriptor,
        record: &ProductRecord,
        now: DateTime<Utc>,
    ) -> RepositoryResult<WriteOutcome>;

    /// 文本检索（最多 limit 条）
    fn search_text(
        &self,
        desc: &CategoryDescriptor,
        fields: &[&str],
        query: &TextQuery,
        limit: usize,
    ) -> RepositoryResult<Vec<ProductRecord>>;

    /// 文本检索命中总数
    fn count_text(
        &self,
        desc: &CategoryDescriptor,
        fields: &[&str],
        query: &TextQuery,
    ) -> RepositoryResult<usize>;
}

// ==========================================
// CategoryTableRepository
// ==========================================
pub struct CategoryTableRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CategoryTableRepository {
    /// 创建新的 CategoryTableRepository 实例
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

    fn check_identifiers(desc: &CategoryDescriptor) -> RepositoryResult<()> {
        if !is_safe_identifier(&desc.table_name) {
            return Err(RepositoryError::InvalidIdentifier(desc.table_name.clone()));
        }
        for column in &desc.columns {
            if !is_safe_identifier(&column.name) {
                return Err(RepositoryError::InvalidIdentifier(column.name.clone()));
            }
        }
        Ok(())
    }

    // ===== 查询 =====

    fn select_list(desc: &CategoryDescriptor) -> String {
        let mut cols = vec![format!("\"{}\"", NATURAL_KEY_COLUMN)];
        cols.extend(desc.basic_columns().map(|c| format!("\"{}\"", c.name)));
        cols.push("specifications".to_string());
        cols.push("created_at".to_string());
        cols.push("updated_at".to_string());
        cols.join(", ")
    }

    fn map_row(desc: &CategoryDescriptor, row: &Row<'_>) -> rusqlite::Result<ProductRecord> {
        let part_number: String = row.get(0)?;
        let mut record = ProductRecord::new(&desc.id, &part_number);

        let mut idx = 1;
        for column in desc.basic_columns() {
            let raw: Value = row.get(idx)?;
            record
                .fields
                .insert(column.name.clone(), value_to_cell(raw, column.data_type));
            idx += 1;
        }

        let specs_raw: Option<String> = row.get(idx)?;
        record.specifications = specs_raw
            .as_deref()
            .and_then(|s| serde_json::from_str::<BTreeMap<String, CellValue>>(s).ok())
            .unwrap_or_default();
        let created_at: Option<String> = row.get(idx + 1)?;
        let updated_at: Option<String> = row.get(idx + 2)?;
        record.created_at = created_at.as_deref().and_then(parse_timestamp);
        record.updated_at = updated_at.as_deref().and_then(parse_timestamp);
        Ok(record)
    }

    fn find_by_key_inner(
        conn: &Connection,
        desc: &CategoryDescriptor,
        part_number: &str,
    ) -> RepositoryResult<Option<ProductRecord>> {
        let sql = format!(
            "SELECT {} FROM \"{}\" WHERE \"{}\" = ?1",
            Self::select_list(desc),
            desc.table_name,
            NATURAL_KEY_COLUMN
        );
        let record = conn
            .query_row(&sql, [part_number], |row| Self::map_row(desc, row))
            .optional()?;
        Ok(record)
    }

    /// 按描述符规整记录: 补齐全部 basic 列（缺失为 Null），丢弃未声明字段与空规格值
    pub fn normalize(desc: &CategoryDescriptor, record: &ProductRecord) -> ProductRecord {
        let mut normalized = ProductRecord::new(&desc.id, record.part_number.trim());
        for column in desc.basic_columns() {
            let value = record
                .fields
                .get(&column.name)
                .cloned()
                .unwrap_or(CellValue::Null);
            normalized.fields.insert(column.name.clone(), value);
        }
        for column in desc.specification_columns() {
            if let Some(value) = record.specifications.get(&column.name) {
                if !value.is_null() {
                    normalized
                        .specifications
                        .insert(column.name.clone(), value.clone());
                }
            }
        }
        normalized
    }
}

impl ProductTableStore for CategoryTableRepository {
    // ===== DDL =====

    /// 创建物理表（幂等），并补齐描述符新增的 basic 列
    fn ensure_table(&self, desc: &CategoryDescriptor) -> RepositoryResult<()> {
        Self::check_identifiers(desc)?;
        let conn = self.get_conn()?;

        let mut defs = vec![format!("\"{}\" TEXT PRIMARY KEY", NATURAL_KEY_COLUMN)];
        for column in desc.basic_columns() {
            defs.push(format!("\"{}\" {}", column.name, column.data_type.sql_type()));
        }
        defs.push("\"specifications\" TEXT NOT NULL DEFAULT '{}'".to_string());
        defs.push("\"created_at\" TEXT NOT NULL".to_string());
        defs.push("\"updated_at\" TEXT NOT NULL".to_string());

        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS \"{table}\" ({defs});
             CREATE INDEX IF NOT EXISTS \"idx_{table}_updated_at\" ON \"{table}\"(updated_at);",
            table = desc.table_name,
            defs = defs.join(", ")
        ))?;

        let existing: HashSet<String> = {
            let mut stmt = conn.prepare(&format!("PRAGMA table_info(\"{}\")", desc.table_name))?;
            let names = stmt.query_map([], |row| row.get::<_, String>(1))?;
            names.collect::<Result<HashSet<_>, _>>()?
        };
        for column in desc.basic_columns() {
            if !existing.contains(&column.name) {
                tracing::info!(
                    table = %desc.table_name,
                    column = %column.name,
                    "补齐物理表新增列"
                );
                conn.execute(
                    &format!(
                        "ALTER TABLE \"{}\" ADD COLUMN \"{}\" {}",
                        desc.table_name,
                        column.name,
                        column.data_type.sql_type()
                    ),
                    [],
                )?;
            }
        }
        Ok(())
    }

    /// 按自然键查找记录
    fn find_by_key(
        &self,
        desc: &CategoryDescriptor,
        part_number: &str,
    ) -> RepositoryResult<Option<ProductRecord>> {
        Self::check_identifiers(desc)?;
        let conn = self.get_conn()?;
        Self::find_by_key_inner(&conn, desc, part_number)
    }

    /// 文本检索: 任一字段包含查询串，按匹配等级 → updated_at 降序取前 limit 条
    fn search_text(
        &self,
        desc: &CategoryDescriptor,
        fields: &[&str],
        query: &TextQuery,
        limit: usize,
    ) -> RepositoryResult<Vec<ProductRecord>> {
        Self::check_identifiers(desc)?;
        if fields.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {select} FROM \"{table}\" WHERE {filter} ORDER BY {rank}, updated_at DESC, \"{key}\" LIMIT ?4",
            select = Self::select_list(desc),
            table = desc.table_name,
            filter = TextQuery::where_clause(fields),
            rank = TextQuery::rank_expr(fields),
            key = NATURAL_KEY_COLUMN,
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            rusqlite::params![query.contains, query.exact, query.prefix, limit as i64],
            |row| Self::map_row(desc, row),
        )?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// 文本检索命中总数（不受 limit 截断）
    fn count_text(
        &self,
        desc: &CategoryDescriptor,
        fields: &[&str],
        query: &TextQuery,
    ) -> RepositoryResult<usize> {
        Self::check_identifiers(desc)?;
        if fields.is_empty() {
            return Ok(0);
        }
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT COUNT(*) FROM \"{}\" WHERE {}",
            desc.table_name,
            TextQuery::where_clause(fields)
        );
        let count: i64 = conn.query_row(&sql, [&query.contains], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// 按自然键写入一条记录（不存在则插入，存在则整行覆盖）
    ///
    /// # 说明
    /// - 内容一致时不改写，也不刷新 updated_at
    /// - 覆盖时保留 created_at
    fn upsert(
        &self,
        desc: &CategoryDescriptor,
        record: &ProductRecord,
        now: DateTime<Utc>,
    ) -> RepositoryResult<WriteOutcome> {
        Self::check_identifiers(desc)?;
        let record = Self::normalize(desc, record);
        if record.part_number.is_empty() {
            return Err(RepositoryError::InternalError(format!(
                "品类 {} 的记录缺少自然键",
                desc.id
            )));
        }

        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        let existing = Self::find_by_key_inner(&tx, desc, &record.part_number)?;
        let specs_json = serde_json::to_string(&record.specifications)?;
        let stamp = now.to_rfc3339();

        let basic: Vec<&str> = desc.basic_columns().map(|c| c.name.as_str()).collect();
        let mut values: Vec<Value> = basic
            .iter()
            .map(|name| cell_to_value(record.fields.get(*name).unwrap_or(&CellValue::Null)))
            .collect();

        let outcome = match existing {
            Some(current) if current.same_content(&record) => WriteOutcome::Unchanged,
            Some(_) => {
                let mut assignments: Vec<String> = basic
                    .iter()
                    .enumerate()
                    .map(|(i, name)| format!("\"{}\" = ?{}", name, i + 1))
                    .collect();
                let n = basic.len();
                assignments.push(format!("specifications = ?{}", n + 1));
                assignments.push(format!("updated_at = ?{}", n + 2));
                let sql = format!(
                    "UPDATE \"{}\" SET {} WHERE \"{}\" = ?{}",
                    desc.table_name,
                    assignments.join(", "),
                    NATURAL_KEY_COLUMN,
                    n + 3
                );
                values.push(Value::Text(specs_json));
                values.push(Value::Text(stamp));
                values.push(Value::Text(record.part_number.clone()));
                tx.execute(&sql, params_from_iter(values.iter()))?;
                WriteOutcome::Updated
            }
            None => {
                let mut columns = vec![format!("\"{}\"", NATURAL_KEY_COLUMN)];
                columns.extend(basic.iter().map(|name| format!("\"{}\"", name)));
                columns.push("specifications".to_string());
                columns.push("created_at".to_string());
                columns.push("updated_at".to_string());
                let placeholders: Vec<String> =
                    (1..=columns.len()).map(|i| format!("?{}", i)).collect();
                let sql = format!(
                    "INSERT INTO \"{}\" ({}) VALUES ({})",
                    desc.table_name,
                    columns.join(", "),
                    placeholders.join(", ")
                );
                let mut all = Vec::with_capacity(columns.len());
                all.push(Value::Text(record.part_number.clone()));
                all.append(&mut values);
                all.push(Value::Text(specs_json));
                all.push(Value::Text(stamp.clone()));
                all.push(Value::Text(stamp));
                tx.execute(&sql, params_from_iter(all.iter()))?;
                WriteOutcome::Inserted
            }
        };

        tx.commit()?;
        Ok(outcome)
    }
}

/// CellValue → SQLite 值
fn cell_to_value(cell: &CellValue) -> Value {
    match cell {
        CellValue::Text(s) => Value::Text(s.clone()),
        CellValue::Number(n) => Value::Real(*n),
        CellValue::Boolean(b) => Value::Integer(i64::from(*b)),
        CellValue::Null => Value::Null,
    }
}

/// SQLite 值 → CellValue（按列数据类型解释）
fn value_to_cell(raw: Value, data_type: ColumnDataType) -> CellValue {
    match (raw, data_type) {
        (Value::Null, _) => CellValue::Null,
        (Value::Integer(i), ColumnDataType::Boolean) => CellValue::Boolean(i != 0),
        (Value::Integer(i), ColumnDataType::Number) => CellValue::Number(i as f64),
        (Value::Real(r), ColumnDataType::Number) => CellValue::Number(r),
        (Value::Real(r), ColumnDataType::Boolean) => CellValue::Boolean(r != 0.0),
        (Value::Integer(i), _) => CellValue::Text(i.to_string()),
        (Value::Real(r), _) => CellValue::Text(r.to_string()),
        (Value::Text(s), _) => CellValue::Text(s),
        (Value::Blob(b), _) => CellValue::Text(String::from_utf8_lossy(&b).into_owned()),
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
