// ==========================================
// 产品目录门户 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为（外键 / busy_timeout）
// - 注册检索用的 Unicode 大小写折叠函数（内置 lower()/LIKE 只折叠 ASCII）
// - 统一核心表结构（元数据 / 内容集合 / 键索引 / 导入批次 / 配置）
// 说明: 品类物理表由 CategoryTableRepository 按描述符创建
// ==========================================

use rusqlite::functions::FunctionFlags;
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 大小写折叠函数名（与 str::to_lowercase 一致）
pub const FOLD_CASE_FN: &str = "fold_case";

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
/// - 自定义函数同样按连接注册
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    register_text_functions(conn)?;
    Ok(())
}

/// 注册 fold_case(x): 文本按 Unicode 规则转小写，NULL 保持 NULL
pub fn register_text_functions(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        FOLD_CASE_FN,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            Ok(match ctx.get_raw(0) {
                ValueRef::Null => None,
                ValueRef::Integer(i) => Some(i.to_string()),
                ValueRef::Real(f) => Some(f.to_string()),
                ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
                    Some(String::from_utf8_lossy(bytes).to_lowercase())
                }
            })
        },
    )
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 创建核心表（幂等）并登记 schema_version
pub fn ensure_core_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS catalog_category (
            category_id TEXT PRIMARY KEY,
            display_name TEXT NOT NULL,
            table_name TEXT NOT NULL UNIQUE,
            sort_order INTEGER NOT NULL DEFAULT 0,
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS catalog_column (
            category_id TEXT NOT NULL REFERENCES catalog_category(category_id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            label TEXT NOT NULL,
            kind TEXT NOT NULL,
            data_type TEXT NOT NULL,
            unit TEXT,
            sort_order INTEGER NOT NULL DEFAULT 0,
            visible INTEGER NOT NULL DEFAULT 1,
            sortable INTEGER NOT NULL DEFAULT 1,
            format_prefix TEXT,
            format_suffix TEXT,
            decimal_places INTEGER,
            PRIMARY KEY (category_id, name)
        );

        CREATE TABLE IF NOT EXISTS catalog_filter (
            category_id TEXT NOT NULL REFERENCES catalog_category(category_id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            label TEXT NOT NULL,
            filter_type TEXT NOT NULL,
            unit TEXT,
            sort_order INTEGER NOT NULL DEFAULT 0,
            default_expanded INTEGER NOT NULL DEFAULT 0,
            active INTEGER NOT NULL DEFAULT 1,
            options_json TEXT,
            range_min REAL,
            range_max REAL,
            range_step REAL,
            PRIMARY KEY (category_id, name)
        );

        CREATE TABLE IF NOT EXISTS article (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            slug TEXT NOT NULL,
            excerpt TEXT,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS download_file (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            filename TEXT NOT NULL,
            collection TEXT,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS product_key_index (
            part_number TEXT NOT NULL,
            category_id TEXT NOT NULL,
            written_at TEXT NOT NULL,
            write_seq INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (part_number, category_id)
        );

        CREATE TABLE IF NOT EXISTS import_batch (
            batch_id TEXT PRIMARY KEY,
            category_id TEXT NOT NULL,
            total_rows INTEGER NOT NULL,
            inserted INTEGER NOT NULL,
            updated INTEGER NOT NULL,
            unchanged INTEGER NOT NULL,
            failed INTEGER NOT NULL,
            elapsed_ms INTEGER NOT NULL,
            failures_json TEXT NOT NULL,
            imported_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_import_batch_imported_at ON import_batch(imported_at);
        CREATE INDEX IF NOT EXISTS idx_article_updated_at ON article(updated_at);
        CREATE INDEX IF NOT EXISTS idx_download_file_updated_at ON download_file(updated_at);
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}
