// ==========================================
// 产品目录门户 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::portal_config_trait::{
    defaults, ImportLimits, PortalConfigReader, PortalSettings, SearchSettings,
};
use crate::db::open_sqlite_connection;
use async_trait::async_trait;
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::BTreeMap;
use std::error::Error;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

type ConfigResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

/// 全局作用域标识
const GLOBAL_SCOPE: &str = "global";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> ConfigResult<Self> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ConfigResult<Self> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
            params![GLOBAL_SCOPE, key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取并解析数值配置；缺失取默认值，无法解析时告警并取默认值
    fn get_parsed_or_default<T>(&self, key: &str, default: T) -> ConfigResult<T>
    where
        T: FromStr + Copy,
    {
        match self.get_config_value(key)? {
            None => Ok(default),
            Some(raw) => match raw.trim().parse::<T>() {
                Ok(v) => Ok(v),
                Err(_) => {
                    tracing::warn!(
                        config_key = key,
                        raw_value = %raw,
                        "配置值格式错误，使用默认值"
                    );
                    Ok(default)
                }
            },
        }
    }

    /// 写入（覆写）global 配置
    pub fn update_config(&self, key: &str, value: &str) -> ConfigResult<()> {
        let key = key.trim();
        if key.is_empty() {
            return Err("配置键不能为空".into());
        }
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at) VALUES (?1, ?2, ?3, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![GLOBAL_SCOPE, key, value],
        )?;
        tracing::info!(config_key = key, value = value, "配置已更新");
        Ok(())
    }

    /// 获取所有配置的快照（JSON格式，按键排序）
    pub fn get_config_snapshot(&self) -> ConfigResult<String> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = ?1 ORDER BY key")?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        let rows = stmt.query_map(params![GLOBAL_SCOPE], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }

    /// 一次性读取全部门户配置
    pub fn load_settings(&self) -> ConfigResult<PortalSettings> {
        let settings = PortalSettings {
            refresh_interval_secs: self.get_parsed_or_default(
                config_keys::REGISTRY_REFRESH_INTERVAL_SECS,
                defaults::REFRESH_INTERVAL_SECS,
            )?,
            probe_concurrency: self
                .get_parsed_or_default(
                    config_keys::RESOLVER_PROBE_CONCURRENCY,
                    defaults::PROBE_CONCURRENCY,
                )?
                .max(1),
            search: self.read_search_settings()?,
            import: self.read_import_limits()?,
        };
        Ok(settings)
    }

    fn read_search_settings(&self) -> ConfigResult<SearchSettings> {
        let max_limit = self
            .get_parsed_or_default(config_keys::SEARCH_MAX_LIMIT, defaults::SEARCH_MAX_LIMIT)?
            .max(1);
        let default_limit = self
            .get_parsed_or_default(
                config_keys::SEARCH_DEFAULT_LIMIT,
                defaults::SEARCH_DEFAULT_LIMIT,
            )?
            .clamp(1, max_limit);
        Ok(SearchSettings {
            timeout_ms: self
                .get_parsed_or_default(config_keys::SEARCH_TIMEOUT_MS, defaults::SEARCH_TIMEOUT_MS)?,
            default_limit,
            max_limit,
            text_fields_per_category: self.get_parsed_or_default(
                config_keys::SEARCH_TEXT_FIELDS_PER_CATEGORY,
                defaults::TEXT_FIELDS_PER_CATEGORY,
            )?,
            snippet_max_chars: self.get_parsed_or_default(
                config_keys::SEARCH_SNIPPET_MAX_CHARS,
                defaults::SNIPPET_MAX_CHARS,
            )?,
        })
    }

    fn read_import_limits(&self) -> ConfigResult<ImportLimits> {
        Ok(ImportLimits {
            max_rows: self
                .get_parsed_or_default(config_keys::IMPORT_MAX_ROWS, defaults::IMPORT_MAX_ROWS)?,
            max_file_bytes: self.get_parsed_or_default(
                config_keys::IMPORT_MAX_FILE_BYTES,
                defaults::IMPORT_MAX_FILE_BYTES,
            )?,
        })
    }
}

// ==========================================
// PortalConfigReader Trait 实现
// ==========================================
#[async_trait]
impl PortalConfigReader for ConfigManager {
    async fn get_import_limits(&self) -> ConfigResult<ImportLimits> {
        self.read_import_limits()
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 元数据缓存
    pub const REGISTRY_REFRESH_INTERVAL_SECS: &str = "registry.refresh_interval_secs";

    // 统一检索
    pub const SEARCH_TIMEOUT_MS: &str = "search.timeout_ms";
    pub const SEARCH_DEFAULT_LIMIT: &str = "search.default_limit";
    pub const SEARCH_MAX_LIMIT: &str = "search.max_limit";
    pub const SEARCH_TEXT_FIELDS_PER_CATEGORY: &str = "search.text_fields_per_category";
    pub const SEARCH_SNIPPET_MAX_CHARS: &str = "search.snippet_max_chars";

    // 跨品类解析
    pub const RESOLVER_PROBE_CONCURRENCY: &str = "resolver.probe_concurrency";

    // 导入上限
    pub const IMPORT_MAX_ROWS: &str = "import.max_rows";
    pub const IMPORT_MAX_FILE_BYTES: &str = "import.max_file_bytes";
}
