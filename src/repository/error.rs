// ==========================================
// 产品目录门户 - 仓储层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 说明: 品类物理表由元数据驱动，表缺失/列漂移单独归类，
//       便于上层区分“元数据与物理表不一致”和一般 SQL 失败
// ==========================================

use thiserror::Error;

/// 仓储层错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("记录未找到: {entity} with id={id}")]
    NotFound { entity: String, id: String },

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库锁获取失败: {0}")]
    LockError(String),

    #[error("数据库查询失败: {0}")]
    DatabaseQueryError(String),

    // ===== 元数据与物理表不一致 =====
    #[error("品类物理表不存在: {0}")]
    TableMissing(String),

    #[error("物理表列与元数据不一致: {0}")]
    ColumnDrift(String),

    #[error("非法标识符（不可用于 SQL）: {0}")]
    InvalidIdentifier(String),

    #[error("元数据取值错误 (category={category}, field={field}): {message}")]
    MetadataValueError {
        category: String,
        field: String,
        message: String,
    },

    #[error("序列化失败: {0}")]
    SerializationError(String),

    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RepositoryError {
    /// 元数据与物理表不一致（补建表/刷新元数据可恢复）
    pub fn is_schema_mismatch(&self) -> bool {
        matches!(
            self,
            RepositoryError::TableMissing(_) | RepositoryError::ColumnDrift(_)
        )
    }
}

impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(_, Some(msg)) => classify_sqlite_message(msg),
            rusqlite::Error::QueryReturnedNoRows => RepositoryError::NotFound {
                entity: "row".to_string(),
                id: "-".to_string(),
            },
            rusqlite::Error::FromSqlConversionFailure(_, _, e) => {
                RepositoryError::SerializationError(e.to_string())
            }
            _ => RepositoryError::DatabaseQueryError(err.to_string()),
        }
    }
}

// SQLite 只给出文本消息，按前缀归类
fn classify_sqlite_message(msg: String) -> RepositoryError {
    if let Some(table) = msg.strip_prefix("no such table: ") {
        RepositoryError::TableMissing(table.to_string())
    } else if msg.starts_with("no such column") || msg.contains("has no column named") {
        RepositoryError::ColumnDrift(msg)
    } else {
        RepositoryError::DatabaseQueryError(msg)
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::SerializationError(err.to_string())
    }
}

/// Result 类型别名
pub type RepositoryResult<T> = Result<T, RepositoryError>;
