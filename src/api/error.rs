// ==========================================
// 产品目录门户 - API层错误类型
// ==========================================
// 职责: 定义面向调用方的错误分类，转换各层错误并附稳定错误码
// 分类: 输入校验 / 未找到 / 存储故障 / 内部错误
// ==========================================

use crate::engine::search_aggregator::SearchError;
use crate::i18n::t;
use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 调用方错误
    // ==========================================
    #[error("数据验证失败: {0}")]
    ValidationError(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// 调用方输入问题（非服务端故障）
    pub fn is_client_error(&self) -> bool {
        matches!(self, ApiError::ValidationError(_) | ApiError::NotFound(_))
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),

            // 元数据/标识符问题: 服务端配置错误
            err @ (RepositoryError::TableMissing(_)
            | RepositoryError::ColumnDrift(_)
            | RepositoryError::InvalidIdentifier(_)
            | RepositoryError::MetadataValueError { .. }
            | RepositoryError::SerializationError(_)) => ApiError::InternalError(err.to_string()),
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从 ImportError 转换
// ==========================================
impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        if err.is_validation() {
            return ApiError::ValidationError(err.localized_message());
        }
        match err {
            ImportError::UnknownCategory(_) => ApiError::NotFound(err.localized_message()),
            ImportError::Repository(e) => e.into(),
            ImportError::Other(e) => ApiError::Other(e),
            other => ApiError::InternalError(other.to_string()),
        }
    }
}

// ==========================================
// 从 SearchError 转换
// ==========================================
impl From<SearchError> for ApiError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::EmptyQuery => ApiError::ValidationError(t("search.empty_query")),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

// ==========================================
// 错误响应（传输层 JSON 信封）
// ==========================================

/// 稳定错误码
pub fn error_code(err: &ApiError) -> &'static str {
    match err {
        ApiError::ValidationError(_) => "VALIDATION_ERROR",
        ApiError::NotFound(_) => "NOT_FOUND",
        ApiError::DatabaseError(_) => "DATABASE_ERROR",
        ApiError::DatabaseConnectionError(_) => "DATABASE_CONNECTION_ERROR",
        ApiError::InternalError(_) => "INTERNAL_ERROR",
        ApiError::Other(_) => "OTHER_ERROR",
    }
}

/// 错误响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// 错误代码
    pub code: String,

    /// 错误消息
    pub message: String,

    /// 详细信息（可选）
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn from_error(err: &ApiError) -> Self {
        Self {
            code: error_code(err).to_string(),
            message: err.to_string(),
            details: None,
        }
    }
}

/// 将 ApiError 转换为 JSON 字符串
pub fn map_api_error(err: ApiError) -> String {
    let response = ErrorResponse::from_error(&err);
    serde_json::to_string(&response).unwrap_or_else(|_| err.to_string())
}
