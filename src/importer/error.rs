// ==========================================
// 产品目录门户 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 说明: 整文件级错误（结构、上限、未知品类）在此表达；
//       行级失败进入 ImportReport.failed，不走错误通道
// ==========================================

use crate::i18n::t_with_args;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 输入校验错误 =====
    #[error("未知品类: {0}")]
    UnknownCategory(String),

    #[error("文件为空（缺少表头行）")]
    EmptyFile,

    #[error("表头字段数不符: 期望 {expected}，实际 {actual}")]
    HeaderMismatch { expected: usize, actual: usize },

    #[error("数据行数 {actual} 超过上限 {max}")]
    TooManyRows { actual: usize, max: usize },

    #[error("文件大小 {actual} 字节超过上限 {max} 字节")]
    FileTooLarge { actual: usize, max: usize },

    // ===== 文件相关错误 =====
    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    #[error("CSV 生成失败: {0}")]
    CsvWriteError(String),

    // ===== 配置错误 =====
    #[error("配置读取失败: {0}")]
    ConfigReadError(String),

    // ===== 存储错误 =====
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ImportError {
    /// 是否为调用方输入问题（对外映射为 ValidationError / NotFound）
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ImportError::EmptyFile
                | ImportError::HeaderMismatch { .. }
                | ImportError::TooManyRows { .. }
                | ImportError::FileTooLarge { .. }
                | ImportError::CsvParseError(_)
        )
    }

    /// 面向用户的本地化说明
    pub fn localized_message(&self) -> String {
        match self {
            ImportError::UnknownCategory(category) => {
                t_with_args("import.unknown_category", &[("category", category)])
            }
            ImportError::EmptyFile => t_with_args("import.empty_file", &[]),
            ImportError::HeaderMismatch { expected, actual } => t_with_args(
                "import.header_mismatch",
                &[
                    ("expected", &expected.to_string()),
                    ("actual", &actual.to_string()),
                ],
            ),
            ImportError::TooManyRows { actual, max } => t_with_args(
                "import.too_many_rows",
                &[("actual", &actual.to_string()), ("max", &max.to_string())],
            ),
            ImportError::FileTooLarge { actual, max } => t_with_args(
                "import.file_too_large",
                &[("actual", &actual.to_string()), ("max", &max.to_string())],
            ),
            other => other.to_string(),
        }
    }
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_classification() {
        assert!(ImportError::EmptyFile.is_validation());
        assert!(ImportError::HeaderMismatch {
            expected: 3,
            actual: 2
        }
        .is_validation());
        assert!(!ImportError::UnknownCategory("x".to_string()).is_validation());
        assert!(!ImportError::Repository(RepositoryError::LockError("x".to_string()))
            .is_validation());
    }
}
