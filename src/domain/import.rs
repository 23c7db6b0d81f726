// ==========================================
// 产品目录门户 - 导入领域模型
// ==========================================
// 用途: CSV 模板解析产物、Upsert 结果、导入批次记录
// 行号口径: 数据行从 1 开始计数（表头不计）
// ==========================================

use crate::domain::product::ProductRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// CsvRow - 原始行
// ==========================================
// 与品类列顺序按位置对齐的原始单元格
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsvRow {
    pub row_number: usize,
    pub cells: Vec<String>,
}

// ==========================================
// FailureReason - 行失败原因
// ==========================================
// 序列化值为稳定的机器可读文本（与语言无关）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureReason {
    #[serde(rename = "not numeric")]
    NotNumeric,
    #[serde(rename = "not boolean")]
    NotBoolean,
    #[serde(rename = "missing natural key")]
    MissingNaturalKey,
    #[serde(rename = "wrong field count")]
    WrongFieldCount,
    #[serde(rename = "malformed row")]
    MalformedRow,
    #[serde(rename = "write failed")]
    WriteFailed,
}

impl FailureReason {
    /// i18n 消息键后缀
    pub fn code(&self) -> &'static str {
        match self {
            FailureReason::NotNumeric => "not_numeric",
            FailureReason::NotBoolean => "not_boolean",
            FailureReason::MissingNaturalKey => "missing_natural_key",
            FailureReason::WrongFieldCount => "wrong_field_count",
            FailureReason::MalformedRow => "malformed_row",
            FailureReason::WriteFailed => "write_failed",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            FailureReason::NotNumeric => "not numeric",
            FailureReason::NotBoolean => "not boolean",
            FailureReason::MissingNaturalKey => "missing natural key",
            FailureReason::WrongFieldCount => "wrong field count",
            FailureReason::MalformedRow => "malformed row",
            FailureReason::WriteFailed => "write failed",
        };
        write!(f, "{}", text)
    }
}

// ==========================================
// CellFailure - 单元格校验失败
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellFailure {
    pub column: Option<String>, // 行级失败（如字段数不符）时为空
    pub raw_value: Option<String>,
    pub reason: FailureReason,
}

// ==========================================
// ValidationOutcome - 单行校验结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ValidationOutcome {
    Valid {
        row: usize,
        record: ProductRecord,
    },
    Invalid {
        row: usize,
        failures: Vec<CellFailure>, // 非空
    },
}

impl ValidationOutcome {
    pub fn row(&self) -> usize {
        match self {
            ValidationOutcome::Valid { row, .. } | ValidationOutcome::Invalid { row, .. } => *row,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationOutcome::Valid { .. })
    }
}

// ==========================================
// RowFailure - 导入报告中的失败条目
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowFailure {
    pub row: usize,
    pub column: Option<String>,
    pub raw_value: Option<String>,
    pub reason: FailureReason,
    pub message: String, // 本地化说明
}

// ==========================================
// ImportReport - Upsert 结果（部分失败不视为整体失败）
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportReport {
    pub category: String,
    pub total_rows: usize,
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize, // updated 的子集：内容完全一致，未改写
    pub failed: Vec<RowFailure>,
}

impl ImportReport {
    pub fn new(category: &str) -> Self {
        Self {
            category: category.to_string(),
            ..Default::default()
        }
    }

    /// 失败涉及的行数（同一行多个单元格失败只计一次）
    pub fn failed_rows(&self) -> usize {
        self.failed
            .iter()
            .map(|f| f.row)
            .collect::<std::collections::BTreeSet<_>>()
            .len()
    }
}

// ==========================================
// ImportBatch - 导入批次
// ==========================================
// 对齐: import_batch 表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportBatch {
    pub batch_id: String, // UUID
    pub category: String,
    pub total_rows: i64,
    pub inserted: i64,
    pub updated: i64,
    pub unchanged: i64,
    pub failed: i64,
    pub elapsed_ms: i64,
    pub failures_json: String,
    pub imported_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_reason_serializes_as_text() {
        let json = serde_json::to_string(&FailureReason::NotNumeric).unwrap();
        assert_eq!(json, "\"not numeric\"");
        assert_eq!(FailureReason::NotNumeric.to_string(), "not numeric");
    }

    #[test]
    fn test_failed_rows_counts_distinct_rows() {
        let mut report = ImportReport::new("cable");
        for (row, column) in [(2, "a"), (2, "b"), (4, "a")] {
            report.failed.push(RowFailure {
                row,
                column: Some(column.to_string()),
                raw_value: None,
                reason: FailureReason::NotNumeric,
                message: String::new(),
            });
        }
        assert_eq!(report.failed_rows(), 2);
    }
}
