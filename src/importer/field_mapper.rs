// ==========================================
// 产品目录门户 - 字段映射器实现
// ==========================================
// 职责: 按品类描述符逐列转换并校验一行
// 规则: 列与单元格按位置对齐（列按 sort_order）；
//       basic 列写入顶层字段，specification 列写入 specifications
// ==========================================

use crate::domain::category::CategoryDescriptor;
use crate::domain::import::{CellFailure, CsvRow, FailureReason, ValidationOutcome};
use crate::domain::product::{CellValue, ProductRecord};
use crate::domain::types::{ColumnDataType, ColumnKind};
use crate::importer::data_cleaner::DataCleaner as DataCleanerImpl;
use crate::importer::importer_trait::{DataCleaner, FieldMapper as FieldMapperTrait};

pub struct FieldMapper {
    cleaner: Box<dyn DataCleaner>,
}

impl FieldMapper {
    pub fn new(cleaner: Box<dyn DataCleaner>) -> Self {
        Self { cleaner }
    }

    /// 单元格 → 取值；失败返回原因
    fn convert(&self, data_type: ColumnDataType, raw: &str) -> Result<CellValue, FailureReason> {
        let Some(value) = self.cleaner.normalize_null(raw) else {
            return Ok(CellValue::Null);
        };
        match data_type {
            ColumnDataType::Text | ColumnDataType::ImageReference => Ok(CellValue::Text(value)),
            ColumnDataType::Number => self
                .cleaner
                .parse_number(&value)
                .map(CellValue::Number)
                .ok_or(FailureReason::NotNumeric),
            ColumnDataType::Boolean => self
                .cleaner
                .parse_boolean(&value)
                .map(CellValue::Boolean)
                .ok_or(FailureReason::NotBoolean),
        }
    }
}

impl Default for FieldMapper {
    fn default() -> Self {
        Self::new(Box::new(DataCleanerImpl))
    }
}

impl FieldMapperTrait for FieldMapper {
    fn map_row(&self, desc: &CategoryDescriptor, row: &CsvRow) -> ValidationOutcome {
        if row.cells.len() != desc.columns.len() {
            return ValidationOutcome::Invalid {
                row: row.row_number,
                failures: vec![CellFailure {
                    column: None,
                    raw_value: Some(row.cells.len().to_string()),
                    reason: FailureReason::WrongFieldCount,
                }],
            };
        }

        let mut part_number: Option<String> = None;
        let mut record = ProductRecord::new(&desc.id, "");
        let mut failures = Vec::new();

        for (column, raw) in desc.columns.iter().zip(row.cells.iter()) {
            if column.is_natural_key() {
                match self.cleaner.normalize_null(raw) {
                    Some(key) => part_number = Some(key),
                    None => failures.push(CellFailure {
                        column: Some(column.name.clone()),
                        raw_value: Some(raw.clone()),
                        reason: FailureReason::MissingNaturalKey,
                    }),
                }
                continue;
            }

            match self.convert(column.data_type, raw) {
                Ok(value) => match column.kind {
                    ColumnKind::Basic => {
                        record.fields.insert(column.name.clone(), value);
                    }
                    ColumnKind::Specification => {
                        if !value.is_null() {
                            record.specifications.insert(column.name.clone(), value);
                        }
                    }
                },
                Err(reason) => failures.push(CellFailure {
                    column: Some(column.name.clone()),
                    raw_value: Some(raw.trim().to_string()),
                    reason,
                }),
            }
        }

        match part_number {
            Some(key) if failures.is_empty() => {
                record.part_number = key;
                ValidationOutcome::Valid {
                    row: row.row_number,
                    record,
                }
            }
            _ => ValidationOutcome::Invalid {
                row: row.row_number,
                failures,
            },
        }
    }
}
