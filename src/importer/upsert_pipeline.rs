// ==========================================
// 产品目录门户 - 品类 Upsert 管道
// ==========================================
// 职责: 校验结果 → 品类物理表（按自然键插入或整行覆盖）
// 规则: 行按文件顺序逐条写入，单行写入失败不影响其他行
// 索引: 每次实际写入都刷新自然键索引
// ==========================================

use crate::domain::category::CategoryDescriptor;
use crate::domain::import::{CellFailure, FailureReason, ImportReport, RowFailure, ValidationOutcome};
use crate::engine::key_index::KeyIndex;
use crate::i18n::t_with_args;
use crate::repository::category_table_repo::{ProductTableStore, WriteOutcome};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// 失败条目的本地化说明
fn failure_message(desc: &CategoryDescriptor, failure: &CellFailure) -> String {
    let key = format!("import.reason.{}", failure.reason.code());
    let column = failure.column.as_deref().unwrap_or("");
    let raw = failure.raw_value.as_deref().unwrap_or("");
    match failure.reason {
        FailureReason::NotNumeric | FailureReason::NotBoolean => {
            t_with_args(&key, &[("column", column), ("value", raw)])
        }
        FailureReason::MissingNaturalKey => t_with_args(&key, &[("column", column)]),
        FailureReason::WrongFieldCount => t_with_args(
            &key,
            &[("expected", &desc.columns.len().to_string()), ("actual", raw)],
        ),
        FailureReason::MalformedRow | FailureReason::WriteFailed => {
            t_with_args(&key, &[("detail", raw)])
        }
    }
}

// ==========================================
// UpsertPipeline
// ==========================================
pub struct UpsertPipeline {
    store: Arc<dyn ProductTableStore>,
    key_index: Arc<KeyIndex>,
}

impl UpsertPipeline {
    pub fn new(store: Arc<dyn ProductTableStore>, key_index: Arc<KeyIndex>) -> Self {
        Self { store, key_index }
    }

    /// 应用一个文件的校验结果
    ///
    /// # 返回
    /// - ImportReport: updated 含 unchanged；failed 含解析失败与写入失败
    #[instrument(skip(self, desc, outcomes), fields(category = %desc.id))]
    pub fn apply(&self, desc: &CategoryDescriptor, outcomes: Vec<ValidationOutcome>) -> ImportReport {
        let mut report = ImportReport::new(&desc.id);
        report.total_rows = outcomes.len();
        let mut seen_keys: HashMap<String, usize> = HashMap::new();

        for outcome in outcomes {
            match outcome {
                ValidationOutcome::Invalid { row, failures } => {
                    for failure in failures {
                        warn!(
                            row,
                            column = ?failure.column,
                            reason = %failure.reason,
                            "行校验失败"
                        );
                        report.failed.push(RowFailure {
                            row,
                            message: failure_message(desc, &failure),
                            column: failure.column,
                            raw_value: failure.raw_value,
                            reason: failure.reason,
                        });
                    }
                }
                ValidationOutcome::Valid { row, record } => {
                    if let Some(first_row) = seen_keys.insert(record.part_number.clone(), row) {
                        warn!(
                            key = %record.part_number,
                            first_row,
                            row,
                            "文件内自然键重复，后一行覆盖前一行"
                        );
                    }

                    match self.store.upsert(desc, &record, Utc::now()) {
                        Ok(WriteOutcome::Inserted) => {
                            report.inserted += 1;
                            self.key_index.record_write(&record.part_number, &desc.id);
                        }
                        Ok(WriteOutcome::Updated) => {
                            report.updated += 1;
                            self.key_index.record_write(&record.part_number, &desc.id);
                        }
                        Ok(WriteOutcome::Unchanged) => {
                            report.updated += 1;
                            report.unchanged += 1;
                            self.key_index.ensure_present(&record.part_number, &desc.id);
                        }
                        Err(e) => {
                            error!(key = %record.part_number, row, error = %e, "行写入失败");
                            let failure = CellFailure {
                                column: None,
                                raw_value: Some(e.to_string()),
                                reason: FailureReason::WriteFailed,
                            };
                            report.failed.push(RowFailure {
                                row,
                                message: failure_message(desc, &failure),
                                column: None,
                                raw_value: Some(record.part_number.clone()),
                                reason: FailureReason::WriteFailed,
                            });
                        }
                    }
                }
            }
        }

        info!(
            total_rows = report.total_rows,
            inserted = report.inserted,
            updated = report.updated,
            unchanged = report.unchanged,
            failed = report.failed_rows(),
            "品类导入写入完成"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::category::ColumnDescriptor;
    use crate::domain::product::{CellValue, ProductRecord};
    use crate::domain::types::ColumnDataType;
    use crate::repository::category_table_repo::CategoryTableRepository;
    use crate::repository::text_query::TextQuery;
    use crate::repository::{RepositoryError, RepositoryResult};
    use chrono::DateTime;
    use rusqlite::Connection;
    use std::sync::Mutex;

    fn cable() -> CategoryDescriptor {
        CategoryDescriptor::new(
            "cable",
            "Cables",
            "cable_products",
            vec![
                ColumnDescriptor::basic("part_number", "Part Number", ColumnDataType::Text, 1),
                ColumnDescriptor::basic("length_mm", "Length", ColumnDataType::Number, 2),
            ],
            vec![],
        )
    }

    fn valid(row: usize, key: &str, length: f64) -> ValidationOutcome {
        let mut record = ProductRecord::new("cable", key);
        record
            .fields
            .insert("length_mm".to_string(), CellValue::Number(length));
        ValidationOutcome::Valid { row, record }
    }

    fn pipeline() -> (UpsertPipeline, Arc<KeyIndex>) {
        let store = CategoryTableRepository::from_connection(Arc::new(Mutex::new(
            Connection::open_in_memory().unwrap(),
        )));
        store.ensure_table(&cable()).unwrap();
        let index = Arc::new(KeyIndex::in_memory());
        (UpsertPipeline::new(Arc::new(store), index.clone()), index)
    }

    #[test]
    fn test_apply_classifies_and_indexes() {
        let (pipeline, index) = pipeline();
        let desc = cable();

        let first = pipeline.apply(&desc, vec![valid(1, "CBL-001", 500.0), valid(2, "CBL-002", 750.0)]);
        assert_eq!((first.inserted, first.updated), (2, 0));
        assert_eq!(index.lookup("CBL-001").unwrap().owner, "cable");

        let second = pipeline.apply(&desc, vec![valid(1, "CBL-001", 500.0), valid(2, "CBL-002", 800.0)]);
        assert_eq!(second.inserted, 0);
        assert_eq!(second.updated, 2);
        assert_eq!(second.unchanged, 1);
        assert!(second.failed.is_empty());
    }

    #[test]
    fn test_invalid_rows_echoed_with_message() {
        let (pipeline, _) = pipeline();
        let outcome = ValidationOutcome::Invalid {
            row: 3,
            failures: vec![CellFailure {
                column: Some("length_mm".to_string()),
                raw_value: Some("abc".to_string()),
                reason: FailureReason::NotNumeric,
            }],
        };
        let report = pipeline.apply(&cable(), vec![valid(1, "CBL-001", 1.0), outcome]);
        assert_eq!(report.inserted, 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].row, 3);
        assert!(report.failed[0].message.contains("abc"));
    }

    struct BrokenStore;

    impl ProductTableStore for BrokenStore {
        fn ensure_table(&self, _desc: &CategoryDescriptor) -> RepositoryResult<()> {
            Ok(())
        }

        fn find_by_key(
            &self,
            _desc: &CategoryDescriptor,
            _part_number: &str,
        ) -> RepositoryResult<Option<ProductRecord>> {
            Ok(None)
        }

        fn upsert(
            &self,
            _desc: &CategoryDescriptor,
            record: &ProductRecord,
            _now: DateTime<Utc>,
        ) -> RepositoryResult<WriteOutcome> {
            if record.part_number == "CBL-BAD" {
                Err(RepositoryError::DatabaseQueryError("disk I/O error".to_string()))
            } else {
                Ok(WriteOutcome::Inserted)
            }
        }

        fn search_text(
            &self,
            _desc: &CategoryDescriptor,
            _fields: &[&str],
            _query: &TextQuery,
            _limit: usize,
        ) -> RepositoryResult<Vec<ProductRecord>> {
            Ok(Vec::new())
        }

        fn count_text(
            &self,
            _desc: &CategoryDescriptor,
            _fields: &[&str],
            _query: &TextQuery,
        ) -> RepositoryResult<usize> {
            Ok(0)
        }
    }

    #[test]
    fn test_write_failure_does_not_abort_batch() {
        let index = Arc::new(KeyIndex::in_memory());
        let pipeline = UpsertPipeline::new(Arc::new(BrokenStore), index.clone());
        let report = pipeline.apply(
            &cable(),
            vec![valid(1, "CBL-BAD", 1.0), valid(2, "CBL-OK", 2.0)],
        );
        assert_eq!(report.inserted, 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].reason, FailureReason::WriteFailed);
        assert_eq!(report.failed[0].raw_value.as_deref(), Some("CBL-BAD"));
        assert!(index.lookup("CBL-BAD").is_none());
        assert!(index.lookup("CBL-OK").is_some());
    }
}
