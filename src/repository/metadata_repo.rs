// ==========================================
// 产品目录门户 - 元数据仓储
// ==========================================
// 职责: 读取 catalog_category / catalog_column / catalog_filter
// 红线: 核心层只读；写入仅供管理端与种子工具
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::category::{
    CategoryDescriptor, ColumnDescriptor, FilterDescriptor, FilterDomain, FilterOption,
    FormatOptions,
};
use crate::domain::types::{ColumnDataType, ColumnKind, FilterType};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// MetadataSource Trait
// ==========================================
// 用途: Schema Registry 的加载来源
// 返回: 外层错误 = 元数据存储不可达；内层错误 = 单个品类的元数据行非法
pub trait MetadataSource: Send + Sync {
    fn load_descriptors(&self) -> RepositoryResult<Vec<RepositoryResult<CategoryDescriptor>>>;
}

// ==========================================
// MetadataRepository
// ==========================================
pub struct MetadataRepository {
    conn: Arc<Mutex<Connection>>,
}

/// 列元数据原始行
struct ColumnRow {
    name: String,
    label: String,
    kind: String,
    data_type: String,
    unit: Option<String>,
    sort_order: i32,
    visible: bool,
    sortable: bool,
    prefix: Option<String>,
    suffix: Option<String>,
    decimal_places: Option<i64>,
}

/// 筛选器元数据原始行
struct FilterRow {
    name: String,
    label: String,
    filter_type: String,
    unit: Option<String>,
    sort_order: i32,
    default_expanded: bool,
    active: bool,
    options_json: Option<String>,
    range_min: Option<f64>,
    range_max: Option<f64>,
    range_step: Option<f64>,
}

impl MetadataRepository {
    /// 创建新的 MetadataRepository 实例
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

    /// 写入（覆盖）一个品类的完整元数据
    ///
    /// # 说明
    /// - 列与筛选器先删后插，保证与描述符完全一致
    /// - 违反描述符不变量时拒绝写入
    pub fn upsert_category(
        &self,
        descriptor: &CategoryDescriptor,
        sort_order: i32,
    ) -> RepositoryResult<()> {
        descriptor
            .validate()
            .map_err(|e| RepositoryError::MetadataValueError {
                category: descriptor.id.clone(),
                field: "descriptor".to_string(),
                message: e.to_string(),
            })?;
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        tx.execute(
            r#"
            INSERT INTO catalog_category (category_id, display_name, table_name, sort_order, updated_at)
            VALUES (?1, ?2, ?3, ?4, datetime('now'))
            ON CONFLICT(category_id) DO UPDATE SET
                display_name = excluded.display_name,
                table_name = excluded.table_name,
                sort_order = excluded.sort_order,
                updated_at = excluded.updated_at
            "#,
            params![
                descriptor.id,
                descriptor.display_name,
                descriptor.table_name,
                sort_order
            ],
        )?;

        tx.execute(
            "DELETE FROM catalog_column WHERE category_id = ?1",
            params![descriptor.id],
        )?;
        tx.execute(
            "DELETE FROM catalog_filter WHERE category_id = ?1",
            params![descriptor.id],
        )?;

        for column in &descriptor.columns {
            tx.execute(
                r#"
                INSERT INTO catalog_column (
                    category_id, name, label, kind, data_type, unit, sort_order,
                    visible, sortable, format_prefix, format_suffix, decimal_places
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                "#,
                params![
                    descriptor.id,
                    column.name,
                    column.label,
                    column.kind.as_str(),
                    column.data_type.as_str(),
                    column.unit,
                    column.sort_order,
                    column.visible as i32,
                    column.sortable as i32,
                    column.format.prefix,
                    column.format.suffix,
                    column.format.decimal_places.map(|d| d as i64),
                ],
            )?;
        }

        for filter in &descriptor.filters {
            let (options_json, min, max, step) = match &filter.domain {
                FilterDomain::CheckboxSet { options } => {
                    (Some(serde_json::to_string(options)?), None, None, None)
                }
                FilterDomain::NumericRange { min, max, step } => {
                    (None, Some(*min), Some(*max), Some(*step))
                }
            };
            tx.execute(
                r#"
                INSERT INTO catalog_filter (
                    category_id, name, label, filter_type, unit, sort_order,
                    default_expanded, active, options_json, range_min, range_max, range_step
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                "#,
                params![
                    descriptor.id,
                    filter.name,
                    filter.label,
                    filter.filter_type().as_str(),
                    filter.unit,
                    filter.sort_order,
                    filter.default_expanded as i32,
                    filter.active as i32,
                    options_json,
                    min,
                    max,
                    step,
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn load_columns(conn: &Connection, category_id: &str) -> RepositoryResult<Vec<ColumnRow>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT name, label, kind, data_type, unit, sort_order, visible, sortable,
                   format_prefix, format_suffix, decimal_places
            FROM catalog_column
            WHERE category_id = ?1
            ORDER BY sort_order, name
            "#,
        )?;
        let rows = stmt.query_map(params![category_id], |row| {
            Ok(ColumnRow {
                name: row.get(0)?,
                label: row.get(1)?,
                kind: row.get(2)?,
                data_type: row.get(3)?,
                unit: row.get(4)?,
                sort_order: row.get(5)?,
                visible: row.get::<_, i64>(6)? != 0,
                sortable: row.get::<_, i64>(7)? != 0,
                prefix: row.get(8)?,
                suffix: row.get(9)?,
                decimal_places: row.get(10)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn load_filters(conn: &Connection, category_id: &str) -> RepositoryResult<Vec<FilterRow>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT name, label, filter_type, unit, sort_order, default_expanded, active,
                   options_json, range_min, range_max, range_step
            FROM catalog_filter
            WHERE category_id = ?1
            ORDER BY sort_order, name
            "#,
        )?;
        let rows = stmt.query_map(params![category_id], |row| {
            Ok(FilterRow {
                name: row.get(0)?,
                label: row.get(1)?,
                filter_type: row.get(2)?,
                unit: row.get(3)?,
                sort_order: row.get(4)?,
                default_expanded: row.get::<_, i64>(5)? != 0,
                active: row.get::<_, i64>(6)? != 0,
                options_json: row.get(7)?,
                range_min: row.get(8)?,
                range_max: row.get(9)?,
                range_step: row.get(10)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// 原始行 → 描述符（类型判别字段非法时返回 MetadataValueError）
    fn assemble(
        category_id: &str,
        display_name: &str,
        table_name: &str,
        columns: Vec<ColumnRow>,
        filters: Vec<FilterRow>,
    ) -> RepositoryResult<CategoryDescriptor> {
        let value_error = |field: &str, message: String| RepositoryError::MetadataValueError {
            category: category_id.to_string(),
            field: field.to_string(),
            message,
        };

        let mut column_descriptors = Vec::with_capacity(columns.len());
        for row in columns {
            let kind = ColumnKind::from_db_str(&row.kind)
                .ok_or_else(|| value_error(&row.name, format!("未知列类别: {}", row.kind)))?;
            let data_type = ColumnDataType::from_db_str(&row.data_type).ok_or_else(|| {
                value_error(&row.name, format!("未知数据类型: {}", row.data_type))
            })?;
            let decimal_places = match row.decimal_places {
                Some(d) if (0..=12).contains(&d) => Some(d as u8),
                Some(d) => return Err(value_error(&row.name, format!("小数位非法: {}", d))),
                None => None,
            };
            column_descriptors.push(ColumnDescriptor {
                name: row.name,
                label: row.label,
                kind,
                data_type,
                unit: row.unit,
                sort_order: row.sort_order,
                visible: row.visible,
                sortable: row.sortable,
                format: FormatOptions {
                    prefix: row.prefix,
                    suffix: row.suffix,
                    decimal_places,
                },
            });
        }

        let mut filter_descriptors = Vec::with_capacity(filters.len());
        for row in filters {
            let filter_type = FilterType::from_db_str(&row.filter_type).ok_or_else(|| {
                value_error(&row.name, format!("未知筛选器类型: {}", row.filter_type))
            })?;
            let domain = match filter_type {
                FilterType::CheckboxSet => {
                    let options: Vec<FilterOption> = match row.options_json.as_deref() {
                        Some(raw) if !raw.trim().is_empty() => serde_json::from_str(raw)
                            .map_err(|e| value_error(&row.name, format!("选项 JSON 非法: {}", e)))?,
                        _ => Vec::new(),
                    };
                    FilterDomain::CheckboxSet { options }
                }
                FilterType::NumericRange => match (row.range_min, row.range_max) {
                    (Some(min), Some(max)) => FilterDomain::NumericRange {
                        min,
                        max,
                        step: row.range_step.unwrap_or(1.0),
                    },
                    _ => {
                        return Err(value_error(&row.name, "范围筛选器缺少 min/max".to_string()))
                    }
                },
            };
            filter_descriptors.push(FilterDescriptor {
                name: row.name,
                label: row.label,
                unit: row.unit,
                sort_order: row.sort_order,
                default_expanded: row.default_expanded,
                active: row.active,
                domain,
            });
        }

        Ok(CategoryDescriptor::new(
            category_id,
            display_name,
            table_name,
            column_descriptors,
            filter_descriptors,
        ))
    }
}

impl MetadataSource for MetadataRepository {
    fn load_descriptors(&self) -> RepositoryResult<Vec<RepositoryResult<CategoryDescriptor>>> {
        let conn = self.get_conn()?;

        let categories: Vec<(String, String, String)> = {
            let mut stmt = conn.prepare(
                r#"
                SELECT category_id, display_name, table_name
                FROM catalog_category
                ORDER BY sort_order, category_id
                "#,
            )?;
            let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?;
            rows.collect::<Result<Vec<_>, _>>()?
        };

        let mut loaded = Vec::with_capacity(categories.len());
        for (category_id, display_name, table_name) in categories {
            let columns = Self::load_columns(&conn, &category_id)?;
            let filters = Self::load_filters(&conn, &category_id)?;
            loaded.push(Self::assemble(
                &category_id,
                &display_name,
                &table_name,
                columns,
                filters,
            ));
        }

        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{configure_sqlite_connection, ensure_core_schema};

    fn memory_repo() -> MetadataRepository {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        ensure_core_schema(&conn).unwrap();
        MetadataRepository::from_connection(Arc::new(Mutex::new(conn)))
    }

    fn light() -> CategoryDescriptor {
        CategoryDescriptor::new(
            "light",
            "光源",
            "light_products",
            vec![
                ColumnDescriptor::basic("part_number", "Part Number", ColumnDataType::Text, 1),
                ColumnDescriptor::basic("wattage", "Wattage", ColumnDataType::Number, 2)
                    .with_unit("W"),
                ColumnDescriptor::specification("dimmable", "Dimmable", ColumnDataType::Boolean, 3),
            ],
            vec![
                FilterDescriptor {
                    name: "wattage".to_string(),
                    label: "Wattage".to_string(),
                    unit: Some("W".to_string()),
                    sort_order: 1,
                    default_expanded: true,
                    active: true,
                    domain: FilterDomain::NumericRange {
                        min: 0.0,
                        max: 200.0,
                        step: 5.0,
                    },
                },
                FilterDescriptor {
                    name: "color".to_string(),
                    label: "Color".to_string(),
                    unit: None,
                    sort_order: 2,
                    default_expanded: false,
                    active: true,
                    domain: FilterDomain::CheckboxSet {
                        options: vec![FilterOption {
                            value: "white".to_string(),
                            label: "White".to_string(),
                        }],
                    },
                },
            ],
        )
    }

    #[test]
    fn test_upsert_then_load_roundtrip() {
        let repo = memory_repo();
        let desc = light();
        repo.upsert_category(&desc, 1).unwrap();

        let loaded = repo.load_descriptors().unwrap();
        assert_eq!(loaded.len(), 1);
        let got = loaded.into_iter().next().unwrap().unwrap();
        assert_eq!(got, desc);
    }

    #[test]
    fn test_upsert_replaces_columns() {
        let repo = memory_repo();
        let mut desc = light();
        repo.upsert_category(&desc, 1).unwrap();

        desc.columns.pop();
        repo.upsert_category(&desc, 1).unwrap();

        let got = repo.load_descriptors().unwrap().remove(0).unwrap();
        assert_eq!(got.columns.len(), 2);
    }

    #[test]
    fn test_unknown_data_type_is_isolated_per_category() {
        let repo = memory_repo();
        repo.upsert_category(&light(), 1).unwrap();
        {
            let conn = repo.get_conn().unwrap();
            conn.execute(
                "UPDATE catalog_column SET data_type = 'date' WHERE name = 'wattage'",
                [],
            )
            .unwrap();
        }
        let loaded = repo.load_descriptors().unwrap();
        assert!(matches!(
            loaded[0],
            Err(RepositoryError::MetadataValueError { .. })
        ));
    }

    #[test]
    fn test_invalid_descriptor_is_rejected() {
        let repo = memory_repo();
        let mut desc = light();
        desc.table_name = "light products".to_string();
        assert!(matches!(
            repo.upsert_category(&desc, 1),
            Err(RepositoryError::MetadataValueError { .. })
        ));
        assert!(repo.load_descriptors().unwrap().is_empty());
    }
}
