// ==========================================
// 产品目录门户 - 品类描述符
// ==========================================
// 职责: 品类 → 物理表 + 列/筛选器元数据
// 红线: 元数据即数据，不在代码中按品类分支
// ==========================================

use crate::domain::types::{ColumnDataType, ColumnKind, FilterType};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// 自然键列名（每个品类表唯一）
pub const NATURAL_KEY_COLUMN: &str = "part_number";

/// 物理表保留列，不允许出现在列描述符中
pub const RESERVED_COLUMNS: [&str; 3] = ["specifications", "created_at", "updated_at"];

/// 判断是否为可安全拼接进 SQL 的标识符: ^[a-z_][a-z0-9_]*$
pub fn is_safe_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

// ==========================================
// 描述符校验错误
// ==========================================
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DescriptorError {
    #[error("品类标识为空")]
    EmptyCategoryId,

    #[error("品类 {category} 的表名非法: {table}")]
    InvalidTableName { category: String, table: String },

    #[error("品类 {0} 未定义任何列")]
    NoColumns(String),

    #[error("品类 {category} 的列名非法: {column}")]
    InvalidColumnName { category: String, column: String },

    #[error("品类 {category} 的列名重复: {column}")]
    DuplicateColumn { category: String, column: String },

    #[error("品类 {category} 使用了保留列名: {column}")]
    ReservedColumn { category: String, column: String },

    #[error("品类 {0} 缺少自然键列 part_number（须为 basic/text）")]
    MissingNaturalKey(String),

    #[error("品类 {category} 的范围筛选器 {filter} 非法: min={min}, max={max}, step={step}")]
    InvalidRange {
        category: String,
        filter: String,
        min: f64,
        max: f64,
        step: f64,
    },

    #[error("品类 {category} 的复选筛选器 {filter} 没有选项")]
    EmptyCheckboxOptions { category: String, filter: String },

    #[error("物理表 {table} 同时被品类 {first} 与 {second} 使用")]
    DuplicateTable {
        table: String,
        first: String,
        second: String,
    },
}

// ==========================================
// FormatOptions - 列展示格式
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormatOptions {
    pub prefix: Option<String>,
    pub suffix: Option<String>,
    pub decimal_places: Option<u8>,
}

// ==========================================
// ColumnDescriptor - 列描述符
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,             // 物理字段名（与表列名一致）
    pub label: String,            // 展示名（CSV 表头）
    pub kind: ColumnKind,         // basic / specification
    pub data_type: ColumnDataType,
    pub unit: Option<String>,
    pub sort_order: i32,
    pub visible: bool,
    pub sortable: bool,
    #[serde(default)]
    pub format: FormatOptions,
}

impl ColumnDescriptor {
    /// 基础文本列（测试与种子数据常用）
    pub fn basic(name: &str, label: &str, data_type: ColumnDataType, sort_order: i32) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            kind: ColumnKind::Basic,
            data_type,
            unit: None,
            sort_order,
            visible: true,
            sortable: true,
            format: FormatOptions::default(),
        }
    }

    /// 规格列（嵌套容器）
    pub fn specification(
        name: &str,
        label: &str,
        data_type: ColumnDataType,
        sort_order: i32,
    ) -> Self {
        Self {
            kind: ColumnKind::Specification,
            sortable: false,
            ..Self::basic(name, label, data_type, sort_order)
        }
    }

    pub fn with_unit(mut self, unit: &str) -> Self {
        self.unit = Some(unit.to_string());
        self
    }

    pub fn is_natural_key(&self) -> bool {
        self.name == NATURAL_KEY_COLUMN
    }
}

// ==========================================
// FilterDescriptor - 筛选器描述符
// ==========================================

/// 复选项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterOption {
    pub value: String,
    pub label: String,
}

/// 筛选器取值域（带显式判别字段）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterDomain {
    CheckboxSet { options: Vec<FilterOption> },
    NumericRange { min: f64, max: f64, step: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterDescriptor {
    pub name: String,
    pub label: String,
    pub unit: Option<String>,
    pub sort_order: i32,
    pub default_expanded: bool,
    pub active: bool,
    pub domain: FilterDomain,
}

impl FilterDescriptor {
    pub fn filter_type(&self) -> FilterType {
        match self.domain {
            FilterDomain::CheckboxSet { .. } => FilterType::CheckboxSet,
            FilterDomain::NumericRange { .. } => FilterType::NumericRange,
        }
    }
}

// ==========================================
// CategoryDescriptor - 品类描述符
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryDescriptor {
    pub id: String,           // 品类标识（如 cable）
    pub display_name: String, // 展示名
    pub table_name: String,   // 物理表名（全局唯一）
    pub columns: Vec<ColumnDescriptor>,
    pub filters: Vec<FilterDescriptor>,
}

impl CategoryDescriptor {
    /// 创建描述符，列与筛选器按 sort_order 稳定排序
    pub fn new(
        id: &str,
        display_name: &str,
        table_name: &str,
        mut columns: Vec<ColumnDescriptor>,
        mut filters: Vec<FilterDescriptor>,
    ) -> Self {
        columns.sort_by_key(|c| c.sort_order);
        filters.sort_by_key(|f| f.sort_order);
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            table_name: table_name.to_string(),
            columns,
            filters,
        }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn natural_key_column(&self) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.is_natural_key())
    }

    /// 顶层字段列（不含自然键）
    pub fn basic_columns(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns
            .iter()
            .filter(|c| c.kind == ColumnKind::Basic && !c.is_natural_key())
    }

    pub fn specification_columns(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns
            .iter()
            .filter(|c| c.kind == ColumnKind::Specification)
    }

    /// 参与文本检索的顶层文本列（按 sort_order，最多 limit 个）
    pub fn searchable_text_columns(&self, limit: usize) -> Vec<&ColumnDescriptor> {
        self.basic_columns()
            .filter(|c| c.data_type.is_textual())
            .take(limit)
            .collect()
    }

    /// 校验单个描述符的内部不变量
    pub fn validate(&self) -> Result<(), DescriptorError> {
        if self.id.trim().is_empty() {
            return Err(DescriptorError::EmptyCategoryId);
        }
        if !is_safe_identifier(&self.table_name) {
            return Err(DescriptorError::InvalidTableName {
                category: self.id.clone(),
                table: self.table_name.clone(),
            });
        }
        if self.columns.is_empty() {
            return Err(DescriptorError::NoColumns(self.id.clone()));
        }

        let mut seen = HashSet::new();
        for column in &self.columns {
            if !is_safe_identifier(&column.name) {
                return Err(DescriptorError::InvalidColumnName {
                    category: self.id.clone(),
                    column: column.name.clone(),
                });
            }
            if RESERVED_COLUMNS.contains(&column.name.as_str()) {
                return Err(DescriptorError::ReservedColumn {
                    category: self.id.clone(),
                    column: column.name.clone(),
                });
            }
            if !seen.insert(column.name.as_str()) {
                return Err(DescriptorError::DuplicateColumn {
                    category: self.id.clone(),
                    column: column.name.clone(),
                });
            }
        }

        match self.natural_key_column() {
            Some(key)
                if key.kind == ColumnKind::Basic && key.data_type == ColumnDataType::Text => {}
            _ => return Err(DescriptorError::MissingNaturalKey(self.id.clone())),
        }

        for filter in &self.filters {
            match &filter.domain {
                FilterDomain::NumericRange { min, max, step } => {
                    let valid = min.is_finite()
                        && max.is_finite()
                        && step.is_finite()
                        && min <= max
                        && *step > 0.0;
                    if !valid {
                        return Err(DescriptorError::InvalidRange {
                            category: self.id.clone(),
                            filter: filter.name.clone(),
                            min: *min,
                            max: *max,
                            step: *step,
                        });
                    }
                }
                FilterDomain::CheckboxSet { options } => {
                    if options.is_empty() {
                        return Err(DescriptorError::EmptyCheckboxOptions {
                            category: self.id.clone(),
                            filter: filter.name.clone(),
                        });
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cable() -> CategoryDescriptor {
        CategoryDescriptor::new(
            "cable",
            "线缆",
            "cable_products",
            vec![
                ColumnDescriptor::basic("length_mm", "Length", ColumnDataType::Number, 2),
                ColumnDescriptor::basic("part_number", "Part Number", ColumnDataType::Text, 1),
            ],
            vec![],
        )
    }

    #[test]
    fn test_columns_sorted_by_sort_order() {
        let desc = cable();
        assert_eq!(desc.columns[0].name, "part_number");
        assert_eq!(desc.columns[1].name, "length_mm");
        assert!(desc.validate().is_ok());
    }

    #[test]
    fn test_safe_identifier() {
        assert!(is_safe_identifier("cable_products"));
        assert!(is_safe_identifier("_x1"));
        assert!(!is_safe_identifier("1abc"));
        assert!(!is_safe_identifier("drop table"));
        assert!(!is_safe_identifier("Cable"));
        assert!(!is_safe_identifier(""));
    }

    #[test]
    fn test_missing_natural_key_rejected() {
        let desc = CategoryDescriptor::new(
            "cable",
            "线缆",
            "cable_products",
            vec![ColumnDescriptor::basic("length_mm", "Length", ColumnDataType::Number, 1)],
            vec![],
        );
        assert_eq!(
            desc.validate(),
            Err(DescriptorError::MissingNaturalKey("cable".to_string()))
        );
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let mut desc = cable();
        desc.columns
            .push(ColumnDescriptor::basic("length_mm", "Again", ColumnDataType::Number, 3));
        assert!(matches!(
            desc.validate(),
            Err(DescriptorError::DuplicateColumn { .. })
        ));
    }

    #[test]
    fn test_filter_invariants() {
        let mut desc = cable();
        desc.filters.push(FilterDescriptor {
            name: "length_mm".to_string(),
            label: "Length".to_string(),
            unit: Some("mm".to_string()),
            sort_order: 1,
            default_expanded: true,
            active: true,
            domain: FilterDomain::NumericRange {
                min: 10.0,
                max: 1.0,
                step: 1.0,
            },
        });
        assert!(matches!(desc.validate(), Err(DescriptorError::InvalidRange { .. })));

        desc.filters[0].domain = FilterDomain::CheckboxSet { options: vec![] };
        assert!(matches!(
            desc.validate(),
            Err(DescriptorError::EmptyCheckboxOptions { .. })
        ));
    }

    #[test]
    fn test_filter_domain_tagged_serde() {
        let domain = FilterDomain::NumericRange {
            min: 0.0,
            max: 5.0,
            step: 0.5,
        };
        let json = serde_json::to_value(&domain).unwrap();
        assert_eq!(json["type"], "numeric_range");
        assert_eq!(json["max"], 5.0);
    }
}
