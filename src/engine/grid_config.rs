// ==========================================
// 产品目录门户 - 管理端表格配置
// ==========================================
// 职责: 列/筛选器描述符 → 数据表格配置（仅展示，不含取数）
// ==========================================

use crate::domain::category::{CategoryDescriptor, ColumnDescriptor, FilterDomain};
use crate::domain::types::{ColumnDataType, ColumnKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnAlign {
    Left,
    Center,
    Right,
}

/// 单元格格式化参数
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CellFormatter {
    pub prefix: Option<String>,
    pub suffix: Option<String>,
    pub decimals: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridColumn {
    /// 记录中的字段路径: part_number / <name> / specifications.<name>
    pub field: String,
    pub header: String,
    pub data_type: ColumnDataType,
    pub align: ColumnAlign,
    pub visible: bool,
    pub sortable: bool,
    pub formatter: CellFormatter,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridFilter {
    pub field: String,
    pub label: String,
    pub unit: Option<String>,
    pub default_expanded: bool,
    pub domain: FilterDomain,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    pub category: String,
    pub display_name: String,
    pub columns: Vec<GridColumn>,
    pub filters: Vec<GridFilter>,
}

fn field_path(column: &ColumnDescriptor) -> String {
    match column.kind {
        ColumnKind::Basic => column.name.clone(),
        ColumnKind::Specification => format!("specifications.{}", column.name),
    }
}

fn header_label(label: &str, unit: Option<&str>) -> String {
    match unit {
        Some(unit) if !unit.trim().is_empty() => format!("{} ({})", label, unit.trim()),
        _ => label.to_string(),
    }
}

fn align_for(data_type: ColumnDataType) -> ColumnAlign {
    match data_type {
        ColumnDataType::Number => ColumnAlign::Right,
        ColumnDataType::Boolean | ColumnDataType::ImageReference => ColumnAlign::Center,
        ColumnDataType::Text => ColumnAlign::Left,
    }
}

fn grid_column(column: &ColumnDescriptor) -> GridColumn {
    let decimals = match column.data_type {
        ColumnDataType::Number => column.format.decimal_places,
        _ => None,
    };
    GridColumn {
        field: field_path(column),
        header: header_label(&column.label, column.unit.as_deref()),
        data_type: column.data_type,
        align: align_for(column.data_type),
        visible: column.visible,
        sortable: column.sortable,
        formatter: CellFormatter {
            prefix: column.format.prefix.clone(),
            suffix: column.format.suffix.clone(),
            decimals,
        },
    }
}

impl GridConfig {
    /// 由描述符生成表格配置；列按 sort_order，仅保留启用的筛选器
    pub fn from_descriptor(desc: &CategoryDescriptor) -> Self {
        let mut columns: Vec<&ColumnDescriptor> = desc.columns.iter().collect();
        columns.sort_by_key(|c| c.sort_order);

        let mut filters: Vec<_> = desc.filters.iter().filter(|f| f.active).collect();
        filters.sort_by_key(|f| f.sort_order);

        Self {
            category: desc.id.clone(),
            display_name: desc.display_name.clone(),
            columns: columns.into_iter().map(grid_column).collect(),
            filters: filters
                .into_iter()
                .map(|f| GridFilter {
                    field: f.name.clone(),
                    label: f.label.clone(),
                    unit: f.unit.clone(),
                    default_expanded: f.default_expanded,
                    domain: f.domain.clone(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::category::{FilterDescriptor, FilterOption, FormatOptions};

    fn cable() -> CategoryDescriptor {
        let mut price = ColumnDescriptor::basic("price", "Price", ColumnDataType::Number, 4);
        price.format = FormatOptions {
            prefix: Some("$".to_string()),
            suffix: None,
            decimal_places: Some(2),
        };
        CategoryDescriptor::new(
            "cable",
            "Cables",
            "cable_products",
            vec![
                ColumnDescriptor::specification("shielded", "Shielded", ColumnDataType::Boolean, 3),
                ColumnDescriptor::basic("part_number", "Part Number", ColumnDataType::Text, 1),
                ColumnDescriptor::basic("length_mm", "Length", ColumnDataType::Number, 2)
                    .with_unit("mm"),
                price,
            ],
            vec![
                FilterDescriptor {
                    name: "length_mm".to_string(),
                    label: "Length".to_string(),
                    unit: Some("mm".to_string()),
                    sort_order: 2,
                    default_expanded: false,
                    active: true,
                    domain: FilterDomain::NumericRange {
                        min: 0.0,
                        max: 5000.0,
                        step: 50.0,
                    },
                },
                FilterDescriptor {
                    name: "connector".to_string(),
                    label: "Connector".to_string(),
                    unit: None,
                    sort_order: 1,
                    default_expanded: true,
                    active: true,
                    domain: FilterDomain::CheckboxSet {
                        options: vec![FilterOption {
                            value: "m12".to_string(),
                            label: "M12".to_string(),
                        }],
                    },
                },
                FilterDescriptor {
                    name: "color".to_string(),
                    label: "Color".to_string(),
                    unit: None,
                    sort_order: 0,
                    default_expanded: false,
                    active: false,
                    domain: FilterDomain::CheckboxSet {
                        options: vec![FilterOption {
                            value: "black".to_string(),
                            label: "Black".to_string(),
                        }],
                    },
                },
            ],
        )
    }

    #[test]
    fn test_columns_follow_descriptor_order() {
        let grid = GridConfig::from_descriptor(&cable());
        let fields: Vec<_> = grid.columns.iter().map(|c| c.field.as_str()).collect();
        assert_eq!(
            fields,
            vec!["part_number", "length_mm", "specifications.shielded", "price"]
        );
        assert_eq!(grid.columns[1].header, "Length (mm)");
        assert_eq!(grid.columns[1].align, ColumnAlign::Right);
        assert_eq!(grid.columns[2].align, ColumnAlign::Center);
        assert!(!grid.columns[2].sortable);
        assert_eq!(grid.columns[3].formatter.prefix.as_deref(), Some("$"));
        assert_eq!(grid.columns[3].formatter.decimals, Some(2));
    }

    #[test]
    fn test_only_active_filters_in_order() {
        let grid = GridConfig::from_descriptor(&cable());
        let names: Vec<_> = grid.filters.iter().map(|f| f.field.as_str()).collect();
        assert_eq!(names, vec!["connector", "length_mm"]);
        assert!(matches!(
            grid.filters[1].domain,
            FilterDomain::NumericRange { step, .. } if step == 50.0
        ));
    }
}
