// ==========================================
// 产品目录门户 - 产品记录
// ==========================================
// 红线: specification 列只出现在 specifications 容器中
// 生命周期: Upsert 管道首次写入创建，后续同键导入整行覆盖，本层从不删除
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

// ==========================================
// CellValue - 单元格取值
// ==========================================
// 反序列化采用 untagged（读取 specifications JSON）
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Boolean(bool),
    Number(f64),
    Text(String),
    Null,
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// CSV 单元格文本（数字不带多余小数位，布尔为 true/false）
    pub fn to_csv_string(&self) -> String {
        match self {
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => format_plain_number(*n),
            CellValue::Boolean(b) => b.to_string(),
            CellValue::Null => String::new(),
        }
    }
}

/// 整数值输出为 500 而不是 500.0
pub fn format_plain_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CellValue::Text(s) => serializer.serialize_str(s),
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                serializer.serialize_i64(*n as i64)
            }
            CellValue::Number(n) => serializer.serialize_f64(*n),
            CellValue::Boolean(b) => serializer.serialize_bool(*b),
            CellValue::Null => serializer.serialize_none(),
        }
    }
}

// ==========================================
// ProductRecord - 统一产品记录
// ==========================================
// 对外 JSON: {category, part_number, <basic 字段平铺>, specifications: {...}}
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub category: String,
    pub part_number: String,
    #[serde(flatten)]
    pub fields: BTreeMap<String, CellValue>,
    #[serde(default)]
    pub specifications: BTreeMap<String, CellValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ProductRecord {
    pub fn new(category: &str, part_number: &str) -> Self {
        Self {
            category: category.to_string(),
            part_number: part_number.to_string(),
            fields: BTreeMap::new(),
            specifications: BTreeMap::new(),
            created_at: None,
            updated_at: None,
        }
    }

    /// 内容是否一致（忽略时间戳）
    pub fn same_content(&self, other: &ProductRecord) -> bool {
        self.part_number == other.part_number
            && self.fields == other.fields
            && self.specifications == other.specifications
    }

    /// 最近时间戳（检索排序用）
    pub fn last_touched(&self) -> Option<DateTime<Utc>> {
        self.updated_at.or(self.created_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integral_number_serializes_without_fraction() {
        let mut record = ProductRecord::new("cable", "CBL-001");
        record
            .fields
            .insert("length_mm".to_string(), CellValue::Number(500.0));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["category"], "cable");
        assert_eq!(json["part_number"], "CBL-001");
        assert_eq!(json["length_mm"], serde_json::json!(500));
    }

    #[test]
    fn test_cell_value_untagged_roundtrip() {
        let raw = r#"{"shielded": true, "awg": 24, "jacket": "PVC", "note": null}"#;
        let map: BTreeMap<String, CellValue> = serde_json::from_str(raw).unwrap();
        assert_eq!(map["shielded"], CellValue::Boolean(true));
        assert_eq!(map["awg"], CellValue::Number(24.0));
        assert_eq!(map["jacket"], CellValue::Text("PVC".to_string()));
        assert_eq!(map["note"], CellValue::Null);
    }

    #[test]
    fn test_csv_rendering() {
        assert_eq!(CellValue::Number(12.5).to_csv_string(), "12.5");
        assert_eq!(CellValue::Number(3.0).to_csv_string(), "3");
        assert_eq!(CellValue::Boolean(false).to_csv_string(), "false");
        assert_eq!(CellValue::Null.to_csv_string(), "");
    }

    #[test]
    fn test_same_content_ignores_timestamps() {
        let a = ProductRecord::new("cable", "CBL-001");
        let mut b = a.clone();
        b.updated_at = Some(Utc::now());
        assert!(a.same_content(&b));
    }
}
