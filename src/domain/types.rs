// ==========================================
// 产品目录门户 - 领域类型定义
// ==========================================
// 职责: 元数据描述符的判别字段（kind / data type / filter type）
// 序列化格式: snake_case（与 metadata 表存储值一致）
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 列类别 (Column Kind)
// ==========================================
// basic: 记录顶层字段（物理表中的真实列）
// specification: 存放在记录的 specifications 嵌套容器中
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Basic,
    Specification,
}

impl ColumnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnKind::Basic => "basic",
            ColumnKind::Specification => "specification",
        }
    }

    /// 从 metadata 表的存储值解析（大小写不敏感）
    pub fn from_db_str(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "basic" => Some(ColumnKind::Basic),
            "specification" | "spec" => Some(ColumnKind::Specification),
            _ => None,
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 列数据类型 (Column Data Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnDataType {
    Text,
    Number,
    Boolean,
    ImageReference,
}

impl ColumnDataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnDataType::Text => "text",
            ColumnDataType::Number => "number",
            ColumnDataType::Boolean => "boolean",
            ColumnDataType::ImageReference => "image_reference",
        }
    }

    pub fn from_db_str(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "text" => Some(ColumnDataType::Text),
            "number" => Some(ColumnDataType::Number),
            "boolean" => Some(ColumnDataType::Boolean),
            "image_reference" | "image" => Some(ColumnDataType::ImageReference),
            _ => None,
        }
    }

    /// 物理表列类型（SQLite 亲和类型）
    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnDataType::Text | ColumnDataType::ImageReference => "TEXT",
            ColumnDataType::Number => "REAL",
            ColumnDataType::Boolean => "INTEGER",
        }
    }

    /// 是否参与文本检索
    pub fn is_textual(&self) -> bool {
        matches!(self, ColumnDataType::Text)
    }
}

impl fmt::Display for ColumnDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 筛选器类型 (Filter Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterType {
    CheckboxSet,
    NumericRange,
}

impl FilterType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterType::CheckboxSet => "checkbox_set",
            FilterType::NumericRange => "numeric_range",
        }
    }

    pub fn from_db_str(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "checkbox_set" | "checkbox" => Some(FilterType::CheckboxSet),
            "numeric_range" | "range" => Some(FilterType::NumericRange),
            _ => None,
        }
    }
}

impl fmt::Display for FilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 检索来源类型 (Source Kind)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Product,
    Article,
    DownloadableFile,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Product => write!(f, "product"),
            SourceKind::Article => write!(f, "article"),
            SourceKind::DownloadableFile => write!(f, "downloadable_file"),
        }
    }
}

// ==========================================
// 匹配等级 (Match Rank)
// ==========================================
// 排序: Exact < Prefix < Substring（越小越靠前）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchRank {
    Exact,
    Prefix,
    Substring,
}

impl MatchRank {
    /// 对外展示的相关度分值
    pub fn score(&self) -> f64 {
        match self {
            MatchRank::Exact => 3.0,
            MatchRank::Prefix => 2.0,
            MatchRank::Substring => 1.0,
        }
    }

    /// 与 SQL 排序表达式中的 CASE 值保持一致
    pub fn sql_ordinal(&self) -> i64 {
        match self {
            MatchRank::Exact => 0,
            MatchRank::Prefix => 1,
            MatchRank::Substring => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_aliases() {
        assert_eq!(ColumnDataType::from_db_str("IMAGE"), Some(ColumnDataType::ImageReference));
        assert_eq!(ColumnDataType::from_db_str(" number "), Some(ColumnDataType::Number));
        assert_eq!(ColumnDataType::from_db_str("date"), None);
    }

    #[test]
    fn test_match_rank_ordering() {
        assert!(MatchRank::Exact < MatchRank::Prefix);
        assert!(MatchRank::Prefix < MatchRank::Substring);
        assert!(MatchRank::Exact.score() > MatchRank::Substring.score());
    }

    #[test]
    fn test_filter_type_serde() {
        let json = serde_json::to_string(&FilterType::NumericRange).unwrap();
        assert_eq!(json, "\"numeric_range\"");
    }
}
