// ==========================================
// 产品目录门户 - 领域模型层
// ==========================================
// 职责: 定义描述符、产品记录、导入与检索结果
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod category;
pub mod content;
pub mod import;
pub mod product;
pub mod search;
pub mod types;

// 重导出核心类型
pub use category::{
    is_safe_identifier, CategoryDescriptor, ColumnDescriptor, DescriptorError, FilterDescriptor,
    FilterDomain, FilterOption, FormatOptions, NATURAL_KEY_COLUMN,
};
pub use content::{Article, DownloadFile};
pub use import::{
    CellFailure, CsvRow, FailureReason, ImportBatch, ImportReport, RowFailure, ValidationOutcome,
};
pub use product::{CellValue, ProductRecord};
pub use search::{SearchResponse, SearchResult, SourceTotals};
pub use types::{ColumnDataType, ColumnKind, FilterType, MatchRank, SourceKind};
