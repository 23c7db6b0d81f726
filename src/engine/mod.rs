// ==========================================
// 产品目录门户 - 引擎层
// ==========================================
// 职责: 描述符缓存、跨品类解析、统一检索、表格配置
// 红线: 引擎不拼 SQL，不按品类写分支
// ==========================================

pub mod grid_config;
pub mod key_index;
pub mod ranking;
pub mod resolver;
pub mod schema_registry;
pub mod search_aggregator;
pub mod search_source;

// 重导出核心引擎
pub use grid_config::{CellFormatter, ColumnAlign, GridColumn, GridConfig, GridFilter};
pub use key_index::{KeyIndex, KeyOwnership};
pub use resolver::{CrossFamilyResolver, OwnerSource, Resolution};
pub use schema_registry::{RegistrySnapshot, SchemaRegistry};
pub use search_aggregator::{SearchAggregator, SearchError};
pub use search_source::{
    ArticleSource, DownloadFileSource, ProductFamilySource, SearchSource, SourceError,
    SourceHits, ARTICLES_SOURCE, FILES_SOURCE,
};
