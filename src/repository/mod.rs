// ==========================================
// 产品目录门户 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 取值一律参数化；动态表名/列名仅来自已校验的描述符
// ==========================================

pub mod category_table_repo;
pub mod content_repo;
pub mod error;
pub mod import_batch_repo;
pub mod key_index_repo;
pub mod metadata_repo;
pub mod text_query;

// 重导出核心仓储
pub use category_table_repo::{CategoryTableRepository, ProductTableStore, WriteOutcome};
pub use content_repo::ContentRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use import_batch_repo::ImportBatchRepository;
pub use key_index_repo::{KeyIndexEntry, KeyIndexRepository};
pub use metadata_repo::{MetadataRepository, MetadataSource};
pub use text_query::TextQuery;
