// ==========================================
// 产品目录门户 - 导入层
// ==========================================
// 职责: CSV 模板生成、上传解析与校验、按品类 Upsert
// 支持: CSV（UTF-8，可带 BOM）
// ==========================================

// 模块声明
pub mod category_importer;
pub mod data_cleaner;
pub mod error;
pub mod field_mapper;
pub mod file_parser;
pub mod importer_trait;
pub mod template;
pub mod upsert_pipeline;

// 重导出核心类型
pub use category_importer::CategoryImporterImpl;
pub use data_cleaner::DataCleaner as DataCleanerImpl;
pub use error::{ImportError, ImportResult};
pub use field_mapper::FieldMapper as FieldMapperImpl;
pub use file_parser::CsvParser;
pub use template::{CsvTemplateEngine, TemplateInfo};
pub use upsert_pipeline::UpsertPipeline;

// 重导出 Trait 接口
pub use importer_trait::{
    CategoryImporter, DataCleaner, FieldMapper, FileParser, ParsedCsv, RawRow,
};
