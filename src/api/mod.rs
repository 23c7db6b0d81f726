// ==========================================
// 产品目录门户 - API 层
// ==========================================
// 职责: 传输无关的业务 API，供命令行或任意 HTTP 外壳调用
// ==========================================

pub mod catalog_api;
pub mod error;
pub mod import_api;
pub mod search_api;
pub mod template_api;

// 重导出核心类型
pub use catalog_api::CatalogApi;
pub use error::{error_code, map_api_error, ApiError, ApiResult, ErrorResponse};
pub use import_api::{BatchImportItem, ImportApi};
pub use search_api::SearchApi;
pub use template_api::{TemplateApi, TemplateFormat, TemplateOutput};
