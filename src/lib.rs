// ==========================================
// 产品目录门户 - 核心库
// ==========================================
// 定位: 按品类元数据驱动的模式虚拟化层
// 技术栈: Rust + SQLite
// 能力: 元数据缓存 / 跨品类解析 / 统一检索 / CSV 模板与导入
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "zh-CN");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 描述符与记录
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 元数据缓存 / 解析 / 检索
pub mod engine;

// 导入层 - CSV 模板与 Upsert
pub mod importer;

// 配置层 - 门户参数
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// API 层 - 业务接口
pub mod api;

// 应用层 - 组装
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{ColumnDataType, ColumnKind, FilterType, MatchRank, SourceKind};

// 领域实体
pub use domain::{
    CategoryDescriptor, CellValue, ColumnDescriptor, FilterDescriptor, ImportReport,
    ProductRecord, SearchResponse, SearchResult,
};

// 引擎
pub use engine::{CrossFamilyResolver, GridConfig, KeyIndex, SchemaRegistry, SearchAggregator};

// API
pub use api::{ApiError, CatalogApi, ImportApi, SearchApi, TemplateApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "产品目录门户";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
