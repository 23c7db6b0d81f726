// ==========================================
// 产品目录门户 - 配置层
// ==========================================
// 职责: 门户可调参数管理（检索超时/上限、导入上限、缓存刷新间隔）
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod portal_config_trait;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager};
pub use portal_config_trait::{
    defaults, ImportLimits, PortalConfigReader, PortalSettings, SearchSettings,
};
