// ==========================================
// 产品目录门户 - 配置读取 Trait
// ==========================================
// 职责: 定义各组件所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::time::Duration;

// ==========================================
// 配置默认值
// ==========================================
pub mod defaults {
    pub const REFRESH_INTERVAL_SECS: u64 = 300;
    pub const SEARCH_TIMEOUT_MS: u64 = 1_500;
    pub const SEARCH_DEFAULT_LIMIT: usize = 10;
    pub const SEARCH_MAX_LIMIT: usize = 50;
    pub const TEXT_FIELDS_PER_CATEGORY: usize = 3;
    pub const SNIPPET_MAX_CHARS: usize = 160;
    pub const PROBE_CONCURRENCY: usize = 4;
    pub const IMPORT_MAX_ROWS: usize = 5_000;
    pub const IMPORT_MAX_FILE_BYTES: usize = 5 * 1024 * 1024;
}

// ==========================================
// 配置快照
// ==========================================

/// 检索配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSettings {
    pub timeout_ms: u64,
    pub default_limit: usize,
    pub max_limit: usize,
    pub text_fields_per_category: usize,
    pub snippet_max_chars: usize,
}

impl SearchSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// 调用方 limit → 实际 limit（缺省取默认值，超出取上限；0 表示只要总数）
    pub fn effective_limit(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.default_limit).min(self.max_limit)
    }
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            timeout_ms: defaults::SEARCH_TIMEOUT_MS,
            default_limit: defaults::SEARCH_DEFAULT_LIMIT,
            max_limit: defaults::SEARCH_MAX_LIMIT,
            text_fields_per_category: defaults::TEXT_FIELDS_PER_CATEGORY,
            snippet_max_chars: defaults::SNIPPET_MAX_CHARS,
        }
    }
}

/// 导入上限
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportLimits {
    pub max_rows: usize,
    pub max_file_bytes: usize,
}

impl Default for ImportLimits {
    fn default() -> Self {
        Self {
            max_rows: defaults::IMPORT_MAX_ROWS,
            max_file_bytes: defaults::IMPORT_MAX_FILE_BYTES,
        }
    }
}

/// 门户全部可调参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortalSettings {
    pub refresh_interval_secs: u64,
    pub probe_concurrency: usize,
    pub search: SearchSettings,
    pub import: ImportLimits,
}

impl PortalSettings {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

impl Default for PortalSettings {
    fn default() -> Self {
        Self {
            refresh_interval_secs: defaults::REFRESH_INTERVAL_SECS,
            probe_concurrency: defaults::PROBE_CONCURRENCY,
            search: SearchSettings::default(),
            import: ImportLimits::default(),
        }
    }
}

// ==========================================
// PortalConfigReader Trait
// ==========================================
// 用途: 导入器在每次导入时读取最新上限（config-set 无需重启即生效）
// 实现者: ConfigManager（从 config_kv 表读取）、PortalSettings（固定值）
#[async_trait]
pub trait PortalConfigReader: Send + Sync {
    /// 获取导入上限
    ///
    /// # 默认值
    /// - 5000 行 / 5 MiB
    async fn get_import_limits(&self) -> Result<ImportLimits, Box<dyn Error + Send + Sync>>;
}

/// 固定配置（测试与无库场景）
#[async_trait]
impl PortalConfigReader for PortalSettings {
    async fn get_import_limits(&self) -> Result<ImportLimits, Box<dyn Error + Send + Sync>> {
        Ok(self.import)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_limit() {
        let s = SearchSettings::default();
        assert_eq!(s.effective_limit(None), 10);
        assert_eq!(s.effective_limit(Some(0)), 0);
        assert_eq!(s.effective_limit(Some(5)), 5);
        assert_eq!(s.effective_limit(Some(500)), 50);
    }
}
