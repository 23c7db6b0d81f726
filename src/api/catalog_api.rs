// ==========================================
// 产品目录门户 - 目录 API
// ==========================================
// 职责: 跨品类按编号解析、品类列表、管理端表格配置、元数据刷新
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::category::CategoryDescriptor;
use crate::engine::{CrossFamilyResolver, GridConfig, Resolution, SchemaRegistry};
use crate::i18n::t_with_args;
use crate::repository::ProductTableStore;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// 目录API
pub struct CatalogApi {
    registry: Arc<SchemaRegistry>,
    resolver: Arc<CrossFamilyResolver>,
    store: Arc<dyn ProductTableStore>,
}

impl CatalogApi {
    pub fn new(
        registry: Arc<SchemaRegistry>,
        resolver: Arc<CrossFamilyResolver>,
        store: Arc<dyn ProductTableStore>,
    ) -> Self {
        Self {
            registry,
            resolver,
            store,
        }
    }

    /// 按编号解析产品（无需知道品类）
    ///
    /// # 返回
    /// - Ok(None): 所有品类均不存在该编号
    /// - Err(ApiError::ValidationError): 编号为空
    #[instrument(skip(self))]
    pub async fn resolve(&self, key: &str) -> ApiResult<Option<Resolution>> {
        let key = key.trim();
        if key.is_empty() {
            return Err(ApiError::ValidationError("编号不能为空".to_string()));
        }
        match self.resolver.find_by_key(key).await {
            Ok(Some(resolution)) => Ok(Some(resolution)),
            Ok(None) => {
                info!(key = %key, "{}", t_with_args("resolve.not_found", &[("key", key)]));
                Ok(None)
            }
            Err(e) => {
                error!(key = %key, error = %e, "编号解析失败");
                Err(e.into())
            }
        }
    }

    /// 全部品类（按元数据顺序）
    pub fn list_categories(&self) -> Vec<CategoryDescriptor> {
        self.registry
            .list_categories()
            .iter()
            .map(|desc| desc.as_ref().clone())
            .collect()
    }

    /// 管理端表格配置
    pub fn grid_config(&self, category: &str) -> ApiResult<GridConfig> {
        let desc = self.registry.resolve(category).ok_or_else(|| {
            ApiError::NotFound(t_with_args(
                "import.unknown_category",
                &[("category", category.trim())],
            ))
        })?;
        Ok(GridConfig::from_descriptor(&desc))
    }

    /// 元数据变更后强制重载，并补齐各品类物理表
    pub fn refresh_metadata(&self) -> ApiResult<usize> {
        let count = self.registry.reload().map_err(|e| {
            error!(error = %e, "元数据重载失败");
            ApiError::from(e)
        })?;
        for desc in self.registry.list_categories() {
            if let Err(e) = self.store.ensure_table(&desc) {
                warn!(category = %desc.id, error = %e, "品类物理表补齐失败");
            }
        }
        info!(categories = count, "元数据已刷新");
        Ok(count)
    }
}
