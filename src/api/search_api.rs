// ==========================================
// 产品目录门户 - 检索 API
// ==========================================

use crate::api::error::ApiResult;
use crate::domain::search::SearchResponse;
use crate::engine::SearchAggregator;
use crate::i18n::t_with_args;
use std::sync::Arc;
use tracing::warn;

/// 检索API
pub struct SearchApi {
    aggregator: Arc<SearchAggregator>,
}

impl SearchApi {
    pub fn new(aggregator: Arc<SearchAggregator>) -> Self {
        Self { aggregator }
    }

    /// 统一检索（limit 缺省取配置默认值，并受配置上限约束）
    pub async fn search(&self, query: &str, limit: Option<usize>) -> ApiResult<SearchResponse> {
        let limit = self.aggregator.settings().effective_limit(limit);
        let response = self.aggregator.search(query, limit).await?;
        if !response.degraded_sources.is_empty() {
            let sources = response.degraded_sources.join(", ");
            warn!(
                query = %response.query,
                "{}",
                t_with_args("search.degraded", &[("sources", &sources)])
            );
        }
        Ok(response)
    }
}
