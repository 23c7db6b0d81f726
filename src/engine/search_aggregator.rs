// ==========================================
// 产品目录门户 - 统一检索聚合器
// ==========================================
// 流程: 规范化查询 → 并发扇出（共享一个截止时间）→ 合并 → 全局排序 → 截断
// 降级: 超时或出错的来源计 0 条，整体检索不失败
// ==========================================

use crate::config::SearchSettings;
use crate::domain::search::{SearchResponse, SearchResult, SourceTotals};
use crate::engine::schema_registry::SchemaRegistry;
use crate::engine::search_source::{ProductFamilySource, SearchSource, SourceHits};
use crate::repository::category_table_repo::ProductTableStore;
use futures::future::join_all;
use std::sync::Arc;
use thiserror::Error;
use tokio::time::{timeout_at, Instant};
use tracing::{info, instrument, warn};

/// 检索错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    #[error("检索关键字不能为空")]
    EmptyQuery,
}

// ==========================================
// SearchAggregator
// ==========================================
pub struct SearchAggregator {
    registry: Arc<SchemaRegistry>,
    store: Arc<dyn ProductTableStore>,
    content_sources: Vec<Arc<dyn SearchSource>>,
    settings: SearchSettings,
}

impl SearchAggregator {
    pub fn new(
        registry: Arc<SchemaRegistry>,
        store: Arc<dyn ProductTableStore>,
        settings: SearchSettings,
    ) -> Self {
        Self {
            registry,
            store,
            content_sources: Vec::new(),
            settings,
        }
    }

    /// 追加非产品来源（文章、下载文件等）
    pub fn with_source(mut self, source: Arc<dyn SearchSource>) -> Self {
        self.content_sources.push(source);
        self
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    /// 本次检索的全部来源: 每个品类一个 + 非产品来源
    async fn sources(&self) -> Vec<Arc<dyn SearchSource>> {
        let snapshot = self.registry.current().await;
        let mut sources: Vec<Arc<dyn SearchSource>> = snapshot
            .categories()
            .iter()
            .cloned()
            .map(|desc| {
                Arc::new(ProductFamilySource::new(
                    desc,
                    Arc::clone(&self.store),
                    self.settings.text_fields_per_category,
                    self.settings.snippet_max_chars,
                )) as Arc<dyn SearchSource>
            })
            .collect();
        sources.extend(self.content_sources.iter().cloned());
        sources
    }

    /// 统一检索
    ///
    /// # 返回
    /// - Err(SearchError::EmptyQuery): 查询串 trim 后为空
    /// - Ok(SearchResponse): results.len() <= limit（limit 为 0 时只返回总数）；total 为各来源实际命中数
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str, limit: usize) -> Result<SearchResponse, SearchError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SearchError::EmptyQuery);
        }
        let deadline = Instant::now() + self.settings.timeout();

        let sources = self.sources().await;
        let tasks = sources.iter().map(|source| {
            let source = Arc::clone(source);
            async move {
                let outcome = timeout_at(deadline, source.search(query, limit)).await;
                (source, outcome)
            }
        });
        let outcomes = join_all(tasks).await;

        let mut total = SourceTotals::default();
        let mut merged: Vec<SearchResult> = Vec::new();
        let mut degraded_sources = Vec::new();

        for (source, outcome) in outcomes {
            match outcome {
                Ok(Ok(SourceHits { total: matched, mut results })) => {
                    results.truncate(limit);
                    total.add(source.kind(), matched);
                    merged.extend(results);
                }
                Ok(Err(e)) => {
                    warn!(query = %query, source = %source.name(), error = %e, "检索来源出错，已降级");
                    degraded_sources.push(source.name());
                }
                Err(_) => {
                    warn!(
                        query = %query,
                        source = %source.name(),
                        timeout_ms = self.settings.timeout_ms,
                        "检索来源超时，已降级"
                    );
                    degraded_sources.push(source.name());
                }
            }
        }

        merged.sort_by(|a, b| a.ranking_cmp(b));
        merged.truncate(limit);
        degraded_sources.sort();

        info!(
            query = %query,
            limit,
            returned = merged.len(),
            products = total.products,
            articles = total.articles,
            files = total.files,
            degraded = degraded_sources.len(),
            "统一检索完成"
        );

        Ok(SearchResponse {
            query: query.to_string(),
            limit,
            total,
            results: merged,
            degraded_sources,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::category::CategoryDescriptor;
    use crate::domain::types::{MatchRank, SourceKind};
    use crate::engine::search_source::SourceError;
    use crate::repository::category_table_repo::CategoryTableRepository;
    use crate::repository::metadata_repo::MetadataSource;
    use crate::repository::RepositoryResult;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use rusqlite::Connection;
    use std::sync::Mutex;
    use std::time::Duration;

    struct NoCategories;

    impl MetadataSource for NoCategories {
        fn load_descriptors(&self) -> RepositoryResult<Vec<RepositoryResult<CategoryDescriptor>>> {
            Ok(Vec::new())
        }
    }

    enum Behaviour {
        Hits(usize, Vec<SearchResult>),
        Fail,
        Hang,
    }

    struct FakeSource {
        name: &'static str,
        kind: SourceKind,
        behaviour: Behaviour,
    }

    #[async_trait]
    impl SearchSource for FakeSource {
        fn name(&self) -> String {
            self.name.to_string()
        }

        fn kind(&self) -> SourceKind {
            self.kind
        }

        async fn search(&self, _query: &str, _limit: usize) -> Result<SourceHits, SourceError> {
            match &self.behaviour {
                Behaviour::Hits(total, results) => Ok(SourceHits {
                    total: *total,
                    results: results.clone(),
                }),
                Behaviour::Fail => Err(SourceError::Unavailable(self.name.to_string())),
                Behaviour::Hang => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok(SourceHits::default())
                }
            }
        }
    }

    fn hit(kind: SourceKind, id: &str, rank: MatchRank, day: u32) -> SearchResult {
        SearchResult {
            source_kind: kind,
            identifier: id.to_string(),
            title: id.to_string(),
            snippet: String::new(),
            score: rank.score(),
            rank,
            source: "fake".to_string(),
            updated_at: Some(Utc.with_ymd_and_hms(2026, 3, day, 0, 0, 0).unwrap()),
        }
    }

    fn aggregator(timeout_ms: u64) -> SearchAggregator {
        let registry = Arc::new(
            SchemaRegistry::load(Arc::new(NoCategories), Duration::from_secs(300)).unwrap(),
        );
        let conn = Connection::open_in_memory().unwrap();
        let store = Arc::new(CategoryTableRepository::from_connection(Arc::new(Mutex::new(conn))));
        let settings = SearchSettings {
            timeout_ms,
            ..SearchSettings::default()
        };
        SearchAggregator::new(registry, store, settings)
    }

    #[tokio::test]
    async fn test_empty_query_rejected() {
        let agg = aggregator(1000);
        assert_eq!(agg.search("   ", 10).await.unwrap_err(), SearchError::EmptyQuery);
    }

    #[tokio::test]
    async fn test_merge_sorts_and_truncates() {
        let agg = aggregator(1000)
            .with_source(Arc::new(FakeSource {
                name: "articles",
                kind: SourceKind::Article,
                behaviour: Behaviour::Hits(
                    7,
                    vec![
                        hit(SourceKind::Article, "a-sub", MatchRank::Substring, 9),
                        hit(SourceKind::Article, "a-pre", MatchRank::Prefix, 2),
                    ],
                ),
            }))
            .with_source(Arc::new(FakeSource {
                name: "files",
                kind: SourceKind::DownloadableFile,
                behaviour: Behaviour::Hits(
                    1,
                    vec![hit(SourceKind::DownloadableFile, "f-exact", MatchRank::Exact, 1)],
                ),
            }));

        let resp = agg.search(" cbl ", 2).await.unwrap();
        assert_eq!(resp.query, "cbl");
        assert_eq!(resp.total.articles, 7);
        assert_eq!(resp.total.files, 1);
        let ids: Vec<_> = resp.results.iter().map(|r| r.identifier.as_str()).collect();
        assert_eq!(ids, vec!["f-exact", "a-pre"]);
        assert!(resp.degraded_sources.is_empty());
    }

    #[tokio::test]
    async fn test_zero_limit_keeps_totals() {
        let agg = aggregator(1000).with_source(Arc::new(FakeSource {
            name: "articles",
            kind: SourceKind::Article,
            behaviour: Behaviour::Hits(
                3,
                vec![hit(SourceKind::Article, "a-1", MatchRank::Exact, 1)],
            ),
        }));

        let resp = agg.search("cbl", 0).await.unwrap();
        assert_eq!(resp.limit, 0);
        assert!(resp.results.is_empty());
        assert_eq!(resp.total.articles, 3);
    }

    #[tokio::test]
    async fn test_failing_and_slow_sources_degrade() {
        let agg = aggregator(100)
            .with_source(Arc::new(FakeSource {
                name: "articles",
                kind: SourceKind::Article,
                behaviour: Behaviour::Fail,
            }))
            .with_source(Arc::new(FakeSource {
                name: "files",
                kind: SourceKind::DownloadableFile,
                behaviour: Behaviour::Hang,
            }));

        let resp = agg.search("cbl", 10).await.unwrap();
        assert_eq!(resp.total, SourceTotals::default());
        assert!(resp.results.is_empty());
        assert_eq!(resp.degraded_sources, vec!["articles".to_string(), "files".to_string()]);
    }
}
