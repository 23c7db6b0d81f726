// ==========================================
// 产品目录门户 - 跨品类解析器
// ==========================================
// 职责: 给定裸 part_number，定位所属品类并返回完整记录
// 策略: 先查自然键索引；索引缺失/失效时有界并行探测全部品类表
//       索引命中后仍核对其余品类表（绕过导入管道写入的重复键不在索引中）
// 红线: 多品类歧义必须记录日志；索引 owner 优先于探测结果
// ==========================================

use crate::domain::category::CategoryDescriptor;
use crate::domain::product::ProductRecord;
use crate::engine::key_index::{KeyIndex, KeyOwnership};
use crate::engine::schema_registry::SchemaRegistry;
use crate::repository::category_table_repo::ProductTableStore;
use crate::repository::error::{RepositoryError, RepositoryResult};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, instrument, warn};

type ProbeOutcome = (usize, String, RepositoryResult<Option<ProductRecord>>);

/// 记录的定位方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerSource {
    Index,
    Probe,
}

/// 解析结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub record: ProductRecord,
    pub owner_source: OwnerSource,
    /// 同时持有该键的其他品类（为空表示无歧义）
    pub ambiguous_with: Vec<String>,
}

// ==========================================
// CrossFamilyResolver
// ==========================================
pub struct CrossFamilyResolver {
    registry: Arc<SchemaRegistry>,
    store: Arc<dyn ProductTableStore>,
    index: Arc<KeyIndex>,
    probe_concurrency: usize,
}

impl CrossFamilyResolver {
    pub fn new(
        registry: Arc<SchemaRegistry>,
        store: Arc<dyn ProductTableStore>,
        index: Arc<KeyIndex>,
        probe_concurrency: usize,
    ) -> Self {
        Self {
            registry,
            store,
            index,
            probe_concurrency: probe_concurrency.max(1),
        }
    }

    async fn fetch(
        &self,
        desc: Arc<CategoryDescriptor>,
        key: &str,
    ) -> RepositoryResult<Option<ProductRecord>> {
        let store = Arc::clone(&self.store);
        let key = key.to_string();
        tokio::task::spawn_blocking(move || store.find_by_key(&desc, &key))
            .await
            .map_err(|e| RepositoryError::InternalError(format!("查询任务异常: {}", e)))?
    }

    /// 按自然键查找记录；所有品类均不存在时返回 Ok(None)
    #[instrument(skip(self))]
    pub async fn find_by_key(&self, key: &str) -> RepositoryResult<Option<Resolution>> {
        let key = key.trim();
        if key.is_empty() {
            return Ok(None);
        }

        let ownership = self.index.lookup(key);

        // === 1. 索引命中 ===
        if let Some(owners) = &ownership {
            match self.registry.current().await.resolve(&owners.owner) {
                Some(desc) => match self.fetch(desc, key).await {
                    Ok(Some(record)) => {
                        let ambiguous_with = self.co_owners(key, owners).await;
                        if !ambiguous_with.is_empty() {
                            warn!(
                                key = %key,
                                owner = %owners.owner,
                                also_in = ?ambiguous_with,
                                "自然键存在于多个品类，返回索引 owner"
                            );
                        }
                        return Ok(Some(Resolution {
                            record,
                            owner_source: OwnerSource::Index,
                            ambiguous_with,
                        }));
                    }
                    Ok(None) => {
                        warn!(key = %key, owner = %owners.owner, "索引条目已失效，改为探测");
                        self.index.forget(key, &owners.owner);
                    }
                    Err(e) => {
                        error!(key = %key, category = %owners.owner, error = %e, "索引 owner 查询失败，改为探测");
                    }
                },
                None => {
                    warn!(key = %key, owner = %owners.owner, "索引 owner 品类已不存在，改为探测");
                    self.index.forget(key, &owners.owner);
                }
            }
        }

        // === 2. 有界并行探测 ===
        self.probe(key, ownership.as_ref()).await
    }

    /// 有界并行查询给定品类；结果附带品类的注册顺序
    async fn fetch_all(&self, key: &str, skip: Option<&str>) -> Vec<ProbeOutcome> {
        let categories = self.registry.current().await.categories().to_vec();
        debug!(key = %key, categories = categories.len(), skip = ?skip, "开始并行探测");

        stream::iter(categories.into_iter().enumerate())
            .filter(|(_, desc)| futures::future::ready(Some(desc.id.as_str()) != skip))
            .map(|(order, desc)| async move {
                let id = desc.id.clone();
                (order, id, self.fetch(desc, key).await)
            })
            .buffer_unordered(self.probe_concurrency)
            .collect()
            .await
    }

    /// 索引 owner 之外实际持有该键的品类（索引顺序优先，其余按注册顺序）
    ///
    /// 顺带修复索引: 补录外部写入的归属，移除已失效的 co-owner
    async fn co_owners(&self, key: &str, owners: &KeyOwnership) -> Vec<String> {
        let mut found: Vec<(usize, String)> = Vec::new();
        for (order, category, outcome) in self.fetch_all(key, Some(&owners.owner)).await {
            let indexed = owners.priority_of(&category).is_some();
            match outcome {
                Ok(Some(_)) => {
                    if !indexed {
                        self.index.ensure_present(key, &category);
                    }
                    found.push((order, category));
                }
                Ok(None) => {
                    if indexed {
                        self.index.forget(key, &category);
                    }
                }
                Err(e) if e.is_schema_mismatch() => {
                    if indexed {
                        self.index.forget(key, &category);
                    }
                }
                // 无法核对时沿用索引记录
                Err(e) => {
                    warn!(key = %key, category = %category, error = %e, "歧义核对失败");
                    if indexed {
                        found.push((order, category));
                    }
                }
            }
        }

        found.sort_by_key(|(order, category)| {
            (owners.priority_of(category).unwrap_or(usize::MAX), *order)
        });
        found.into_iter().map(|(_, category)| category).collect()
    }

    async fn probe(
        &self,
        key: &str,
        ownership: Option<&KeyOwnership>,
    ) -> RepositoryResult<Option<Resolution>> {
        let outcomes = self.fetch_all(key, None).await;

        let mut hits: Vec<(usize, String, ProductRecord)> = Vec::new();
        let mut first_error: Option<RepositoryError> = None;
        for (order, category, outcome) in outcomes {
            match outcome {
                Ok(Some(record)) => hits.push((order, category, record)),
                Ok(None) => {}
                // 物理表尚未建立: 该品类没有任何记录
                Err(e) if e.is_schema_mismatch() => {
                    warn!(key = %key, category = %category, error = %e, "品类表与元数据不一致，视为未命中");
                }
                Err(e) => {
                    error!(key = %key, category = %category, error = %e, "品类表探测失败");
                    first_error.get_or_insert(e);
                }
            }
        }

        if hits.is_empty() {
            // 有品类探测失败时无法断言不存在
            return match first_error {
                Some(e) => Err(e),
                None => Ok(None),
            };
        }

        // 索引中仍有记录的品类优先，其余按注册顺序
        hits.sort_by_key(|(order, category, _)| {
            let priority = ownership
                .and_then(|o| o.priority_of(category))
                .unwrap_or(usize::MAX);
            (priority, *order)
        });

        let mut hits = hits.into_iter();
        let Some((_, chosen, record)) = hits.next() else {
            return Ok(None);
        };
        let others: Vec<String> = hits.map(|(_, category, _)| category).collect();

        if !others.is_empty() {
            warn!(
                key = %key,
                owner = %chosen,
                also_in = ?others,
                "自然键存在于多个品类（探测），按确定顺序返回"
            );
        }

        // 修复索引
        self.index.ensure_present(key, &chosen);
        for category in &others {
            self.index.ensure_present(key, category);
        }

        Ok(Some(Resolution {
            record,
            owner_source: OwnerSource::Probe,
            ambiguous_with: others,
        }))
    }
}
