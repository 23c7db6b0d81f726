// ==========================================
// 产品目录门户 - Schema Registry
// ==========================================
// 职责: 品类 → 描述符 的进程级缓存
// 并发: 快照整体替换（RwLock<Arc<快照>>），读者只会看到完整的旧快照或新快照
// 刷新: 超过刷新间隔或 invalidate() 后的下一次读取触发重载；重载失败沿用旧快照
//       异步调用方经 current() 读取，重载在阻塞线程池执行
// ==========================================

use crate::domain::category::{CategoryDescriptor, DescriptorError};
use crate::repository::error::RepositoryResult;
use crate::repository::metadata_repo::MetadataSource;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

// ==========================================
// RegistrySnapshot - 不可变快照
// ==========================================
#[derive(Debug)]
pub struct RegistrySnapshot {
    categories: Vec<Arc<CategoryDescriptor>>,
    by_id: HashMap<String, Arc<CategoryDescriptor>>,
    loaded_at: Instant,
    generation: u64,
}

impl RegistrySnapshot {
    /// 由元数据加载结果构建快照，跳过非法描述符
    fn build(loaded: Vec<RepositoryResult<CategoryDescriptor>>, generation: u64) -> Self {
        let mut categories: Vec<Arc<CategoryDescriptor>> = Vec::with_capacity(loaded.len());
        let mut by_id = HashMap::new();
        let mut tables: HashMap<String, String> = HashMap::new();

        for item in loaded {
            let desc = match item {
                Ok(desc) => desc,
                Err(e) => {
                    error!(error = %e, "品类元数据读取失败，已跳过");
                    continue;
                }
            };

            if let Err(e) = desc.validate() {
                error!(category = %desc.id, error = %e, "品类描述符非法，已跳过");
                continue;
            }
            if by_id.contains_key(&desc.id) {
                error!(category = %desc.id, "品类标识重复，已跳过");
                continue;
            }
            if let Some(first) = tables.get(&desc.table_name) {
                let e = DescriptorError::DuplicateTable {
                    table: desc.table_name.clone(),
                    first: first.clone(),
                    second: desc.id.clone(),
                };
                error!(category = %desc.id, error = %e, "物理表重复，已跳过");
                continue;
            }

            tables.insert(desc.table_name.clone(), desc.id.clone());
            let desc = Arc::new(desc);
            by_id.insert(desc.id.clone(), Arc::clone(&desc));
            categories.push(desc);
        }

        Self {
            categories,
            by_id,
            loaded_at: Instant::now(),
            generation,
        }
    }

    /// 沿用旧内容、重置计时（重载失败后避免每次读取都重试）
    fn retain(&self) -> Self {
        Self {
            categories: self.categories.clone(),
            by_id: self.by_id.clone(),
            loaded_at: Instant::now(),
            generation: self.generation,
        }
    }

    pub fn resolve(&self, category: &str) -> Option<Arc<CategoryDescriptor>> {
        self.by_id.get(category).cloned()
    }

    pub fn categories(&self) -> &[Arc<CategoryDescriptor>] {
        &self.categories
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

// ==========================================
// SchemaRegistry
// ==========================================
pub struct SchemaRegistry {
    source: Arc<dyn MetadataSource>,
    snapshot: RwLock<Arc<RegistrySnapshot>>,
    refresh_interval: Duration,
    stale: AtomicBool,
    generation: AtomicU64,
    reload_lock: Mutex<()>,
}

impl SchemaRegistry {
    /// 首次加载（元数据存储不可达时返回错误）
    pub fn load(
        source: Arc<dyn MetadataSource>,
        refresh_interval: Duration,
    ) -> RepositoryResult<Self> {
        let loaded = source.load_descriptors()?;
        let snapshot = RegistrySnapshot::build(loaded, 1);
        info!(categories = snapshot.len(), "Schema Registry 加载完成");

        Ok(Self {
            source,
            snapshot: RwLock::new(Arc::new(snapshot)),
            refresh_interval,
            stale: AtomicBool::new(false),
            generation: AtomicU64::new(1),
            reload_lock: Mutex::new(()),
        })
    }

    fn read_snapshot(&self) -> Arc<RegistrySnapshot> {
        match self.snapshot.read() {
            Ok(guard) => Arc::clone(&*guard),
            Err(poisoned) => Arc::clone(&*poisoned.into_inner()),
        }
    }

    fn swap_snapshot(&self, next: RegistrySnapshot) {
        let next = Arc::new(next);
        match self.snapshot.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }

    fn needs_refresh(&self, current: &RegistrySnapshot) -> bool {
        current.loaded_at.elapsed() >= self.refresh_interval || self.stale.load(Ordering::Acquire)
    }

    /// 当前快照（必要时先刷新，同步执行）
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        let current = self.read_snapshot();
        if !self.needs_refresh(&current) {
            return current;
        }

        // 同一时刻只允许一个重载；其余读者直接使用旧快照
        let _guard = match self.reload_lock.try_lock() {
            Ok(guard) => guard,
            Err(_) => return current,
        };
        self.stale.store(false, Ordering::Release);

        match self.reload() {
            Ok(_) => self.read_snapshot(),
            Err(e) => {
                warn!(error = %e, "元数据重载失败，继续使用旧快照");
                self.swap_snapshot(current.retain());
                self.read_snapshot()
            }
        }
    }

    /// 当前快照；需要重载时放到阻塞线程池，不占用运行时工作线程
    pub async fn current(self: &Arc<Self>) -> Arc<RegistrySnapshot> {
        let current = self.read_snapshot();
        if !self.needs_refresh(&current) {
            return current;
        }
        let registry = Arc::clone(self);
        match tokio::task::spawn_blocking(move || registry.snapshot()).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "元数据重载任务异常，继续使用旧快照");
                current
            }
        }
    }

    /// 强制从元数据存储重载，返回可用品类数
    pub fn reload(&self) -> RepositoryResult<usize> {
        let loaded = self.source.load_descriptors()?;
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let next = RegistrySnapshot::build(loaded, generation);
        let count = next.len();
        self.swap_snapshot(next);
        info!(categories = count, generation, "Schema Registry 已重载");
        Ok(count)
    }

    /// 管理端修改元数据后调用；下一次读取时重载
    pub fn invalidate(&self) {
        self.stale.store(true, Ordering::Release);
        info!("Schema Registry 已标记失效");
    }

    /// 按品类标识查找描述符；未知品类返回 None
    pub fn resolve(&self, category: &str) -> Option<Arc<CategoryDescriptor>> {
        self.snapshot().resolve(category.trim())
    }

    /// 全部品类（按元数据 sort_order）
    pub fn list_categories(&self) -> Vec<Arc<CategoryDescriptor>> {
        self.snapshot().categories().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::category::ColumnDescriptor;
    use crate::domain::types::ColumnDataType;
    use crate::repository::error::RepositoryError;
    use std::sync::atomic::AtomicUsize;

    fn desc(id: &str, table: &str) -> CategoryDescriptor {
        CategoryDescriptor::new(
            id,
            id,
            table,
            vec![ColumnDescriptor::basic(
                "part_number",
                "Part Number",
                ColumnDataType::Text,
                1,
            )],
            vec![],
        )
    }

    /// 可编程的元数据来源
    struct ScriptedSource {
        descriptors: Mutex<Vec<CategoryDescriptor>>,
        fail: AtomicBool,
        loads: AtomicUsize,
        last_thread: Mutex<Option<std::thread::ThreadId>>,
    }

    impl ScriptedSource {
        fn new(descriptors: Vec<CategoryDescriptor>) -> Arc<Self> {
            Arc::new(Self {
                descriptors: Mutex::new(descriptors),
                fail: AtomicBool::new(false),
                loads: AtomicUsize::new(0),
                last_thread: Mutex::new(None),
            })
        }
    }

    impl MetadataSource for ScriptedSource {
        fn load_descriptors(&self) -> RepositoryResult<Vec<RepositoryResult<CategoryDescriptor>>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            *self.last_thread.lock().unwrap() = Some(std::thread::current().id());
            if self.fail.load(Ordering::SeqCst) {
                return Err(RepositoryError::DatabaseConnectionError("down".to_string()));
            }
            Ok(self
                .descriptors
                .lock()
                .unwrap()
                .iter()
                .cloned()
                .map(Ok)
                .collect())
        }
    }

    #[test]
    fn test_invalid_and_duplicate_tables_skipped() {
        let mut broken = desc("broken", "broken_products");
        broken.columns.clear();
        let source = ScriptedSource::new(vec![
            desc("cable", "cable_products"),
            broken,
            desc("cable2", "cable_products"),
            desc("light", "light_products"),
        ]);
        let registry = SchemaRegistry::load(source, Duration::from_secs(300)).unwrap();

        let ids: Vec<_> = registry
            .list_categories()
            .iter()
            .map(|d| d.id.clone())
            .collect();
        assert_eq!(ids, vec!["cable", "light"]);
        assert!(registry.resolve("cable2").is_none());
        assert!(registry.resolve("unknown").is_none());
    }

    #[test]
    fn test_invalidate_reloads_on_next_read() {
        let source = ScriptedSource::new(vec![desc("cable", "cable_products")]);
        let registry =
            SchemaRegistry::load(source.clone(), Duration::from_secs(300)).unwrap();
        assert!(registry.resolve("light").is_none());

        source
            .descriptors
            .lock()
            .unwrap()
            .push(desc("light", "light_products"));
        // 未失效前继续使用缓存
        assert!(registry.resolve("light").is_none());

        registry.invalidate();
        assert!(registry.resolve("light").is_some());
        assert_eq!(registry.snapshot().generation(), 2);
    }

    #[test]
    fn test_failed_reload_keeps_old_snapshot() {
        let source = ScriptedSource::new(vec![desc("cable", "cable_products")]);
        let registry =
            SchemaRegistry::load(source.clone(), Duration::from_secs(300)).unwrap();

        source.fail.store(true, Ordering::SeqCst);
        registry.invalidate();
        assert!(registry.resolve("cable").is_some());
        assert!(registry.reload().is_err());
        assert_eq!(registry.list_categories().len(), 1);
    }

    #[tokio::test]
    async fn test_current_reloads_on_blocking_pool() {
        let source = ScriptedSource::new(vec![desc("cable", "cable_products")]);
        let registry = Arc::new(
            SchemaRegistry::load(source.clone(), Duration::from_secs(300)).unwrap(),
        );
        let caller = std::thread::current().id();

        // 未失效时直接返回缓存快照
        assert_eq!(registry.current().await.generation(), 1);
        assert_eq!(source.loads.load(Ordering::SeqCst), 1);

        source
            .descriptors
            .lock()
            .unwrap()
            .push(desc("light", "light_products"));
        registry.invalidate();

        let snapshot = registry.current().await;
        assert_eq!(snapshot.generation(), 2);
        assert!(snapshot.resolve("light").is_some());
        assert_ne!(source.last_thread.lock().unwrap().unwrap(), caller);
    }

    #[test]
    fn test_expired_interval_triggers_reload() {
        let source = ScriptedSource::new(vec![desc("cable", "cable_products")]);
        let registry = SchemaRegistry::load(source.clone(), Duration::ZERO).unwrap();
        registry.resolve("cable");
        registry.resolve("cable");
        assert!(source.loads.load(Ordering::SeqCst) >= 3);
    }
}
