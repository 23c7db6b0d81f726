// ==========================================
// 产品目录门户 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// 启动顺序: 连接 → 建核心表 → 配置 → 元数据 → 品类表 → 键索引 → 引擎 → API
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::{CatalogApi, ImportApi, SearchApi, TemplateApi};
use crate::config::{ConfigManager, PortalSettings};
use crate::db::{ensure_core_schema, open_sqlite_connection};
use crate::engine::{
    ArticleSource, CrossFamilyResolver, DownloadFileSource, KeyIndex, SchemaRegistry,
    SearchAggregator,
};
use crate::importer::{CategoryImporter, CategoryImporterImpl, CsvTemplateEngine, UpsertPipeline};
use crate::repository::{
    CategoryTableRepository, ContentRepository, ImportBatchRepository, KeyIndexRepository,
    MetadataRepository, ProductTableStore,
};

/// 应用状态
///
/// 包含所有API实例和共享资源，所有仓储共享同一个 SQLite 连接
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 启动时读取的配置快照
    pub settings: PortalSettings,

    /// 目录API（解析 / 品类 / 表格配置）
    pub catalog_api: Arc<CatalogApi>,

    /// 模板API
    pub template_api: Arc<TemplateApi>,

    /// 导入API
    pub import_api: Arc<ImportApi>,

    /// 检索API
    pub search_api: Arc<SearchApi>,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,

    /// 元数据仓储（管理端维护品类时使用）
    pub metadata_repo: Arc<MetadataRepository>,

    /// 文章/下载文件仓储
    pub content_repo: Arc<ContentRepository>,

    /// 元数据缓存
    pub registry: Arc<SchemaRegistry>,

    /// 自然键索引
    pub key_index: Arc<KeyIndex>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径（":memory:" 可用于测试）
    ///
    /// # 返回
    /// - Err(String): 数据库不可用或元数据无法加载
    ///
    /// # 说明
    /// 某个品类的物理表补齐失败只告警，不阻塞启动
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        // 创建数据库连接（共享连接）
        let conn = open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        ensure_core_schema(&conn).map_err(|e| format!("核心表初始化失败: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 初始化配置
        // ==========================================
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );
        let settings = config_manager
            .load_settings()
            .map_err(|e| format!("配置读取失败: {}", e))?;
        tracing::info!(
            refresh_interval_secs = settings.refresh_interval_secs,
            search_timeout_ms = settings.search.timeout_ms,
            max_rows = settings.import.max_rows,
            "门户配置已加载"
        );

        // ==========================================
        // 初始化Repository层
        // ==========================================
        let metadata_repo = Arc::new(MetadataRepository::from_connection(conn.clone()));
        let table_repo: Arc<dyn ProductTableStore> =
            Arc::new(CategoryTableRepository::from_connection(conn.clone()));
        let content_repo = Arc::new(ContentRepository::from_connection(conn.clone()));
        let key_index_repo = Arc::new(KeyIndexRepository::from_connection(conn.clone()));
        let batch_repo = Arc::new(ImportBatchRepository::from_connection(conn.clone()));

        // ==========================================
        // 元数据缓存 + 品类物理表
        // ==========================================
        let registry = Arc::new(
            SchemaRegistry::load(metadata_repo.clone(), settings.refresh_interval())
                .map_err(|e| format!("元数据加载失败: {}", e))?,
        );
        for desc in registry.list_categories() {
            if let Err(e) = table_repo.ensure_table(&desc) {
                tracing::warn!(category = %desc.id, error = %e, "品类物理表补齐失败(将继续启动)");
            }
        }

        // ==========================================
        // 自然键索引
        // ==========================================
        let key_index = Arc::new(KeyIndex::with_repository(key_index_repo));
        match key_index.warm() {
            Ok(entries) => tracing::info!(entries, "自然键索引已预热"),
            Err(e) => tracing::warn!(error = %e, "自然键索引预热失败，解析将退化为探测"),
        }

        // ==========================================
        // 初始化Engine层
        // ==========================================
        let resolver = Arc::new(CrossFamilyResolver::new(
            registry.clone(),
            table_repo.clone(),
            key_index.clone(),
            settings.probe_concurrency,
        ));
        let aggregator = Arc::new(
            SearchAggregator::new(registry.clone(), table_repo.clone(), settings.search.clone())
                .with_source(Arc::new(ArticleSource::new(
                    content_repo.clone(),
                    settings.search.snippet_max_chars,
                )))
                .with_source(Arc::new(DownloadFileSource::new(content_repo.clone()))),
        );

        // ==========================================
        // 初始化导入层
        // ==========================================
        let templates = Arc::new(CsvTemplateEngine::with_defaults(registry.clone()));
        let pipeline = Arc::new(UpsertPipeline::new(table_repo.clone(), key_index.clone()));
        let importer_config = ConfigManager::from_connection(conn.clone())
            .map_err(|e| format!("无法创建导入配置读取器: {}", e))?;
        let importer: Arc<dyn CategoryImporter> = Arc::new(CategoryImporterImpl::new(
            importer_config,
            templates.clone(),
            table_repo.clone(),
            pipeline,
            batch_repo,
        ));

        // ==========================================
        // 初始化API层
        // ==========================================
        let catalog_api = Arc::new(CatalogApi::new(registry.clone(), resolver, table_repo));
        let template_api = Arc::new(TemplateApi::new(templates));
        let import_api = Arc::new(ImportApi::new(importer));
        let search_api = Arc::new(SearchApi::new(aggregator));

        tracing::info!(categories = registry.list_categories().len(), "AppState初始化完成");

        Ok(Self {
            db_path,
            settings,
            catalog_api,
            template_api,
            import_api,
            search_api,
            config_manager,
            metadata_repo,
            content_repo,
            registry,
            key_index,
        })
    }
}

/// 获取默认数据库路径
///
/// 优先级: 环境变量 CATALOG_PORTAL_DB_PATH > 用户数据目录 > 当前目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("CATALOG_PORTAL_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./catalog_portal.db");

    if let Some(data_dir) = dirs::data_dir() {
        #[cfg(debug_assertions)]
        let dir = data_dir.join("catalog-portal-dev");

        #[cfg(not(debug_assertions))]
        let dir = data_dir.join("catalog-portal");

        // 目录创建失败时退回当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("catalog_portal.db");
        }
    }

    path.to_string_lossy().to_string()
}
