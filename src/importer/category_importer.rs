// ==========================================
// 产品目录门户 - 品类导入器实现
// ==========================================
// 职责: 整合导入流程，从上传内容到品类物理表
// 流程: 上限检查 → 解析/校验 → 建表 → Upsert → 批次记录
// 说明: 同一文件的行顺序写入；不同品类的文件可并发导入
// ==========================================

use crate::config::PortalConfigReader;
use crate::domain::import::{ImportBatch, ImportReport};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::importer_trait::CategoryImporter;
use crate::importer::template::CsvTemplateEngine;
use crate::importer::upsert_pipeline::UpsertPipeline;
use crate::repository::category_table_repo::ProductTableStore;
use crate::repository::import_batch_repo::ImportBatchRepository;
use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument};
use uuid::Uuid;

// ==========================================
// CategoryImporterImpl
// ==========================================
pub struct CategoryImporterImpl<C>
where
    C: PortalConfigReader,
{
    // 配置读取器
    config: C,

    // 导入组件
    templates: Arc<CsvTemplateEngine>,
    store: Arc<dyn ProductTableStore>,
    pipeline: Arc<UpsertPipeline>,

    // 批次记录
    batch_repo: Arc<ImportBatchRepository>,
}

impl<C> CategoryImporterImpl<C>
where
    C: PortalConfigReader,
{
    pub fn new(
        config: C,
        templates: Arc<CsvTemplateEngine>,
        store: Arc<dyn ProductTableStore>,
        pipeline: Arc<UpsertPipeline>,
        batch_repo: Arc<ImportBatchRepository>,
    ) -> Self {
        Self {
            config,
            templates,
            store,
            pipeline,
            batch_repo,
        }
    }
}

/// 写入导入批次记录；失败只记日志，不影响已完成的写入
fn record_batch(batch_repo: &ImportBatchRepository, report: &ImportReport, elapsed_ms: i64) {
    let failures_json = match serde_json::to_string(&report.failed) {
        Ok(json) => json,
        Err(e) => {
            error!(category = %report.category, error = %e, "失败明细序列化失败");
            "[]".to_string()
        }
    };
    let batch = ImportBatch {
        batch_id: Uuid::new_v4().to_string(),
        category: report.category.clone(),
        total_rows: report.total_rows as i64,
        inserted: report.inserted as i64,
        updated: report.updated as i64,
        unchanged: report.unchanged as i64,
        failed: report.failed_rows() as i64,
        elapsed_ms,
        failures_json,
        imported_at: Utc::now(),
    };
    match batch_repo.insert(&batch) {
        Ok(()) => info!(batch_id = %batch.batch_id, category = %batch.category, "导入批次已记录"),
        Err(e) => error!(category = %batch.category, error = %e, "导入批次记录失败"),
    }
}

#[async_trait]
impl<C> CategoryImporter for CategoryImporterImpl<C>
where
    C: PortalConfigReader + Send + Sync + 'static,
{
    #[instrument(skip(self, content), fields(bytes = content.len()))]
    async fn import_csv(&self, category: &str, content: Vec<u8>) -> ImportResult<ImportReport> {
        let start_time = Instant::now();

        let limits = self
            .config
            .get_import_limits()
            .await
            .map_err(|e| ImportError::ConfigReadError(e.to_string()))?;

        let category = category.to_string();
        let templates = Arc::clone(&self.templates);
        let store = Arc::clone(&self.store);
        let pipeline = Arc::clone(&self.pipeline);
        let batch_repo = Arc::clone(&self.batch_repo);

        // 描述符查找可能触发元数据重载，与后续步骤一起在阻塞线程池执行
        let report = tokio::task::spawn_blocking(move || -> ImportResult<ImportReport> {
            let desc = templates.descriptor(&category)?;

            // === 步骤 1: 文件大小上限 ===
            if content.len() > limits.max_file_bytes {
                return Err(ImportError::FileTooLarge {
                    actual: content.len(),
                    max: limits.max_file_bytes,
                });
            }

            // === 步骤 2: 解析与逐行校验 ===
            let outcomes = templates.parse_with(&desc, &content)?;

            // === 步骤 3: 行数上限（任何写入之前）===
            if outcomes.len() > limits.max_rows {
                return Err(ImportError::TooManyRows {
                    actual: outcomes.len(),
                    max: limits.max_rows,
                });
            }

            // === 步骤 4: 建表 + Upsert ===
            store.ensure_table(&desc)?;
            let report = pipeline.apply(&desc, outcomes);

            // === 步骤 5: 批次记录 ===
            let elapsed_ms = start_time.elapsed().as_millis() as i64;
            record_batch(&batch_repo, &report, elapsed_ms);
            Ok(report)
        })
        .await
        .map_err(|e| ImportError::InternalError(format!("导入任务异常: {}", e)))??;

        info!(
            category = %report.category,
            inserted = report.inserted,
            updated = report.updated,
            failed = report.failed_rows(),
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "CSV 导入完成"
        );
        Ok(report)
    }

    async fn batch_import(
        &self,
        files: Vec<(String, Vec<u8>)>,
    ) -> Vec<(String, ImportResult<ImportReport>)> {
        info!(files = files.len(), "开始批量导入");
        let tasks = files.into_iter().map(|(category, content)| async move {
            let result = self.import_csv(&category, content).await;
            (category, result)
        });
        join_all(tasks).await
    }

    async fn list_recent_batches(
        &self,
        category: Option<String>,
        limit: usize,
    ) -> ImportResult<Vec<ImportBatch>> {
        Ok(self.batch_repo.list_recent(category.as_deref(), limit)?)
    }
}
