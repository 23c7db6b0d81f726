// ==========================================
// 产品目录门户 - 导入 API
// ==========================================
// 职责: 封装品类 CSV 导入与批次查询
// 说明: 部分行失败仍返回成功，失败明细在 ImportReport.failed
// ==========================================

use crate::api::error::{ApiError, ApiResult, ErrorResponse};
use crate::domain::import::{ImportBatch, ImportReport};
use crate::importer::CategoryImporter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

/// 批量导入中单个文件的结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchImportItem {
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<ImportReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorResponse>,
}

/// 导入API
pub struct ImportApi {
    importer: Arc<dyn CategoryImporter>,
}

impl ImportApi {
    pub fn new(importer: Arc<dyn CategoryImporter>) -> Self {
        Self { importer }
    }

    /// 导入单个品类文件
    ///
    /// # 返回
    /// - Ok(ImportReport): 含逐行失败明细
    /// - Err(ApiError::NotFound): 未知品类
    /// - Err(ApiError::ValidationError): 结构错误 / 超出上限
    pub async fn import_csv(&self, category: &str, content: Vec<u8>) -> ApiResult<ImportReport> {
        let result = self.importer.import_csv(category, content).await;
        match result {
            Ok(report) => {
                info!(
                    category = %category,
                    inserted = report.inserted,
                    updated = report.updated,
                    failed = report.failed_rows(),
                    "导入请求完成"
                );
                Ok(report)
            }
            Err(e) => {
                let err = ApiError::from(e);
                if !err.is_client_error() {
                    error!(category = %category, error = %err, "导入失败");
                }
                Err(err)
            }
        }
    }

    /// 并发导入多个品类文件（单个文件失败不影响其他文件）
    pub async fn batch_import(&self, files: Vec<(String, Vec<u8>)>) -> ApiResult<Vec<BatchImportItem>> {
        if files.is_empty() {
            return Err(ApiError::ValidationError("导入文件列表不能为空".to_string()));
        }
        let results = self.importer.batch_import(files).await;
        Ok(results
            .into_iter()
            .map(|(category, result)| match result {
                Ok(report) => BatchImportItem {
                    category,
                    report: Some(report),
                    error: None,
                },
                Err(e) => {
                    let err = ApiError::from(e);
                    if !err.is_client_error() {
                        error!(category = %category, error = %err, "批量导入中的文件失败");
                    }
                    BatchImportItem {
                        category,
                        report: None,
                        error: Some(ErrorResponse::from_error(&err)),
                    }
                }
            })
            .collect())
    }

    /// 最近的导入批次
    pub async fn list_recent_batches(
        &self,
        category: Option<String>,
        limit: usize,
    ) -> ApiResult<Vec<ImportBatch>> {
        Ok(self
            .importer
            .list_recent_batches(category, limit.clamp(1, 200))
            .await?)
    }
}
