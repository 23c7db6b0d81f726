// ==========================================
// 产品目录门户 - 模板 API
// ==========================================
// 职责: 品类 CSV 模板下载与模板元数据查询
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::importer::{CsvTemplateEngine, TemplateInfo};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;

/// 模板输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateFormat {
    Csv,
    Json,
}

impl TemplateFormat {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "csv" => Some(TemplateFormat::Csv),
            "json" => Some(TemplateFormat::Json),
            _ => None,
        }
    }
}

/// 模板响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum TemplateOutput {
    Csv { filename: String, content: Vec<u8> },
    Json { info: TemplateInfo },
}

/// 模板API
pub struct TemplateApi {
    templates: Arc<CsvTemplateEngine>,
}

impl TemplateApi {
    pub fn new(templates: Arc<CsvTemplateEngine>) -> Self {
        Self { templates }
    }

    /// 获取品类模板
    ///
    /// # 参数
    /// - category: 品类标识
    /// - include_sample: 是否附带示例行（仅 CSV）
    /// - format: CSV 字节流或模板元数据 JSON
    ///
    /// # 返回
    /// - Err(ApiError::NotFound): 未知品类
    #[instrument(skip(self))]
    pub fn get_template(
        &self,
        category: &str,
        include_sample: bool,
        format: TemplateFormat,
    ) -> ApiResult<TemplateOutput> {
        match format {
            TemplateFormat::Csv => {
                let content = self.templates.generate(category, include_sample)?;
                let suffix = if include_sample { "_sample" } else { "_template" };
                Ok(TemplateOutput::Csv {
                    filename: format!("{}{}.csv", category.trim(), suffix),
                    content,
                })
            }
            TemplateFormat::Json => Ok(TemplateOutput::Json {
                info: self.templates.template_info(category)?,
            }),
        }
    }

    /// 批量获取模板元数据（任一品类未知则整体返回 NotFound）
    pub fn templates_info(&self, categories: &[String]) -> ApiResult<Vec<TemplateInfo>> {
        if categories.is_empty() {
            return Err(ApiError::ValidationError("品类列表不能为空".to_string()));
        }
        categories
            .iter()
            .map(|category| self.templates.template_info(category).map_err(ApiError::from))
            .collect()
    }
}
