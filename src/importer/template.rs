// ==========================================
// 产品目录门户 - CSV 模板引擎
// ==========================================
// 职责: 由品类描述符派生表头/示例行，并按同一契约解析上传文件
// 契约: 表头 = 列 label（按 sort_order）；表头按位置匹配，只校验字段数
// ==========================================

use crate::domain::category::{CategoryDescriptor, ColumnDescriptor};
use crate::domain::import::{CellFailure, FailureReason, ValidationOutcome};
use crate::domain::types::ColumnDataType;
use crate::engine::schema_registry::SchemaRegistry;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_mapper::FieldMapper as FieldMapperImpl;
use crate::importer::file_parser::CsvParser;
use crate::importer::importer_trait::{FieldMapper, FileParser, RawRow};
use csv::{QuoteStyle, WriterBuilder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// 模板元数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateInfo {
    pub category: String,
    pub display_name: String,
    pub headers: Vec<String>,
    pub types: Vec<ColumnDataType>,
    pub units: Vec<Option<String>>,
    pub sample_available: bool,
}

impl TemplateInfo {
    pub fn from_descriptor(desc: &CategoryDescriptor) -> Self {
        Self {
            category: desc.id.clone(),
            display_name: desc.display_name.clone(),
            headers: desc.columns.iter().map(|c| c.label.clone()).collect(),
            types: desc.columns.iter().map(|c| c.data_type).collect(),
            units: desc.columns.iter().map(|c| c.unit.clone()).collect(),
            sample_available: !desc.columns.is_empty(),
        }
    }
}

/// 示例单元格（按列类型）
fn sample_cell(desc: &CategoryDescriptor, column: &ColumnDescriptor) -> String {
    if column.is_natural_key() {
        return format!("{}-SAMPLE-001", desc.id.to_uppercase());
    }
    match column.data_type {
        ColumnDataType::Number => match column.format.decimal_places {
            Some(places) => format!("{:.*}", places as usize, 12.34),
            None => "12.34".to_string(),
        },
        ColumnDataType::Boolean => "true".to_string(),
        ColumnDataType::ImageReference => "images/sample.png".to_string(),
        ColumnDataType::Text => format!("Sample \"{}\", standard", column.label),
    }
}

// ==========================================
// CsvTemplateEngine
// ==========================================
pub struct CsvTemplateEngine {
    registry: Arc<SchemaRegistry>,
    parser: Box<dyn FileParser>,
    mapper: Box<dyn FieldMapper>,
}

impl CsvTemplateEngine {
    pub fn new(
        registry: Arc<SchemaRegistry>,
        parser: Box<dyn FileParser>,
        mapper: Box<dyn FieldMapper>,
    ) -> Self {
        Self {
            registry,
            parser,
            mapper,
        }
    }

    /// 默认组件: CsvParser + FieldMapper
    pub fn with_defaults(registry: Arc<SchemaRegistry>) -> Self {
        Self::new(
            registry,
            Box::new(CsvParser),
            Box::new(FieldMapperImpl::default()),
        )
    }

    pub fn descriptor(&self, category: &str) -> ImportResult<Arc<CategoryDescriptor>> {
        self.registry
            .resolve(category)
            .ok_or_else(|| ImportError::UnknownCategory(category.trim().to_string()))
    }

    pub fn template_info(&self, category: &str) -> ImportResult<TemplateInfo> {
        let desc = self.descriptor(category)?;
        Ok(TemplateInfo::from_descriptor(&desc))
    }

    /// 生成模板 CSV（可选示例行）
    pub fn generate(&self, category: &str, include_sample: bool) -> ImportResult<Vec<u8>> {
        let desc = self.descriptor(category)?;
        Self::render(&desc, include_sample)
    }

    pub fn render(desc: &CategoryDescriptor, include_sample: bool) -> ImportResult<Vec<u8>> {
        let mut writer = WriterBuilder::new()
            .quote_style(QuoteStyle::Necessary)
            .from_writer(Vec::new());

        writer
            .write_record(desc.columns.iter().map(|c| c.label.as_str()))
            .map_err(|e| ImportError::CsvWriteError(e.to_string()))?;
        if include_sample {
            writer
                .write_record(desc.columns.iter().map(|c| sample_cell(desc, c)))
                .map_err(|e| ImportError::CsvWriteError(e.to_string()))?;
        }

        writer
            .into_inner()
            .map_err(|e| ImportError::CsvWriteError(e.to_string()))
    }

    /// 按品类解析上传内容
    pub fn parse(&self, category: &str, content: &[u8]) -> ImportResult<Vec<ValidationOutcome>> {
        let desc = self.descriptor(category)?;
        self.parse_with(&desc, content)
    }

    /// 解析并逐行校验；表头字段数不符时整文件失败
    pub fn parse_with(
        &self,
        desc: &CategoryDescriptor,
        content: &[u8],
    ) -> ImportResult<Vec<ValidationOutcome>> {
        let parsed = self.parser.parse_content(content)?;

        if parsed.headers.len() != desc.columns.len() {
            return Err(ImportError::HeaderMismatch {
                expected: desc.columns.len(),
                actual: parsed.headers.len(),
            });
        }
        let renamed: Vec<(&str, &str)> = desc
            .columns
            .iter()
            .zip(parsed.headers.iter())
            .filter(|(column, header)| !column.label.eq_ignore_ascii_case(header))
            .map(|(column, header)| (column.label.as_str(), header.as_str()))
            .collect();
        if !renamed.is_empty() {
            warn!(category = %desc.id, renamed = ?renamed, "表头与模板不一致，按位置匹配");
        }

        let outcomes: Vec<ValidationOutcome> = parsed
            .rows
            .iter()
            .map(|raw| match raw {
                RawRow::Fields(row) => self.mapper.map_row(desc, row),
                RawRow::Malformed { row_number, detail } => ValidationOutcome::Invalid {
                    row: *row_number,
                    failures: vec![CellFailure {
                        column: None,
                        raw_value: Some(detail.clone()),
                        reason: FailureReason::MalformedRow,
                    }],
                },
            })
            .collect();

        debug!(
            category = %desc.id,
            rows = outcomes.len(),
            valid = outcomes.iter().filter(|o| o.is_valid()).count(),
            "CSV 解析完成"
        );
        Ok(outcomes)
    }
}
