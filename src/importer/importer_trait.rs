// ==========================================
// 产品目录门户 - 导入 Trait
// ==========================================
// 职责: 定义导入管道各阶段接口（不包含实现）
// 阶段: 解析 → 清洗 → 映射/校验 → Upsert
// ==========================================

use crate::domain::category::CategoryDescriptor;
use crate::domain::import::{CsvRow, ImportBatch, ImportReport, ValidationOutcome};
use crate::importer::error::ImportResult;
use async_trait::async_trait;

/// 解析出的一行（字段数不符等问题留给映射阶段判定）
#[derive(Debug, Clone, PartialEq)]
pub enum RawRow {
    Fields(CsvRow),
    /// 无法读取的行（如非 UTF-8），不影响后续行
    Malformed { row_number: usize, detail: String },
}

impl RawRow {
    pub fn row_number(&self) -> usize {
        match self {
            RawRow::Fields(row) => row.row_number,
            RawRow::Malformed { row_number, .. } => *row_number,
        }
    }
}

/// 解析结果: 表头 + 数据行（空白行已跳过，行号不重排）
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCsv {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

// ==========================================
// FileParser Trait
// ==========================================
// 用途: 文件解析（阶段 0）
// 实现者: CsvParser
pub trait FileParser: Send + Sync {
    /// 解析上传内容为原始行
    ///
    /// # 返回
    /// - Err(ImportError::EmptyFile): 没有表头行
    /// - Err(ImportError::CsvParseError): 表头本身无法读取
    fn parse_content(&self, content: &[u8]) -> ImportResult<ParsedCsv>;
}

// ==========================================
// DataCleaner Trait
// ==========================================
// 用途: 单元格清洗与类型转换（阶段 1）
// 实现者: DataCleanerImpl
pub trait DataCleaner: Send + Sync {
    /// TRIM；空白视为 None
    fn normalize_null(&self, raw: &str) -> Option<String>;

    /// 有限数值（NaN/inf 视为非法）
    fn parse_number(&self, raw: &str) -> Option<f64>;

    /// true/false/yes/no/1/0（大小写不敏感）
    fn parse_boolean(&self, raw: &str) -> Option<bool>;
}

// ==========================================
// FieldMapper Trait
// ==========================================
// 用途: 按描述符逐列映射并校验一行（阶段 2）
// 实现者: FieldMapperImpl
pub trait FieldMapper: Send + Sync {
    /// 单行 → 校验结果；列按 sort_order 与单元格位置对齐
    fn map_row(&self, desc: &CategoryDescriptor, row: &CsvRow) -> ValidationOutcome;
}

// ==========================================
// CategoryImporter Trait
// ==========================================
// 用途: 品类导入主接口
// 实现者: CategoryImporterImpl
#[async_trait]
pub trait CategoryImporter: Send + Sync {
    /// 导入单个品类的 CSV 内容
    ///
    /// # 返回
    /// - Ok(ImportReport): 部分行失败仍为 Ok，失败行列于 failed
    /// - Err: 未知品类、整文件结构错误、超出上限、存储不可用
    async fn import_csv(&self, category: &str, content: Vec<u8>) -> ImportResult<ImportReport>;

    /// 并发导入多个品类文件，每个文件互不影响
    async fn batch_import(
        &self,
        files: Vec<(String, Vec<u8>)>,
    ) -> Vec<(String, ImportResult<ImportReport>)>;

    /// 最近的导入批次（category 为 None 时不过滤）
    async fn list_recent_batches(
        &self,
        category: Option<String>,
        limit: usize,
    ) -> ImportResult<Vec<ImportBatch>>;
}
