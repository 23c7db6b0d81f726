// ==========================================
// 产品目录门户 - 文件解析器实现
// ==========================================
// 阶段 0: 上传内容 → 表头 + 原始行
// 约定: 去除 UTF-8 BOM；完全空白的行跳过；行号从 1 开始（表头不计）
// ==========================================

use crate::domain::import::CsvRow;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::importer_trait::{FileParser, ParsedCsv, RawRow};
use csv::{ByteRecord, ReaderBuilder};
use tracing::debug;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl CsvParser {
    fn decode(record: &ByteRecord) -> Result<Vec<String>, String> {
        record
            .iter()
            .enumerate()
            .map(|(idx, field)| {
                std::str::from_utf8(field)
                    .map(|s| s.to_string())
                    .map_err(|e| format!("field {} is not valid UTF-8 ({})", idx + 1, e))
            })
            .collect()
    }
}

impl FileParser for CsvParser {
    fn parse_content(&self, content: &[u8]) -> ImportResult<ParsedCsv> {
        let content = content.strip_prefix(UTF8_BOM).unwrap_or(content);

        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true) // 字段数不符由映射阶段逐行判定
            .from_reader(content);
        let mut records = reader.byte_records();

        // 读取表头
        let header = match records.next() {
            None => return Err(ImportError::EmptyFile),
            Some(result) => result?,
        };
        let headers: Vec<String> = Self::decode(&header)
            .map_err(ImportError::CsvParseError)?
            .into_iter()
            .map(|h| h.trim().to_string())
            .collect();
        if headers.iter().all(|h| h.is_empty()) {
            return Err(ImportError::EmptyFile);
        }

        // 读取数据行
        let mut rows = Vec::new();
        for (idx, result) in records.enumerate() {
            let row_number = idx + 1;
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    rows.push(RawRow::Malformed {
                        row_number,
                        detail: e.to_string(),
                    });
                    continue;
                }
            };

            match Self::decode(&record) {
                Ok(cells) => {
                    // 跳过完全空白的行
                    if cells.iter().all(|c| c.trim().is_empty()) {
                        debug!(row_number, "跳过空白行");
                        continue;
                    }
                    rows.push(RawRow::Fields(CsvRow { row_number, cells }));
                }
                Err(detail) => rows.push(RawRow::Malformed { row_number, detail }),
            }
        }

        Ok(ParsedCsv { headers, rows })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_parser_quoting_and_bom() {
        let content = "\u{feff}Part Number,Name\nCBL-001,\"Cable, \"\"shielded\"\"\"\n";
        let parsed = CsvParser.parse_content(content.as_bytes()).unwrap();

        assert_eq!(parsed.headers, vec!["Part Number", "Name"]);
        assert_eq!(parsed.rows.len(), 1);
        match &parsed.rows[0] {
            RawRow::Fields(row) => {
                assert_eq!(row.row_number, 1);
                assert_eq!(row.cells[1], "Cable, \"shielded\"");
            }
            other => panic!("unexpected row: {:?}", other),
        }
    }

    #[test]
    fn test_csv_parser_empty_content() {
        assert!(matches!(
            CsvParser.parse_content(b""),
            Err(ImportError::EmptyFile)
        ));
    }

    #[test]
    fn test_csv_parser_skip_blank_rows_keeps_numbering() {
        let content = "Part Number,Length\nA-1,10\n,\nA-2,20\n";
        let parsed = CsvParser.parse_content(content.as_bytes()).unwrap();
        let numbers: Vec<_> = parsed.rows.iter().map(|r| r.row_number()).collect();
        assert_eq!(numbers, vec![1, 3]);
    }

    #[test]
    fn test_csv_parser_invalid_utf8_row_isolated() {
        let mut content = b"Part Number,Name\nA-1,ok\nA-2,".to_vec();
        content.extend_from_slice(&[0xff, 0xfe]);
        content.extend_from_slice(b"\nA-3,fine\n");

        let parsed = CsvParser.parse_content(&content).unwrap();
        assert_eq!(parsed.rows.len(), 3);
        assert!(matches!(parsed.rows[1], RawRow::Malformed { row_number: 2, .. }));
        assert!(matches!(parsed.rows[2], RawRow::Fields(_)));
    }
}
