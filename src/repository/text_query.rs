// ==========================================
// 产品目录门户 - 文本检索参数
// ==========================================
// 职责: 把用户查询串转为 LIKE 参数（转义 % _ \）
// 说明: SQL 只负责预筛与粗排，匹配等级最终在引擎层重新计算
// 折叠: 两侧都按 Unicode 转小写（查询串用 to_lowercase，列用 fold_case()）
// ==========================================

use crate::db::FOLD_CASE_FN;
use crate::domain::types::MatchRank;

/// LIKE 转义字符
pub const LIKE_ESCAPE: char = '\\';

/// 转义 LIKE 通配符
pub fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if ch == '%' || ch == '_' || ch == LIKE_ESCAPE {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(ch);
    }
    escaped
}

/// 预处理后的文本检索参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextQuery {
    pub exact: String,    // 小写原文（= 比较）
    pub prefix: String,   // 'q%'
    pub contains: String, // '%q%'
}

impl TextQuery {
    pub fn new(query: &str) -> Self {
        let lowered = query.trim().to_lowercase();
        let escaped = escape_like(&lowered);
        Self {
            prefix: format!("{}%", escaped),
            contains: format!("%{}%", escaped),
            exact: lowered,
        }
    }

    /// WHERE 子句: 任一字段包含查询串
    ///
    /// 参数占位: ?1 = contains
    pub fn where_clause(fields: &[&str]) -> String {
        fields
            .iter()
            .map(|f| format!("{}(\"{}\") LIKE ?1 ESCAPE '\\'", FOLD_CASE_FN, f))
            .collect::<Vec<_>>()
            .join(" OR ")
    }

    /// 排序表达式: 取各字段最优匹配等级（0 精确 / 1 前缀 / 2 包含）
    ///
    /// 参数占位: ?2 = exact, ?3 = prefix
    pub fn rank_expr(fields: &[&str]) -> String {
        let cases: Vec<String> = fields
            .iter()
            .map(|f| {
                format!(
                    "CASE WHEN {fold}(\"{f}\") = ?2 THEN {exact} WHEN {fold}(\"{f}\") LIKE ?3 ESCAPE '\\' THEN {prefix} ELSE {substring} END",
                    fold = FOLD_CASE_FN,
                    f = f,
                    exact = MatchRank::Exact.sql_ordinal(),
                    prefix = MatchRank::Prefix.sql_ordinal(),
                    substring = MatchRank::Substring.sql_ordinal(),
                )
            })
            .collect();
        // 单参数 min() 在 SQLite 中是聚合函数
        if cases.len() == 1 {
            cases[0].clone()
        } else {
            format!("min({})", cases.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like_wildcards() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("CBL-001"), "CBL-001");
    }

    #[test]
    fn test_text_query_lowercases() {
        let q = TextQuery::new("  CBL-001 ");
        assert_eq!(q.exact, "cbl-001");
        assert_eq!(q.prefix, "cbl-001%");
        assert_eq!(q.contains, "%cbl-001%");
    }

    #[test]
    fn test_text_query_folds_non_ascii() {
        let q = TextQuery::new("Ärmel Leuchte");
        assert_eq!(q.exact, "ärmel leuchte");
        assert!(TextQuery::where_clause(&["name"]).starts_with("fold_case(\"name\")"));
    }

    #[test]
    fn test_rank_expr_single_field_has_no_min() {
        let expr = TextQuery::rank_expr(&["title"]);
        assert!(!expr.starts_with("min("));
        let expr = TextQuery::rank_expr(&["title", "filename"]);
        assert!(expr.starts_with("min("));
    }
}
