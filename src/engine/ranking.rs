// ==========================================
// 产品目录门户 - 检索匹配规则
// ==========================================
// 规则: 精确 > 前缀 > 包含（大小写不敏感）
// ==========================================

use crate::domain::types::MatchRank;

/// 单个候选文本相对查询串的匹配等级（query 需已小写）
pub fn match_rank(candidate: &str, query_lower: &str) -> Option<MatchRank> {
    if query_lower.is_empty() {
        return None;
    }
    let candidate = candidate.trim().to_lowercase();
    if candidate == query_lower {
        Some(MatchRank::Exact)
    } else if candidate.starts_with(query_lower) {
        Some(MatchRank::Prefix)
    } else if candidate.contains(query_lower) {
        Some(MatchRank::Substring)
    } else {
        None
    }
}

/// 多个候选字段中的最佳匹配等级
pub fn best_rank<'a, I>(candidates: I, query_lower: &str) -> Option<MatchRank>
where
    I: IntoIterator<Item = &'a str>,
{
    candidates
        .into_iter()
        .filter_map(|c| match_rank(c, query_lower))
        .min()
}

/// 按字符截断摘要（不切断多字节字符）
pub fn truncate_snippet(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_rank_levels() {
        assert_eq!(match_rank("CBL-001", "cbl-001"), Some(MatchRank::Exact));
        assert_eq!(match_rank("CBL-0011", "cbl-001"), Some(MatchRank::Prefix));
        assert_eq!(match_rank("XCBL-001", "cbl-001"), Some(MatchRank::Substring));
        assert_eq!(match_rank("LNS-001", "cbl-001"), None);
    }

    #[test]
    fn test_best_rank_takes_strongest_field() {
        let fields = ["Patch cable CBL-001", "CBL-001"];
        assert_eq!(
            best_rank(fields.iter().copied(), "cbl-001"),
            Some(MatchRank::Exact)
        );
    }

    #[test]
    fn test_truncate_snippet_multibyte() {
        assert_eq!(truncate_snippet("屏蔽双绞线缆", 4), "屏蔽双…");
        assert_eq!(truncate_snippet("short", 10), "short");
    }
}
