// ==========================================
// 产品目录门户 - 统一检索模型
// ==========================================

use crate::domain::types::{MatchRank, SourceKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

// ==========================================
// SearchResult - 单条检索结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub source_kind: SourceKind,
    pub identifier: String,
    pub title: String,
    pub snippet: String,
    pub score: f64,
    pub rank: MatchRank,
    pub source: String, // 品类标识 / articles / files
    pub updated_at: Option<DateTime<Utc>>,
}

impl SearchResult {
    /// 全局排序规则: 匹配等级升序 → 时间戳降序 → 标识升序（保证确定性）
    pub fn ranking_cmp(&self, other: &SearchResult) -> Ordering {
        self.rank
            .cmp(&other.rank)
            .then_with(|| other.updated_at.cmp(&self.updated_at))
            .then_with(|| self.identifier.cmp(&other.identifier))
            .then_with(|| self.source.cmp(&other.source))
    }
}

// ==========================================
// SourceTotals - 各来源命中总数
// ==========================================
// 口径: 来源实际匹配数，而非截断后返回数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceTotals {
    pub products: usize,
    pub articles: usize,
    pub files: usize,
}

impl SourceTotals {
    pub fn add(&mut self, kind: SourceKind, count: usize) {
        match kind {
            SourceKind::Product => self.products += count,
            SourceKind::Article => self.articles += count,
            SourceKind::DownloadableFile => self.files += count,
        }
    }

    pub fn get(&self, kind: SourceKind) -> usize {
        match kind {
            SourceKind::Product => self.products,
            SourceKind::Article => self.articles,
            SourceKind::DownloadableFile => self.files,
        }
    }
}

// ==========================================
// SearchResponse - 聚合检索响应
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub limit: usize,
    pub total: SourceTotals,
    pub results: Vec<SearchResult>,
    /// 超时或出错而被降级为 0 条的来源
    pub degraded_sources: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn result(id: &str, rank: MatchRank, day: u32) -> SearchResult {
        SearchResult {
            source_kind: SourceKind::Product,
            identifier: id.to_string(),
            title: id.to_string(),
            snippet: String::new(),
            score: rank.score(),
            rank,
            source: "cable".to_string(),
            updated_at: Some(Utc.with_ymd_and_hms(2026, 1, day, 0, 0, 0).unwrap()),
        }
    }

    #[test]
    fn test_ranking_rank_before_recency() {
        let mut items = vec![
            result("A", MatchRank::Substring, 20),
            result("B", MatchRank::Exact, 1),
            result("C", MatchRank::Prefix, 5),
            result("D", MatchRank::Prefix, 9),
        ];
        items.sort_by(|a, b| a.ranking_cmp(b));
        let ids: Vec<_> = items.iter().map(|r| r.identifier.as_str()).collect();
        assert_eq!(ids, vec!["B", "D", "C", "A"]);
    }
}
