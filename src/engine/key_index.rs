// ==========================================
// 产品目录门户 - 自然键索引
// ==========================================
// 职责: part_number → 写入过该键的品类集合（内存 + product_key_index 持久化）
// 归属: 最近一次写入的品类为 owner，其余为 co-owner
// 并发: 单条目的更新在写锁内完成，读者看不到半更新的条目
// ==========================================

use crate::repository::key_index_repo::{KeyIndexEntry, KeyIndexRepository};
use crate::repository::RepositoryResult;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

/// 某个键的归属
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyOwnership {
    pub owner: String,
    /// 同时持有该键的其他品类（按写入先后倒序）
    pub others: Vec<String>,
}

impl KeyOwnership {
    pub fn is_ambiguous(&self) -> bool {
        !self.others.is_empty()
    }

    /// 品类在索引中的优先级（owner 为 0，未知为 None）
    pub fn priority_of(&self, category: &str) -> Option<usize> {
        if self.owner == category {
            return Some(0);
        }
        self.others.iter().position(|c| c == category).map(|p| p + 1)
    }
}

// ==========================================
// KeyIndex
// ==========================================
pub struct KeyIndex {
    // part_number → (category → write_seq)
    entries: RwLock<HashMap<String, HashMap<String, u64>>>,
    seq: AtomicU64,
    repo: Option<Arc<KeyIndexRepository>>,
}

impl KeyIndex {
    /// 仅内存（测试用）
    pub fn in_memory() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            seq: AtomicU64::new(0),
            repo: None,
        }
    }

    /// 带持久化
    pub fn with_repository(repo: Arc<KeyIndexRepository>) -> Self {
        Self {
            repo: Some(repo),
            ..Self::in_memory()
        }
    }

    /// 启动预热: 按 write_seq 回放持久化条目
    pub fn warm(&self) -> RepositoryResult<usize> {
        let Some(repo) = &self.repo else {
            return Ok(0);
        };
        let rows = repo.load_all()?;
        let count = rows.len();
        let mut max_seq = 0;
        {
            let mut entries = match self.entries.write() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            for row in rows {
                max_seq = max_seq.max(row.write_seq);
                entries
                    .entry(row.part_number)
                    .or_default()
                    .insert(row.category_id, row.write_seq);
            }
        }
        self.seq.fetch_max(max_seq, Ordering::AcqRel);
        info!(entries = count, max_seq, "自然键索引预热完成");
        Ok(count)
    }

    fn persist(&self, part_number: &str, category: &str, seq: u64) {
        if let Some(repo) = &self.repo {
            let entry = KeyIndexEntry {
                part_number: part_number.to_string(),
                category_id: category.to_string(),
                written_at: Utc::now(),
                write_seq: seq,
            };
            if let Err(e) = repo.record(&entry) {
                // 索引只是加速结构，持久化失败不影响写入结果
                warn!(key = %part_number, category = %category, error = %e, "索引持久化失败");
            }
        }
    }

    /// 记录一次写入（插入或改写），该品类成为 owner
    pub fn record_write(&self, part_number: &str, category: &str) {
        let seq = self.seq.fetch_add(1, Ordering::AcqRel) + 1;
        match self.entries.write() {
            Ok(mut entries) => {
                entries
                    .entry(part_number.to_string())
                    .or_default()
                    .insert(category.to_string(), seq);
            }
            Err(_) => {
                warn!(key = %part_number, "索引锁已损坏，跳过内存更新");
                return;
            }
        }
        self.persist(part_number, category, seq);
        debug!(key = %part_number, category = %category, seq, "索引已更新");
    }

    /// 确保品类出现在键的归属集合中，不改变 owner（内容未变的重复导入）
    pub fn ensure_present(&self, part_number: &str, category: &str) {
        let inserted_seq = match self.entries.write() {
            Ok(mut entries) => {
                let owners = entries.entry(part_number.to_string()).or_default();
                if owners.contains_key(category) {
                    None
                } else {
                    // 空集合时等同一次写入；否则排在现有归属之后
                    let seq = if owners.is_empty() {
                        self.seq.fetch_add(1, Ordering::AcqRel) + 1
                    } else {
                        0
                    };
                    owners.insert(category.to_string(), seq);
                    Some(seq)
                }
            }
            Err(_) => None,
        };
        if let Some(seq) = inserted_seq {
            self.persist(part_number, category, seq);
        }
    }

    /// 移除失效条目（owner 表中已不存在该键）
    pub fn forget(&self, part_number: &str, category: &str) {
        if let Ok(mut entries) = self.entries.write() {
            if let Some(owners) = entries.get_mut(part_number) {
                owners.remove(category);
                if owners.is_empty() {
                    entries.remove(part_number);
                }
            }
        }
        if let Some(repo) = &self.repo {
            if let Err(e) = repo.remove(part_number, category) {
                warn!(key = %part_number, category = %category, error = %e, "索引失效条目删除失败");
            }
        }
    }

    /// 查询键的归属；索引不可用（锁损坏）或无记录时返回 None
    pub fn lookup(&self, part_number: &str) -> Option<KeyOwnership> {
        let entries = self.entries.read().ok()?;
        let owners = entries.get(part_number)?;
        let mut ranked: Vec<(&String, &u64)> = owners.iter().collect();
        // seq 降序；同 seq 按品类名保证确定性
        ranked.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        let mut iter = ranked.into_iter().map(|(c, _)| c.clone());
        let owner = iter.next()?;
        Some(KeyOwnership {
            owner,
            others: iter.collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
