// ==========================================
// 产品目录门户 - 非产品内容
// ==========================================
// 用途: 文章与下载文件集合，仅参与统一检索
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 文章
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// 下载文件元数据（文件本体由外部存储负责）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadFile {
    pub id: String,
    pub title: String,
    pub filename: String,
    pub collection: Option<String>, // 如 datasheet / manual / driver
    pub updated_at: DateTime<Utc>,
}
