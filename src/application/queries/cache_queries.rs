//! Cache Queries - 音频缓存查询

use chrono::{DateTime, Utc};

use crate::domain::prayer::PrayerId;

/// 单篇祈祷文的缓存状态
#[derive(Debug, Clone)]
pub struct GetCacheStatusQuery {
    pub prayer_id: PrayerId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheStatus {
    pub prayer_id: PrayerId,
    pub cached: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub size_bytes: u64,
}

impl CacheStatus {
    /// 缓存提示文字，未缓存时为 None
    pub fn label(&self) -> Option<String> {
        self.created_at
            .filter(|_| self.cached)
            .map(|at| format!("✅ Audio en caché ({})", at.format("%d/%m/%Y")))
    }
}

/// 列出全部缓存音频
#[derive(Debug, Clone, Default)]
pub struct ListCachedAudioQuery;

#[derive(Debug, Clone, PartialEq)]
pub struct CachedAudioSummary {
    pub prayer_id: PrayerId,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub size_bytes: u64,
    /// 从 WAV 头读出，头部损坏时为 None
    pub duration_ms: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct ListCachedAudioResponse {
    /// 最新的在前
    pub entries: Vec<CachedAudioSummary>,
    pub count: usize,
    pub total_size_bytes: u64,
}

impl ListCachedAudioResponse {
    /// 形如 `12.34 KB`
    pub fn total_size_label(&self) -> String {
        format!("{:.2} KB", self.total_size_bytes as f64 / 1024.0)
    }
}

/// 当前播放状态
#[derive(Debug, Clone, Default)]
pub struct GetPlaybackStatusQuery;
