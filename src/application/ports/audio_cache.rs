//! Audio Cache Port - 合成音频缓存
//!
//! 定义音频缓存的抽象接口，具体实现使用 Sled

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use thiserror::Error;

use crate::domain::prayer::PrayerId;

/// Audio Cache 错误
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

/// 缓存条目
///
/// 每个祈祷文 ID 至多一条，后写覆盖先写，不会自动过期
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub id: PrayerId,
    pub title: String,
    /// 编码后的 WAV 字节
    pub audio: Vec<u8>,
    /// 写入时间（Unix 毫秒）
    pub created_at: i64,
    pub size_bytes: u64,
}

impl CacheEntry {
    pub fn created_at_utc(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.created_at)
            .single()
            .unwrap_or_else(Utc::now)
    }
}

/// Audio Cache Port
///
/// key = 祈祷文 ID
#[async_trait]
pub trait AudioCachePort: Send + Sync {
    /// 存储音频，覆盖同 ID 的旧条目
    async fn put(&self, id: &PrayerId, title: &str, audio: Vec<u8>)
        -> Result<CacheEntry, CacheError>;

    /// 获取条目，未命中返回 `Ok(None)`
    async fn get(&self, id: &PrayerId) -> Result<Option<CacheEntry>, CacheError>;

    /// 检查缓存是否存在
    async fn exists(&self, id: &PrayerId) -> Result<bool, CacheError>;

    /// 删除条目（不存在时为空操作）
    async fn delete(&self, id: &PrayerId) -> Result<(), CacheError>;

    /// 列出所有条目，最新的在前
    async fn list_all(&self) -> Result<Vec<CacheEntry>, CacheError>;

    /// 清空缓存
    async fn clear(&self) -> Result<(), CacheError>;

    /// 获取缓存统计信息
    async fn stats(&self) -> CacheStats;
}

/// 缓存统计信息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub total_entries: usize,
    pub total_size_bytes: u64,
    pub hit_count: u64,
    pub miss_count: u64,
}
