//! Prayer Store Port - 自定义祈祷文持久化
//!
//! 所有用户祈祷文作为一个 JSON 对象保存在固定 key 下

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// 自定义祈祷文的存储 key
pub const CUSTOM_PRAYERS_KEY: &str = "customPrayers";

/// Store 错误
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// 持久化的单条祈祷文（id 为 map 的 key）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredPrayer {
    pub title: String,
    pub text: String,
}

/// id -> { title, text }
pub type CustomPrayerMap = BTreeMap<String, StoredPrayer>;

/// Prayer Store Port
///
/// 整体读写，没有部分更新
#[async_trait]
pub trait PrayerStorePort: Send + Sync {
    /// 读取全部自定义祈祷文，未保存过时返回空 map
    async fn load(&self) -> Result<CustomPrayerMap, StoreError>;

    /// 整体覆盖保存
    async fn save(&self, prayers: &CustomPrayerMap) -> Result<(), StoreError>;
}
