//! Sled-based Audio Cache Implementation
//!
//! 记录布局（tree `audio_cache`）:
//! - `cache:<id>` -> bincode(InternalCacheEntry)，音频以 base64 WAV 保存
//! - `idx:title:<title>\0<id>` -> id
//! - `idx:ts:<020 毫秒时间戳>\0<id>` -> id
//!
//! 条目和索引在同一个事务里写入/删除。

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sled::transaction::{ConflictableTransactionError, TransactionError, TransactionResult};
use sled::{Db, Tree};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::application::ports::{AudioCachePort, CacheEntry, CacheError, CacheStats};
use crate::domain::prayer::PrayerId;

const TREE_NAME: &str = "audio_cache";
const ENTRY_PREFIX: &str = "cache:";
const TITLE_INDEX_PREFIX: &str = "idx:title:";
const TS_INDEX_PREFIX: &str = "idx:ts:";

/// 内部缓存条目
#[derive(Debug, Clone, Serialize, Deserialize)]
struct InternalCacheEntry {
    id: String,
    title: String,
    /// base64 编码的 WAV
    audio_data: String,
    timestamp: i64,
    size: u64,
}

impl InternalCacheEntry {
    fn into_entry(self) -> Result<CacheEntry, CacheError> {
        let audio = STANDARD
            .decode(self.audio_data.as_bytes())
            .map_err(|e| CacheError::SerializationError(e.to_string()))?;
        Ok(CacheEntry {
            id: PrayerId::new(self.id),
            title: self.title,
            audio,
            created_at: self.timestamp,
            size_bytes: self.size,
        })
    }
}

fn entry_key(id: &str) -> String {
    format!("{}{}", ENTRY_PREFIX, id)
}

fn title_index_key(title: &str, id: &str) -> String {
    format!("{}{}\0{}", TITLE_INDEX_PREFIX, title, id)
}

fn ts_index_key(timestamp: i64, id: &str) -> String {
    format!("{}{:020}\0{}", TS_INDEX_PREFIX, timestamp.max(0), id)
}

fn db_err(e: impl std::fmt::Display) -> CacheError {
    CacheError::DatabaseError(e.to_string())
}

fn tx_err(e: TransactionError<CacheError>) -> CacheError {
    match e {
        TransactionError::Abort(e) => e,
        TransactionError::Storage(e) => db_err(e),
    }
}

fn decode_internal(bytes: &[u8]) -> Result<InternalCacheEntry, CacheError> {
    bincode::deserialize(bytes).map_err(|e| CacheError::SerializationError(e.to_string()))
}

/// Sled 音频缓存
pub struct SledAudioCache {
    tree: Tree,
    current_size: AtomicU64,
    hit_count: AtomicU64,
    miss_count: AtomicU64,
}

impl SledAudioCache {
    /// 在已打开的数据库上创建缓存实例
    pub fn new(db: &Db) -> Result<Self, CacheError> {
        let tree = db.open_tree(TREE_NAME).map_err(db_err)?;

        // 计算当前缓存大小
        let current_size = Self::calculate_total_size(&tree)?;

        tracing::info!(
            entries = tree.scan_prefix(ENTRY_PREFIX).count(),
            current_size = current_size,
            "SledAudioCache initialized"
        );

        Ok(Self {
            tree,
            current_size: AtomicU64::new(current_size),
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
        })
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 计算所有条目的总大小
    fn calculate_total_size(tree: &Tree) -> Result<u64, CacheError> {
        let mut total = 0u64;
        for item in tree.scan_prefix(ENTRY_PREFIX) {
            let (_, value) = item.map_err(db_err)?;
            if let Ok(entry) = decode_internal(&value) {
                total += entry.size;
            }
        }
        Ok(total)
    }

    /// 按标题查找（二级索引）
    pub fn find_by_title(&self, title: &str) -> Result<Vec<PrayerId>, CacheError> {
        let prefix = format!("{}{}\0", TITLE_INDEX_PREFIX, title);
        self.tree
            .scan_prefix(prefix.as_bytes())
            .map(|item| {
                let (_, value) = item.map_err(db_err)?;
                String::from_utf8(value.to_vec())
                    .map(PrayerId::new)
                    .map_err(|e| CacheError::SerializationError(e.to_string()))
            })
            .collect()
    }

    /// 刷新数据库
    pub async fn flush(&self) -> Result<(), CacheError> {
        self.tree.flush_async().await.map_err(db_err)?;
        Ok(())
    }
}

#[async_trait]
impl AudioCachePort for SledAudioCache {
    async fn put(
        &self,
        id: &PrayerId,
        title: &str,
        audio: Vec<u8>,
    ) -> Result<CacheEntry, CacheError> {
        let size = audio.len() as u64;
        let timestamp = Utc::now().timestamp_millis();

        let record = InternalCacheEntry {
            id: id.to_string(),
            title: title.to_string(),
            audio_data: STANDARD.encode(&audio),
            timestamp,
            size,
        };
        let record_bytes =
            bincode::serialize(&record).map_err(|e| CacheError::SerializationError(e.to_string()))?;

        let key = entry_key(id.as_str());
        let title_key = title_index_key(title, id.as_str());
        let ts_key = ts_index_key(timestamp, id.as_str());

        let result: TransactionResult<Option<u64>, CacheError> = self.tree.transaction(|tx| {
            // 覆盖旧条目时先清理它的索引
            let previous = match tx.get(key.as_bytes())? {
                Some(old) => {
                    let old = decode_internal(&old).map_err(ConflictableTransactionError::Abort)?;
                    tx.remove(title_index_key(&old.title, &old.id).as_bytes())?;
                    tx.remove(ts_index_key(old.timestamp, &old.id).as_bytes())?;
                    Some(old.size)
                }
                None => None,
            };

            tx.insert(key.as_bytes(), record_bytes.as_slice())?;
            tx.insert(title_key.as_bytes(), id.as_str().as_bytes())?;
            tx.insert(ts_key.as_bytes(), id.as_str().as_bytes())?;
            Ok(previous)
        });
        let previous = result.map_err(tx_err)?;

        if let Some(old_size) = previous {
            self.current_size.fetch_sub(old_size, Ordering::Relaxed);
        }
        self.current_size.fetch_add(size, Ordering::Relaxed);

        tracing::debug!(
            id = %id,
            size_bytes = size,
            replaced = previous.is_some(),
            "Audio cached"
        );

        Ok(CacheEntry {
            id: id.clone(),
            title: title.to_string(),
            audio,
            created_at: timestamp,
            size_bytes: size,
        })
    }

    async fn get(&self, id: &PrayerId) -> Result<Option<CacheEntry>, CacheError> {
        match self.tree.get(entry_key(id.as_str())).map_err(db_err)? {
            Some(data) => {
                let entry = decode_internal(&data)?.into_entry()?;
                self.hit_count.fetch_add(1, Ordering::Relaxed);
                Ok(Some(entry))
            }
            None => {
                self.miss_count.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    async fn exists(&self, id: &PrayerId) -> Result<bool, CacheError> {
        self.tree
            .contains_key(entry_key(id.as_str()))
            .map_err(db_err)
    }

    async fn delete(&self, id: &PrayerId) -> Result<(), CacheError> {
        let key = entry_key(id.as_str());

        let result: TransactionResult<Option<u64>, CacheError> = self.tree.transaction(|tx| {
            match tx.remove(key.as_bytes())? {
                Some(old) => {
                    let old = decode_internal(&old).map_err(ConflictableTransactionError::Abort)?;
                    tx.remove(title_index_key(&old.title, &old.id).as_bytes())?;
                    tx.remove(ts_index_key(old.timestamp, &old.id).as_bytes())?;
                    Ok(Some(old.size))
                }
                None => Ok(None),
            }
        });

        if let Some(size) = result.map_err(tx_err)? {
            self.current_size.fetch_sub(size, Ordering::Relaxed);
            tracing::debug!(id = %id, size_bytes = size, "Cached audio deleted");
        }

        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<CacheEntry>, CacheError> {
        let mut entries = Vec::new();

        // 时间戳索引倒序 = 最新的在前
        for item in self.tree.scan_prefix(TS_INDEX_PREFIX).rev() {
            let (_, id) = item.map_err(db_err)?;
            let id = String::from_utf8(id.to_vec())
                .map_err(|e| CacheError::SerializationError(e.to_string()))?;

            if let Some(data) = self.tree.get(entry_key(&id)).map_err(db_err)? {
                entries.push(decode_internal(&data)?.into_entry()?);
            }
        }

        Ok(entries)
    }

    async fn clear(&self) -> Result<(), CacheError> {
        self.tree.clear().map_err(db_err)?;
        self.current_size.store(0, Ordering::Relaxed);
        tracing::info!("Audio cache cleared");
        Ok(())
    }

    async fn stats(&self) -> CacheStats {
        CacheStats {
            total_entries: self.tree.scan_prefix(ENTRY_PREFIX).count(),
            total_size_bytes: self.current_size.load(Ordering::Relaxed),
            hit_count: self.hit_count.load(Ordering::Relaxed),
            miss_count: self.miss_count.load(Ordering::Relaxed),
        }
    }
}
