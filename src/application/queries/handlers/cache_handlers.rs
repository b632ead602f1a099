//! Cache Query Handlers

use std::sync::Arc;

use crate::application::error::NarrationError;
use crate::application::playback::{PlaybackSequencer, PlaybackSnapshot};
use crate::application::ports::{AudioCachePort, AudioCodecPort};
use crate::application::queries::cache_queries::*;

/// GetCacheStatus Handler
pub struct GetCacheStatusHandler {
    cache: Arc<dyn AudioCachePort>,
}

impl GetCacheStatusHandler {
    pub fn new(cache: Arc<dyn AudioCachePort>) -> Self {
        Self { cache }
    }

    pub async fn handle(&self, query: GetCacheStatusQuery) -> Result<CacheStatus, NarrationError> {
        let status = match self.cache.get(&query.prayer_id).await? {
            Some(entry) => CacheStatus {
                prayer_id: query.prayer_id,
                cached: true,
                created_at: Some(entry.created_at_utc()),
                size_bytes: entry.size_bytes,
            },
            None => CacheStatus {
                prayer_id: query.prayer_id,
                cached: false,
                created_at: None,
                size_bytes: 0,
            },
        };
        Ok(status)
    }
}

/// ListCachedAudio Handler - 缓存页的列表与统计
pub struct ListCachedAudioHandler {
    cache: Arc<dyn AudioCachePort>,
    codec: Arc<dyn AudioCodecPort>,
}

impl ListCachedAudioHandler {
    pub fn new(cache: Arc<dyn AudioCachePort>, codec: Arc<dyn AudioCodecPort>) -> Self {
        Self { cache, codec }
    }

    pub async fn handle(
        &self,
        _query: ListCachedAudioQuery,
    ) -> Result<ListCachedAudioResponse, NarrationError> {
        let entries: Vec<_> = self
            .cache
            .list_all()
            .await?
            .into_iter()
            .map(|entry| CachedAudioSummary {
                duration_ms: self
                    .codec
                    .probe_wav(&entry.audio)
                    .map(|info| info.duration_ms)
                    .ok(),
                created_at: entry.created_at_utc(),
                prayer_id: entry.id,
                title: entry.title,
                size_bytes: entry.size_bytes,
            })
            .collect();

        let total_size_bytes = entries.iter().map(|e| e.size_bytes).sum();
        Ok(ListCachedAudioResponse {
            count: entries.len(),
            total_size_bytes,
            entries,
        })
    }
}

/// GetPlaybackStatus Handler
pub struct GetPlaybackStatusHandler {
    sequencer: Arc<PlaybackSequencer>,
}

impl GetPlaybackStatusHandler {
    pub fn new(sequencer: Arc<PlaybackSequencer>) -> Self {
        Self { sequencer }
    }

    pub fn handle(&self, _query: GetPlaybackStatusQuery) -> PlaybackSnapshot {
        self.sequencer.snapshot()
    }
}
