//! Cache Command Handlers

use std::path::Path;
use std::sync::Arc;

use crate::application::commands::cache_commands::*;
use crate::application::error::NarrationError;
use crate::application::ports::{AudioCachePort, ChunkMimeType};
use crate::infrastructure::events::EventPublisher;

const STATUS_EXPORTED: &str = "✅ Audio descargado";

/// DeleteCachedAudio Handler
pub struct DeleteCachedAudioHandler {
    cache: Arc<dyn AudioCachePort>,
    events: Arc<EventPublisher>,
}

impl DeleteCachedAudioHandler {
    pub fn new(cache: Arc<dyn AudioCachePort>, events: Arc<EventPublisher>) -> Self {
        Self { cache, events }
    }

    pub async fn handle(
        &self,
        cmd: DeleteCachedAudioCommand,
    ) -> Result<DeleteCachedAudioResponse, NarrationError> {
        let existed = self.cache.exists(&cmd.prayer_id).await?;
        self.cache.delete(&cmd.prayer_id).await?;

        if existed {
            self.events
                .publish_cache_updated(cmd.prayer_id.as_str(), false);
        }

        Ok(DeleteCachedAudioResponse {
            prayer_id: cmd.prayer_id,
            existed,
        })
    }
}

/// ClearCache Handler
pub struct ClearCacheHandler {
    cache: Arc<dyn AudioCachePort>,
    events: Arc<EventPublisher>,
}

impl ClearCacheHandler {
    pub fn new(cache: Arc<dyn AudioCachePort>, events: Arc<EventPublisher>) -> Self {
        Self { cache, events }
    }

    pub async fn handle(&self, _cmd: ClearCacheCommand) -> Result<ClearCacheResponse, NarrationError> {
        let before = self.cache.stats().await;
        self.cache.clear().await?;

        tracing::info!(
            removed = before.total_entries,
            freed_bytes = before.total_size_bytes,
            "Audio cache cleared"
        );
        self.events.publish_cache_cleared(before.total_entries);

        Ok(ClearCacheResponse {
            removed: before.total_entries,
            freed_bytes: before.total_size_bytes,
        })
    }
}

/// ExportAudio Handler - 把缓存的 WAV 写到 `<dir>/<标题>.wav`
pub struct ExportAudioHandler {
    cache: Arc<dyn AudioCachePort>,
    events: Arc<EventPublisher>,
}

impl ExportAudioHandler {
    pub fn new(cache: Arc<dyn AudioCachePort>, events: Arc<EventPublisher>) -> Self {
        Self { cache, events }
    }

    pub async fn handle(
        &self,
        cmd: ExportAudioCommand,
    ) -> Result<ExportAudioResponse, NarrationError> {
        let entry = self
            .cache
            .get(&cmd.prayer_id)
            .await?
            .ok_or_else(|| NarrationError::not_found("Cached audio", cmd.prayer_id.as_str()))?;

        let stem = match file_stem(&entry.title) {
            stem if stem.is_empty() => entry.id.to_string(),
            stem => stem,
        };
        let path = cmd
            .dir
            .join(format!("{}.{}", stem, ChunkMimeType::Wav.extension()));

        write_file(&cmd.dir, &path, &entry.audio).await?;

        tracing::info!(
            prayer_id = %entry.id,
            path = %path.display(),
            size_bytes = entry.audio.len(),
            "Audio exported"
        );
        self.events.publish_status(None, STATUS_EXPORTED);

        Ok(ExportAudioResponse {
            path,
            size_bytes: entry.audio.len() as u64,
        })
    }
}

async fn write_file(dir: &Path, path: &Path, bytes: &[u8]) -> Result<(), NarrationError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| NarrationError::storage(format!("{}: {}", dir.display(), e)))?;
    tokio::fs::write(path, bytes)
        .await
        .map_err(|e| NarrationError::storage(format!("{}: {}", path.display(), e)))
}

/// 标题转为文件名：去掉路径分隔符等非法字符
fn file_stem(title: &str) -> String {
    title
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect::<String>()
        .trim_matches('.')
        .to_string()
}
