//! Audio Sink Port - 播放输出抽象
//!
//! 一次只播放一个单元；`play` 返回的 future 在单元播放结束时完成，
//! 被 drop 时必须立即停止播放并释放该单元占用的资源。

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use super::ChunkMimeType;

/// 播放错误
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("Failed to load unit {index}: {reason}")]
    LoadFailed { index: usize, reason: String },

    #[error("Playback rejected unit {index}: {reason}")]
    Rejected { index: usize, reason: String },

    #[error("Nothing to play")]
    EmptyQueue,

    #[error("Playback session was superseded")]
    Superseded,
}

/// 可播放单元：整段拼接音频或单个原始片段
#[derive(Debug, Clone)]
pub struct PlaybackUnit {
    pub index: usize,
    pub audio: Arc<[u8]>,
    pub mime: ChunkMimeType,
}

impl PlaybackUnit {
    pub fn new(index: usize, audio: impl Into<Arc<[u8]>>, mime: ChunkMimeType) -> Self {
        Self {
            index,
            audio: audio.into(),
            mime,
        }
    }

    pub fn size_bytes(&self) -> usize {
        self.audio.len()
    }
}

/// Audio Sink Port
#[async_trait]
pub trait AudioSinkPort: Send + Sync {
    /// 加载并播放单元，直到播放完成
    async fn play(&self, unit: &PlaybackUnit) -> Result<(), PlaybackError>;
}
