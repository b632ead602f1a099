//! Clocked Sink - 无声卡的播放输出
//!
//! 按单元的实际时长计时（可按倍速缩放），不向设备输出声音。
//! 每个单元播放期间持有一个 `UnitHandle`，播放结束、出错或 future 被 drop 时释放。

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::application::ports::{
    AudioCodecPort, AudioSinkPort, ChunkMimeType, PlaybackError, PlaybackUnit,
};

/// 正在播放的单元句柄
struct UnitHandle {
    index: usize,
    live: Arc<AtomicUsize>,
}

impl UnitHandle {
    fn acquire(index: usize, live: Arc<AtomicUsize>) -> Self {
        live.fetch_add(1, Ordering::SeqCst);
        Self { index, live }
    }
}

impl Drop for UnitHandle {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
        tracing::trace!(index = self.index, "Unit handle released");
    }
}

/// 按音频时长计时的 sink
pub struct ClockedSink {
    codec: Arc<dyn AudioCodecPort>,
    /// 播放倍速，1.0 为实时
    speed: f64,
    live: Arc<AtomicUsize>,
}

impl ClockedSink {
    pub fn new(codec: Arc<dyn AudioCodecPort>, speed: f64) -> Self {
        let speed = if speed.is_finite() && speed > 0.0 {
            speed
        } else {
            tracing::warn!(speed = speed, "Invalid playback speed, falling back to 1.0");
            1.0
        };
        Self {
            codec,
            speed,
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// 尚未释放的单元句柄数
    pub fn live_handles(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    async fn duration_ms(&self, unit: &PlaybackUnit) -> Result<u64, PlaybackError> {
        let load_failed = |reason: String| PlaybackError::LoadFailed {
            index: unit.index,
            reason,
        };

        match unit.mime {
            ChunkMimeType::Wav => self
                .codec
                .probe_wav(&unit.audio)
                .map(|info| info.duration_ms)
                .map_err(|e| load_failed(e.to_string())),
            ChunkMimeType::Mpeg => {
                // MP3 没有可直接读取的时长字段，只能完整解码
                let codec = self.codec.clone();
                let audio = unit.audio.clone();
                let decoded = tokio::task::spawn_blocking(move || {
                    codec.decode(&audio, ChunkMimeType::Mpeg)
                })
                .await
                .map_err(|e| load_failed(e.to_string()))?;
                decoded
                    .map(|buffer| buffer.duration_ms())
                    .map_err(|e| load_failed(e.to_string()))
            }
        }
    }
}

#[async_trait]
impl AudioSinkPort for ClockedSink {
    async fn play(&self, unit: &PlaybackUnit) -> Result<(), PlaybackError> {
        let _handle = UnitHandle::acquire(unit.index, self.live.clone());

        let duration_ms = self.duration_ms(unit).await?;
        if duration_ms == 0 {
            return Err(PlaybackError::Rejected {
                index: unit.index,
                reason: "unit has no audio".to_string(),
            });
        }

        let wall = Duration::from_secs_f64(duration_ms as f64 / 1000.0 / self.speed);
        tracing::debug!(
            index = unit.index,
            mime = %unit.mime,
            duration_ms = duration_ms,
            wall_ms = wall.as_millis() as u64,
            "Playing unit"
        );

        tokio::time::sleep(wall).await;
        Ok(())
    }
}
