//! Playback Commands - 播放相关命令

use uuid::Uuid;

use crate::application::playback::PlaybackMode;
use crate::domain::prayer::PrayerId;

/// 朗读祈祷文命令 - 完整的合成/缓存/播放流程
#[derive(Debug, Clone)]
pub struct PlayPrayerCommand {
    pub prayer_id: PrayerId,
}

/// 朗读祈祷文响应
#[derive(Debug, Clone)]
pub struct PlayPrayerResponse {
    pub session_id: Uuid,
    pub prayer_id: PrayerId,
    pub mode: PlaybackMode,
    /// 播放队列长度
    pub units: usize,
    pub from_cache: bool,
    /// 加载期间被停止或被新会话替换时为 false
    pub started: bool,
}

/// 停止播放命令
#[derive(Debug, Clone, Default)]
pub struct StopPlaybackCommand;

/// 停止播放响应
#[derive(Debug, Clone)]
pub struct StopPlaybackResponse {
    pub session_id: Option<Uuid>,
    /// 停止前是否有会话在加载或播放
    pub was_active: bool,
}
