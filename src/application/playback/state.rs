//! 播放状态与会话上下文

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::application::ports::PlaybackUnit;
use crate::domain::prayer::PrayerId;

/// 合并模式的进度里程碑
pub mod milestones {
    /// 请求已发出
    pub const REQUEST_SENT: u8 = 0;
    /// 片段已收到，开始拼接
    pub const CHUNKS_RECEIVED: u8 = 50;
    /// 拼接完成 / 缓存命中
    pub const READY: u8 = 100;
}

/// 播放模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackMode {
    /// 先拼接成一段再播放，结果写入缓存
    #[default]
    Merge,
    /// 不拼接，逐个片段顺序播放
    Sequence,
}

impl std::fmt::Display for PlaybackMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackMode::Merge => write!(f, "merge"),
            PlaybackMode::Sequence => write!(f, "sequence"),
        }
    }
}

impl std::str::FromStr for PlaybackMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "merge" => Ok(PlaybackMode::Merge),
            "sequence" => Ok(PlaybackMode::Sequence),
            _ => Err(format!("unknown playback mode: {}", s)),
        }
    }
}

/// 播放器状态机
///
/// ```text
/// Idle -> Loading -> Playing(0) -> Playing(1) -> ... -> Completed
///   任意状态 --stop--> Stopped
///   任意状态 --失败--> Errored
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Loading,
    Playing(usize),
    Stopped,
    Completed,
    Errored(String),
}

impl PlaybackState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackState::Idle => "idle",
            PlaybackState::Loading => "loading",
            PlaybackState::Playing(_) => "playing",
            PlaybackState::Stopped => "stopped",
            PlaybackState::Completed => "completed",
            PlaybackState::Errored(_) => "errored",
        }
    }

    /// 是否有会话正在占用播放器
    pub fn is_active(&self) -> bool {
        matches!(self, PlaybackState::Loading | PlaybackState::Playing(_))
    }

    pub fn unit_index(&self) -> Option<usize> {
        match self {
            PlaybackState::Playing(index) => Some(*index),
            _ => None,
        }
    }
}

/// 顺序播放模式的进度：`round(100 × (index+1) / total)`
pub fn sequence_progress(index: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let percent = (100.0 * (index + 1) as f64 / total as f64).round();
    percent.clamp(0.0, 100.0) as u8
}

/// 播放会话（同一时刻至多一个处于活动状态）
#[derive(Debug, Clone)]
pub struct PlaybackSession {
    pub id: Uuid,
    pub prayer_id: PrayerId,
    pub mode: PlaybackMode,
    pub queue: Vec<PlaybackUnit>,
    pub current_index: usize,
    pub is_playing: bool,
    pub created_at: DateTime<Utc>,
}

impl PlaybackSession {
    pub fn new(prayer_id: PrayerId) -> Self {
        Self {
            id: Uuid::new_v4(),
            prayer_id,
            mode: PlaybackMode::default(),
            queue: Vec::new(),
            current_index: 0,
            is_playing: false,
            created_at: Utc::now(),
        }
    }

    /// 进入终态：丢弃剩余队列
    pub(crate) fn finish(&mut self) {
        self.queue.clear();
        self.is_playing = false;
    }
}

/// 会话凭据，由 `begin` 返回，后续操作据此确认会话未被替换
///
/// 会话被停止或替换时令牌被取消，加载阶段据此提前退出。
#[derive(Debug, Clone)]
pub struct SessionTicket {
    pub session_id: Uuid,
    pub prayer_id: PrayerId,
    pub(super) cancel: CancellationToken,
}

impl SessionTicket {
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// 会话被停止、替换或失败时完成
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }
}

/// 播放器当前状态快照（供 UI 查询）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackSnapshot {
    pub state: PlaybackState,
    pub progress: u8,
    pub session_id: Option<Uuid>,
    pub prayer_id: Option<PrayerId>,
    pub mode: Option<PlaybackMode>,
    pub current_index: usize,
    pub total_units: usize,
}
