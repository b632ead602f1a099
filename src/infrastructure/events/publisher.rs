//! Event Publisher Implementation
//!
//! 播放器事件推送：状态、进度、状态栏消息、缓存与祷文列表变更

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::application::playback::PlaybackState;

/// 事件类型
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum PlaybackEvent {
    /// 播放状态变更
    StateChanged {
        session_id: String,
        state: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        unit_index: Option<usize>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// 进度变更（0..=100）
    Progress { session_id: String, percent: u8 },
    /// 状态栏消息
    Status {
        #[serde(skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
        message: String,
    },
    /// 会话结束
    SessionClosed { session_id: String, reason: String },
    /// 某篇祷文的缓存状态变化
    CacheUpdated { prayer_id: String, cached: bool },
    /// 缓存被清空
    CacheCleared { removed: usize },
    /// 祷文列表变化
    PrayersChanged { total: usize },
}

/// 事件发布器
///
/// 所有事件都发往全局通道；会话相关的事件额外发往该会话已注册的通道。
pub struct EventPublisher {
    /// session_id -> broadcast sender
    session_channels: DashMap<String, broadcast::Sender<PlaybackEvent>>,
    global_channel: broadcast::Sender<PlaybackEvent>,
}

impl EventPublisher {
    pub fn new() -> Self {
        let (global_tx, _) = broadcast::channel(100);
        Self {
            session_channels: DashMap::new(),
            global_channel: global_tx,
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 订阅全局事件
    pub fn subscribe_global(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.global_channel.subscribe()
    }

    /// 注册会话的事件通道
    pub fn register_session(&self, session_id: Uuid) -> broadcast::Receiver<PlaybackEvent> {
        let key = session_id.to_string();
        if let Some(sender) = self.session_channels.get(&key) {
            return sender.subscribe();
        }

        let (tx, rx) = broadcast::channel(100);
        self.session_channels.insert(key, tx);
        rx
    }

    /// 取消注册会话
    pub fn unregister_session(&self, session_id: Uuid) {
        self.session_channels.remove(&session_id.to_string());
    }

    /// 获取会话的事件接收器
    pub fn subscribe(&self, session_id: Uuid) -> Option<broadcast::Receiver<PlaybackEvent>> {
        self.session_channels
            .get(&session_id.to_string())
            .map(|s| s.subscribe())
    }

    /// 发布状态变更事件
    pub fn publish_state(&self, session_id: Uuid, state: &PlaybackState) {
        let error = match state {
            PlaybackState::Errored(message) => Some(message.clone()),
            _ => None,
        };
        self.publish_to_session(
            session_id,
            PlaybackEvent::StateChanged {
                session_id: session_id.to_string(),
                state: state.as_str().to_string(),
                unit_index: state.unit_index(),
                error,
            },
        );
    }

    /// 发布进度事件
    pub fn publish_progress(&self, session_id: Uuid, percent: u8) {
        self.publish_to_session(
            session_id,
            PlaybackEvent::Progress {
                session_id: session_id.to_string(),
                percent,
            },
        );
    }

    /// 发布状态栏消息
    pub fn publish_status(&self, session_id: Option<Uuid>, message: &str) {
        let event = PlaybackEvent::Status {
            session_id: session_id.map(|id| id.to_string()),
            message: message.to_string(),
        };
        match session_id {
            Some(id) => self.publish_to_session(id, event),
            None => self.publish_global(event),
        }
    }

    /// 发布会话结束事件，并移除会话通道
    pub fn publish_session_closed(&self, session_id: Uuid, reason: &str) {
        self.publish_to_session(
            session_id,
            PlaybackEvent::SessionClosed {
                session_id: session_id.to_string(),
                reason: reason.to_string(),
            },
        );
        self.unregister_session(session_id);
    }

    /// 发布缓存状态变化（全局广播）
    pub fn publish_cache_updated(&self, prayer_id: &str, cached: bool) {
        self.publish_global(PlaybackEvent::CacheUpdated {
            prayer_id: prayer_id.to_string(),
            cached,
        });
    }

    /// 发布缓存清空事件（全局广播）
    pub fn publish_cache_cleared(&self, removed: usize) {
        self.publish_global(PlaybackEvent::CacheCleared { removed });
    }

    /// 发布祷文列表变化（全局广播）
    pub fn publish_prayers_changed(&self, total: usize) {
        self.publish_global(PlaybackEvent::PrayersChanged { total });
    }

    fn publish_global(&self, event: PlaybackEvent) {
        if let Err(e) = self.global_channel.send(event) {
            tracing::trace!(error = %e, "Failed to publish global event (no receivers)");
        }
    }

    /// 发布事件到指定会话（同时进入全局通道）
    fn publish_to_session(&self, session_id: Uuid, event: PlaybackEvent) {
        if let Some(sender) = self.session_channels.get(&session_id.to_string()) {
            if let Err(e) = sender.send(event.clone()) {
                tracing::debug!(
                    session_id = %session_id,
                    error = %e,
                    "Failed to publish event (no receivers)"
                );
            }
        }
        self.publish_global(event);
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new()
    }
}
