//! Playback Sequencer - 播放控制循环
//!
//! 持有唯一的播放会话。控制循环逐个等待单元播放完成的 future，
//! 一次只有一个单元在播放，不预取。停止时取消令牌，drop 正在播放的 future，
//! 由 sink 释放该单元的资源。
//!
//! 会话的取消令牌在 `begin` 时创建并随凭据交给调用方，加载阶段
//! （合成、解码、写缓存）同样受其约束。

use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::state::{
    sequence_progress, PlaybackMode, PlaybackSession, PlaybackSnapshot, PlaybackState,
    SessionTicket,
};
use crate::application::ports::{AudioSinkPort, PlaybackError, PlaybackUnit};
use crate::domain::prayer::PrayerId;
use crate::infrastructure::events::{EventPublisher, PlaybackEvent};

const STATUS_PLAYING: &str = "🔊 Reproduciendo...";
const STATUS_COMPLETED: &str = "✅ Reproducción completada";
const STATUS_PLAYBACK_FAILED: &str = "❌ Error al reproducir";

/// 控制循环任务
///
/// 循环退出时 `done` 的发送端被 drop，任意数量的等待者都能观察到。
struct Worker {
    handle: JoinHandle<()>,
    done: watch::Receiver<()>,
}

struct Inner {
    state: PlaybackState,
    progress: u8,
    session: Option<PlaybackSession>,
    cancel: Option<CancellationToken>,
    worker: Option<Worker>,
}

impl Inner {
    fn is_current(&self, session_id: Uuid) -> bool {
        self.session.as_ref().is_some_and(|s| s.id == session_id)
    }

    fn is_running(&self, session_id: Uuid) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.id == session_id && s.is_playing)
    }

    /// 进入终态：清空队列并交出取消令牌
    fn finish(&mut self, state: PlaybackState) -> Option<CancellationToken> {
        self.state = state;
        if let Some(session) = self.session.as_mut() {
            session.finish();
        }
        self.cancel.take()
    }

    fn worker_done(&self) -> Option<watch::Receiver<()>> {
        self.worker.as_ref().map(|w| w.done.clone())
    }
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// 等待控制循环退出；可随时取消，不影响其他等待者
async fn loop_exited(mut done: watch::Receiver<()>) {
    while done.changed().await.is_ok() {}
}

/// 播放控制器
pub struct PlaybackSequencer {
    sink: Arc<dyn AudioSinkPort>,
    events: Arc<EventPublisher>,
    inner: Arc<Mutex<Inner>>,
    loading: tokio::sync::Mutex<()>,
}

impl PlaybackSequencer {
    pub fn new(sink: Arc<dyn AudioSinkPort>, events: Arc<EventPublisher>) -> Self {
        Self {
            sink,
            events,
            inner: Arc::new(Mutex::new(Inner {
                state: PlaybackState::Idle,
                progress: 0,
                session: None,
                cancel: None,
                worker: None,
            })),
            loading: tokio::sync::Mutex::new(()),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 开始新会话：先停止正在进行的会话，然后进入 Loading
    pub async fn begin(&self, prayer_id: PrayerId) -> SessionTicket {
        if self.state().is_active() {
            tracing::info!("Stopping active session before starting a new one");
            self.stop().await;
        } else {
            self.wait().await;
        }

        let session = PlaybackSession::new(prayer_id.clone());
        let cancel = CancellationToken::new();
        let ticket = SessionTicket {
            session_id: session.id,
            prayer_id,
            cancel: cancel.clone(),
        };

        {
            let mut inner = lock(&self.inner);
            inner.state = PlaybackState::Loading;
            inner.progress = 0;
            inner.session = Some(session);
            // 旧会话的令牌已在 stop 中取消
            inner.cancel = Some(cancel);
        }

        // 通道在会话结束时移除
        drop(self.events.register_session(ticket.session_id));

        tracing::info!(
            session_id = %ticket.session_id,
            prayer_id = %ticket.prayer_id,
            "Playback session created"
        );
        self.events
            .publish_state(ticket.session_id, &PlaybackState::Loading);
        self.events.publish_progress(ticket.session_id, 0);

        ticket
    }

    /// 加载阶段独占：同一时刻至多一个会话在合成或解码
    ///
    /// 被替换的会话须在其令牌取消后尽快释放此锁。
    pub async fn load_slot(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.loading.lock().await
    }

    /// 装入播放队列并启动控制循环
    pub fn start(
        &self,
        ticket: &SessionTicket,
        mode: PlaybackMode,
        units: Vec<PlaybackUnit>,
    ) -> Result<(), PlaybackError> {
        if units.is_empty() {
            let err = PlaybackError::EmptyQueue;
            self.fail(ticket, &err.to_string());
            return Err(err);
        }

        let session_id = ticket.session_id;
        let total = units.len();

        // 状态切换、任务登记与首批事件在同一次加锁内完成，
        // stop 不会错过刚启动的循环
        let mut inner = lock(&self.inner);
        if !inner.is_current(session_id)
            || inner.state != PlaybackState::Loading
            || ticket.is_cancelled()
        {
            return Err(PlaybackError::Superseded);
        }
        if let Some(session) = inner.session.as_mut() {
            session.mode = mode;
            session.queue = units.clone();
            session.current_index = 0;
            session.is_playing = true;
        }
        inner.state = PlaybackState::Playing(0);
        if mode == PlaybackMode::Sequence {
            inner.progress = sequence_progress(0, total);
        }

        tracing::info!(
            session_id = %session_id,
            mode = %mode,
            units = total,
            "Playback started"
        );
        self.events
            .publish_state(session_id, &PlaybackState::Playing(0));
        self.events.publish_progress(session_id, inner.progress);
        self.events.publish_status(Some(session_id), STATUS_PLAYING);

        let (done_tx, done_rx) = watch::channel(());
        let handle = tokio::spawn({
            let inner = self.inner.clone();
            let sink = self.sink.clone();
            let events = self.events.clone();
            let token = ticket.cancel.clone();
            async move {
                let _done = done_tx;
                run_units(inner, sink, events, token, session_id, mode, units).await;
            }
        });
        inner.worker = Some(Worker {
            handle,
            done: done_rx,
        });
        Ok(())
    }

    /// 停止播放：任意状态 -> Stopped
    ///
    /// 等待控制循环退出后返回，此时正在播放的单元已被释放。
    pub async fn stop(&self) {
        let (session_id, token, done) = {
            let mut inner = lock(&self.inner);
            let token = inner.finish(PlaybackState::Stopped);
            inner.progress = 0;
            let session_id = inner.session.as_ref().map(|s| s.id);
            (session_id, token, inner.worker_done())
        };

        if let Some(token) = token {
            token.cancel();
        }
        if let Some(done) = done {
            loop_exited(done).await;
        }

        match session_id {
            Some(id) => {
                tracing::info!(session_id = %id, "Playback stopped");
                self.events.publish_state(id, &PlaybackState::Stopped);
                self.events.publish_progress(id, 0);
                self.events.publish_status(Some(id), "");
                self.events.publish_session_closed(id, "stopped");
            }
            None => self.events.publish_status(None, ""),
        }
    }

    /// 加载阶段失败：-> Errored
    ///
    /// 会话已被替换或已进入终态时忽略，返回 false。
    pub fn fail(&self, ticket: &SessionTicket, reason: &str) -> bool {
        let token = {
            let mut inner = lock(&self.inner);
            if !inner.is_current(ticket.session_id) || !inner.state.is_active() {
                return false;
            }
            inner.progress = 0;
            inner.finish(PlaybackState::Errored(reason.to_string()))
        };
        if let Some(token) = token {
            token.cancel();
        }

        tracing::warn!(
            session_id = %ticket.session_id,
            prayer_id = %ticket.prayer_id,
            reason = %reason,
            "Playback session failed"
        );
        self.events.publish_state(
            ticket.session_id,
            &PlaybackState::Errored(reason.to_string()),
        );
        self.events.publish_progress(ticket.session_id, 0);
        self.events.publish_session_closed(ticket.session_id, "errored");
        true
    }

    /// 合并模式的进度里程碑
    pub fn set_progress(&self, ticket: &SessionTicket, percent: u8) {
        let percent = percent.min(100);
        {
            let mut inner = lock(&self.inner);
            if !inner.is_current(ticket.session_id) || !inner.state.is_active() {
                return;
            }
            inner.progress = percent;
        }
        self.events.publish_progress(ticket.session_id, percent);
    }

    /// 状态栏消息
    pub fn report_status(&self, ticket: &SessionTicket, message: &str) {
        if lock(&self.inner).is_current(ticket.session_id) {
            self.events.publish_status(Some(ticket.session_id), message);
        }
    }

    pub fn state(&self) -> PlaybackState {
        lock(&self.inner).state.clone()
    }

    pub fn progress(&self) -> u8 {
        lock(&self.inner).progress
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        let inner = lock(&self.inner);
        let session = inner.session.as_ref();
        PlaybackSnapshot {
            state: inner.state.clone(),
            progress: inner.progress,
            session_id: session.map(|s| s.id),
            prayer_id: session.map(|s| s.prayer_id.clone()),
            mode: session.filter(|s| s.is_playing).map(|s| s.mode),
            current_index: session.map(|s| s.current_index).unwrap_or(0),
            total_units: session.map(|s| s.queue.len()).unwrap_or(0),
        }
    }

    /// 订阅所有播放事件
    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.events.subscribe_global()
    }

    /// 订阅单个会话的事件；会话已结束时返回 None
    pub fn subscribe_session(
        &self,
        ticket: &SessionTicket,
    ) -> Option<broadcast::Receiver<PlaybackEvent>> {
        self.events.subscribe(ticket.session_id)
    }

    /// 等待当前控制循环结束（完成、出错或被停止）
    ///
    /// 取消此 future 不影响之后的 `stop`。
    pub async fn wait(&self) {
        let done = lock(&self.inner).worker_done();
        if let Some(done) = done {
            loop_exited(done).await;
        }
    }
}

impl Drop for PlaybackSequencer {
    fn drop(&mut self) {
        let mut inner = lock(&self.inner);
        if let Some(token) = inner.cancel.take() {
            token.cancel();
        }
        if let Some(worker) = inner.worker.take() {
            worker.handle.abort();
        }
    }
}

/// 控制循环：单元 i 播放完成后才开始单元 i+1
async fn run_units(
    inner: Arc<Mutex<Inner>>,
    sink: Arc<dyn AudioSinkPort>,
    events: Arc<EventPublisher>,
    token: CancellationToken,
    session_id: Uuid,
    mode: PlaybackMode,
    units: Vec<PlaybackUnit>,
) {
    let total = units.len();

    for (index, unit) in units.iter().enumerate() {
        if index > 0 {
            let progress = {
                let mut guard = lock(&inner);
                if !guard.is_running(session_id) {
                    return;
                }
                guard.state = PlaybackState::Playing(index);
                if let Some(session) = guard.session.as_mut() {
                    session.current_index = index;
                }
                if mode == PlaybackMode::Sequence {
                    guard.progress = sequence_progress(index, total);
                }
                guard.progress
            };
            events.publish_state(session_id, &PlaybackState::Playing(index));
            events.publish_progress(session_id, progress);
        }

        tracing::debug!(
            session_id = %session_id,
            index = index,
            size_bytes = unit.size_bytes(),
            "Playing unit"
        );

        let outcome = tokio::select! {
            biased;
            _ = token.cancelled() => {
                tracing::debug!(session_id = %session_id, index = index, "Unit playback cancelled");
                return;
            }
            result = sink.play(unit) => result,
        };

        if let Err(e) = outcome {
            let message = e.to_string();
            let changed = {
                let mut guard = lock(&inner);
                if guard.is_running(session_id) {
                    guard.progress = 0;
                    guard.finish(PlaybackState::Errored(message.clone()));
                    true
                } else {
                    false
                }
            };
            if changed {
                tracing::warn!(
                    session_id = %session_id,
                    index = index,
                    error = %message,
                    "Unit playback failed"
                );
                events.publish_state(session_id, &PlaybackState::Errored(message));
                events.publish_progress(session_id, 0);
                events.publish_status(Some(session_id), STATUS_PLAYBACK_FAILED);
                events.publish_session_closed(session_id, "errored");
            }
            return;
        }
    }

    let completed = {
        let mut guard = lock(&inner);
        if guard.is_running(session_id) {
            guard.finish(PlaybackState::Completed);
            true
        } else {
            false
        }
    };
    if completed {
        tracing::info!(session_id = %session_id, units = total, "Playback completed");
        events.publish_state(session_id, &PlaybackState::Completed);
        events.publish_status(Some(session_id), STATUS_COMPLETED);
        events.publish_session_closed(session_id, "completed");
    }
}
