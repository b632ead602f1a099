//! Playback Command Handlers
//!
//! 朗读流程：
//! 1. 查缓存，命中则直接播放缓存的 WAV
//! 2. 未命中则请求 TTS 代理，得到有序片段
//! 3. 合并模式：并发解码、按序拼接、编码 WAV、写缓存，播放一个单元
//!    顺序模式：不拼接，每个片段作为一个单元依次播放
//!
//! 任一片段解码失败都会中止整个流程。会话被停止或替换时，合成、解码与写缓存
//! 随凭据令牌一起取消，同一时刻至多一个合成请求在途。

use futures_util::future::try_join_all;
use std::future::Future;
use std::sync::Arc;

use crate::application::commands::playback_commands::*;
use crate::application::error::NarrationError;
use crate::application::playback::{milestones, PlaybackMode, PlaybackSequencer, SessionTicket};
use crate::application::ports::{
    AudioCachePort, AudioChunk, AudioCodecPort, ChunkMimeType, PlaybackError, PlaybackUnit,
    SynthesisRequest, TtsEnginePort,
};
use crate::application::registry::PrayerRegistry;
use crate::domain::audio::{assemble, PcmBuffer};
use crate::domain::prayer::PrayerRecord;
use crate::infrastructure::events::EventPublisher;

const STATUS_NO_TEXT: &str = "No hay texto para narrar";
const STATUS_FROM_CACHE: &str = "Cargando desde caché...";
const STATUS_GENERATING: &str = "Generando audio...";
const STATUS_MERGED: &str = "✅ Audio fusionado y guardado";

/// 加载结果
struct LoadedUnits {
    units: Vec<PlaybackUnit>,
    from_cache: bool,
}

/// PlayPrayer Handler - 合成/缓存/播放
pub struct PlayPrayerHandler {
    registry: Arc<PrayerRegistry>,
    tts: Arc<dyn TtsEnginePort>,
    codec: Arc<dyn AudioCodecPort>,
    cache: Arc<dyn AudioCachePort>,
    sequencer: Arc<PlaybackSequencer>,
    events: Arc<EventPublisher>,
    mode: PlaybackMode,
}

impl PlayPrayerHandler {
    pub fn new(
        registry: Arc<PrayerRegistry>,
        tts: Arc<dyn TtsEnginePort>,
        codec: Arc<dyn AudioCodecPort>,
        cache: Arc<dyn AudioCachePort>,
        sequencer: Arc<PlaybackSequencer>,
        events: Arc<EventPublisher>,
        mode: PlaybackMode,
    ) -> Self {
        Self {
            registry,
            tts,
            codec,
            cache,
            sequencer,
            events,
            mode,
        }
    }

    /// 播放队列装入后立即返回；用 `PlaybackSequencer::wait` 等待播放结束
    pub async fn handle(
        &self,
        cmd: PlayPrayerCommand,
    ) -> Result<PlayPrayerResponse, NarrationError> {
        let prayer = self.registry.get(&cmd.prayer_id).await?;
        if prayer.narration_text().is_empty() {
            let err = NarrationError::validation(STATUS_NO_TEXT);
            self.events.publish_status(None, &err.user_message());
            return Err(err);
        }

        let ticket = self.sequencer.begin(prayer.id.clone()).await;
        let _slot = self.sequencer.load_slot().await;

        let loaded = match self.load_units(&ticket, &prayer).await {
            Ok(loaded) => loaded,
            Err(_) if ticket.is_cancelled() => {
                tracing::info!(
                    session_id = %ticket.session_id,
                    prayer_id = %prayer.id,
                    "Session ended while loading audio"
                );
                return Ok(PlayPrayerResponse {
                    session_id: ticket.session_id,
                    prayer_id: prayer.id,
                    mode: self.mode,
                    units: 0,
                    from_cache: false,
                    started: false,
                });
            }
            Err(err) => {
                self.sequencer.fail(&ticket, &err.to_string());
                self.sequencer.report_status(&ticket, &err.user_message());
                return Err(err);
            }
        };

        let units = loaded.units.len();
        let started = match self.sequencer.start(&ticket, self.mode, loaded.units) {
            Ok(()) => true,
            Err(PlaybackError::Superseded) => {
                tracing::info!(
                    session_id = %ticket.session_id,
                    prayer_id = %prayer.id,
                    "Session ended before playback could start"
                );
                false
            }
            Err(e) => return Err(e.into()),
        };

        Ok(PlayPrayerResponse {
            session_id: ticket.session_id,
            prayer_id: prayer.id,
            mode: self.mode,
            units,
            from_cache: loaded.from_cache,
            started,
        })
    }

    async fn load_units(
        &self,
        ticket: &SessionTicket,
        prayer: &PrayerRecord,
    ) -> Result<LoadedUnits, NarrationError> {
        self.sequencer
            .set_progress(ticket, milestones::REQUEST_SENT);

        if let Some(entry) = until_cancelled(ticket, self.cache.get(&prayer.id)).await? {
            tracing::info!(
                prayer_id = %prayer.id,
                size_bytes = entry.size_bytes,
                "Playing from cache"
            );
            self.sequencer.report_status(ticket, STATUS_FROM_CACHE);
            self.sequencer.set_progress(ticket, milestones::READY);
            return Ok(LoadedUnits {
                units: vec![PlaybackUnit::new(0, entry.audio, ChunkMimeType::Wav)],
                from_cache: true,
            });
        }

        self.sequencer.report_status(ticket, STATUS_GENERATING);
        let request = SynthesisRequest::new(prayer.narration_text());
        let synthesized = until_cancelled(ticket, self.tts.synthesize(request)).await?;
        self.sequencer
            .set_progress(ticket, milestones::CHUNKS_RECEIVED);

        tracing::info!(
            prayer_id = %prayer.id,
            chunks = synthesized.len(),
            mime = %synthesized.mime,
            mode = %self.mode,
            "Synthesis finished"
        );

        let units = match self.mode {
            PlaybackMode::Sequence => synthesized
                .chunks
                .iter()
                .map(|chunk| {
                    chunk
                        .bytes()
                        .map(|bytes| PlaybackUnit::new(chunk.index, bytes, chunk.mime))
                })
                .collect::<Result<Vec<_>, _>>()?,
            PlaybackMode::Merge => {
                self.sequencer.report_status(
                    ticket,
                    &format!("✅ Fusionando {} fragmentos...", synthesized.len()),
                );
                let wav = until_cancelled(ticket, self.merge(synthesized.chunks)).await?;
                until_cancelled(ticket, self.cache.put(&prayer.id, &prayer.title, wav.clone()))
                    .await?;
                self.events.publish_cache_updated(prayer.id.as_str(), true);
                self.sequencer.set_progress(ticket, milestones::READY);
                self.sequencer.report_status(ticket, STATUS_MERGED);
                vec![PlaybackUnit::new(0, wav, ChunkMimeType::Wav)]
            }
        };

        Ok(LoadedUnits {
            units,
            from_cache: false,
        })
    }

    /// 解码、拼接并编码为 WAV
    async fn merge(&self, chunks: Vec<AudioChunk>) -> Result<Vec<u8>, NarrationError> {
        let buffers = self.decode_all(chunks).await?;
        let codec = self.codec.clone();

        tokio::task::spawn_blocking(move || {
            let assembled = assemble(&buffers)?;
            tracing::debug!(
                frames = assembled.frames(),
                duration_ms = assembled.duration_ms(),
                "Chunks assembled"
            );
            Ok::<_, NarrationError>(codec.encode_wav(&assembled)?)
        })
        .await
        .map_err(|e| NarrationError::Decode(format!("encode task failed: {}", e)))?
    }

    /// 在阻塞线程池上并发解码，结果按请求顺序返回
    async fn decode_all(&self, chunks: Vec<AudioChunk>) -> Result<Vec<PcmBuffer>, NarrationError> {
        let tasks = chunks.into_iter().map(|chunk| {
            let codec = self.codec.clone();
            async move {
                let index = chunk.index;
                match tokio::task::spawn_blocking(move || codec.decode_chunk(&chunk)).await {
                    Ok(decoded) => decoded
                        .map_err(|e| NarrationError::Decode(format!("chunk {}: {}", index, e))),
                    Err(e) => Err(NarrationError::Decode(format!("decode task failed: {}", e))),
                }
            }
        });

        try_join_all(tasks).await
    }
}

/// 会话令牌取消时放弃 `fut`（drop 即中止在途请求）
async fn until_cancelled<T, E>(
    ticket: &SessionTicket,
    fut: impl Future<Output = Result<T, E>>,
) -> Result<T, NarrationError>
where
    NarrationError: From<E>,
{
    tokio::select! {
        biased;
        _ = ticket.cancelled() => Err(PlaybackError::Superseded.into()),
        result = fut => result.map_err(NarrationError::from),
    }
}

/// StopPlayback Handler
pub struct StopPlaybackHandler {
    sequencer: Arc<PlaybackSequencer>,
}

impl StopPlaybackHandler {
    pub fn new(sequencer: Arc<PlaybackSequencer>) -> Self {
        Self { sequencer }
    }

    pub async fn handle(
        &self,
        _cmd: StopPlaybackCommand,
    ) -> Result<StopPlaybackResponse, NarrationError> {
        let before = self.sequencer.snapshot();
        self.sequencer.stop().await;

        Ok(StopPlaybackResponse {
            session_id: before.session_id,
            was_active: before.state.is_active(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::playback::PlaybackState;
    use crate::application::ports::{AudioSinkPort, SynthesizedChunks, TtsError};
    use crate::domain::audio::AssembledAudio;
    use crate::domain::prayer::PrayerId;
    use crate::infrastructure::adapters::codec::SymphoniaCodec;
    use crate::infrastructure::adapters::tts::{FakeTtsClient, FakeTtsClientConfig};
    use crate::infrastructure::memory::InMemoryPrayerStore;
    use crate::infrastructure::persistence::SledAudioCache;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// 立即完成并记录单元的 sink
    #[derive(Default)]
    struct RecordingSink {
        played: Mutex<Vec<PlaybackUnit>>,
    }

    #[async_trait]
    impl AudioSinkPort for RecordingSink {
        async fn play(&self, unit: &PlaybackUnit) -> Result<(), PlaybackError> {
            self.played.lock().unwrap().push(unit.clone());
            Ok(())
        }
    }

    /// 返回固定帧数片段的 TTS
    struct ScriptedTts {
        frames: Vec<usize>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TtsEnginePort for ScriptedTts {
        async fn synthesize(&self, _: SynthesisRequest) -> Result<SynthesizedChunks, TtsError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let codec = SymphoniaCodec::new();
            let chunks = self
                .frames
                .iter()
                .enumerate()
                .map(|(i, &n)| {
                    let audio = AssembledAudio::from(PcmBuffer::mono(16000, vec![0.25; n]));
                    AudioChunk::from_bytes(i, &codec.encode_wav(&audio).unwrap(), ChunkMimeType::Wav)
                })
                .collect();
            Ok(SynthesizedChunks {
                chunks,
                mime: ChunkMimeType::Wav,
            })
        }
    }

    struct RejectingTts;

    #[async_trait]
    impl TtsEnginePort for RejectingTts {
        async fn synthesize(&self, _: SynthesisRequest) -> Result<SynthesizedChunks, TtsError> {
            Err(TtsError::Rejected("quota exceeded".to_string()))
        }
    }

    struct Fixture {
        handler: PlayPrayerHandler,
        sequencer: Arc<PlaybackSequencer>,
        cache: Arc<SledAudioCache>,
        sink: Arc<RecordingSink>,
        _dir: tempfile::TempDir,
    }

    fn fixture(tts: Arc<dyn TtsEnginePort>, mode: PlaybackMode) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let db = sled::open(dir.path().join("db")).unwrap();
        let cache = SledAudioCache::new(&db).unwrap().arc();
        let sink = Arc::new(RecordingSink::default());
        let events = EventPublisher::new().arc();
        let sequencer = PlaybackSequencer::new(sink.clone(), events.clone()).arc();
        let registry = PrayerRegistry::new(InMemoryPrayerStore::new().arc()).arc();

        let handler = PlayPrayerHandler::new(
            registry,
            tts,
            Arc::new(SymphoniaCodec::new()),
            cache.clone(),
            sequencer.clone(),
            events,
            mode,
        );
        Fixture {
            handler,
            sequencer,
            cache,
            sink,
            _dir: dir,
        }
    }

    fn scripted(frames: &[usize]) -> Arc<ScriptedTts> {
        Arc::new(ScriptedTts {
            frames: frames.to_vec(),
            calls: AtomicUsize::new(0),
        })
    }

    fn play(id: &str) -> PlayPrayerCommand {
        PlayPrayerCommand {
            prayer_id: PrayerId::new(id),
        }
    }

    #[tokio::test]
    async fn test_merge_miss_assembles_caches_and_plays() {
        let tts = scripted(&[1000, 1000, 500]);
        let f = fixture(tts.clone(), PlaybackMode::Merge);

        let response = f.handler.handle(play("salmo23")).await.unwrap();
        assert!(response.started);
        assert!(!response.from_cache);
        assert_eq!(response.units, 1);

        f.sequencer.wait().await;
        assert_eq!(f.sequencer.state(), PlaybackState::Completed);

        let entry = f.cache.get(&PrayerId::new("salmo23")).await.unwrap().unwrap();
        assert_eq!(entry.audio.len(), 5044);
        assert_eq!(entry.title, "Salmo 23");

        let played = f.sink.played.lock().unwrap().clone();
        assert_eq!(played.len(), 1);
        assert_eq!(played[0].audio.as_ref(), entry.audio.as_slice());

        let info = SymphoniaCodec::new().probe_wav(&entry.audio).unwrap();
        assert_eq!(info.data_size, 5000);
    }

    #[tokio::test]
    async fn test_merge_hit_skips_synthesis() {
        let tts = scripted(&[800, 800]);
        let f = fixture(tts.clone(), PlaybackMode::Merge);

        f.handler.handle(play("salmo91")).await.unwrap();
        f.sequencer.wait().await;
        let second = f.handler.handle(play("salmo91")).await.unwrap();
        f.sequencer.wait().await;

        assert!(second.from_cache);
        assert_eq!(tts.calls.load(Ordering::SeqCst), 1);
        assert_eq!(f.sink.played.lock().unwrap().len(), 2);
        assert_eq!(f.sequencer.progress(), milestones::READY);
    }

    #[tokio::test]
    async fn test_sequence_mode_plays_each_chunk_without_caching() {
        let tts = scripted(&[400, 600, 200]);
        let f = fixture(tts, PlaybackMode::Sequence);

        let response = f.handler.handle(play("salmo121")).await.unwrap();
        assert_eq!(response.units, 3);
        f.sequencer.wait().await;

        let played = f.sink.played.lock().unwrap().clone();
        let indices: Vec<_> = played.iter().map(|u| u.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert!(!f.cache.exists(&PrayerId::new("salmo121")).await.unwrap());
        assert_eq!(f.sequencer.state(), PlaybackState::Completed);
        assert_eq!(f.sequencer.progress(), 100);
    }

    #[tokio::test]
    async fn test_rejection_errors_session() {
        let f = fixture(Arc::new(RejectingTts), PlaybackMode::Merge);

        let result = f.handler.handle(play("salmo23")).await;
        assert!(matches!(result, Err(NarrationError::Rejected(ref m)) if m == "quota exceeded"));
        assert!(matches!(f.sequencer.state(), PlaybackState::Errored(_)));
        assert!(f.sink.played.lock().unwrap().is_empty());
        assert!(!f.cache.exists(&PrayerId::new("salmo23")).await.unwrap());
    }

    #[tokio::test]
    async fn test_incompatible_chunks_fail_without_caching() {
        struct MixedRateTts;

        #[async_trait]
        impl TtsEnginePort for MixedRateTts {
            async fn synthesize(&self, _: SynthesisRequest) -> Result<SynthesizedChunks, TtsError> {
                let codec = SymphoniaCodec::new();
                let a = AssembledAudio::from(PcmBuffer::mono(16000, vec![0.0; 100]));
                let b = AssembledAudio::from(PcmBuffer::mono(22050, vec![0.0; 100]));
                Ok(SynthesizedChunks {
                    chunks: vec![
                        AudioChunk::from_bytes(0, &codec.encode_wav(&a).unwrap(), ChunkMimeType::Wav),
                        AudioChunk::from_bytes(1, &codec.encode_wav(&b).unwrap(), ChunkMimeType::Wav),
                    ],
                    mime: ChunkMimeType::Wav,
                })
            }
        }

        let f = fixture(Arc::new(MixedRateTts), PlaybackMode::Merge);
        let result = f.handler.handle(play("salmo23")).await;
        assert!(matches!(result, Err(NarrationError::IncompatibleFormat(_))));
        assert!(!f.cache.exists(&PrayerId::new("salmo23")).await.unwrap());
    }

    #[tokio::test]
    async fn test_corrupt_chunk_aborts_assembly() {
        struct CorruptTts;

        #[async_trait]
        impl TtsEnginePort for CorruptTts {
            async fn synthesize(&self, _: SynthesisRequest) -> Result<SynthesizedChunks, TtsError> {
                Ok(SynthesizedChunks {
                    chunks: vec![AudioChunk::new(0, "%%%not-base64%%%", ChunkMimeType::Wav)],
                    mime: ChunkMimeType::Wav,
                })
            }
        }

        let f = fixture(Arc::new(CorruptTts), PlaybackMode::Merge);
        let result = f.handler.handle(play("salmo23")).await;
        assert!(matches!(result, Err(NarrationError::Decode(_))));
        assert!(matches!(f.sequencer.state(), PlaybackState::Errored(_)));
    }

    #[tokio::test]
    async fn test_unknown_prayer() {
        let f = fixture(scripted(&[10]), PlaybackMode::Merge);
        let result = f.handler.handle(play("custom_404")).await;
        assert!(matches!(result, Err(NarrationError::NotFound { .. })));
        assert_eq!(f.sequencer.state(), PlaybackState::Idle);
    }

    #[tokio::test]
    async fn test_fake_tts_end_to_end() {
        let fake = Arc::new(FakeTtsClient::new(FakeTtsClientConfig {
            ms_per_char: 1,
            latency_ms: 0,
            ..Default::default()
        }));
        let f = fixture(fake.clone(), PlaybackMode::Merge);

        f.handler.handle(play("salmo23")).await.unwrap();
        f.sequencer.wait().await;

        assert_eq!(fake.call_count(), 1);
        assert!(f.cache.exists(&PrayerId::new("salmo23")).await.unwrap());
    }

    #[tokio::test]
    async fn test_stop_handler_reports_previous_session() {
        let f = fixture(scripted(&[100]), PlaybackMode::Merge);
        let stop = StopPlaybackHandler::new(f.sequencer.clone());

        let idle = stop.handle(StopPlaybackCommand).await.unwrap();
        assert!(!idle.was_active);
        assert!(idle.session_id.is_none());
        assert_eq!(f.sequencer.state(), PlaybackState::Stopped);
    }

    /// 慢速 TTS：记录同时在途的请求数
    struct SlowTts {
        inner: Arc<ScriptedTts>,
        in_flight: Arc<AtomicUsize>,
        max_in_flight: AtomicUsize,
    }

    struct InFlight(Arc<AtomicUsize>);

    impl Drop for InFlight {
        fn drop(&mut self) {
            self.0.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl TtsEnginePort for SlowTts {
        async fn synthesize(
            &self,
            request: SynthesisRequest,
        ) -> Result<SynthesizedChunks, TtsError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            let _guard = InFlight(self.in_flight.clone());
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(200)).await;
            self.inner.synthesize(request).await
        }
    }

    #[tokio::test]
    async fn test_new_request_cancels_pending_synthesis() {
        let tts = Arc::new(SlowTts {
            inner: scripted(&[300, 300]),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: AtomicUsize::new(0),
        });
        let f = fixture(tts.clone(), PlaybackMode::Merge);
        let handler = Arc::new(f.handler);

        let first = tokio::spawn({
            let handler = handler.clone();
            async move { handler.handle(play("salmo23")).await }
        });
        while tts.in_flight.load(Ordering::SeqCst) == 0 {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        let second = tokio::spawn({
            let handler = handler.clone();
            async move { handler.handle(play("salmo91")).await }
        });

        let first = first.await.unwrap().unwrap();
        let second = second.await.unwrap().unwrap();
        f.sequencer.wait().await;

        assert!(!first.started);
        assert_eq!(first.units, 0);
        assert!(second.started);
        assert_eq!(tts.max_in_flight.load(Ordering::SeqCst), 1);
        assert_eq!(tts.in_flight.load(Ordering::SeqCst), 0);
        assert!(!f.cache.exists(&PrayerId::new("salmo23")).await.unwrap());
        assert!(f.cache.exists(&PrayerId::new("salmo91")).await.unwrap());
        assert_eq!(f.sequencer.state(), PlaybackState::Completed);
        assert_eq!(f.sink.played.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_stop_while_synthesizing_skips_cache() {
        let tts = Arc::new(SlowTts {
            inner: scripted(&[300]),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: AtomicUsize::new(0),
        });
        let f = fixture(tts.clone(), PlaybackMode::Merge);
        let handler = Arc::new(f.handler);

        let pending = tokio::spawn({
            let handler = handler.clone();
            async move { handler.handle(play("salmo121")).await }
        });
        while tts.in_flight.load(Ordering::SeqCst) == 0 {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        StopPlaybackHandler::new(f.sequencer.clone())
            .handle(StopPlaybackCommand)
            .await
            .unwrap();
        let response = pending.await.unwrap().unwrap();

        assert!(!response.started);
        assert_eq!(tts.in_flight.load(Ordering::SeqCst), 0);
        assert_eq!(f.sequencer.state(), PlaybackState::Stopped);
        assert!(!f.cache.exists(&PrayerId::new("salmo121")).await.unwrap());
        assert!(f.sink.played.lock().unwrap().is_empty());
    }
}
