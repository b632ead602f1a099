//! Fake TTS Client - 离线 / 测试用的 TTS 客户端
//!
//! 不调用代理，按段落（空行分隔）生成正弦波 WAV 片段

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::application::ports::{
    AudioChunk, AudioCodecPort, ChunkMimeType, SynthesisRequest, SynthesizedChunks,
    TtsEnginePort, TtsError,
};
use crate::domain::audio::{AssembledAudio, PcmBuffer};
use crate::infrastructure::adapters::codec::SymphoniaCodec;

/// Fake TTS Client 配置
#[derive(Debug, Clone)]
pub struct FakeTtsClientConfig {
    /// 采样率
    pub sample_rate: u32,
    /// 每个字符对应的音频时长（毫秒）
    pub ms_per_char: u64,
    /// 单个片段的最长时长（毫秒）
    pub max_chunk_ms: u64,
    /// 模拟网络延迟（毫秒）
    pub latency_ms: u64,
}

impl Default for FakeTtsClientConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            ms_per_char: 60,
            max_chunk_ms: 15_000,
            latency_ms: 200,
        }
    }
}

/// Fake TTS Client
pub struct FakeTtsClient {
    config: FakeTtsClientConfig,
    codec: SymphoniaCodec,
    calls: AtomicUsize,
}

impl FakeTtsClient {
    pub fn new(config: FakeTtsClientConfig) -> Self {
        tracing::info!(
            sample_rate = config.sample_rate,
            ms_per_char = config.ms_per_char,
            "FakeTtsClient initialized"
        );
        Self {
            config,
            codec: SymphoniaCodec::new(),
            calls: AtomicUsize::new(0),
        }
    }

    /// 使用默认配置创建
    pub fn with_defaults() -> Self {
        Self::new(FakeTtsClientConfig::default())
    }

    /// 已处理的合成请求数
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn paragraph_tone(&self, index: usize, paragraph: &str) -> Result<Vec<u8>, TtsError> {
        let chars = paragraph.chars().count() as u64;
        let duration_ms = (chars * self.config.ms_per_char).clamp(1, self.config.max_chunk_ms);
        let frames = (self.config.sample_rate as u64 * duration_ms / 1000) as usize;

        // 每段换一个音高，方便听出片段边界
        let freq = 220.0 + 55.0 * (index % 5) as f32;
        let rate = self.config.sample_rate as f32;
        let samples = (0..frames)
            .map(|i| 0.3 * (2.0 * std::f32::consts::PI * freq * i as f32 / rate).sin())
            .collect();

        let audio = AssembledAudio::from(PcmBuffer::mono(self.config.sample_rate, samples));
        self.codec
            .encode_wav(&audio)
            .map_err(|e| TtsError::ProtocolError(e.to_string()))
    }
}

/// 按空行切分段落
fn paragraphs(text: &str) -> Vec<&str> {
    text.split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

#[async_trait]
impl TtsEnginePort for FakeTtsClient {
    async fn synthesize(&self, request: SynthesisRequest) -> Result<SynthesizedChunks, TtsError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let parts = paragraphs(&request.text);
        if parts.is_empty() {
            return Err(TtsError::Rejected("No text provided".to_string()));
        }

        if self.config.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.latency_ms)).await;
        }

        let chunks = parts
            .iter()
            .enumerate()
            .map(|(index, paragraph)| {
                self.paragraph_tone(index, paragraph)
                    .map(|wav| AudioChunk::from_bytes(index, &wav, ChunkMimeType::Wav))
            })
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            text_len = request.text.len(),
            chunks = chunks.len(),
            "FakeTtsClient: generated chunks"
        );

        Ok(SynthesizedChunks {
            chunks,
            mime: ChunkMimeType::Wav,
        })
    }
}
