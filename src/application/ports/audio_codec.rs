//! Audio Codec Port - 片段解码 / WAV 编码抽象
//!
//! 定义音频片段解码与 WAV 封装的抽象接口，具体实现基于 symphonia

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::audio::{AssembledAudio, PcmBuffer};

/// 编解码错误
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Invalid base64 payload: {0}")]
    InvalidBase64(String),

    #[error("Unsupported mime type: {0}")]
    UnsupportedMime(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Decoding error: {0}")]
    DecodingError(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}

/// 片段声明的容器格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ChunkMimeType {
    /// RIFF/WAVE PCM
    #[default]
    #[serde(rename = "audio/wav")]
    Wav,
    /// MPEG Layer III
    #[serde(rename = "audio/mpeg")]
    Mpeg,
}

impl ChunkMimeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkMimeType::Wav => "audio/wav",
            ChunkMimeType::Mpeg => "audio/mpeg",
        }
    }

    /// 容器探测用的扩展名提示
    pub fn extension(&self) -> &'static str {
        match self {
            ChunkMimeType::Wav => "wav",
            ChunkMimeType::Mpeg => "mp3",
        }
    }
}

impl std::fmt::Display for ChunkMimeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ChunkMimeType {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // 忽略参数部分，如 "audio/wav; codecs=1"
        let essence = s.split(';').next().unwrap_or("").trim().to_lowercase();
        match essence.as_str() {
            "audio/wav" | "audio/x-wav" | "audio/wave" | "audio/vnd.wave" => Ok(ChunkMimeType::Wav),
            "audio/mpeg" | "audio/mp3" | "audio/mpeg3" => Ok(ChunkMimeType::Mpeg),
            _ => Err(CodecError::UnsupportedMime(s.to_string())),
        }
    }
}

/// TTS 代理返回的单个音频片段
///
/// `index` 为其在响应数组中的位置，决定拼接和播放顺序
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioChunk {
    pub index: usize,
    /// base64 编码的容器字节
    pub payload: String,
    pub mime: ChunkMimeType,
}

impl AudioChunk {
    pub fn new(index: usize, payload: impl Into<String>, mime: ChunkMimeType) -> Self {
        Self {
            index,
            payload: payload.into(),
            mime,
        }
    }

    /// 从原始字节构建（base64 编码）
    pub fn from_bytes(index: usize, bytes: &[u8], mime: ChunkMimeType) -> Self {
        Self::new(index, STANDARD.encode(bytes), mime)
    }

    /// 解码 base64 负载，允许 data URL 前缀和换行
    pub fn bytes(&self) -> Result<Vec<u8>, CodecError> {
        let payload = match self.payload.split_once(";base64,") {
            Some((_, data)) => data,
            None => self.payload.as_str(),
        };
        let cleaned: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        if cleaned.is_empty() {
            return Err(CodecError::InvalidBase64(format!(
                "chunk {} has an empty payload",
                self.index
            )));
        }
        STANDARD
            .decode(cleaned.as_bytes())
            .map_err(|e| CodecError::InvalidBase64(format!("chunk {}: {}", self.index, e)))
    }
}

/// WAV 头信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioInfo {
    /// 时长（毫秒）
    pub duration_ms: u64,
    /// 采样率
    pub sample_rate: u32,
    /// 声道数
    pub channels: u16,
    /// 位深度
    pub bits_per_sample: u16,
    /// 数据大小（字节）
    pub data_size: usize,
}

/// Audio Codec Port
///
/// 解码是 CPU 密集型同步操作，调用方可放到阻塞线程池并发执行
pub trait AudioCodecPort: Send + Sync {
    /// 按声明的容器格式解码原始字节
    fn decode(&self, data: &[u8], mime: ChunkMimeType) -> Result<PcmBuffer, CodecError>;

    /// 解码 base64 片段
    fn decode_chunk(&self, chunk: &AudioChunk) -> Result<PcmBuffer, CodecError> {
        let bytes = chunk.bytes()?;
        self.decode(&bytes, chunk.mime)
    }

    /// 编码为 16-bit PCM WAV
    fn encode_wav(&self, audio: &AssembledAudio) -> Result<Vec<u8>, CodecError>;

    /// 读取 WAV 头信息（不解码样本）
    fn probe_wav(&self, data: &[u8]) -> Result<AudioInfo, CodecError>;
}
