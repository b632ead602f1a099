//! TTS Engine Port - 远程 TTS 代理抽象
//!
//! 定义语音合成的抽象接口，具体实现在 infrastructure/adapters 层

use async_trait::async_trait;
use thiserror::Error;

use super::{AudioChunk, ChunkMimeType};

/// TTS 错误
#[derive(Debug, Error)]
pub enum TtsError {
    /// 请求失败或非 2xx 响应
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout")]
    Timeout,

    /// 代理返回 `success: false`
    #[error("Service rejected request: {0}")]
    Rejected(String),

    /// 响应结构不符合约定（缺少片段数组等）
    #[error("Protocol error: {0}")]
    ProtocolError(String),
}

/// 合成请求
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    /// 要合成的文本内容
    pub text: String,
}

impl SynthesisRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// 规范化后的合成结果
///
/// 不论代理使用哪种字段名，都映射为这一种内部形态
#[derive(Debug, Clone)]
pub struct SynthesizedChunks {
    /// 按响应顺序排列的片段
    pub chunks: Vec<AudioChunk>,
    pub mime: ChunkMimeType,
}

impl SynthesizedChunks {
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// TTS Engine Port
///
/// 外部 TTS 代理的抽象接口，不做任何重试
#[async_trait]
pub trait TtsEnginePort: Send + Sync {
    /// 发送文本，返回有序的音频片段
    async fn synthesize(&self, request: SynthesisRequest) -> Result<SynthesizedChunks, TtsError>;

    /// 检查 TTS 服务是否可用
    async fn health_check(&self) -> bool {
        true // 默认实现
    }
}
