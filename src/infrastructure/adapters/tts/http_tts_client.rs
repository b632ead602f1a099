//! HTTP TTS Client - 调用远程 TTS 代理
//!
//! 实现 TtsEnginePort trait，通过 HTTP 调用外部 TTS 代理
//!
//! 代理 API:
//! POST <url>
//! Request: {"text": "..."}  (JSON)
//! Response: {"success": true, "audioChunks": ["<base64>", ...], "totalChunks": 3}
//!           {"success": false, "error": "..."}
//!
//! 不同部署使用过 `audioChunks` / `chunks` / `audio` 三种字段名，
//! 这里统一规范化为 `SynthesizedChunks`。

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::application::ports::{
    AudioChunk, ChunkMimeType, SynthesisRequest, SynthesizedChunks, TtsEnginePort, TtsError,
};

/// TTS 请求体 (JSON)
#[derive(Debug, Serialize)]
struct TtsHttpRequest<'a> {
    /// 要合成的文本
    text: &'a str,
}

/// 代理响应（宽松形态）
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ProxyResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default, rename = "audioChunks")]
    audio_chunks: Option<Vec<String>>,
    #[serde(default)]
    chunks: Option<Vec<String>>,
    #[serde(default)]
    audio: Option<Vec<String>>,
    #[serde(default, rename = "totalChunks")]
    total_chunks: Option<usize>,
    #[serde(default, rename = "mimeType")]
    mime_type: Option<String>,
}

/// 把任一可接受的响应形态映射为规范的片段序列
pub(crate) fn normalize_response(
    response: ProxyResponse,
    default_mime: ChunkMimeType,
) -> Result<SynthesizedChunks, TtsError> {
    if !response.success {
        return Err(TtsError::Rejected(
            response
                .error
                .filter(|e| !e.trim().is_empty())
                .unwrap_or_else(|| "Unknown error".to_string()),
        ));
    }

    let payloads = [response.audio_chunks, response.chunks, response.audio]
        .into_iter()
        .flatten()
        .find(|list| !list.is_empty())
        .ok_or_else(|| {
            TtsError::ProtocolError(
                "response has no non-empty audioChunks/chunks/audio array".to_string(),
            )
        })?;

    let mime = match response.mime_type.as_deref() {
        Some(declared) => declared
            .parse::<ChunkMimeType>()
            .map_err(|e| TtsError::ProtocolError(e.to_string()))?,
        None => default_mime,
    };

    if let Some(total) = response.total_chunks {
        if total != payloads.len() {
            tracing::warn!(
                declared = total,
                received = payloads.len(),
                "totalChunks does not match chunk array length"
            );
        }
    }

    let chunks = payloads
        .into_iter()
        .enumerate()
        .map(|(index, payload)| AudioChunk::new(index, payload, mime))
        .collect();

    Ok(SynthesizedChunks { chunks, mime })
}

/// HTTP TTS 客户端配置
#[derive(Debug, Clone)]
pub struct HttpTtsClientConfig {
    /// 代理完整 URL
    pub url: String,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
    /// 代理未声明 mimeType 时使用的片段格式
    pub chunk_mime: ChunkMimeType,
}

impl Default for HttpTtsClientConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8000/tts".to_string(),
            timeout_secs: 120,
            chunk_mime: ChunkMimeType::Wav,
        }
    }
}

impl HttpTtsClientConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_chunk_mime(mut self, mime: ChunkMimeType) -> Self {
        self.chunk_mime = mime;
        self
    }
}

/// HTTP TTS 客户端
pub struct HttpTtsClient {
    client: Client,
    config: HttpTtsClientConfig,
}

impl HttpTtsClient {
    /// 创建新的 HTTP TTS 客户端
    pub fn new(config: HttpTtsClientConfig) -> Result<Self, TtsError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TtsError::NetworkError(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// 使用默认配置创建客户端
    pub fn with_default_config() -> Result<Self, TtsError> {
        Self::new(HttpTtsClientConfig::default())
    }
}

#[async_trait]
impl TtsEnginePort for HttpTtsClient {
    async fn synthesize(&self, request: SynthesisRequest) -> Result<SynthesizedChunks, TtsError> {
        tracing::debug!(
            url = %self.config.url,
            text_len = request.text.len(),
            "Sending TTS synthesis request"
        );

        let response = self
            .client
            .post(&self.config.url)
            .json(&TtsHttpRequest {
                text: &request.text,
            })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TtsError::Timeout
                } else if e.is_connect() {
                    TtsError::NetworkError(format!("Cannot connect to TTS proxy: {}", e))
                } else {
                    TtsError::NetworkError(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(TtsError::NetworkError(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| TtsError::NetworkError(format!("Failed to read response: {}", e)))?;

        let parsed: ProxyResponse = serde_json::from_str(&body)
            .map_err(|e| TtsError::ProtocolError(format!("Invalid JSON response: {}", e)))?;

        let synthesized = normalize_response(parsed, self.config.chunk_mime)?;

        tracing::info!(
            chunks = synthesized.len(),
            mime = %synthesized.mime,
            "TTS synthesis completed"
        );

        Ok(synthesized)
    }

    async fn health_check(&self) -> bool {
        // 代理没有独立的健康检查端点，只确认可以建立连接
        match self
            .client
            .head(&self.config.url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(response) => !response.status().is_server_error(),
            Err(_) => false,
        }
    }
}
