//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;
use std::path::PathBuf;

use crate::application::playback::PlaybackMode;
use crate::application::ports::{ChunkMimeType, CodecError};

/// 应用主配置
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    /// TTS 代理配置
    #[serde(default)]
    pub tts: TtsConfig,

    /// 播放配置
    #[serde(default)]
    pub playback: PlaybackConfig,

    /// 存储配置
    #[serde(default)]
    pub storage: StorageConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// TTS 后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TtsBackend {
    /// 远程 HTTP 代理
    #[default]
    Http,
    /// 本地生成测试音，不联网
    Fake,
}

/// TTS 代理配置
#[derive(Debug, Clone, Deserialize)]
pub struct TtsConfig {
    #[serde(default)]
    pub backend: TtsBackend,

    /// 代理完整 URL
    #[serde(default = "default_tts_url")]
    pub url: String,

    /// 请求超时时间（秒）
    #[serde(default = "default_tts_timeout")]
    pub timeout_secs: u64,

    /// 代理未声明 mimeType 时片段的格式
    /// 可选: audio/wav, audio/mpeg（及其别名）
    #[serde(default = "default_chunk_mime")]
    pub chunk_mime: String,
}

fn default_tts_url() -> String {
    "http://localhost:8000/tts".to_string()
}

fn default_tts_timeout() -> u64 {
    120
}

fn default_chunk_mime() -> String {
    ChunkMimeType::Wav.as_str().to_string()
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            backend: TtsBackend::default(),
            url: default_tts_url(),
            timeout_secs: default_tts_timeout(),
            chunk_mime: default_chunk_mime(),
        }
    }
}

impl TtsConfig {
    pub fn chunk_mime_type(&self) -> Result<ChunkMimeType, CodecError> {
        self.chunk_mime.parse()
    }
}

/// 播放配置
#[derive(Debug, Clone, Deserialize)]
pub struct PlaybackConfig {
    /// merge: 拼接后整段播放并缓存；sequence: 逐片段播放
    #[serde(default)]
    pub mode: PlaybackMode,

    /// 播放倍速，1.0 为实时
    #[serde(default = "default_speed")]
    pub speed: f64,
}

fn default_speed() -> f64 {
    1.0
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            mode: PlaybackMode::default(),
            speed: default_speed(),
        }
    }
}

/// 存储配置
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Sled 数据库目录（音频缓存 + 自定义祈祷文）
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// 导出 WAV 的目录
    #[serde(default = "default_export_dir")]
    pub export_dir: PathBuf,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("data/oracion.sled")
}

fn default_export_dir() -> PathBuf {
    PathBuf::from("data/exports")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            export_dir: default_export_dir(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}
