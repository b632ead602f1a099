//! 应用层错误定义
//!
//! 各端口的错误统一映射为 `NarrationError`

use thiserror::Error;

use crate::application::ports::{CacheError, CodecError, PlaybackError, StoreError, TtsError};
use crate::domain::audio::AssembleError;
use crate::domain::prayer::PrayerError;

/// 应用层错误
#[derive(Debug, Error)]
pub enum NarrationError {
    /// 代理不可达、超时或非 2xx 响应
    #[error("Network error: {0}")]
    Network(String),

    /// 代理响应结构不符合约定
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// 代理返回 `success: false`
    #[error("Rejected by TTS service: {0}")]
    Rejected(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Incompatible audio format: {0}")]
    IncompatibleFormat(String),

    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error("Playback error: {0}")]
    Playback(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("{resource_type} not found: {id}")]
    NotFound {
        resource_type: &'static str,
        id: String,
    },

    #[error("Validation error: {0}")]
    Validation(String),
}

impl NarrationError {
    pub fn not_found(resource_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type,
            id: id.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// 状态栏显示的一行消息
    pub fn user_message(&self) -> String {
        match self {
            NarrationError::Validation(message) => format!("⚠️ {}", message),
            NarrationError::EmptyInput(_) => "⚠️ No hay texto para narrar".to_string(),
            NarrationError::NotFound { .. } => format!("⚠️ {}", self),
            other => format!("❌ Error: {}", other),
        }
    }
}

impl From<TtsError> for NarrationError {
    fn from(err: TtsError) -> Self {
        match err {
            TtsError::NetworkError(message) => Self::Network(message),
            TtsError::Timeout => Self::Network("request timed out".to_string()),
            TtsError::Rejected(message) => Self::Rejected(message),
            TtsError::ProtocolError(message) => Self::Protocol(message),
        }
    }
}

impl From<CodecError> for NarrationError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::EncodingError(message) => Self::Storage(message),
            other => Self::Decode(other.to_string()),
        }
    }
}

impl From<AssembleError> for NarrationError {
    fn from(err: AssembleError) -> Self {
        match err {
            AssembleError::EmptyInput => Self::EmptyInput(err.to_string()),
            other => Self::IncompatibleFormat(other.to_string()),
        }
    }
}

impl From<CacheError> for NarrationError {
    fn from(err: CacheError) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<StoreError> for NarrationError {
    fn from(err: StoreError) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<PlaybackError> for NarrationError {
    fn from(err: PlaybackError) -> Self {
        Self::Playback(err.to_string())
    }
}

impl From<PrayerError> for NarrationError {
    fn from(err: PrayerError) -> Self {
        match err {
            PrayerError::NotFound(id) => Self::not_found("Prayer", id.as_str()),
            PrayerError::Immutable(_) | PrayerError::InvalidTitle(_) | PrayerError::InvalidContent(_) => {
                Self::Validation(err.to_string())
            }
            PrayerError::StorageError(message) => Self::Storage(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::prayer::PrayerId;

    #[test]
    fn test_tts_errors_map_by_kind() {
        assert!(matches!(
            NarrationError::from(TtsError::Rejected("quota".into())),
            NarrationError::Rejected(m) if m == "quota"
        ));
        assert!(matches!(
            NarrationError::from(TtsError::Timeout),
            NarrationError::Network(_)
        ));
        assert!(matches!(
            NarrationError::from(TtsError::ProtocolError("x".into())),
            NarrationError::Protocol(_)
        ));
    }

    #[test]
    fn test_assemble_errors_map() {
        assert!(matches!(
            NarrationError::from(AssembleError::EmptyInput),
            NarrationError::EmptyInput(_)
        ));
        assert!(matches!(
            NarrationError::from(AssembleError::MalformedBuffer(1)),
            NarrationError::IncompatibleFormat(_)
        ));
    }

    #[test]
    fn test_prayer_errors_map() {
        let err = NarrationError::from(PrayerError::NotFound(PrayerId::new("custom_1")));
        assert!(matches!(err, NarrationError::NotFound { resource_type: "Prayer", .. }));

        let err = NarrationError::from(PrayerError::Immutable(PrayerId::new("salmo23")));
        assert!(matches!(err, NarrationError::Validation(_)));
    }

    #[test]
    fn test_user_message() {
        let err = NarrationError::Rejected("quota exceeded".into());
        assert_eq!(
            err.user_message(),
            "❌ Error: Rejected by TTS service: quota exceeded"
        );
        let err = NarrationError::validation("Por favor completa todos los campos");
        assert_eq!(err.user_message(), "⚠️ Por favor completa todos los campos");
    }
}
