//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（config.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::{AppConfig, TtsBackend};

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["config", "config.local"];

/// 环境变量前缀
const ENV_PREFIX: &str = "ORACION";

/// 加载应用配置
///
/// 按优先级从高到低合并配置：
/// 1. 环境变量（前缀 `ORACION_`，层级分隔符 `__`）
/// 2. 配置文件（config.toml 或 config.local.toml）
/// 3. 默认值
///
/// # 环境变量示例
/// - `ORACION_TTS__URL=https://proxy.example.com/exec`
/// - `ORACION_TTS__BACKEND=fake`
/// - `ORACION_PLAYBACK__MODE=sequence`
/// - `ORACION_STORAGE__DB_PATH=/data/oracion.sled`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径，如果为 None 则使用默认搜索路径
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. 默认值（最低优先级）
    builder = builder
        .set_default("tts.backend", "http")?
        .set_default("tts.url", "http://localhost:8000/tts")?
        .set_default("tts.timeout_secs", 120)?
        .set_default("tts.chunk_mime", "audio/wav")?
        .set_default("playback.mode", "merge")?
        .set_default("playback.speed", 1.0)?
        .set_default("storage.db_path", "data/oracion.sled")?
        .set_default("storage.export_dir", "data/exports")?
        .set_default("log.level", "info")?
        .set_default("log.json", false)?;

    // 2. 配置文件（如果存在）
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 3. 环境变量（最高优先级）
    // 例如: ORACION_TTS__TIMEOUT_SECS=30
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;

    let app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// 验证配置有效性
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    // Fake 后端不需要 URL
    if config.tts.backend == TtsBackend::Http && config.tts.url.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "TTS URL cannot be empty".to_string(),
        ));
    }

    if config.tts.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "TTS timeout cannot be 0".to_string(),
        ));
    }

    config
        .tts
        .chunk_mime_type()
        .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

    if !(config.playback.speed.is_finite() && config.playback.speed > 0.0) {
        return Err(ConfigError::ValidationError(format!(
            "Playback speed must be positive, got {}",
            config.playback.speed
        )));
    }

    if config.storage.db_path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "Database path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    tracing::info!("TTS Backend: {:?}", config.tts.backend);
    if config.tts.backend == TtsBackend::Http {
        tracing::info!("TTS URL: {}", config.tts.url);
        tracing::info!("TTS Timeout: {}s", config.tts.timeout_secs);
    }
    tracing::info!("Chunk Mime: {}", config.tts.chunk_mime);
    tracing::info!("Playback Mode: {}", config.playback.mode);
    tracing::info!("Playback Speed: {}x", config.playback.speed);
    tracing::info!("Database: {:?}", config.storage.db_path);
    tracing::info!("Export Directory: {:?}", config.storage.export_dir);
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=================================");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::playback::PlaybackMode;
    use std::io::Write;

    #[test]
    fn test_validation_passes_for_valid_config() {
        let config = AppConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validation_error_for_empty_tts_url() {
        let mut config = AppConfig::default();
        config.tts.url = String::new();
        assert!(validate_config(&config).is_err());

        // Fake 后端允许空 URL
        config.tts.backend = TtsBackend::Fake;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validation_error_for_zero_timeout() {
        let mut config = AppConfig::default();
        config.tts.timeout_secs = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_unknown_mime() {
        let mut config = AppConfig::default();
        config.tts.chunk_mime = "audio/ogg".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_bad_speed() {
        let mut config = AppConfig::default();
        config.playback.speed = 0.0;
        assert!(validate_config(&config).is_err());
        config.playback.speed = f64::NAN;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[tts]
backend = "fake"
chunk_mime = "audio/mpeg"

[playback]
mode = "sequence"
speed = 2.5
"#
        )
        .unwrap();

        let config = load_config_from_path(Some(file.path())).unwrap();
        assert_eq!(config.tts.backend, TtsBackend::Fake);
        assert_eq!(config.tts.chunk_mime, "audio/mpeg");
        assert_eq!(config.playback.mode, PlaybackMode::Sequence);
        assert_eq!(config.playback.speed, 2.5);
        // 未覆盖的字段保持默认值
        assert_eq!(config.tts.timeout_secs, 120);
        assert_eq!(config.log.level, "info");
    }
}
