//! Oracion - 祈祷文朗读系统
//!
//! 架构设计: DDD + CQRS + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Prayer Context: 内置与用户祈祷文
//! - Audio: PCM 缓冲区与无损拼接
//!
//! 应用层 (application/):
//! - Ports: 端口定义（TtsEngine, AudioCodec, AudioCache, PrayerStore, AudioSink）
//! - Playback: 播放状态机与控制循环
//! - Commands: CQRS 命令处理器
//! - Queries: CQRS 查询处理器
//!
//! 基础设施层 (infrastructure/):
//! - Adapters: TTS 代理客户端, symphonia 编解码, 计时播放输出
//! - Persistence: Sled 存储（音频缓存、自定义祈祷文）
//! - Memory: 内存祈祷文存储
//! - Events: 播放事件发布

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
