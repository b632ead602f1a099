//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（TtsEngine、AudioCodec、AudioCache、PrayerStore、AudioSink）
//! - playback: 播放状态机与控制循环
//! - registry: 内置与用户祈祷文的合并视图
//! - commands: CQRS 命令及处理器
//! - queries: CQRS 查询及处理器
//! - error: 应用层错误定义

pub mod commands;
pub mod error;
pub mod playback;
pub mod ports;
pub mod queries;
pub mod registry;

// Re-exports
pub use commands::{
    // Playback commands
    PlayPrayerCommand,
    PlayPrayerResponse,
    StopPlaybackCommand,
    StopPlaybackResponse,
    // Prayer commands
    AddPrayerCommand,
    AddPrayerResponse,
    RemovePrayerCommand,
    RemovePrayerResponse,
    // Cache commands
    ClearCacheCommand,
    ClearCacheResponse,
    DeleteCachedAudioCommand,
    DeleteCachedAudioResponse,
    ExportAudioCommand,
    ExportAudioResponse,
    // Handlers
    handlers::{
        AddPrayerHandler, ClearCacheHandler, DeleteCachedAudioHandler, ExportAudioHandler,
        PlayPrayerHandler, RemovePrayerHandler, StopPlaybackHandler,
    },
};

pub use error::NarrationError;

pub use playback::{
    PlaybackMode, PlaybackSequencer, PlaybackSnapshot, PlaybackState, SessionTicket,
};

pub use ports::{
    // Audio cache
    AudioCachePort,
    CacheEntry,
    CacheError,
    CacheStats,
    // Audio codec
    AudioChunk,
    AudioCodecPort,
    AudioInfo,
    ChunkMimeType,
    CodecError,
    // Audio sink
    AudioSinkPort,
    PlaybackError,
    PlaybackUnit,
    // Prayer store
    CustomPrayerMap,
    PrayerStorePort,
    StoreError,
    StoredPrayer,
    // TTS engine
    SynthesisRequest,
    SynthesizedChunks,
    TtsEnginePort,
    TtsError,
};

pub use queries::{
    // Prayer queries
    GetPrayerQuery,
    GetPrayerResponse,
    ListPrayersQuery,
    ListPrayersResponse,
    PrayerSummary,
    // Cache queries
    CacheStatus,
    CachedAudioSummary,
    GetCacheStatusQuery,
    GetPlaybackStatusQuery,
    ListCachedAudioQuery,
    ListCachedAudioResponse,
    // Handlers
    handlers::{
        GetCacheStatusHandler, GetPlaybackStatusHandler, GetPrayerHandler,
        ListCachedAudioHandler, ListPrayersHandler,
    },
};

pub use registry::PrayerRegistry;
