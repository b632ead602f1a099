//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod audio_cache;
mod audio_codec;
mod audio_sink;
mod prayer_store;
mod tts_engine;

pub use audio_cache::{AudioCachePort, CacheEntry, CacheError, CacheStats};
pub use audio_codec::{AudioChunk, AudioCodecPort, AudioInfo, ChunkMimeType, CodecError};
pub use audio_sink::{AudioSinkPort, PlaybackError, PlaybackUnit};
pub use prayer_store::{
    CustomPrayerMap, PrayerStorePort, StoreError, StoredPrayer, CUSTOM_PRAYERS_KEY,
};
pub use tts_engine::{SynthesisRequest, SynthesizedChunks, TtsEnginePort, TtsError};
