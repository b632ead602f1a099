//! Cache Commands - 音频缓存命令

use std::path::PathBuf;

use crate::domain::prayer::PrayerId;

/// 删除单条缓存音频
#[derive(Debug, Clone)]
pub struct DeleteCachedAudioCommand {
    pub prayer_id: PrayerId,
}

#[derive(Debug, Clone)]
pub struct DeleteCachedAudioResponse {
    pub prayer_id: PrayerId,
    /// 删除前是否存在
    pub existed: bool,
}

/// 清空缓存
#[derive(Debug, Clone, Default)]
pub struct ClearCacheCommand;

#[derive(Debug, Clone)]
pub struct ClearCacheResponse {
    pub removed: usize,
    pub freed_bytes: u64,
}

/// 导出缓存音频为 `<标题>.wav`
#[derive(Debug, Clone)]
pub struct ExportAudioCommand {
    pub prayer_id: PrayerId,
    pub dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ExportAudioResponse {
    pub path: PathBuf,
    pub size_bytes: u64,
}
