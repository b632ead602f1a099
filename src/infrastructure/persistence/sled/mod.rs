//! Sled 存储：音频缓存 + 自定义祈祷文

mod audio_cache;
mod prayer_store;

use std::path::Path;

pub use audio_cache::SledAudioCache;
pub use prayer_store::SledPrayerStore;

/// 打开（或创建）Sled 数据库
pub fn open_database(path: impl AsRef<Path>) -> Result<sled::Db, sled::Error> {
    let path = path.as_ref();
    let db = sled::open(path)?;
    tracing::info!(db_path = %path.display(), "Sled database opened");
    Ok(db)
}
