//! Prayer Commands - 自定义祈祷文命令

use crate::domain::prayer::{PrayerId, PrayerRecord};

/// 添加祈祷文命令
#[derive(Debug, Clone)]
pub struct AddPrayerCommand {
    pub title: String,
    pub text: String,
}

/// 添加祈祷文响应
#[derive(Debug, Clone)]
pub struct AddPrayerResponse {
    pub prayer: PrayerRecord,
}

/// 删除祈祷文命令（同时删除其缓存音频）
#[derive(Debug, Clone)]
pub struct RemovePrayerCommand {
    pub prayer_id: PrayerId,
}

/// 删除祈祷文响应
#[derive(Debug, Clone)]
pub struct RemovePrayerResponse {
    pub prayer_id: PrayerId,
    pub cache_deleted: bool,
}
