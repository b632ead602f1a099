//! Prayer Queries - 祈祷文查询

use crate::domain::prayer::{PrayerId, PrayerRecord};

/// 列出合并后的全部祈祷文
#[derive(Debug, Clone, Default)]
pub struct ListPrayersQuery;

/// 列表项
#[derive(Debug, Clone)]
pub struct PrayerSummary {
    pub prayer: PrayerRecord,
    /// 是否已有缓存音频
    pub cached: bool,
}

#[derive(Debug, Clone)]
pub struct ListPrayersResponse {
    pub prayers: Vec<PrayerSummary>,
}

/// 获取单篇祈祷文
#[derive(Debug, Clone)]
pub struct GetPrayerQuery {
    pub prayer_id: PrayerId,
}

#[derive(Debug, Clone)]
pub struct GetPrayerResponse {
    pub prayer: PrayerRecord,
    /// 正文字符数
    pub char_count: usize,
}
