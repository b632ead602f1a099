//! Prayer Query Handlers

use std::sync::Arc;

use crate::application::error::NarrationError;
use crate::application::ports::AudioCachePort;
use crate::application::queries::prayer_queries::*;
use crate::application::registry::PrayerRegistry;

/// ListPrayers Handler
pub struct ListPrayersHandler {
    registry: Arc<PrayerRegistry>,
    cache: Arc<dyn AudioCachePort>,
}

impl ListPrayersHandler {
    pub fn new(registry: Arc<PrayerRegistry>, cache: Arc<dyn AudioCachePort>) -> Self {
        Self { registry, cache }
    }

    pub async fn handle(&self, _query: ListPrayersQuery) -> Result<ListPrayersResponse, NarrationError> {
        let merged = self.registry.get_merged().await?;

        let mut prayers = Vec::with_capacity(merged.len());
        for prayer in merged {
            let cached = self.cache.exists(&prayer.id).await?;
            prayers.push(PrayerSummary { prayer, cached });
        }

        Ok(ListPrayersResponse { prayers })
    }
}

/// GetPrayer Handler
pub struct GetPrayerHandler {
    registry: Arc<PrayerRegistry>,
}

impl GetPrayerHandler {
    pub fn new(registry: Arc<PrayerRegistry>) -> Self {
        Self { registry }
    }

    pub async fn handle(&self, query: GetPrayerQuery) -> Result<GetPrayerResponse, NarrationError> {
        let prayer = self.registry.get(&query.prayer_id).await?;
        let char_count = prayer.text.chars().count();
        Ok(GetPrayerResponse { prayer, char_count })
    }
}
