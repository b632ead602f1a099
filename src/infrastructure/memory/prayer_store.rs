//! In-Memory Prayer Store Implementation

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::application::ports::{CustomPrayerMap, PrayerStorePort, StoreError};

/// 内存祈祷文存储（进程退出即丢失）
#[derive(Default)]
pub struct InMemoryPrayerStore {
    prayers: RwLock<CustomPrayerMap>,
}

impl InMemoryPrayerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prayers(prayers: CustomPrayerMap) -> Self {
        Self {
            prayers: RwLock::new(prayers),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[async_trait]
impl PrayerStorePort for InMemoryPrayerStore {
    async fn load(&self) -> Result<CustomPrayerMap, StoreError> {
        Ok(self.prayers.read().await.clone())
    }

    async fn save(&self, prayers: &CustomPrayerMap) -> Result<(), StoreError> {
        *self.prayers.write().await = prayers.clone();
        Ok(())
    }
}
