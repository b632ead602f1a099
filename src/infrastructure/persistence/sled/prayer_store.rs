//! Sled-based Custom Prayer Store
//!
//! 全部自定义祈祷文以 JSON 对象形式保存在 tree `prayers` 的固定 key 下

use async_trait::async_trait;
use sled::{Db, Tree};

use crate::application::ports::{CustomPrayerMap, PrayerStorePort, StoreError, CUSTOM_PRAYERS_KEY};

const TREE_NAME: &str = "prayers";

/// Sled 祈祷文存储
pub struct SledPrayerStore {
    tree: Tree,
}

impl SledPrayerStore {
    pub fn new(db: &Db) -> Result<Self, StoreError> {
        let tree = db
            .open_tree(TREE_NAME)
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;
        Ok(Self { tree })
    }
}

#[async_trait]
impl PrayerStorePort for SledPrayerStore {
    async fn load(&self) -> Result<CustomPrayerMap, StoreError> {
        match self
            .tree
            .get(CUSTOM_PRAYERS_KEY)
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?
        {
            Some(data) => serde_json::from_slice(&data)
                .map_err(|e| StoreError::SerializationError(e.to_string())),
            None => Ok(CustomPrayerMap::new()),
        }
    }

    async fn save(&self, prayers: &CustomPrayerMap) -> Result<(), StoreError> {
        let json =
            serde_json::to_vec(prayers).map_err(|e| StoreError::SerializationError(e.to_string()))?;

        self.tree
            .insert(CUSTOM_PRAYERS_KEY, json)
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;
        self.tree
            .flush_async()
            .await
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        tracing::debug!(count = prayers.len(), "Custom prayers saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::StoredPrayer;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_load_empty_then_save() {
        let dir = tempdir().unwrap();
        let db = sled::open(dir.path().join("prayers.sled")).unwrap();
        let store = SledPrayerStore::new(&db).unwrap();

        assert!(store.load().await.unwrap().is_empty());

        let mut prayers = CustomPrayerMap::new();
        prayers.insert(
            "custom_1".to_string(),
            StoredPrayer {
                title: "Ave María".to_string(),
                text: "Dios te salve, María".to_string(),
            },
        );
        store.save(&prayers).await.unwrap();

        assert_eq!(store.load().await.unwrap(), prayers);
    }

    #[tokio::test]
    async fn test_stored_as_json_object() {
        let dir = tempdir().unwrap();
        let db = sled::open(dir.path().join("prayers.sled")).unwrap();
        let store = SledPrayerStore::new(&db).unwrap();

        let mut prayers = CustomPrayerMap::new();
        prayers.insert(
            "custom_42".to_string(),
            StoredPrayer {
                title: "T".to_string(),
                text: "X".to_string(),
            },
        );
        store.save(&prayers).await.unwrap();

        let raw = db.open_tree(TREE_NAME).unwrap().get(CUSTOM_PRAYERS_KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&raw).unwrap();
        assert_eq!(value["custom_42"]["title"], "T");
        assert_eq!(value["custom_42"]["text"], "X");
    }
}
