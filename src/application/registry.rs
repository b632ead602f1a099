//! Prayer Registry - 内置与用户祈祷文的合并视图

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::application::ports::{CustomPrayerMap, PrayerStorePort, StoredPrayer};
use crate::domain::prayer::{builtin_prayers, is_builtin_id, PrayerError, PrayerId, PrayerRecord};

/// 祈祷文注册表
///
/// 合并顺序：内置祈祷文按表顺序，同 id 的用户记录原位覆盖；
/// 其余用户记录按 id 排在后面。
pub struct PrayerRegistry {
    store: Arc<dyn PrayerStorePort>,
    /// 串行化整体读-改-写
    write_lock: Mutex<()>,
}

impl PrayerRegistry {
    pub fn new(store: Arc<dyn PrayerStorePort>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    async fn load(&self) -> Result<CustomPrayerMap, PrayerError> {
        self.store
            .load()
            .await
            .map_err(|e| PrayerError::StorageError(e.to_string()))
    }

    async fn save(&self, prayers: &CustomPrayerMap) -> Result<(), PrayerError> {
        self.store
            .save(prayers)
            .await
            .map_err(|e| PrayerError::StorageError(e.to_string()))
    }

    /// 合并后的完整列表
    pub async fn get_merged(&self) -> Result<Vec<PrayerRecord>, PrayerError> {
        let mut custom = self.load().await?;

        let mut merged: Vec<PrayerRecord> = builtin_prayers()
            .into_iter()
            .map(|builtin| match custom.remove(builtin.id.as_str()) {
                Some(stored) => to_record(builtin.id.as_str(), stored).unwrap_or(builtin),
                None => builtin,
            })
            .collect();

        merged.extend(
            custom
                .into_iter()
                .filter_map(|(id, stored)| to_record(&id, stored)),
        );

        Ok(merged)
    }

    pub async fn get(&self, id: &PrayerId) -> Result<PrayerRecord, PrayerError> {
        if let Some(stored) = self.load().await?.remove(id.as_str()) {
            if let Some(record) = to_record(id.as_str(), stored) {
                return Ok(record);
            }
        }

        builtin_prayers()
            .into_iter()
            .find(|p| &p.id == id)
            .ok_or_else(|| PrayerError::NotFound(id.clone()))
    }

    /// 添加用户祈祷文，返回新记录
    pub async fn add(&self, title: &str, text: &str) -> Result<PrayerRecord, PrayerError> {
        // 先校验，失败时不触碰存储
        let draft = PrayerRecord::custom(PrayerId::generate(), title, text)?;

        let _guard = self.write_lock.lock().await;
        let mut custom = self.load().await?;

        let mut millis = Utc::now().timestamp_millis();
        let mut id = PrayerId::from_millis(millis);
        while custom.contains_key(id.as_str()) || is_builtin_id(id.as_str()) {
            millis += 1;
            id = PrayerId::from_millis(millis);
        }

        let record = PrayerRecord { id, ..draft };
        custom.insert(
            record.id.to_string(),
            StoredPrayer {
                title: record.title.clone(),
                text: record.text.clone(),
            },
        );
        self.save(&custom).await?;

        tracing::info!(
            prayer_id = %record.id,
            title = %record.title,
            text_len = record.text.len(),
            "Custom prayer added"
        );
        Ok(record)
    }

    /// 删除用户祈祷文
    ///
    /// 只存在于内置表中的 id 不可删除；删除覆盖内置祈祷文的用户记录后恢复内置版本。
    pub async fn remove(&self, id: &PrayerId) -> Result<(), PrayerError> {
        let _guard = self.write_lock.lock().await;
        let mut custom = self.load().await?;

        if custom.remove(id.as_str()).is_none() {
            return Err(if is_builtin_id(id.as_str()) {
                PrayerError::Immutable(id.clone())
            } else {
                PrayerError::NotFound(id.clone())
            });
        }

        self.save(&custom).await?;
        tracing::info!(prayer_id = %id, "Custom prayer removed");
        Ok(())
    }
}

fn to_record(id: &str, stored: StoredPrayer) -> Option<PrayerRecord> {
    match PrayerRecord::custom(PrayerId::new(id), &stored.title, &stored.text) {
        Ok(record) => Some(record),
        Err(e) => {
            tracing::warn!(prayer_id = %id, error = %e, "Skipping invalid stored prayer");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::prayer::PrayerOrigin;
    use crate::infrastructure::memory::InMemoryPrayerStore;

    fn registry() -> (PrayerRegistry, Arc<InMemoryPrayerStore>) {
        let store = InMemoryPrayerStore::new().arc();
        (PrayerRegistry::new(store.clone()), store)
    }

    fn stored(title: &str, text: &str) -> StoredPrayer {
        StoredPrayer {
            title: title.to_string(),
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn test_merged_starts_with_builtins() {
        let (registry, _) = registry();
        let merged = registry.get_merged().await.unwrap();
        let ids: Vec<_> = merged.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["salmo23", "salmo91", "salmo121"]);
    }

    #[tokio::test]
    async fn test_add_then_remove() {
        let (registry, store) = registry();
        let record = registry
            .add("  Padre Nuestro ", " Padre nuestro que estás en los cielos ")
            .await
            .unwrap();

        assert!(record.id.as_str().starts_with("custom_"));
        assert_eq!(record.title, "Padre Nuestro");
        assert_eq!(record.origin, PrayerOrigin::Custom);

        let merged = registry.get_merged().await.unwrap();
        assert_eq!(merged.len(), 4);
        assert_eq!(merged[3].id, record.id);
        assert!(store.load().await.unwrap().contains_key(record.id.as_str()));

        registry.remove(&record.id).await.unwrap();
        assert_eq!(registry.get_merged().await.unwrap().len(), 3);
        assert!(matches!(
            registry.get(&record.id).await,
            Err(PrayerError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_rapid_adds_get_unique_ids() {
        let (registry, _) = registry();
        let a = registry.add("Uno", "texto uno").await.unwrap();
        let b = registry.add("Dos", "texto dos").await.unwrap();
        let c = registry.add("Tres", "texto tres").await.unwrap();
        assert_ne!(a.id, b.id);
        assert_ne!(b.id, c.id);
        assert_eq!(registry.get_merged().await.unwrap().len(), 6);
    }

    #[tokio::test]
    async fn test_add_rejects_blank_fields() {
        let (registry, store) = registry();
        assert!(matches!(
            registry.add("   ", "texto").await,
            Err(PrayerError::InvalidTitle(_))
        ));
        assert!(matches!(
            registry.add("Título", "\n\t").await,
            Err(PrayerError::InvalidContent(_))
        ));
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_builtin_is_immutable() {
        let (registry, _) = registry();
        let result = registry.remove(&PrayerId::new("salmo23")).await;
        assert!(matches!(result, Err(PrayerError::Immutable(_))));

        let result = registry.remove(&PrayerId::new("custom_42")).await;
        assert!(matches!(result, Err(PrayerError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_user_entry_overrides_builtin_in_place() {
        let mut map = CustomPrayerMap::new();
        map.insert("salmo91".to_string(), stored("Salmo 91 (mío)", "Mi versión"));
        map.insert("custom_1".to_string(), stored("Extra", "Texto extra"));
        let store = InMemoryPrayerStore::with_prayers(map).arc();
        let registry = PrayerRegistry::new(store);

        let merged = registry.get_merged().await.unwrap();
        let ids: Vec<_> = merged.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["salmo23", "salmo91", "salmo121", "custom_1"]);
        assert_eq!(merged[1].title, "Salmo 91 (mío)");
        assert_eq!(merged[1].origin, PrayerOrigin::Custom);

        // 删除覆盖后恢复内置版本
        registry.remove(&PrayerId::new("salmo91")).await.unwrap();
        let restored = registry.get(&PrayerId::new("salmo91")).await.unwrap();
        assert!(restored.is_builtin());
    }

    #[tokio::test]
    async fn test_get_unknown() {
        let (registry, _) = registry();
        let result = registry.get(&PrayerId::new("nope")).await;
        assert!(matches!(result, Err(PrayerError::NotFound(_))));
    }
}
