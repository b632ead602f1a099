//! Prayer Command Handlers

use std::sync::Arc;

use crate::application::commands::prayer_commands::*;
use crate::application::error::NarrationError;
use crate::application::ports::AudioCachePort;
use crate::application::registry::PrayerRegistry;
use crate::infrastructure::events::EventPublisher;

const STATUS_SAVED: &str = "✅ Oración guardada exitosamente";
const STATUS_MISSING_FIELDS: &str = "Por favor completa todos los campos";

/// AddPrayer Handler
pub struct AddPrayerHandler {
    registry: Arc<PrayerRegistry>,
    events: Arc<EventPublisher>,
}

impl AddPrayerHandler {
    pub fn new(registry: Arc<PrayerRegistry>, events: Arc<EventPublisher>) -> Self {
        Self { registry, events }
    }

    pub async fn handle(&self, cmd: AddPrayerCommand) -> Result<AddPrayerResponse, NarrationError> {
        if cmd.title.trim().is_empty() || cmd.text.trim().is_empty() {
            let err = NarrationError::validation(STATUS_MISSING_FIELDS);
            self.events.publish_status(None, &err.user_message());
            return Err(err);
        }

        let prayer = self.registry.add(&cmd.title, &cmd.text).await?;

        let total = self.registry.get_merged().await?.len();
        self.events.publish_prayers_changed(total);
        self.events.publish_status(None, STATUS_SAVED);

        Ok(AddPrayerResponse { prayer })
    }
}

/// RemovePrayer Handler - 删除用户祈祷文及其缓存音频
pub struct RemovePrayerHandler {
    registry: Arc<PrayerRegistry>,
    cache: Arc<dyn AudioCachePort>,
    events: Arc<EventPublisher>,
}

impl RemovePrayerHandler {
    pub fn new(
        registry: Arc<PrayerRegistry>,
        cache: Arc<dyn AudioCachePort>,
        events: Arc<EventPublisher>,
    ) -> Self {
        Self {
            registry,
            cache,
            events,
        }
    }

    pub async fn handle(
        &self,
        cmd: RemovePrayerCommand,
    ) -> Result<RemovePrayerResponse, NarrationError> {
        self.registry.remove(&cmd.prayer_id).await?;

        let cache_deleted = self.cache.exists(&cmd.prayer_id).await?;
        if cache_deleted {
            self.cache.delete(&cmd.prayer_id).await?;
            self.events
                .publish_cache_updated(cmd.prayer_id.as_str(), false);
        }

        let total = self.registry.get_merged().await?.len();
        self.events.publish_prayers_changed(total);

        tracing::info!(
            prayer_id = %cmd.prayer_id,
            cache_deleted = cache_deleted,
            "Prayer removed"
        );

        Ok(RemovePrayerResponse {
            prayer_id: cmd.prayer_id,
            cache_deleted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::prayer::PrayerId;
    use crate::infrastructure::events::PlaybackEvent;
    use crate::infrastructure::memory::InMemoryPrayerStore;
    use crate::infrastructure::persistence::SledAudioCache;

    struct Fixture {
        add: AddPrayerHandler,
        remove: RemovePrayerHandler,
        cache: Arc<SledAudioCache>,
        events: Arc<EventPublisher>,
        _dir: tempfile::TempDir,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let db = sled::open(dir.path().join("db")).unwrap();
        let cache = SledAudioCache::new(&db).unwrap().arc();
        let events = EventPublisher::new().arc();
        let registry = PrayerRegistry::new(InMemoryPrayerStore::new().arc()).arc();

        Fixture {
            add: AddPrayerHandler::new(registry.clone(), events.clone()),
            remove: RemovePrayerHandler::new(registry, cache.clone(), events.clone()),
            cache,
            events,
            _dir: dir,
        }
    }

    #[tokio::test]
    async fn test_add_publishes_list_change() {
        let f = fixture();
        let mut rx = f.events.subscribe_global();

        let response = f
            .add
            .handle(AddPrayerCommand {
                title: "Ave María".to_string(),
                text: "Dios te salve, María".to_string(),
            })
            .await
            .unwrap();
        assert!(response.prayer.id.as_str().starts_with("custom_"));

        assert_eq!(rx.recv().await.unwrap(), PlaybackEvent::PrayersChanged { total: 4 });
    }

    #[tokio::test]
    async fn test_add_missing_fields() {
        let f = fixture();
        let result = f
            .add
            .handle(AddPrayerCommand {
                title: "Sin texto".to_string(),
                text: "   ".to_string(),
            })
            .await;
        assert!(matches!(result, Err(NarrationError::Validation(_))));
    }

    #[tokio::test]
    async fn test_remove_deletes_cached_audio() {
        let f = fixture();
        let added = f
            .add
            .handle(AddPrayerCommand {
                title: "Credo".to_string(),
                text: "Creo en Dios Padre".to_string(),
            })
            .await
            .unwrap()
            .prayer;
        f.cache
            .put(&added.id, &added.title, vec![1, 2, 3])
            .await
            .unwrap();

        let response = f
            .remove
            .handle(RemovePrayerCommand {
                prayer_id: added.id.clone(),
            })
            .await
            .unwrap();
        assert!(response.cache_deleted);
        assert!(!f.cache.exists(&added.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_builtin_rejected() {
        let f = fixture();
        let result = f
            .remove
            .handle(RemovePrayerCommand {
                prayer_id: PrayerId::new("salmo23"),
            })
            .await;
        assert!(matches!(result, Err(NarrationError::Validation(_))));
    }
}
