use super::durable::{read_record, write_record, DurableStore};
use chrono::NaiveDate;
use std::{collections::BTreeMap, sync::Arc};
use tokio::sync::Mutex;

pub const CACHE_RECORD: &str = "habit_cache";

/// Habit id to date to completion. Serializes as
/// `{"<habit id>": {"YYYY-MM-DD": bool}}`.
pub type CacheMap = BTreeMap<u64, BTreeMap<NaiveDate, bool>>;

/// The client's best-known completion state per `(habit, date)`.
pub struct LocalCache {
    store: Arc<dyn DurableStore>,
    entries: Mutex<CacheMap>,
}

impl LocalCache {
    pub async fn load(store: Arc<dyn DurableStore>) -> Self {
        let entries = read_record(store.as_ref(), CACHE_RECORD)
            .await
            .unwrap_or_default();
        Self {
            store,
            entries: Mutex::new(entries),
        }
    }

    pub async fn get(&self, habit_id: u64, date: NaiveDate) -> Option<bool> {
        self.entries.lock().await.get(&habit_id)?.get(&date).copied()
    }

    pub async fn get_all(&self) -> CacheMap {
        self.entries.lock().await.clone()
    }

    /// Stores one value and persists the map. Recording the value already
    /// held is a no-op.
    pub async fn record(&self, habit_id: u64, date: NaiveDate, completed: bool) {
        let mut entries = self.entries.lock().await;
        let days = entries.entry(habit_id).or_default();
        if days.get(&date) == Some(&completed) {
            return;
        }
        days.insert(date, completed);
        write_record(self.store.as_ref(), CACHE_RECORD, &*entries).await;
    }

    /// Replaces the whole map.
    pub async fn save(&self, replacement: CacheMap) {
        let mut entries = self.entries.lock().await;
        *entries = replacement;
        write_record(self.store.as_ref(), CACHE_RECORD, &*entries).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::durable::MemoryStore;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, d).unwrap()
    }

    #[tokio::test]
    async fn cache_survives_reload() {
        let store = Arc::new(MemoryStore::new());
        let cache = LocalCache::load(store.clone()).await;
        cache.record(3, date(1), true).await;
        cache.record(3, date(2), false).await;
        cache.record(12, date(2), true).await;

        let reloaded = LocalCache::load(store.clone()).await;
        assert_eq!(reloaded.get_all().await, cache.get_all().await);
        assert_eq!(reloaded.get(3, date(2)).await, Some(false));
    }

    #[tokio::test]
    async fn record_uses_the_documented_layout() {
        let store = Arc::new(MemoryStore::new());
        let cache = LocalCache::load(store.clone()).await;
        cache.record(7, date(28), true).await;

        let raw: serde_json::Value = serde_json::from_slice(&store.raw(CACHE_RECORD).unwrap()).unwrap();
        assert_eq!(raw, serde_json::json!({ "7": { "2025-09-28": true } }));
    }

    #[tokio::test]
    async fn corrupt_cache_starts_empty() {
        let store = Arc::new(MemoryStore::new());
        store.insert_raw(CACHE_RECORD, "not json at all");
        let cache = LocalCache::load(store).await;
        assert!(cache.get_all().await.is_empty());
    }

    #[tokio::test]
    async fn save_replaces_everything() {
        let store = Arc::new(MemoryStore::new());
        let cache = LocalCache::load(store.clone()).await;
        cache.record(1, date(1), true).await;

        let mut replacement = CacheMap::new();
        replacement.entry(2).or_default().insert(date(3), false);
        cache.save(replacement.clone()).await;

        assert_eq!(cache.get(1, date(1)).await, None);
        assert_eq!(LocalCache::load(store).await.get_all().await, replacement);
    }
}
