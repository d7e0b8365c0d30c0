use super::durable::{read_record, write_record, DurableStore};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

pub const QUEUE_RECORD: &str = "pending_toggles";

/// A toggle the server has not confirmed yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingToggleIntent {
    pub habit_id: u64,
    pub date: NaiveDate,
    pub completed: bool,
    /// Epoch milliseconds.
    pub created_at: i64,
}

impl PendingToggleIntent {
    pub fn new(habit_id: u64, date: NaiveDate, completed: bool) -> Self {
        Self {
            habit_id,
            date,
            completed,
            created_at: Utc::now().timestamp_millis(),
        }
    }
}

/// Oldest-first log of unconfirmed toggles. Intents for the same key are
/// kept side by side, never merged.
pub struct PendingQueue {
    store: Arc<dyn DurableStore>,
    intents: Mutex<Vec<PendingToggleIntent>>,
}

impl PendingQueue {
    pub async fn load(store: Arc<dyn DurableStore>) -> Self {
        let intents = read_record(store.as_ref(), QUEUE_RECORD)
            .await
            .unwrap_or_default();
        Self {
            store,
            intents: Mutex::new(intents),
        }
    }

    pub async fn get_all(&self) -> Vec<PendingToggleIntent> {
        self.intents.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.intents.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.intents.lock().await.is_empty()
    }

    pub async fn push(&self, intent: PendingToggleIntent) {
        let mut intents = self.intents.lock().await;
        intents.push(intent);
        write_record(self.store.as_ref(), QUEUE_RECORD, &*intents).await;
    }

    /// Replaces the whole list.
    pub async fn save(&self, replacement: Vec<PendingToggleIntent>) {
        let mut intents = self.intents.lock().await;
        *intents = replacement;
        write_record(self.store.as_ref(), QUEUE_RECORD, &*intents).await;
    }

    pub async fn contains(&self, intent: &PendingToggleIntent) -> bool {
        self.intents.lock().await.contains(intent)
    }

    /// Removes each of `done` once, oldest match first, and persists what is
    /// left in one write. Intents already gone are skipped. Returns the
    /// number of intents still queued.
    pub async fn remove(&self, done: &[PendingToggleIntent]) -> usize {
        let mut intents = self.intents.lock().await;
        let before = intents.len();
        for intent in done {
            if let Some(index) = intents.iter().position(|queued| queued == intent) {
                intents.remove(index);
            }
        }
        if intents.len() != before {
            write_record(self.store.as_ref(), QUEUE_RECORD, &*intents).await;
        }
        intents.len()
    }

    /// Drops every intent for `(habit_id, date)`. Used once a newer value for
    /// the key has reached the server.
    pub async fn discard_key(&self, habit_id: u64, date: NaiveDate) -> usize {
        let mut intents = self.intents.lock().await;
        let before = intents.len();
        intents.retain(|intent| intent.habit_id != habit_id || intent.date != date);
        let dropped = before - intents.len();
        if dropped > 0 {
            write_record(self.store.as_ref(), QUEUE_RECORD, &*intents).await;
        }
        dropped
    }
}
