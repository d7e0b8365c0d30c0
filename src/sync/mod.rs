//! Client-side toggle synchronization.
//!
//! [`SyncEngine::toggle`] updates the display before talking to the server.
//! When the server cannot be reached the intent goes to the
//! [`PendingQueue`] and the [`LocalCache`] keeps the value the user asked for,
//! so a restart shows the user's intention. [`SyncEngine::flush`] replays the
//! queue oldest first and stops at the first failure so intents for a key are
//! never applied out of order.

pub mod api;
pub mod cache;
pub mod config;
pub mod display;
pub mod durable;
pub mod error;
pub mod queue;

pub use api::{EntryApi, HttpEntryApi};
pub use cache::{CacheMap, LocalCache};
pub use config::SyncConfig;
pub use display::{CompletionDisplay, MemoryDisplay, Notifier, Severity, TracingNotifier};
pub use durable::{DurableStore, FileStore, MemoryStore};
pub use error::SyncError;
pub use queue::{PendingQueue, PendingToggleIntent};

use chrono::NaiveDate;
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tracing::{debug, info, warn};

pub const SAVED_LOCALLY_MESSAGE: &str = "Saved locally, will sync later";

/// Outcome of one flush pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub applied: usize,
    pub remaining: usize,
}

pub struct SyncEngine {
    api: Arc<dyn EntryApi>,
    cache: Arc<LocalCache>,
    queue: Arc<PendingQueue>,
    display: Arc<dyn CompletionDisplay>,
    notifier: Arc<dyn Notifier>,
    flushing: Mutex<()>,
}

impl SyncEngine {
    pub fn new(
        api: Arc<dyn EntryApi>,
        cache: Arc<LocalCache>,
        queue: Arc<PendingQueue>,
        display: Arc<dyn CompletionDisplay>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            api,
            cache,
            queue,
            display,
            notifier,
            flushing: Mutex::new(()),
        }
    }

    /// Wires an engine to the HTTP API with file-backed cache and queue under
    /// `config.storage_dir`.
    pub async fn open(
        config: &SyncConfig,
        display: Arc<dyn CompletionDisplay>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, SyncError> {
        let api = HttpEntryApi::connect(config).await?;
        let store: Arc<dyn DurableStore> = Arc::new(FileStore::new(config.storage_dir.clone()));
        let cache = LocalCache::load(store.clone()).await;
        let queue = PendingQueue::load(store).await;
        info!(
            pending = queue.len().await,
            dir = %config.storage_dir.display(),
            "sync engine ready"
        );
        Ok(Self::new(
            Arc::new(api),
            Arc::new(cache),
            Arc::new(queue),
            display,
            notifier,
        ))
    }

    /// [`open`](Self::open) plus the periodic flush every
    /// `config.flush_interval`. Aborting the handle stops the timer.
    pub async fn start(
        config: &SyncConfig,
        display: Arc<dyn CompletionDisplay>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<(Arc<Self>, JoinHandle<()>), SyncError> {
        let engine = Arc::new(Self::open(config, display, notifier).await?);
        let timer = engine.clone().spawn_periodic_flush(config.flush_interval);
        debug!(every = ?config.flush_interval, "periodic flush scheduled");
        Ok((engine, timer))
    }

    pub fn cache(&self) -> &LocalCache {
        &self.cache
    }

    pub fn queue(&self) -> &PendingQueue {
        &self.queue
    }

    /// Flips the shown state of `(habit_id, date)` and syncs it. Failures are
    /// absorbed: the intent is queued and the user is told it was saved
    /// locally. The display never reverts to the old value.
    ///
    /// A confirmed toggle makes older queued intents for the same key
    /// obsolete, so they are dropped before the opportunistic flush.
    pub async fn toggle(&self, habit_id: u64, date: NaiveDate) {
        let Some(was_completed) = self.display.completion(habit_id, date) else {
            debug!(habit_id, %date, "no interactive control, ignoring toggle");
            return;
        };
        let intended = !was_completed;
        self.display.set_completion(habit_id, date, intended);

        match self.api.set_completion(habit_id, date, intended).await {
            Ok(completed) => {
                self.display.set_completion(habit_id, date, completed);
                self.cache.record(habit_id, date, completed).await;
                let superseded = self.queue.discard_key(habit_id, date).await;
                if superseded > 0 {
                    debug!(habit_id, %date, superseded, "dropped older queued toggles");
                }
                self.flush_if_idle().await;
            }
            Err(err) => {
                warn!(habit_id, %date, intended, "toggle not confirmed, queueing: {err}");
                self.queue
                    .push(PendingToggleIntent::new(habit_id, date, intended))
                    .await;
                self.cache.record(habit_id, date, intended).await;
                self.notifier.notify(Severity::Warning, SAVED_LOCALLY_MESSAGE);
            }
        }
    }

    /// Replays queued intents oldest first, stopping at the first failure.
    /// Applied intents leave the queue; the failed one and everything after
    /// it stay in their original order. Concurrent calls run one at a time.
    pub async fn flush(&self) -> FlushReport {
        let _running = self.flushing.lock().await;
        self.flush_pass().await
    }

    async fn flush_if_idle(&self) {
        let Ok(_running) = self.flushing.try_lock() else {
            debug!("flush already running");
            return;
        };
        self.flush_pass().await;
    }

    async fn flush_pass(&self) -> FlushReport {
        let snapshot = self.queue.get_all().await;
        if snapshot.is_empty() {
            return FlushReport::default();
        }

        let mut done = Vec::with_capacity(snapshot.len());
        let mut applied = 0;
        for intent in snapshot {
            // Superseded by a direct toggle since the snapshot was taken.
            if !self.queue.contains(&intent).await {
                continue;
            }
            match self
                .api
                .set_completion(intent.habit_id, intent.date, intent.completed)
                .await
            {
                Ok(completed) => {
                    self.cache
                        .record(intent.habit_id, intent.date, completed)
                        .await;
                    self.display
                        .set_completion(intent.habit_id, intent.date, completed);
                    applied += 1;
                    done.push(intent);
                }
                Err(err) => {
                    warn!(
                        habit_id = intent.habit_id,
                        date = %intent.date,
                        "flush stopped: {err}"
                    );
                    break;
                }
            }
        }

        let remaining = self.queue.remove(&done).await;
        if applied > 0 {
            info!(applied, remaining, "pending toggles synced");
            let plural = if applied == 1 { "" } else { "s" };
            self.notifier.notify(
                Severity::Success,
                &format!("Synced {applied} offline change{plural}"),
            );
        }
        FlushReport { applied, remaining }
    }

    /// Flushes when the client becomes visible again.
    pub async fn on_visibility_change(&self, visible: bool) -> Option<FlushReport> {
        if !visible {
            return None;
        }
        Some(self.flush().await)
    }

    /// Flushes every `every`, starting one interval from now.
    pub fn spawn_periodic_flush(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + every, every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let report = self.flush().await;
                if report.applied > 0 || report.remaining > 0 {
                    debug!(?report, "periodic flush");
                }
            }
        })
    }
}
