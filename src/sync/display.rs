use chrono::NaiveDate;
use std::{collections::HashMap, sync::Mutex};
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

/// User-facing notification channel. Presentation is up to the implementor.
pub trait Notifier: Send + Sync {
    fn notify(&self, severity: Severity, message: &str);
}

/// Surface that shows a habit's completion for a day.
pub trait CompletionDisplay: Send + Sync {
    /// The state currently shown, or `None` when there is no interactive
    /// control for this `(habit, date)`.
    fn completion(&self, habit_id: u64, date: NaiveDate) -> Option<bool>;

    /// Shows `completed`, including any accessible-state metadata. Must be a
    /// no-op when there is no control for the key.
    fn set_completion(&self, habit_id: u64, date: NaiveDate, completed: bool);
}

/// Sends notifications to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Info | Severity::Success => info!(?severity, "{message}"),
            Severity::Warning => warn!("{message}"),
            Severity::Error => error!("{message}"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Control {
    completed: bool,
    interactive: bool,
}

/// Display state kept in memory, for headless clients and tests.
#[derive(Debug, Default)]
pub struct MemoryDisplay {
    controls: Mutex<HashMap<(u64, NaiveDate), Control>>,
}

impl MemoryDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or resets an interactive control.
    pub fn show(&self, habit_id: u64, date: NaiveDate, completed: bool) {
        self.lock().insert(
            (habit_id, date),
            Control {
                completed,
                interactive: true,
            },
        );
    }

    pub fn set_interactive(&self, habit_id: u64, date: NaiveDate, interactive: bool) {
        if let Some(control) = self.lock().get_mut(&(habit_id, date)) {
            control.interactive = interactive;
        }
    }

    /// Shown state regardless of interactivity.
    pub fn shown(&self, habit_id: u64, date: NaiveDate) -> Option<bool> {
        self.lock().get(&(habit_id, date)).map(|control| control.completed)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<(u64, NaiveDate), Control>> {
        self.controls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CompletionDisplay for MemoryDisplay {
    fn completion(&self, habit_id: u64, date: NaiveDate) -> Option<bool> {
        self.lock()
            .get(&(habit_id, date))
            .filter(|control| control.interactive)
            .map(|control| control.completed)
    }

    fn set_completion(&self, habit_id: u64, date: NaiveDate, completed: bool) {
        if let Some(control) = self.lock().get_mut(&(habit_id, date)) {
            control.completed = completed;
        }
    }
}
