use crate::stats::DateRange;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Habit {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub emoji: Option<String>,
    #[serde(default)]
    pub position: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: u64,
    pub habit_id: u64,
    pub date: NaiveDate,
    pub completed: bool,
}

/// Everything the server persists. Entries are keyed by habit and date, so a
/// `(habit, date)` pair can hold at most one entry.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppData {
    #[serde(default)]
    pub next_habit_id: u64,
    #[serde(default)]
    pub next_entry_id: u64,
    #[serde(default)]
    pub habits: Vec<Habit>,
    #[serde(default)]
    pub entries: BTreeMap<u64, BTreeMap<NaiveDate, Entry>>,
}

#[derive(Debug, Clone, Default)]
pub struct HabitUpdate {
    pub name: Option<String>,
    pub category: Option<Option<String>>,
    pub emoji: Option<Option<String>>,
    pub position: Option<i64>,
}

impl AppData {
    /// Habits in display order.
    pub fn sorted_habits(&self) -> Vec<&Habit> {
        let mut habits: Vec<&Habit> = self.habits.iter().collect();
        habits.sort_by_key(|habit| (habit.position, habit.id));
        habits
    }

    pub fn habit(&self, id: u64) -> Option<&Habit> {
        self.habits.iter().find(|habit| habit.id == id)
    }

    pub fn create_habit(
        &mut self,
        name: String,
        category: Option<String>,
        emoji: Option<String>,
        created_at: DateTime<Utc>,
    ) -> u64 {
        let position = self
            .habits
            .iter()
            .map(|habit| habit.position)
            .max()
            .map_or(0, |max| max + 1);
        self.next_habit_id += 1;
        let id = self.next_habit_id;
        self.habits.push(Habit {
            id,
            name,
            category,
            emoji,
            position,
            created_at,
        });
        id
    }

    pub fn update_habit(&mut self, id: u64, update: HabitUpdate) -> Option<&Habit> {
        let habit = self.habits.iter_mut().find(|habit| habit.id == id)?;
        if let Some(name) = update.name {
            habit.name = name;
        }
        if let Some(category) = update.category {
            habit.category = category;
        }
        if let Some(emoji) = update.emoji {
            habit.emoji = emoji;
        }
        if let Some(position) = update.position {
            habit.position = position;
        }
        Some(&*habit)
    }

    /// Removes the habit together with all of its entries.
    pub fn delete_habit(&mut self, id: u64) -> bool {
        let before = self.habits.len();
        self.habits.retain(|habit| habit.id != id);
        if self.habits.len() == before {
            return false;
        }
        self.entries.remove(&id);
        true
    }

    pub fn entry(&self, habit_id: u64, date: NaiveDate) -> Option<&Entry> {
        self.entries.get(&habit_id)?.get(&date)
    }

    pub fn is_completed(&self, habit_id: u64, date: NaiveDate) -> bool {
        self.entry(habit_id, date).is_some_and(|entry| entry.completed)
    }

    /// Upserts the entry for `(habit_id, date)`.
    ///
    /// With `desired` set the entry takes that value; without it the stored
    /// value flips, and a missing entry flips to `true`. Returns the stored
    /// value, or `None` when the habit does not exist.
    pub fn toggle_entry(
        &mut self,
        habit_id: u64,
        date: NaiveDate,
        desired: Option<bool>,
    ) -> Option<bool> {
        self.habit(habit_id)?;
        let days = self.entries.entry(habit_id).or_default();
        if let Some(entry) = days.get_mut(&date) {
            entry.completed = desired.unwrap_or(!entry.completed);
            return Some(entry.completed);
        }

        self.next_entry_id += 1;
        let completed = desired.unwrap_or(true);
        days.insert(
            date,
            Entry {
                id: self.next_entry_id,
                habit_id,
                date,
                completed,
            },
        );
        Some(completed)
    }

    /// Every entry of a habit, ordered by date.
    pub fn habit_entries(&self, habit_id: u64) -> Vec<Entry> {
        self.entries
            .get(&habit_id)
            .map(|days| days.values().copied().collect())
            .unwrap_or_default()
    }

    pub fn entries_in(&self, habit_id: u64, range: &DateRange) -> Vec<Entry> {
        if range.is_empty() {
            return Vec::new();
        }
        self.entries
            .get(&habit_id)
            .map(|days| {
                days.range(range.start..=range.end)
                    .map(|(_, entry)| *entry)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn all_entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values().flat_map(|days| days.values())
    }
}

#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    pub habit_id: u64,
    pub date: String,
    #[serde(default)]
    pub completed: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ToggleResponse {
    pub success: bool,
    pub completed: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateHabitRequest {
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub emoji: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateHabitRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub category: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub emoji: Option<Option<String>>,
    #[serde(default)]
    pub position: Option<i64>,
}

/// Distinguishes an explicit `null` (clear the field) from an absent key.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub success: bool,
    pub id: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TodayHabit {
    pub id: u64,
    pub name: String,
    pub category: Option<String>,
    pub emoji: Option<String>,
    pub position: i64,
    pub completed: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TodayResponse {
    pub date: NaiveDate,
    pub today_rate: f64,
    pub habits: Vec<TodayHabit>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MonthHabitStats {
    pub id: u64,
    pub name: String,
    pub rate: f64,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub trend: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MonthStatsResponse {
    pub overall_rate: f64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub habits: Vec<MonthHabitStats>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WeekHabit {
    pub id: u64,
    pub name: String,
    pub rate: f64,
    pub days: BTreeMap<NaiveDate, bool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WeekResponse {
    pub year: i32,
    pub week: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub overall_rate: f64,
    pub habits: Vec<WeekHabit>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HabitSummary {
    pub id: u64,
    pub name: String,
    pub category: Option<String>,
    pub completed: usize,
    pub recorded: usize,
    pub rate: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub total_habits: usize,
    pub total_entries: usize,
    pub completed_entries: usize,
    pub overall_rate: f64,
    pub habits: Vec<HabitSummary>,
}
