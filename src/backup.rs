//! JSON backup and CSV export of the whole store.

use crate::models::AppData;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupHabit {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub emoji: Option<String>,
    #[serde(default)]
    pub position: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupEntry {
    pub habit_id: u64,
    pub date: NaiveDate,
    pub completed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Backup {
    pub habits: Vec<BackupHabit>,
    pub entries: Vec<BackupEntry>,
    #[serde(default)]
    pub export_date: Option<DateTime<Utc>>,
}

pub fn export(data: &AppData, now: DateTime<Utc>) -> Backup {
    Backup {
        habits: data
            .sorted_habits()
            .into_iter()
            .map(|habit| BackupHabit {
                id: habit.id,
                name: habit.name.clone(),
                category: habit.category.clone(),
                emoji: habit.emoji.clone(),
                position: habit.position,
            })
            .collect(),
        entries: data
            .all_entries()
            .map(|entry| BackupEntry {
                habit_id: entry.habit_id,
                date: entry.date,
                completed: entry.completed,
            })
            .collect(),
        export_date: Some(now),
    }
}

/// Builds a fresh store from a backup. Habit ids are reassigned; entries that
/// point at a habit missing from the backup are dropped.
pub fn import(backup: Backup, now: DateTime<Utc>) -> AppData {
    let mut data = AppData::default();
    let mut ids = HashMap::with_capacity(backup.habits.len());

    for habit in backup.habits {
        let id = data.create_habit(habit.name, habit.category, habit.emoji, now);
        if let Some(stored) = data.habits.iter_mut().find(|stored| stored.id == id) {
            stored.position = habit.position;
        }
        ids.insert(habit.id, id);
    }

    for entry in backup.entries {
        match ids.get(&entry.habit_id) {
            Some(&habit_id) => {
                data.toggle_entry(habit_id, entry.date, Some(entry.completed));
            }
            None => warn!(
                habit_id = entry.habit_id,
                date = %entry.date,
                "dropping backup entry for unknown habit"
            ),
        }
    }

    data
}

/// CSV with one row per entry, newest first.
pub fn export_csv(data: &AppData) -> String {
    let mut rows: Vec<_> = data
        .all_entries()
        .filter_map(|entry| data.habit(entry.habit_id).map(|habit| (entry, habit)))
        .collect();
    rows.sort_by(|(a, _), (b, _)| b.date.cmp(&a.date).then(a.habit_id.cmp(&b.habit_id)));

    let mut out = String::from("Habit,Category,Date,Completed,Weekday\n");
    for (entry, habit) in rows {
        let fields = [
            csv_field(&habit.name),
            csv_field(habit.category.as_deref().unwrap_or("")),
            entry.date.to_string(),
            if entry.completed { "Yes" } else { "No" }.to_string(),
            entry.date.format("%A").to_string(),
        ];
        out.push_str(&fields.join(","));
        out.push('\n');
    }
    out
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
