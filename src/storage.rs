use crate::errors::AppError;
use crate::models::AppData;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info};

const DEFAULT_HABITS: [(&str, &str); 6] = [
    ("Meditation", "Mindfulness"),
    ("Exercise", "Health"),
    ("Eat healthy", "Health"),
    ("Drink water", "Health"),
    ("Read", "Learning"),
    ("Wake up early", "Productivity"),
];

pub async fn load_data(path: &Path) -> AppData {
    match fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(data) => data,
            Err(err) => {
                error!("failed to parse data file: {err}");
                AppData::default()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => AppData::default(),
        Err(err) => {
            error!("failed to read data file: {err}");
            AppData::default()
        }
    }
}

/// Writes the whole data file through a sibling temp file and a rename, so a
/// reader never observes a partial file.
pub async fn persist_data(path: &Path, data: &AppData) -> Result<(), AppError> {
    let payload = serde_json::to_vec_pretty(data)?;
    let tmp = temp_path(path);
    fs::write(&tmp, payload).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Adds the default habits to an empty store. Returns whether anything was added.
pub fn seed_default_habits(data: &mut AppData) -> bool {
    if !data.habits.is_empty() {
        return false;
    }
    let now = Utc::now();
    for (name, category) in DEFAULT_HABITS {
        data.create_habit(name.to_string(), Some(category.to_string()), None, now);
    }
    info!(count = DEFAULT_HABITS.len(), "seeded default habits");
    true
}
