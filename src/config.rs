use std::{env, path::PathBuf};
use tracing::info;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DATA_PATH: &str = "data/habits.json";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_path: PathBuf,
    /// Anti-forgery token every mutating request must echo back.
    pub csrf_token: String,
    pub seed_default_habits: bool,
}

impl Config {
    /// Reads `PORT`, `APP_DATA_PATH`, `SECRET_KEY` and `SEED_DEFAULT_HABITS`.
    pub fn from_env() -> Self {
        let port = env::var("PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);

        let data_path = env::var("APP_DATA_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_PATH));

        let csrf_token = match env::var("SECRET_KEY") {
            Ok(value) if !value.trim().is_empty() => value,
            _ => {
                info!("SECRET_KEY not set, generating a per-process csrf token");
                uuid::Uuid::new_v4().simple().to_string()
            }
        };

        let seed_default_habits = env::var("SEED_DEFAULT_HABITS")
            .map(|value| parse_flag(&value))
            .unwrap_or(true);

        Self {
            port,
            data_path,
            csrf_token,
            seed_default_habits,
        }
    }
}

fn parse_flag(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}
