pub mod app;
pub mod backup;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod state;
pub mod stats;
pub mod storage;
pub mod sync;
pub mod ui;

pub use app::router;
pub use state::AppState;
pub use storage::{load_data, seed_default_habits};
pub use sync::SyncEngine;
