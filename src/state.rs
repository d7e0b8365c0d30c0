use crate::models::AppData;
use std::{path::PathBuf, sync::Arc};
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct AppState {
    pub data_path: PathBuf,
    pub csrf_token: Arc<str>,
    pub data: Arc<Mutex<AppData>>,
}

impl AppState {
    pub fn new(data_path: PathBuf, csrf_token: impl Into<Arc<str>>, data: AppData) -> Self {
        Self {
            data_path,
            csrf_token: csrf_token.into(),
            data: Arc::new(Mutex::new(data)),
        }
    }
}
