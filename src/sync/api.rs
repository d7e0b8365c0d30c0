use super::{SyncConfig, SyncError};
use crate::app::CSRF_HEADER;
use crate::ui::CSRF_META_NAME;
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

/// The server side of a toggle.
#[async_trait]
pub trait EntryApi: Send + Sync {
    /// Stores `completed` for `(habit_id, date)` and returns the value the
    /// server holds afterwards.
    async fn set_completion(
        &self,
        habit_id: u64,
        date: NaiveDate,
        completed: bool,
    ) -> Result<bool, SyncError>;
}

/// `POST /api/toggle` over HTTP.
#[derive(Debug, Clone)]
pub struct HttpEntryApi {
    client: Client,
    base_url: String,
    csrf_token: String,
}

impl HttpEntryApi {
    /// Builds the client; the request timeout applies to every call.
    pub async fn connect(config: &SyncConfig) -> Result<Self, SyncError> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        let csrf_token = match &config.csrf_token {
            Some(token) => token.clone(),
            None => discover_csrf_token(&client, &config.base_url).await?,
        };
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            csrf_token,
        })
    }
}

#[async_trait]
impl EntryApi for HttpEntryApi {
    async fn set_completion(
        &self,
        habit_id: u64,
        date: NaiveDate,
        completed: bool,
    ) -> Result<bool, SyncError> {
        let response = self
            .client
            .post(format!("{}/api/toggle", self.base_url))
            .header(CSRF_HEADER, &self.csrf_token)
            .json(&json!({
                "habit_id": habit_id,
                "date": date.format("%Y-%m-%d").to_string(),
                "completed": completed,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::Status(status.as_u16()));
        }
        let body = response.text().await?;
        debug!(habit_id, %date, "toggle response: {body}");
        parse_toggle_body(&body)
    }
}

/// Reads the anti-forgery token from the index page's meta tag.
pub async fn discover_csrf_token(client: &Client, base_url: &str) -> Result<String, SyncError> {
    let response = client.get(format!("{base_url}/")).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(SyncError::Status(status.as_u16()));
    }
    let html = response.text().await?;
    csrf_from_html(&html)
        .ok_or_else(|| SyncError::MalformedResponse("page has no csrf-token meta tag".into()))
}

fn csrf_from_html(html: &str) -> Option<String> {
    let wanted = format!(r#"name="{CSRF_META_NAME}""#);
    html.split("<meta")
        .skip(1)
        .filter_map(|rest| rest.split('>').next())
        .find(|tag| tag.contains(&wanted))
        .and_then(|tag| {
            let start = tag.find(r#"content=""#)? + r#"content=""#.len();
            let len = tag[start..].find('"')?;
            Some(tag[start..start + len].to_string())
        })
}

/// A 2xx body must be JSON carrying a boolean `completed`; an `error` field
/// or `success: false` is an application error.
pub(crate) fn parse_toggle_body(body: &str) -> Result<bool, SyncError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|err| SyncError::MalformedResponse(err.to_string()))?;
    if let Some(error) = value.get("error").filter(|error| !error.is_null()) {
        let message = error
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(SyncError::Application(message));
    }
    if value.get("success").and_then(Value::as_bool) == Some(false) {
        return Err(SyncError::Application("request was not successful".into()));
    }
    value
        .get("completed")
        .and_then(Value::as_bool)
        .ok_or_else(|| SyncError::MalformedResponse("missing `completed` field".into()))
}
