use crate::backup::{self, Backup};
use crate::errors::AppError;
use crate::models::{
    AppData, CreateHabitRequest, CreatedResponse, Habit, HabitUpdate, MonthStatsResponse, SuccessResponse,
    SummaryResponse, TodayResponse, ToggleRequest, ToggleResponse, UpdateHabitRequest,
    WeekResponse,
};
use crate::state::AppState;
use crate::stats::{build_month_stats, build_summary, build_today, build_week, iso_week_of, DateRange};
use crate::storage::persist_data;
use crate::ui::render_index;
use axum::{
    extract::{Path, State},
    http::header,
    response::{Html, IntoResponse},
    Json,
};
use chrono::{Local, NaiveDate, Utc};
use tracing::info;

pub async fn index(State(state): State<AppState>) -> Html<String> {
    let data = state.data.lock().await;
    Html(render_index(&build_today(&data), &state.csrf_token))
}

pub async fn get_today(State(state): State<AppState>) -> Result<Json<TodayResponse>, AppError> {
    let data = state.data.lock().await;
    Ok(Json(build_today(&data)))
}

/// Sets the entry when `completed` is given, flips it otherwise.
pub async fn toggle(
    State(state): State<AppState>,
    Json(payload): Json<ToggleRequest>,
) -> Result<Json<ToggleResponse>, AppError> {
    let date = NaiveDate::parse_from_str(payload.date.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::bad_request("Invalid date format"))?;

    let completed = commit(&state, |data| {
        data.toggle_entry(payload.habit_id, date, payload.completed)
            .ok_or_else(|| AppError::not_found(format!("habit {} not found", payload.habit_id)))
    })
    .await?;

    info!(habit_id = payload.habit_id, %date, completed, "entry toggled");
    Ok(Json(ToggleResponse {
        success: true,
        completed,
    }))
}

pub async fn get_month_stats(
    State(state): State<AppState>,
    Path((year, month)): Path<(i32, u32)>,
) -> Result<Json<MonthStatsResponse>, AppError> {
    let range = DateRange::month(year, month)
        .ok_or_else(|| AppError::bad_request("Invalid month"))?;
    let data = state.data.lock().await;
    Ok(Json(build_month_stats(&data, &range)))
}

pub async fn get_current_week(State(state): State<AppState>) -> Result<Json<WeekResponse>, AppError> {
    let (year, week) = iso_week_of(Local::now().date_naive());
    week_response(&state, year, week).await
}

pub async fn get_week(
    State(state): State<AppState>,
    Path((year, week)): Path<(i32, u32)>,
) -> Result<Json<WeekResponse>, AppError> {
    week_response(&state, year, week).await
}

async fn week_response(state: &AppState, year: i32, week: u32) -> Result<Json<WeekResponse>, AppError> {
    let range = DateRange::iso_week(year, week)
        .ok_or_else(|| AppError::bad_request("Invalid ISO week"))?;
    let data = state.data.lock().await;
    Ok(Json(build_week(&data, year, week, &range)))
}

pub async fn get_summary(State(state): State<AppState>) -> Result<Json<SummaryResponse>, AppError> {
    let data = state.data.lock().await;
    Ok(Json(build_summary(&data)))
}

pub async fn list_habits(State(state): State<AppState>) -> Result<Json<Vec<Habit>>, AppError> {
    let data = state.data.lock().await;
    Ok(Json(data.sorted_habits().into_iter().cloned().collect()))
}

pub async fn create_habit(
    State(state): State<AppState>,
    Json(payload): Json<CreateHabitRequest>,
) -> Result<Json<CreatedResponse>, AppError> {
    let name = required_name(&payload.name)?;
    let id = commit(&state, |data| {
        Ok(data.create_habit(name, payload.category, payload.emoji, Utc::now()))
    })
    .await?;

    info!(habit_id = id, "habit created");
    Ok(Json(CreatedResponse { success: true, id }))
}

pub async fn update_habit(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(payload): Json<UpdateHabitRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    let name = payload.name.as_deref().map(required_name).transpose()?;
    let update = HabitUpdate {
        name,
        category: payload.category,
        emoji: payload.emoji,
        position: payload.position,
    };

    commit(&state, |data| match data.update_habit(id, update) {
        Some(_) => Ok(()),
        None => Err(AppError::not_found(format!("habit {id} not found"))),
    })
    .await?;
    Ok(Json(SuccessResponse { success: true }))
}

pub async fn delete_habit(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<SuccessResponse>, AppError> {
    commit(&state, |data| {
        if data.delete_habit(id) {
            Ok(())
        } else {
            Err(AppError::not_found(format!("habit {id} not found")))
        }
    })
    .await?;

    info!(habit_id = id, "habit deleted");
    Ok(Json(SuccessResponse { success: true }))
}

pub async fn export_json(State(state): State<AppState>) -> Result<Json<Backup>, AppError> {
    let data = state.data.lock().await;
    Ok(Json(backup::export(&data, Utc::now())))
}

pub async fn export_csv(State(state): State<AppState>) -> impl IntoResponse {
    let data = state.data.lock().await;
    (
        [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
        backup::export_csv(&data),
    )
}

pub async fn import_json(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<SuccessResponse>, AppError> {
    let backup: Backup = serde_json::from_str(&body)
        .map_err(|err| AppError::bad_request(format!("invalid backup: {err}")))?;
    let (habits, entries) = (backup.habits.len(), backup.entries.len());

    commit(&state, |data| {
        *data = backup::import(backup, Utc::now());
        Ok(())
    })
    .await?;

    info!(habits, entries, "backup imported");
    Ok(Json(SuccessResponse { success: true }))
}

/// Applies `change` to a copy of the data and swaps the copy in only after
/// it was written to disk, so a failed write leaves memory as it was.
async fn commit<T>(
    state: &AppState,
    change: impl FnOnce(&mut AppData) -> Result<T, AppError>,
) -> Result<T, AppError> {
    let mut data = state.data.lock().await;
    let mut next = data.clone();
    let outcome = change(&mut next)?;
    persist_data(&state.data_path, &next).await?;
    *data = next;
    Ok(outcome)
}

fn required_name(name: &str) -> Result<String, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::bad_request("name must not be empty"));
    }
    Ok(name.to_string())
}
