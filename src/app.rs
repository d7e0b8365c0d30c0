use crate::errors::AppError;
use crate::handlers;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::Method,
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
    Router,
};
use tracing::warn;

/// Header mutating requests must carry the anti-forgery token in.
pub const CSRF_HEADER: &str = "X-CSRFToken";

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/api/today", get(handlers::get_today))
        .route("/api/toggle", post(handlers::toggle))
        .route("/api/stats/:year/:month", get(handlers::get_month_stats))
        .route("/api/week", get(handlers::get_current_week))
        .route("/api/week/:year/:week", get(handlers::get_week))
        .route("/api/summary", get(handlers::get_summary))
        .route(
            "/api/habits",
            get(handlers::list_habits).post(handlers::create_habit),
        )
        .route(
            "/api/habits/:id",
            put(handlers::update_habit).delete(handlers::delete_habit),
        )
        .route("/api/export", get(handlers::export_json))
        .route("/api/export.csv", get(handlers::export_csv))
        .route("/api/import", post(handlers::import_json))
        .layer(middleware::from_fn_with_state(state.clone(), require_csrf))
        .with_state(state)
}

async fn require_csrf(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let mutating = matches!(
        *request.method(),
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    );
    if mutating {
        let presented = request
            .headers()
            .get(CSRF_HEADER)
            .and_then(|value| value.to_str().ok());
        if presented != Some(&*state.csrf_token) {
            warn!(method = %request.method(), path = %request.uri().path(), "rejected request without valid csrf token");
            return Err(AppError::forbidden("The CSRF token is missing or invalid."));
        }
    }
    Ok(next.run(request).await)
}
