use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use crazylib_common::db::{get_event, LibraryEvent};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// GET /api/events/:id
pub async fn get_event_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<LibraryEvent>> {
    get_event(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Event {}", id)))
}

pub fn event_routes() -> Router<AppState> {
    Router::new().route("/api/events/:id", get(get_event_handler))
}
