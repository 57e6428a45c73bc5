//! Book read projections

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use crazylib_common::db::{get_book_summary, list_copies_for_book, BookCopy, BookSummary};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// GET /api/books/:id
pub async fn get_book_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<BookSummary>> {
    get_book_summary(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Book {}", id)))
}

/// GET /api/books/:id/copies
pub async fn list_copies_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vec<BookCopy>>> {
    if get_book_summary(&state.db, id).await?.is_none() {
        return Err(ApiError::NotFound(format!("Book {}", id)));
    }

    Ok(Json(list_copies_for_book(&state.db, id).await?))
}

/// Build book routes
pub fn book_routes() -> Router<AppState> {
    Router::new()
        .route("/api/books/:id", get(get_book_handler))
        .route("/api/books/:id/copies", get(list_copies_handler))
}
