//! Customer endpoints: profile, borrow, return, loans, history

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use crazylib_common::db::{get_customer, Customer};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::db::{borrow_book, borrow_history, currently_borrowed, return_book, BorrowedItem, HistoryEntry};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Body of POST /api/customers/:id/borrow
#[derive(Debug, Deserialize)]
pub struct BorrowRequest {
    pub book_id: Option<i64>,
}

/// Body of POST /api/customers/:id/return
#[derive(Debug, Deserialize)]
pub struct ReturnRequest {
    pub borrow_event_id: Option<i64>,
}

/// List response with item count
#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub results: Vec<T>,
    pub count: usize,
}

impl<T> From<Vec<T>> for ListResponse<T> {
    fn from(results: Vec<T>) -> Self {
        let count = results.len();
        Self { results, count }
    }
}

/// History entry with its loan status
#[derive(Debug, Serialize)]
pub struct HistoryItem {
    #[serde(flatten)]
    pub entry: HistoryEntry,
    pub status: &'static str,
}

/// GET /api/customers/:id
pub async fn get_customer_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Customer>> {
    get_customer(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Customer {}", id)))
}

/// POST /api/customers/:id/borrow
pub async fn borrow_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<BorrowRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let book_id = request
        .book_id
        .ok_or_else(|| ApiError::BadRequest("book_id is required".to_string()))?;
    let receipt = borrow_book(&state.db, id, book_id, Utc::now()).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "ok",
            "borrow_event_id": receipt.borrow_event_id,
            "book_title": receipt.book_title,
        })),
    ))
}

/// POST /api/customers/:id/return
pub async fn return_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<ReturnRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let borrow_event_id = request
        .borrow_event_id
        .ok_or_else(|| ApiError::BadRequest("borrow_event_id is required".to_string()))?;

    let release_event_id = return_book(&state.db, id, borrow_event_id, Utc::now()).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "ok",
            "release_event_id": release_event_id,
        })),
    ))
}

/// GET /api/customers/:id/borrowed
pub async fn borrowed_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<ListResponse<BorrowedItem>>> {
    let items = currently_borrowed(&state.db, id).await?;
    Ok(Json(items.into()))
}

/// GET /api/customers/:id/history
pub async fn history_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<ListResponse<HistoryItem>>> {
    let items: Vec<HistoryItem> = borrow_history(&state.db, id)
        .await?
        .into_iter()
        .map(|entry| HistoryItem {
            status: entry.status(),
            entry,
        })
        .collect();

    Ok(Json(items.into()))
}

/// Build customer routes
pub fn customer_routes() -> Router<AppState> {
    Router::new()
        .route("/api/customers/:id", get(get_customer_handler))
        .route("/api/customers/:id/borrow", post(borrow_handler))
        .route("/api/customers/:id/return", post(return_handler))
        .route("/api/customers/:id/borrowed", get(borrowed_handler))
        .route("/api/customers/:id/history", get(history_handler))
}
