//! Database models

use crate::EventKind;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Library customer, keyed by passport
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Customer {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub passport: String,
    pub email: Option<String>,
    pub birth_date: Option<DateTime<Utc>>,
    pub address: Option<String>,
    pub city_raw: Option<String>,
    pub zip: Option<String>,
}

impl Customer {
    /// "Last First" display name
    pub fn display_name(&self) -> String {
        format!("{} {}", self.last_name, self.first_name)
    }
}

/// Logical work, keyed by `unique_id`
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Book {
    pub id: i64,
    pub unique_id: String,
    pub title: String,
    pub author_name: Option<String>,
    pub description_html: Option<String>,
    pub publication_date: Option<DateTime<Utc>>,
    pub image_url: Option<String>,
    /// BORROW events across all copies
    pub total_borrowed: i64,
}

/// Book with copy counts
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BookSummary {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub book: Book,
    pub copies_count: i64,
    pub available_copies: i64,
}

/// Physical copy of a book, keyed by call number
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BookCopy {
    pub id: i64,
    pub book_id: i64,
    pub call_number: String,
    pub available: bool,
}

/// Borrow or release of a copy by a customer
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct LibraryEvent {
    pub id: i64,
    pub event_type: EventKind,
    pub action_dt: DateTime<Utc>,
    pub customer_id: i64,
    pub book_copy_id: i64,
    /// Import fingerprint; `None` for events created through the API
    pub source_hash: Option<String>,
}
