//! Read-only projections over the library tables

use super::models::{Book, BookCopy, BookSummary, Customer, LibraryEvent};
use crate::Result;
use sqlx::SqlitePool;

const CUSTOMER_COLUMNS: &str = "id, first_name, last_name, phone, passport, email, birth_date, \
                                address, city_raw, zip";

const BOOK_COLUMNS: &str = "id, unique_id, title, author_name, description_html, \
                            publication_date, image_url, total_borrowed";

pub async fn get_customer(pool: &SqlitePool, id: i64) -> Result<Option<Customer>> {
    let customer = sqlx::query_as::<_, Customer>(&format!(
        "SELECT {} FROM customers WHERE id = ?",
        CUSTOMER_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(customer)
}

pub async fn find_customer_by_passport(pool: &SqlitePool, passport: &str) -> Result<Option<Customer>> {
    let customer = sqlx::query_as::<_, Customer>(&format!(
        "SELECT {} FROM customers WHERE passport = ?",
        CUSTOMER_COLUMNS
    ))
    .bind(passport)
    .fetch_optional(pool)
    .await?;

    Ok(customer)
}

pub async fn get_book(pool: &SqlitePool, id: i64) -> Result<Option<Book>> {
    let book = sqlx::query_as::<_, Book>(&format!("SELECT {} FROM books WHERE id = ?", BOOK_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(book)
}

pub async fn find_book_by_unique_id(pool: &SqlitePool, unique_id: &str) -> Result<Option<Book>> {
    let book = sqlx::query_as::<_, Book>(&format!(
        "SELECT {} FROM books WHERE unique_id = ?",
        BOOK_COLUMNS
    ))
    .bind(unique_id)
    .fetch_optional(pool)
    .await?;

    Ok(book)
}

/// Book with `copies_count` and `available_copies`
pub async fn get_book_summary(pool: &SqlitePool, id: i64) -> Result<Option<BookSummary>> {
    let summary = sqlx::query_as::<_, BookSummary>(
        r#"
        SELECT b.id, b.unique_id, b.title, b.author_name, b.description_html,
               b.publication_date, b.image_url, b.total_borrowed,
               COUNT(c.id) AS copies_count,
               COALESCE(SUM(c.available), 0) AS available_copies
        FROM books b
        LEFT JOIN book_copies c ON c.book_id = b.id
        WHERE b.id = ?
        GROUP BY b.id
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(summary)
}

pub async fn list_copies_for_book(pool: &SqlitePool, book_id: i64) -> Result<Vec<BookCopy>> {
    let copies = sqlx::query_as::<_, BookCopy>(
        "SELECT id, book_id, call_number, available FROM book_copies WHERE book_id = ? ORDER BY call_number",
    )
    .bind(book_id)
    .fetch_all(pool)
    .await?;

    Ok(copies)
}

pub async fn find_copy_by_call_number(pool: &SqlitePool, call_number: &str) -> Result<Option<BookCopy>> {
    let copy = sqlx::query_as::<_, BookCopy>(
        "SELECT id, book_id, call_number, available FROM book_copies WHERE call_number = ?",
    )
    .bind(call_number)
    .fetch_optional(pool)
    .await?;

    Ok(copy)
}

pub async fn get_event(pool: &SqlitePool, id: i64) -> Result<Option<LibraryEvent>> {
    let event = sqlx::query_as::<_, LibraryEvent>(
        r#"
        SELECT id, event_type, action_dt, customer_id, book_copy_id, source_hash
        FROM library_events
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(event)
}

/// Events of one copy in chronological order
pub async fn list_events_for_copy(pool: &SqlitePool, book_copy_id: i64) -> Result<Vec<LibraryEvent>> {
    let events = sqlx::query_as::<_, LibraryEvent>(
        r#"
        SELECT id, event_type, action_dt, customer_id, book_copy_id, source_hash
        FROM library_events
        WHERE book_copy_id = ?
        ORDER BY action_dt ASC, id ASC
        "#,
    )
    .bind(book_copy_id)
    .fetch_all(pool)
    .await?;

    Ok(events)
}

pub async fn count_events(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM library_events")
        .fetch_one(pool)
        .await?;

    Ok(count)
}
