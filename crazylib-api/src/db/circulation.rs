//! Live borrow/return workflows and customer loan projections
//!
//! A borrow claims a copy with one conditional `UPDATE`: the statement only
//! matches a row whose `available` flag is still set, so two concurrent
//! borrows can never both claim the same copy. A return writes the copy row
//! first, which takes the database write lock before the "already returned"
//! check runs.

use chrono::{DateTime, Utc};
use crazylib_common::{Error, EventKind, Result};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Customers see at most this many current loans
pub const BORROWED_LIMIT: i64 = 10;

/// History covers this many most recent borrows
pub const HISTORY_LIMIT: i64 = 50;

/// Outcome of a successful borrow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BorrowReceipt {
    pub borrow_event_id: i64,
    pub book_copy_id: i64,
    pub book_title: String,
}

/// One loan without a later release
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BorrowedItem {
    pub borrow_event_id: i64,
    pub borrowed_at: DateTime<Utc>,
    pub book_copy_id: i64,
    pub call_number: String,
    pub book_id: i64,
    pub title: String,
    pub author_name: Option<String>,
}

/// One borrow with its matching release, if any
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct HistoryEntry {
    pub borrow_event_id: i64,
    pub borrowed_at: DateTime<Utc>,
    pub call_number: String,
    pub book_id: i64,
    pub title: String,
    pub release_event_id: Option<i64>,
    pub returned_at: Option<DateTime<Utc>>,
}

impl HistoryEntry {
    pub fn status(&self) -> &'static str {
        if self.release_event_id.is_some() {
            "returned"
        } else {
            "currently borrowed"
        }
    }
}

async fn ensure_customer(pool: &SqlitePool, customer_id: i64) -> Result<()> {
    let found: Option<i64> = sqlx::query_scalar("SELECT id FROM customers WHERE id = ?")
        .bind(customer_id)
        .fetch_optional(pool)
        .await?;

    found
        .map(|_| ())
        .ok_or_else(|| Error::NotFound(format!("Customer {}", customer_id)))
}

/// Lend any available copy of a book to a customer
///
/// `NotFound` for an unknown customer or book, `Conflict` when every copy is
/// out.
pub async fn borrow_book(
    pool: &SqlitePool,
    customer_id: i64,
    book_id: i64,
    now: DateTime<Utc>,
) -> Result<BorrowReceipt> {
    ensure_customer(pool, customer_id).await?;

    let book_title: String = sqlx::query_scalar("SELECT title FROM books WHERE id = ?")
        .bind(book_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Book {}", book_id)))?;

    let mut tx = pool.begin().await?;

    let claimed: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE book_copies
        SET available = 0
        WHERE id = (
            SELECT id FROM book_copies
            WHERE book_id = ? AND available = 1
            ORDER BY id
            LIMIT 1
        )
        AND available = 1
        RETURNING id
        "#,
    )
    .bind(book_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(book_copy_id) = claimed else {
        warn!(customer_id, book_id, "No available copies");
        return Err(Error::Conflict("No available copies".to_string()));
    };

    sqlx::query("UPDATE books SET total_borrowed = total_borrowed + 1 WHERE id = ?")
        .bind(book_id)
        .execute(&mut *tx)
        .await?;

    let borrow_event_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO library_events (event_type, action_dt, customer_id, book_copy_id)
        VALUES (?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(EventKind::Borrow)
    .bind(now)
    .bind(customer_id)
    .bind(book_copy_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    info!(customer_id, book_id, book_copy_id, borrow_event_id, "Book borrowed");

    Ok(BorrowReceipt {
        borrow_event_id,
        book_copy_id,
        book_title,
    })
}

/// Return the copy of one of the customer's borrow events
///
/// `NotFound` when the event is not a borrow by this customer, `Conflict`
/// when a later release already exists for the copy. Returns the new release
/// event id.
pub async fn return_book(
    pool: &SqlitePool,
    customer_id: i64,
    borrow_event_id: i64,
    now: DateTime<Utc>,
) -> Result<i64> {
    ensure_customer(pool, customer_id).await?;

    let borrow: Option<(i64, DateTime<Utc>)> = sqlx::query_as(
        r#"
        SELECT book_copy_id, action_dt
        FROM library_events
        WHERE id = ? AND customer_id = ? AND event_type = ?
        "#,
    )
    .bind(borrow_event_id)
    .bind(customer_id)
    .bind(EventKind::Borrow)
    .fetch_optional(pool)
    .await?;

    let Some((book_copy_id, borrowed_at)) = borrow else {
        return Err(Error::NotFound(format!("Borrow event {}", borrow_event_id)));
    };

    let mut tx = pool.begin().await?;

    sqlx::query("UPDATE book_copies SET available = 1 WHERE id = ?")
        .bind(book_copy_id)
        .execute(&mut *tx)
        .await?;

    let already_returned: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM library_events
            WHERE book_copy_id = ?
              AND event_type = ?
              AND (action_dt > ? OR (action_dt = ? AND id > ?))
        )
        "#,
    )
    .bind(book_copy_id)
    .bind(EventKind::Release)
    .bind(borrowed_at)
    .bind(borrowed_at)
    .bind(borrow_event_id)
    .fetch_one(&mut *tx)
    .await?;

    if already_returned {
        // Dropping the transaction rolls back the availability write
        warn!(customer_id, borrow_event_id, "Book already returned");
        return Err(Error::Conflict("Book already returned".to_string()));
    }

    let release_event_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO library_events (event_type, action_dt, customer_id, book_copy_id)
        VALUES (?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(EventKind::Release)
    .bind(now)
    .bind(customer_id)
    .bind(book_copy_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    info!(customer_id, borrow_event_id, release_event_id, "Book returned");

    Ok(release_event_id)
}

/// Borrows of the customer with no later release on the same copy, newest first
pub async fn currently_borrowed(pool: &SqlitePool, customer_id: i64) -> Result<Vec<BorrowedItem>> {
    ensure_customer(pool, customer_id).await?;

    let items = sqlx::query_as::<_, BorrowedItem>(
        r#"
        SELECT e.id AS borrow_event_id,
               e.action_dt AS borrowed_at,
               c.id AS book_copy_id,
               c.call_number,
               b.id AS book_id,
               b.title,
               b.author_name
        FROM library_events e
        JOIN book_copies c ON c.id = e.book_copy_id
        JOIN books b ON b.id = c.book_id
        WHERE e.customer_id = ?
          AND e.event_type = 'BORROW'
          AND NOT EXISTS (
              SELECT 1 FROM library_events r
              WHERE r.book_copy_id = e.book_copy_id
                AND r.event_type = 'RELEASE'
                AND (r.action_dt > e.action_dt OR (r.action_dt = e.action_dt AND r.id > e.id))
          )
        ORDER BY e.action_dt DESC, e.id DESC
        LIMIT ?
        "#,
    )
    .bind(customer_id)
    .bind(BORROWED_LIMIT)
    .fetch_all(pool)
    .await?;

    Ok(items)
}

/// Most recent borrows of the customer, each with the first later release
pub async fn borrow_history(pool: &SqlitePool, customer_id: i64) -> Result<Vec<HistoryEntry>> {
    ensure_customer(pool, customer_id).await?;

    let entries = sqlx::query_as::<_, HistoryEntry>(
        r#"
        WITH borrows AS (
            SELECT e.id, e.action_dt, e.book_copy_id
            FROM library_events e
            WHERE e.customer_id = ? AND e.event_type = 'BORROW'
            ORDER BY e.action_dt DESC, e.id DESC
            LIMIT ?
        ),
        releases AS (
            SELECT bo.id AS borrow_id,
                   (SELECT r.id FROM library_events r
                    WHERE r.book_copy_id = bo.book_copy_id
                      AND r.event_type = 'RELEASE'
                      AND (r.action_dt > bo.action_dt OR (r.action_dt = bo.action_dt AND r.id > bo.id))
                    ORDER BY r.action_dt ASC, r.id ASC
                    LIMIT 1) AS release_id
            FROM borrows bo
        )
        SELECT bo.id AS borrow_event_id,
               bo.action_dt AS borrowed_at,
               c.call_number,
               b.id AS book_id,
               b.title,
               rel.id AS release_event_id,
               rel.action_dt AS returned_at
        FROM borrows bo
        JOIN releases x ON x.borrow_id = bo.id
        JOIN book_copies c ON c.id = bo.book_copy_id
        JOIN books b ON b.id = c.book_id
        LEFT JOIN library_events rel ON rel.id = x.release_id
        ORDER BY bo.action_dt DESC, bo.id DESC
        "#,
    )
    .bind(customer_id)
    .bind(HISTORY_LIMIT)
    .fetch_all(pool)
    .await?;

    Ok(entries)
}
