//! Idempotent persistence of imported records
//!
//! Each record is written in its own transaction: customer, book and copy
//! are upserted by natural key, then the event is inserted unless its
//! fingerprint is already stored. Either all four writes land or none do.

use crate::record::{BookFields, CustomerFields, ImportRecord};
use chrono::{DateTime, Utc};
use crazylib_common::{fingerprint, EventKind};
use sqlx::{SqliteConnection, SqlitePool};

/// Result of persisting one record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// New event inserted
    Created,
    /// An event with the same fingerprint already exists
    Duplicate,
}

/// Whole-batch values applied to the record's book and copy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivedState {
    pub total_borrowed: i64,
    pub available: bool,
}

/// Persist one record atomically
pub async fn persist_record(
    pool: &SqlitePool,
    record: &ImportRecord,
    derived: DerivedState,
) -> Result<WriteOutcome, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let customer_id = upsert_customer(&mut tx, &record.identity.customer).await?;
    let book_id = upsert_book(&mut tx, &record.identity.book, derived.total_borrowed).await?;
    let copy_id =
        upsert_copy(&mut tx, &record.identity.call_number, book_id, derived.available).await?;

    let source_hash = fingerprint(
        record.event.kind,
        &record.event.action_dt,
        record.passport(),
        record.copy_key(),
    );
    let created = insert_event_once(
        &mut tx,
        record.event.kind,
        &record.event.action_dt,
        customer_id,
        copy_id,
        &source_hash,
    )
    .await?;

    tx.commit().await?;

    Ok(if created {
        WriteOutcome::Created
    } else {
        WriteOutcome::Duplicate
    })
}

/// Insert or update a customer by passport, returning its id
pub async fn upsert_customer(
    conn: &mut SqliteConnection,
    customer: &CustomerFields,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        INSERT INTO customers (
            passport, first_name, last_name, phone, email, birth_date, address, city_raw, zip
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(passport) DO UPDATE SET
            first_name = excluded.first_name,
            last_name = excluded.last_name,
            phone = excluded.phone,
            email = excluded.email,
            birth_date = excluded.birth_date,
            address = excluded.address,
            city_raw = excluded.city_raw,
            zip = excluded.zip,
            updated_at = CURRENT_TIMESTAMP
        RETURNING id
        "#,
    )
    .bind(&customer.passport)
    .bind(&customer.first_name)
    .bind(&customer.last_name)
    .bind(&customer.phone)
    .bind(&customer.email)
    .bind(customer.birth_date)
    .bind(&customer.address)
    .bind(&customer.city)
    .bind(&customer.zip)
    .fetch_one(&mut *conn)
    .await
}

/// Insert or update a book by unique id, returning its id
///
/// `total_borrowed` is overwritten, never incremented.
pub async fn upsert_book(
    conn: &mut SqliteConnection,
    book: &BookFields,
    total_borrowed: i64,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        INSERT INTO books (
            unique_id, title, author_name, description_html, publication_date, image_url,
            total_borrowed
        ) VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(unique_id) DO UPDATE SET
            title = excluded.title,
            author_name = excluded.author_name,
            description_html = excluded.description_html,
            publication_date = excluded.publication_date,
            image_url = excluded.image_url,
            total_borrowed = excluded.total_borrowed,
            updated_at = CURRENT_TIMESTAMP
        RETURNING id
        "#,
    )
    .bind(&book.unique_id)
    .bind(&book.title)
    .bind(&book.author_name)
    .bind(&book.description_html)
    .bind(book.publication_date)
    .bind(&book.image_url)
    .bind(total_borrowed)
    .fetch_one(&mut *conn)
    .await
}

/// Insert or update a copy by call number, returning its id
pub async fn upsert_copy(
    conn: &mut SqliteConnection,
    call_number: &str,
    book_id: i64,
    available: bool,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        INSERT INTO book_copies (call_number, book_id, available)
        VALUES (?, ?, ?)
        ON CONFLICT(call_number) DO UPDATE SET
            book_id = excluded.book_id,
            available = excluded.available
        RETURNING id
        "#,
    )
    .bind(call_number)
    .bind(book_id)
    .bind(available)
    .fetch_one(&mut *conn)
    .await
}

/// Insert an event unless its fingerprint exists; true when inserted
///
/// Uniqueness is enforced by the `source_hash` constraint, not by a prior
/// lookup.
pub async fn insert_event_once(
    conn: &mut SqliteConnection,
    kind: EventKind,
    action_dt: &DateTime<Utc>,
    customer_id: i64,
    book_copy_id: i64,
    source_hash: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO library_events (event_type, action_dt, customer_id, book_copy_id, source_hash)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(source_hash) DO NOTHING
        "#,
    )
    .bind(kind)
    .bind(action_dt)
    .bind(customer_id)
    .bind(book_copy_id)
    .bind(source_hash)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RawRecord;
    use crazylib_common::db::{find_book_by_unique_id, find_copy_by_call_number, init_memory_database};
    use serde_json::json;

    fn sample(kind: &str, at: &str, first_name: &str) -> ImportRecord {
        RawRecord::from_value(json!({
            "Type": kind,
            "ActionDateTime": at,
            "Customer": {"Passport": "P1", "FirstName": first_name},
            "Book": {"LibraryCallNumber": "C1", "LiteraryCreation": {"UniqueID": "U1", "Title": "T1"}}
        }))
        .extract()
        .unwrap()
    }

    #[tokio::test]
    async fn test_persist_creates_all_entities() {
        let pool = init_memory_database().await.unwrap();
        let record = sample("BORROW", "2024-01-01T10:00:00Z", "Ann");

        let outcome = persist_record(
            &pool,
            &record,
            DerivedState { total_borrowed: 1, available: false },
        )
        .await
        .unwrap();

        assert_eq!(outcome, WriteOutcome::Created);
        let book = find_book_by_unique_id(&pool, "U1").await.unwrap().unwrap();
        assert_eq!(book.total_borrowed, 1);
        let copy = find_copy_by_call_number(&pool, "C1").await.unwrap().unwrap();
        assert_eq!(copy.book_id, book.id);
        assert!(!copy.available);
    }

    #[tokio::test]
    async fn test_same_record_twice_is_duplicate() {
        let pool = init_memory_database().await.unwrap();
        let record = sample("BORROW", "2024-01-01T10:00:00Z", "Ann");
        let derived = DerivedState { total_borrowed: 1, available: false };

        assert_eq!(persist_record(&pool, &record, derived).await.unwrap(), WriteOutcome::Created);
        assert_eq!(persist_record(&pool, &record, derived).await.unwrap(), WriteOutcome::Duplicate);

        let events: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM library_events")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(events, 1);
    }

    #[tokio::test]
    async fn test_customer_fields_last_write_wins() {
        let pool = init_memory_database().await.unwrap();
        let derived = DerivedState { total_borrowed: 1, available: true };

        persist_record(&pool, &sample("BORROW", "2024-01-01T10:00:00Z", "Ann"), derived)
            .await
            .unwrap();
        persist_record(&pool, &sample("RELEASE", "2024-01-02T10:00:00Z", "Anna"), derived)
            .await
            .unwrap();

        let (count, first_name): (i64, String) =
            sqlx::query_as("SELECT COUNT(*), MAX(first_name) FROM customers")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(count, 1);
        assert_eq!(first_name, "Anna");
    }

    #[tokio::test]
    async fn test_total_borrowed_is_overwritten() {
        let pool = init_memory_database().await.unwrap();
        let record = sample("BORROW", "2024-01-01T10:00:00Z", "Ann");

        persist_record(&pool, &record, DerivedState { total_borrowed: 5, available: false })
            .await
            .unwrap();
        persist_record(&pool, &record, DerivedState { total_borrowed: 2, available: false })
            .await
            .unwrap();

        let book = find_book_by_unique_id(&pool, "U1").await.unwrap().unwrap();
        assert_eq!(book.total_borrowed, 2);
    }
}
