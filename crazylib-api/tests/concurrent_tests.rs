//! Concurrent borrows against an on-disk database
//!
//! The in-memory pool has a single connection, so these tests open a real
//! file to get several connections racing for the same copies.

use std::collections::HashSet;

use chrono::Utc;
use crazylib_api::db::borrow_book;
use crazylib_common::config::DatabaseConfig;
use crazylib_common::db::{get_book, init_database};
use crazylib_common::Error;
use sqlx::SqlitePool;
use tempfile::TempDir;
use tokio::task::JoinSet;

async fn setup(temp_dir: &TempDir, copies: usize) -> (SqlitePool, i64, i64) {
    let pool = init_database(&temp_dir.path().join("crazylib.db"), &DatabaseConfig::default())
        .await
        .unwrap();

    let customer_id: i64 = sqlx::query_scalar(
        "INSERT INTO customers (passport, first_name, last_name) VALUES ('P1', 'Ann', 'Lee') RETURNING id",
    )
    .fetch_one(&pool)
    .await
    .unwrap();

    let book_id: i64 = sqlx::query_scalar("INSERT INTO books (unique_id, title) VALUES ('U1', 'T1') RETURNING id")
        .fetch_one(&pool)
        .await
        .unwrap();

    for i in 0..copies {
        sqlx::query("INSERT INTO book_copies (book_id, call_number) VALUES (?, ?)")
            .bind(book_id)
            .bind(format!("C{}", i))
            .execute(&pool)
            .await
            .unwrap();
    }

    (pool, customer_id, book_id)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_two_borrows_of_last_copy() {
    let temp_dir = TempDir::new().unwrap();
    let (pool, customer_id, book_id) = setup(&temp_dir, 1).await;

    let (first, second) = tokio::join!(
        borrow_book(&pool, customer_id, book_id, Utc::now()),
        borrow_book(&pool, customer_id, book_id, Utc::now()),
    );

    let results = [first, second];
    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(Error::Conflict(_))))
        .count();
    assert_eq!(succeeded, 1, "results: {:?}", results);
    assert_eq!(conflicts, 1, "results: {:?}", results);

    let book = get_book(&pool, book_id).await.unwrap().unwrap();
    assert_eq!(book.total_borrowed, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_borrows_never_share_a_copy() {
    let temp_dir = TempDir::new().unwrap();
    let (pool, customer_id, book_id) = setup(&temp_dir, 3).await;

    let mut join_set = JoinSet::new();
    for _ in 0..8 {
        let pool = pool.clone();
        join_set.spawn(async move { borrow_book(&pool, customer_id, book_id, Utc::now()).await });
    }

    let mut claimed = HashSet::new();
    let mut conflicts = 0;
    while let Some(joined) = join_set.join_next().await {
        match joined.unwrap() {
            Ok(receipt) => assert!(claimed.insert(receipt.book_copy_id), "copy lent twice"),
            Err(Error::Conflict(_)) => conflicts += 1,
            Err(other) => panic!("unexpected error: {:?}", other),
        }
    }

    assert_eq!(claimed.len(), 3);
    assert_eq!(conflicts, 5);

    let available: i64 = sqlx::query_scalar("SELECT COALESCE(SUM(available), 0) FROM book_copies")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(available, 0);
}
