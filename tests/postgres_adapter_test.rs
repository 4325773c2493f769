//! PostgreSQLアダプターの結合テスト
//!
//! 実データベースが必要なため`#[ignore]`。
//! `DATABASE_URL=... cargo test -- --ignored` で実行する。

mod common;

use chrono::{DateTime, Duration, Utc};
use rusty_lending::adapters::postgres::{self, PostgresEventStore};
use rusty_lending::application::{LendingError, ServiceDependencies, gateway, loan, review};
use rusty_lending::domain::{
    DomainEvent, InventoryError, LoanStatus, Release,
    commands::*,
    events::{LoanApproved, LoanReserved},
    value_objects::*,
};
use rusty_lending::ports::*;
use serial_test::serial;
use sqlx::PgPool;

use common::{admin, assert_inventory_consistent, book, seed_book, strict_policy, user};

/// PostgreSQLの時刻精度（マイクロ秒）に合わせて丸める
fn truncate_to_micros(dt: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(dt.timestamp_micros()).expect("Invalid timestamp")
}

/// データベースのクリーンアップ
///
/// テストの独立性を保つため、各テスト前にすべてのデータを削除します。
async fn cleanup_database(pool: &PgPool) {
    sqlx::query("TRUNCATE TABLE books, loans, loan_events, reviews")
        .execute(pool)
        .await
        .expect("Failed to truncate tables");
}

async fn setup() -> (PgPool, ServiceDependencies) {
    let pool = common::create_test_pool().await;
    cleanup_database(&pool).await;
    let deps = postgres::service_dependencies(pool.clone(), strict_policy());
    (pool, deps)
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_reserve_until_out_of_stock() {
    let (_pool, deps) = setup().await;
    let book_id = seed_book(&deps, 2).await;

    gateway::reserve_book(&deps, &user(), book_id, Utc::now())
        .await
        .unwrap();
    gateway::reserve_book(&deps, &user(), book_id, Utc::now())
        .await
        .unwrap();
    let third = gateway::reserve_book(&deps, &user(), book_id, Utc::now()).await;

    assert!(matches!(third, Err(LendingError::OutOfStock(id)) if id == book_id));
    assert_eq!(book(&deps, book_id).await.copies.available(), 0);
    assert_inventory_consistent(&deps, book_id).await;

    let missing = BookId::new();
    let result = deps.ledger.reserve_copy(missing).await;
    assert!(matches!(result, Err(LedgerError::BookNotFound(id)) if id == missing));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
#[serial]
async fn test_concurrent_reserves_never_exceed_copies() {
    let (_pool, deps) = setup().await;
    let book_id = seed_book(&deps, 3).await;

    let handles: Vec<_> = (0..20)
        .map(|_| {
            let deps = deps.clone();
            tokio::spawn(async move {
                gateway::reserve_book(&deps, &user(), book_id, Utc::now()).await
            })
        })
        .collect();

    let mut granted = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            granted += 1;
        }
    }

    assert_eq!(granted, 3);
    assert_inventory_consistent(&deps, book_id).await;
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_release_saturates_at_total() {
    let (_pool, deps) = setup().await;
    let book_id = seed_book(&deps, 1).await;
    deps.ledger.reserve_copy(book_id).await.unwrap();

    let first = deps.ledger.release_copy(book_id).await.unwrap();
    let second = deps.ledger.release_copy(book_id).await.unwrap();

    assert!(matches!(first, Release::Released(c) if c.available() == 1));
    assert!(matches!(second, Release::Saturated(c) if c.available() == 1));
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_resize_and_delete_if_idle() {
    let (_pool, deps) = setup().await;
    let book_id = seed_book(&deps, 2).await;
    deps.ledger.reserve_copy(book_id).await.unwrap();

    let counter = deps.ledger.resize(book_id, 4).await.unwrap();
    assert_eq!((counter.total(), counter.available()), (4, 3));

    let below = deps.ledger.resize(book_id, 0).await;
    assert!(matches!(
        below,
        Err(LedgerError::Inventory {
            error: InventoryError::InvalidTotal(0),
            ..
        })
    ));

    assert_eq!(
        deps.books.delete_if_idle(book_id).await.unwrap(),
        DeleteOutcome::InUse { on_loan: 1 }
    );
    deps.ledger.release_copy(book_id).await.unwrap();
    assert_eq!(
        deps.books.delete_if_idle(book_id).await.unwrap(),
        DeleteOutcome::Deleted
    );
    assert_eq!(
        deps.books.delete_if_idle(book_id).await.unwrap(),
        DeleteOutcome::NotFound
    );
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_loan_lifecycle_round_trip() {
    let (_pool, deps) = setup().await;
    let book_id = seed_book(&deps, 1).await;
    let borrower = user();

    let reserved = gateway::reserve_book(&deps, &borrower, book_id, Utc::now())
        .await
        .unwrap();
    let approved_at = truncate_to_micros(Utc::now());
    gateway::approve_loan(
        &deps,
        &admin(),
        ApproveLoan {
            loan_id: reserved.loan_id,
            approved_at,
        },
    )
    .await
    .unwrap();

    let details = loan::get_loan(&deps, &borrower, reserved.loan_id, Utc::now())
        .await
        .unwrap();
    assert_eq!(details.loan.status, LoanStatus::Borrowed);
    assert_eq!(details.loan.due_date, Some(approved_at + Duration::days(14)));
    assert_eq!(details.book.map(|b| b.book_id), Some(book_id));

    // 古い状態を前提にした書き込みは負ける
    assert!(
        !deps
            .loans
            .save_if_status(&reserved, LoanStatus::Reserved)
            .await
            .unwrap()
    );

    gateway::return_loan(
        &deps,
        &borrower,
        ReturnLoan {
            loan_id: reserved.loan_id,
            returned_at: Utc::now(),
        },
    )
    .await
    .unwrap();

    let events = loan::loan_events(&deps, &borrower, reserved.loan_id)
        .await
        .unwrap();
    assert_eq!(events.len(), 3);
    assert_eq!(book(&deps, book_id).await.copies.available(), 1);
    assert_inventory_consistent(&deps, book_id).await;
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_event_store_keeps_order() {
    let (pool, _deps) = setup().await;
    let event_store = PostgresEventStore::new(pool);

    let loan_id = LoanId::new();
    let now = truncate_to_micros(Utc::now());
    let reserved = DomainEvent::LoanReserved(LoanReserved {
        loan_id,
        book_id: BookId::new(),
        user_id: UserId::new(),
        reserved_at: now,
    });
    let approved = DomainEvent::LoanApproved(LoanApproved {
        loan_id,
        approved_at: now + Duration::hours(1),
        due_date: now + Duration::days(14),
    });

    event_store
        .append(loan_id, reserved.clone())
        .await
        .expect("Failed to append first event");
    event_store
        .append(loan_id, approved.clone())
        .await
        .expect("Failed to append second event");

    let loaded = event_store.load(loan_id).await.expect("Failed to load events");
    assert_eq!(loaded, vec![reserved, approved]);

    let empty = event_store.load(LoanId::new()).await.unwrap();
    assert!(empty.is_empty());
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_reviews_round_trip() {
    let (_pool, deps) = setup().await;
    let book_id = seed_book(&deps, 1).await;

    let written = review::add_review(
        &deps,
        &user(),
        book_id,
        3,
        Some("Slow start".to_string()),
        truncate_to_micros(Utc::now()),
    )
    .await
    .unwrap();
    review::respond_to_review(&deps, &admin(), written.review_id, "Noted")
        .await
        .unwrap();

    let reviews = review::list_reviews(&deps, book_id).await.unwrap();
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0].response.as_deref(), Some("Noted"));
    assert_eq!(reviews[0].rating.value(), 3);

    let summary = review::average_rating(&deps, book_id).await.unwrap();
    assert_eq!(summary.count, 1);
    assert_eq!(summary.average, 3.0);
}
