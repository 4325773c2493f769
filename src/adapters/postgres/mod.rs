pub mod catalog;
pub mod event_store;
pub mod loan_repository;
pub mod review_repository;

// パブリックに型を再エクスポート
pub use catalog::PostgresCatalog;
pub use event_store::PostgresEventStore;
pub use loan_repository::PostgresLoanRepository;
pub use review_repository::PostgresReviewRepository;

use crate::application::{LendingPolicy, ServiceDependencies};
use sqlx::PgPool;
use std::sync::Arc;

/// PostgreSQLアダプターで依存関係を組み立てる
///
/// カタログと台帳は同じ`books`テーブルを扱うため、1つのインスタンスを共有する。
pub fn service_dependencies(pool: PgPool, policy: LendingPolicy) -> ServiceDependencies {
    let catalog = Arc::new(PostgresCatalog::new(pool.clone()));
    ServiceDependencies {
        books: catalog.clone(),
        ledger: catalog,
        loans: Arc::new(PostgresLoanRepository::new(pool.clone())),
        event_store: Arc::new(PostgresEventStore::new(pool.clone())),
        reviews: Arc::new(PostgresReviewRepository::new(pool)),
        policy,
    }
}
