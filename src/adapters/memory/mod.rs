//! プロセス内で完結するアダプター。
//!
//! `DATABASE_URL`を指定しない起動と、テストで使う。

pub mod catalog;
pub mod event_store;
pub mod loan_repository;
pub mod review_repository;

pub use catalog::InMemoryCatalog;
pub use event_store::InMemoryEventStore;
pub use loan_repository::InMemoryLoanRepository;
pub use review_repository::InMemoryReviewRepository;

use crate::application::{LendingPolicy, ServiceDependencies};
use std::sync::Arc;

/// インメモリアダプターで依存関係を組み立てる
///
/// カタログと台帳は同じ`InMemoryCatalog`を共有する。
pub fn service_dependencies(policy: LendingPolicy) -> ServiceDependencies {
    let catalog = Arc::new(InMemoryCatalog::new());
    ServiceDependencies {
        books: catalog.clone(),
        ledger: catalog,
        loans: Arc::new(InMemoryLoanRepository::new()),
        event_store: Arc::new(InMemoryEventStore::new()),
        reviews: Arc::new(InMemoryReviewRepository::new()),
        policy,
    }
}
