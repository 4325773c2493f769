pub mod auth_service;
pub mod catalog;
pub mod event_store;
pub mod inventory_ledger;
pub mod loan_repository;
pub mod review_repository;

pub use auth_service::AuthService;
pub use catalog::{BookRepository, DeleteOutcome};
pub use event_store::EventStore;
pub use inventory_ledger::{InventoryLedger, LedgerError, LedgerResult};
pub use loan_repository::LoanRepository;
pub use review_repository::ReviewRepository;
