pub mod catalog;
mod errors;
pub mod gateway;
pub mod loan;
pub mod review;

use crate::domain::LoanPeriod;
use crate::ports::*;
use std::sync::Arc;

pub use errors::{LendingError, Result};

/// 貸出ルールの設定値
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LendingPolicy {
    /// 承認から返却期限までの期間
    pub loan_period: LoanPeriod,
    /// 二重解放をエラーにするか（falseなら飽和させて記録のみ）
    pub strict_release: bool,
}

impl Default for LendingPolicy {
    fn default() -> Self {
        Self {
            loan_period: LoanPeriod::default(),
            strict_release: cfg!(debug_assertions),
        }
    }
}

/// サービスの依存関係
///
/// 関数型DDDの原則に従い、データ構造として定義。
/// 振る舞いは持たず、ユースケース関数に依存関係を渡す。
#[derive(Clone)]
pub struct ServiceDependencies {
    pub books: Arc<dyn BookRepository>,
    pub ledger: Arc<dyn InventoryLedger>,
    pub loans: Arc<dyn LoanRepository>,
    pub event_store: Arc<dyn EventStore>,
    pub reviews: Arc<dyn ReviewRepository>,
    pub policy: LendingPolicy,
}
