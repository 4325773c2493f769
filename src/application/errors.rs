use crate::domain::{
    BookId, BookValidationError, InvalidTransition, InventoryError, LoanId, LoanStatus, ReviewId,
    ReviewValidationError,
};
use crate::ports::LedgerError;
use thiserror::Error;

/// 貸出サービスのアプリケーション層エラー
///
/// 呼び出し側が正確なメッセージを出せるよう、対象の書籍・貸出・現在の状態を保持する。
#[derive(Debug, Error)]
pub enum LendingError {
    /// 書籍が存在しない
    #[error("Book {0} not found")]
    BookNotFound(BookId),

    /// 貸出が存在しない
    #[error("Loan {0} not found")]
    LoanNotFound(LoanId),

    /// レビューが存在しない
    #[error("Review {0} not found")]
    ReviewNotFound(ReviewId),

    /// 貸出可能な蔵書がない
    #[error("No copies of book {0} are available")]
    OutOfStock(BookId),

    /// 状態遷移の規則違反
    #[error("Cannot {action} loan {loan_id} in status {from}")]
    InvalidTransition {
        loan_id: LoanId,
        from: LoanStatus,
        action: &'static str,
    },

    /// 予約中・貸出中の蔵書が残っている書籍の削除
    #[error("Book {book_id} still has {on_loan} copies reserved or on loan")]
    BookInUse { book_id: BookId, on_loan: u32 },

    /// ロール・所有者チェックの失敗
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// 入力値の検証エラー
    #[error("Validation error: {0}")]
    Validation(String),

    /// 台帳のエラー（不変条件違反や永続化失敗）
    #[error("Inventory ledger error")]
    LedgerError(#[source] LedgerError),

    /// カタログストアのエラー
    #[error("Catalog store error")]
    CatalogError(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// 貸出リポジトリのエラー
    #[error("Loan store error")]
    LoanStoreError(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// イベントストアのエラー
    #[error("Event store error")]
    EventStoreError(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// レビューリポジトリのエラー
    #[error("Review store error")]
    ReviewStoreError(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl LendingError {
    pub fn invalid_transition(loan_id: LoanId, err: InvalidTransition) -> Self {
        LendingError::InvalidTransition {
            loan_id,
            from: err.from,
            action: err.action.as_str(),
        }
    }
}

impl From<LedgerError> for LendingError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::BookNotFound(book_id) => LendingError::BookNotFound(book_id),
            LedgerError::Inventory {
                book_id,
                error: InventoryError::OutOfStock,
            } => LendingError::OutOfStock(book_id),
            LedgerError::Inventory {
                error: InventoryError::InvalidTotal(n),
                ..
            } => LendingError::Validation(format!(
                "copiesTotal must be a positive integer, got {}",
                n
            )),
            LedgerError::Inventory {
                error: InventoryError::BelowOnLoan { requested, on_loan },
                ..
            } => LendingError::Validation(format!(
                "copiesTotal {} is below the {} copies currently reserved or on loan",
                requested, on_loan
            )),
            other => LendingError::LedgerError(other),
        }
    }
}

impl From<BookValidationError> for LendingError {
    fn from(err: BookValidationError) -> Self {
        LendingError::Validation(err.to_string())
    }
}

impl From<ReviewValidationError> for LendingError {
    fn from(err: ReviewValidationError) -> Self {
        LendingError::Validation(err.to_string())
    }
}

/// アプリケーション層の Result型
pub type Result<T> = std::result::Result<T, LendingError>;
