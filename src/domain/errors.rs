use super::{LoanStatus, RatingError};

/// 蔵書数カウンタのエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InventoryError {
    /// 貸出可能な冊数が0
    OutOfStock,
    /// 総冊数が不正（1冊以上が必要）
    InvalidTotal(u32),
    /// 貸出中の冊数を下回る総冊数への変更
    BelowOnLoan { requested: u32, on_loan: u32 },
    /// 総冊数を超える解放（二重解放）
    OverRelease,
    /// 永続化された値が不変条件を満たさない
    Corrupted { total: u32, available: u32 },
}

/// 貸出の操作種別（エラー文脈用）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoanAction {
    Approve,
    Reject,
    Cancel,
    Return,
}

impl LoanAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanAction::Approve => "approve",
            LoanAction::Reject => "reject",
            LoanAction::Cancel => "cancel",
            LoanAction::Return => "return",
        }
    }
}

/// 状態遷移のエラー
///
/// 現在の状態から要求された操作が許されない。終端状態からの遷移もこれに含まれる。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidTransition {
    pub from: LoanStatus,
    pub action: LoanAction,
}

/// 承認のエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApproveError {
    Transition(InvalidTransition),
    /// 返却期限が日時の表現範囲を超える
    DueDateOutOfRange,
}

impl From<InvalidTransition> for ApproveError {
    fn from(err: InvalidTransition) -> Self {
        ApproveError::Transition(err)
    }
}

/// 書籍の入力バリデーションエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookValidationError {
    EmptyTitle,
    EmptyAuthor,
    InvalidCopiesTotal(i64),
}

impl std::fmt::Display for BookValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BookValidationError::EmptyTitle => write!(f, "title must not be empty"),
            BookValidationError::EmptyAuthor => write!(f, "author must not be empty"),
            BookValidationError::InvalidCopiesTotal(n) => {
                write!(f, "copiesTotal must be a positive integer, got {}", n)
            }
        }
    }
}

/// レビューの入力バリデーションエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewValidationError {
    Rating(RatingError),
    EmptyResponse,
}

impl From<RatingError> for ReviewValidationError {
    fn from(err: RatingError) -> Self {
        ReviewValidationError::Rating(err)
    }
}

impl std::fmt::Display for ReviewValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReviewValidationError::Rating(e) => e.fmt(f),
            ReviewValidationError::EmptyResponse => write!(f, "response must not be empty"),
        }
    }
}
