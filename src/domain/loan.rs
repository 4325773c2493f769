use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{
    ApproveError, BookId, DomainEvent, InvalidTransition, LoanAction, LoanApproved, LoanCancelled,
    LoanId, LoanRejected, LoanReserved, LoanReturned, UserId,
};

/// 貸出期間の既定値（日数）
pub const DEFAULT_LOAN_PERIOD_DAYS: i64 = 14;

/// 貸出期間の上限（日数）
pub const MAX_LOAN_PERIOD_DAYS: i64 = 3650;

/// 貸出ステータス
///
/// RESERVED, BORROWED のみが非終端状態。
/// REJECTED, RETURNED, CANCELLED からの遷移はすべて`InvalidTransition`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanStatus {
    /// 予約中（1冊保留済み、管理者の承認待ち）
    Reserved,
    /// 貸出中
    Borrowed,
    /// 返却済み
    Returned,
    /// 却下
    Rejected,
    /// 取消
    Cancelled,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Reserved => "RESERVED",
            LoanStatus::Borrowed => "BORROWED",
            LoanStatus::Returned => "RETURNED",
            LoanStatus::Rejected => "REJECTED",
            LoanStatus::Cancelled => "CANCELLED",
        }
    }

    /// 蔵書を1冊占有している状態か
    pub fn holds_copy(&self) -> bool {
        matches!(self, LoanStatus::Reserved | LoanStatus::Borrowed)
    }

    pub fn is_terminal(&self) -> bool {
        !self.holds_copy()
    }
}

impl std::str::FromStr for LoanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "RESERVED" => Ok(LoanStatus::Reserved),
            "BORROWED" => Ok(LoanStatus::Borrowed),
            "RETURNED" => Ok(LoanStatus::Returned),
            "REJECTED" => Ok(LoanStatus::Rejected),
            "CANCELLED" => Ok(LoanStatus::Cancelled),
            _ => Err(format!("Invalid loan status: {}", s)),
        }
    }
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 貸出種別
///
/// 予約として作成され、承認で貸出に切り替わる。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanType {
    Loan,
    Reservation,
}

impl LoanType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanType::Loan => "LOAN",
            LoanType::Reservation => "RESERVATION",
        }
    }
}

impl std::str::FromStr for LoanType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOAN" => Ok(LoanType::Loan),
            "RESERVATION" => Ok(LoanType::Reservation),
            _ => Err(format!("Invalid loan type: {}", s)),
        }
    }
}

/// 貸出期間
///
/// 不変条件：1日以上、`MAX_LOAN_PERIOD_DAYS`日以下。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoanPeriod(Duration);

impl LoanPeriod {
    /// 範囲外の日数なら`None`
    pub fn days(days: i64) -> Option<Self> {
        if !(1..=MAX_LOAN_PERIOD_DAYS).contains(&days) {
            return None;
        }
        Duration::try_days(days).map(Self)
    }

    pub fn duration(&self) -> Duration {
        self.0
    }
}

impl Default for LoanPeriod {
    fn default() -> Self {
        Self(Duration::days(DEFAULT_LOAN_PERIOD_DAYS))
    }
}

/// Loan集約 - 1冊の書籍に対する1回の予約・貸出
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    pub loan_id: LoanId,

    // 他の集約への参照（IDのみ）
    pub book_id: BookId,
    pub user_id: UserId,

    pub loan_type: LoanType,
    pub status: LoanStatus,
    pub start_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub return_date: Option<DateTime<Utc>>,
    /// 却下時のみ設定される
    pub admin_note: Option<String>,

    // 監査情報
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn require(loan: &Loan, expected: LoanStatus, action: LoanAction) -> Result<(), InvalidTransition> {
    if loan.status != expected {
        return Err(InvalidTransition {
            from: loan.status,
            action,
        });
    }
    Ok(())
}

/// 純粋関数：書籍を予約する
///
/// 在庫の保留は呼び出し側（台帳）の責務。ここでは保留済みを前提に
/// RESERVED状態のLoanとイベントを生成する。
pub fn reserve(
    book_id: BookId,
    user_id: UserId,
    reserved_at: DateTime<Utc>,
) -> (Loan, LoanReserved) {
    let loan_id = LoanId::new();

    let loan = Loan {
        loan_id,
        book_id,
        user_id,
        loan_type: LoanType::Reservation,
        status: LoanStatus::Reserved,
        start_date: None,
        due_date: None,
        return_date: None,
        admin_note: None,
        created_at: reserved_at,
        updated_at: reserved_at,
    };

    let event = LoanReserved {
        loan_id,
        book_id,
        user_id,
        reserved_at,
    };

    (loan, event)
}

/// 純粋関数：予約を承認する
///
/// ビジネスルール：
/// - RESERVEDのみ承認可能
/// - 開始日 = 承認時刻、返却期限 = 承認時刻 + 貸出期間
/// - 在庫は予約時に保留済みのため変化しない
/// - 返却期限が日時の表現範囲を超える場合は`DueDateOutOfRange`
pub fn approve(
    loan: &Loan,
    approved_at: DateTime<Utc>,
    period: LoanPeriod,
) -> Result<(Loan, LoanApproved), ApproveError> {
    require(loan, LoanStatus::Reserved, LoanAction::Approve)?;

    let due_date = approved_at
        .checked_add_signed(period.duration())
        .ok_or(ApproveError::DueDateOutOfRange)?;

    let new_loan = Loan {
        loan_type: LoanType::Loan,
        status: LoanStatus::Borrowed,
        start_date: Some(approved_at),
        due_date: Some(due_date),
        updated_at: approved_at,
        ..loan.clone()
    };

    let event = LoanApproved {
        loan_id: loan.loan_id,
        approved_at,
        due_date,
    };

    Ok((new_loan, event))
}

/// 純粋関数：予約を却下する
///
/// 空白のみのメモは未指定として扱う。
pub fn reject(
    loan: &Loan,
    admin_note: Option<String>,
    rejected_at: DateTime<Utc>,
) -> Result<(Loan, LoanRejected), InvalidTransition> {
    require(loan, LoanStatus::Reserved, LoanAction::Reject)?;

    let admin_note = admin_note
        .map(|note| note.trim().to_string())
        .filter(|note| !note.is_empty());

    let new_loan = Loan {
        status: LoanStatus::Rejected,
        admin_note: admin_note.clone(),
        updated_at: rejected_at,
        ..loan.clone()
    };

    let event = LoanRejected {
        loan_id: loan.loan_id,
        book_id: loan.book_id,
        rejected_at,
        admin_note,
    };

    Ok((new_loan, event))
}

/// 純粋関数：予約を取り消す
pub fn cancel(
    loan: &Loan,
    cancelled_at: DateTime<Utc>,
) -> Result<(Loan, LoanCancelled), InvalidTransition> {
    require(loan, LoanStatus::Reserved, LoanAction::Cancel)?;

    let new_loan = Loan {
        status: LoanStatus::Cancelled,
        updated_at: cancelled_at,
        ..loan.clone()
    };

    let event = LoanCancelled {
        loan_id: loan.loan_id,
        book_id: loan.book_id,
        cancelled_at,
    };

    Ok((new_loan, event))
}

/// 純粋関数：書籍を返却する
///
/// 延滞していても返却は受け付ける。延滞の有無はイベントに記録する。
pub fn return_loan(
    loan: &Loan,
    returned_at: DateTime<Utc>,
) -> Result<(Loan, LoanReturned), InvalidTransition> {
    require(loan, LoanStatus::Borrowed, LoanAction::Return)?;

    let was_overdue = is_overdue(loan, returned_at);

    let new_loan = Loan {
        status: LoanStatus::Returned,
        return_date: Some(returned_at),
        updated_at: returned_at,
        ..loan.clone()
    };

    let event = LoanReturned {
        loan_id: loan.loan_id,
        book_id: loan.book_id,
        returned_at,
        was_overdue,
    };

    Ok((new_loan, event))
}

/// 純粋関数：延滞判定
///
/// 保存せず、読み取り時に導出する。
pub fn is_overdue(loan: &Loan, now: DateTime<Utc>) -> bool {
    loan.status == LoanStatus::Borrowed && loan.due_date.is_some_and(|due| now > due)
}

/// イベントを適用して新しい状態を生成する純粋関数
///
/// イベントソーシングのfoldパターンで使用される。
/// 不正な遷移（例: 存在しない貸出の承認、終端状態からの返却）は`None`を返す。
pub fn apply_event(loan: Option<Loan>, event: &DomainEvent) -> Option<Loan> {
    match (loan, event) {
        (None, DomainEvent::LoanReserved(e)) => Some(Loan {
            loan_id: e.loan_id,
            book_id: e.book_id,
            user_id: e.user_id,
            loan_type: LoanType::Reservation,
            status: LoanStatus::Reserved,
            start_date: None,
            due_date: None,
            return_date: None,
            admin_note: None,
            created_at: e.reserved_at,
            updated_at: e.reserved_at,
        }),
        (Some(loan), DomainEvent::LoanApproved(e))
            if loan.loan_id == e.loan_id && loan.status == LoanStatus::Reserved =>
        {
            Some(Loan {
                loan_type: LoanType::Loan,
                status: LoanStatus::Borrowed,
                start_date: Some(e.approved_at),
                due_date: Some(e.due_date),
                updated_at: e.approved_at,
                ..loan
            })
        }
        (Some(loan), DomainEvent::LoanRejected(e))
            if loan.loan_id == e.loan_id && loan.status == LoanStatus::Reserved =>
        {
            Some(Loan {
                status: LoanStatus::Rejected,
                admin_note: e.admin_note.clone(),
                updated_at: e.rejected_at,
                ..loan
            })
        }
        (Some(loan), DomainEvent::LoanCancelled(e))
            if loan.loan_id == e.loan_id && loan.status == LoanStatus::Reserved =>
        {
            Some(Loan {
                status: LoanStatus::Cancelled,
                updated_at: e.cancelled_at,
                ..loan
            })
        }
        (Some(loan), DomainEvent::LoanReturned(e))
            if loan.loan_id == e.loan_id && loan.status == LoanStatus::Borrowed =>
        {
            Some(Loan {
                status: LoanStatus::Returned,
                return_date: Some(e.returned_at),
                updated_at: e.returned_at,
                ..loan
            })
        }
        _ => None,
    }
}

/// イベント列から現在の状態を復元する純粋関数
///
/// # 戻り値
/// * イベントが空、または途中に不正な遷移がある場合は`None`
/// * それ以外は復元されたLoanを`Some`で返す
pub fn replay_events(events: &[DomainEvent]) -> Option<Loan> {
    let (first, rest) = events.split_first()?;
    rest.iter()
        .try_fold(apply_event(None, first)?, |loan, event| {
            apply_event(Some(loan), event)
        })
}
