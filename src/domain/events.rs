use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BookId, LoanId, UserId};

/// イベント：書籍が予約された（1冊保留済み）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanReserved {
    pub loan_id: LoanId,
    pub book_id: BookId,
    pub user_id: UserId,
    pub reserved_at: DateTime<Utc>,
}

/// イベント：予約が承認され貸出中になった
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanApproved {
    pub loan_id: LoanId,
    pub approved_at: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
}

/// イベント：予約が却下された
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanRejected {
    pub loan_id: LoanId,
    pub book_id: BookId,
    pub rejected_at: DateTime<Utc>,
    pub admin_note: Option<String>,
}

/// イベント：予約が取り消された
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanCancelled {
    pub loan_id: LoanId,
    pub book_id: BookId,
    pub cancelled_at: DateTime<Utc>,
}

/// イベント：書籍が返却された
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanReturned {
    pub loan_id: LoanId,
    pub book_id: BookId,
    pub returned_at: DateTime<Utc>,
    pub was_overdue: bool,
}

/// ドメインイベント統合型
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DomainEvent {
    LoanReserved(LoanReserved),
    LoanApproved(LoanApproved),
    LoanRejected(LoanRejected),
    LoanCancelled(LoanCancelled),
    LoanReturned(LoanReturned),
}

impl DomainEvent {
    pub fn loan_id(&self) -> LoanId {
        match self {
            DomainEvent::LoanReserved(e) => e.loan_id,
            DomainEvent::LoanApproved(e) => e.loan_id,
            DomainEvent::LoanRejected(e) => e.loan_id,
            DomainEvent::LoanCancelled(e) => e.loan_id,
            DomainEvent::LoanReturned(e) => e.loan_id,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            DomainEvent::LoanReserved(_) => "LoanReserved",
            DomainEvent::LoanApproved(_) => "LoanApproved",
            DomainEvent::LoanRejected(_) => "LoanRejected",
            DomainEvent::LoanCancelled(_) => "LoanCancelled",
            DomainEvent::LoanReturned(_) => "LoanReturned",
        }
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            DomainEvent::LoanReserved(e) => e.reserved_at,
            DomainEvent::LoanApproved(e) => e.approved_at,
            DomainEvent::LoanRejected(e) => e.rejected_at,
            DomainEvent::LoanCancelled(e) => e.cancelled_at,
            DomainEvent::LoanReturned(e) => e.returned_at,
        }
    }
}
