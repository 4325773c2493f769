use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::{
    catalog::{BookWithReviews, DashboardStats, NewBook},
    loan::LoanDetails,
};
use crate::domain::{
    DomainEvent, LoanStatus,
    book::{Book, BookPatch},
    loan::{self, Loan},
    review::Review,
};

// ============================================================================
// Requests
// ============================================================================

/// 書籍登録リクエスト
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookRequest {
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub description: Option<String>,
    pub copies_total: i64,
}

impl From<CreateBookRequest> for NewBook {
    fn from(req: CreateBookRequest) -> Self {
        NewBook {
            title: req.title,
            author: req.author,
            isbn: req.isbn,
            description: req.description,
            copies_total: req.copies_total,
        }
    }
}

/// 書籍更新リクエスト（指定した項目のみ変更）
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBookRequest {
    pub title: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub description: Option<String>,
    pub copies_total: Option<i64>,
}

impl From<UpdateBookRequest> for BookPatch {
    fn from(req: UpdateBookRequest) -> Self {
        BookPatch {
            title: req.title,
            author: req.author,
            isbn: req.isbn,
            description: req.description,
            copies_total: req.copies_total,
        }
    }
}

/// 却下リクエスト（本文は省略可）
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectLoanRequest {
    pub admin_note: Option<String>,
}

/// 貸出一覧取得のクエリパラメータ
#[derive(Debug, Deserialize)]
pub struct ListLoansQuery {
    /// ステータスでフィルタリング
    pub status: Option<String>,
}

/// レビュー投稿リクエスト
#[derive(Debug, Deserialize)]
pub struct CreateReviewRequest {
    pub rating: i32,
    pub comment: Option<String>,
}

/// レビュー返信リクエスト
#[derive(Debug, Deserialize)]
pub struct ReviewResponseRequest {
    pub response: String,
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResponse {
    pub id: Uuid,
    pub book_id: Uuid,
    pub user_id: Uuid,
    pub rating: u8,
    pub comment: Option<String>,
    pub response: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Review> for ReviewResponse {
    fn from(review: Review) -> Self {
        Self {
            id: review.review_id.value(),
            book_id: review.book_id.value(),
            user_id: review.user_id.value(),
            rating: review.rating.value(),
            comment: review.comment,
            response: review.response,
            created_at: review.created_at,
        }
    }
}

/// 書籍レスポンス（GET /books と GET /books/:id）
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookResponse {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub description: Option<String>,
    pub copies_total: u32,
    pub copies_avail: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviews: Option<Vec<ReviewResponse>>,
}

impl From<Book> for BookResponse {
    fn from(book: Book) -> Self {
        Self {
            id: book.book_id.value(),
            title: book.title,
            author: book.author,
            isbn: book.isbn,
            description: book.description,
            copies_total: book.copies.total(),
            copies_avail: book.copies.available(),
            created_at: book.created_at,
            updated_at: book.updated_at,
            average_rating: None,
            review_count: None,
            reviews: None,
        }
    }
}

impl From<BookWithReviews> for BookResponse {
    fn from(view: BookWithReviews) -> Self {
        Self {
            average_rating: Some(view.rating.average),
            review_count: Some(view.rating.count),
            reviews: Some(view.reviews.into_iter().map(ReviewResponse::from).collect()),
            ..BookResponse::from(view.book)
        }
    }
}

/// 貸出に埋め込む書籍の概要
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookSummary {
    pub id: Uuid,
    pub title: String,
    pub author: String,
}

/// 貸出レスポンス
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanResponse {
    pub id: Uuid,
    pub book_id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub loan_type: String,
    pub status: String,
    pub start_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub return_date: Option<DateTime<Utc>>,
    pub admin_note: Option<String>,
    pub overdue: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub book: Option<BookSummary>,
}

impl LoanResponse {
    /// 遷移直後の貸出をレスポンスにする（延滞は`now`時点で判定）
    pub fn from_loan(loan: Loan, now: DateTime<Utc>) -> Self {
        let overdue = loan::is_overdue(&loan, now);
        Self::build(loan, None, overdue)
    }

    fn build(loan: Loan, book: Option<BookSummary>, overdue: bool) -> Self {
        Self {
            id: loan.loan_id.value(),
            book_id: loan.book_id.value(),
            user_id: loan.user_id.value(),
            loan_type: loan.loan_type.as_str().to_string(),
            status: loan.status.as_str().to_string(),
            start_date: loan.start_date,
            due_date: loan.due_date,
            return_date: loan.return_date,
            admin_note: loan.admin_note,
            overdue,
            created_at: loan.created_at,
            updated_at: loan.updated_at,
            book,
        }
    }
}

impl From<LoanDetails> for LoanResponse {
    fn from(details: LoanDetails) -> Self {
        let book = details.book.map(|b| BookSummary {
            id: b.book_id.value(),
            title: b.title,
            author: b.author,
        });
        Self::build(details.loan, book, details.overdue)
    }
}

/// 貸出の状態変更履歴の1件
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanEventResponse {
    pub event_type: &'static str,
    pub occurred_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub was_overdue: Option<bool>,
}

impl From<DomainEvent> for LoanEventResponse {
    fn from(event: DomainEvent) -> Self {
        let mut response = Self {
            event_type: event.event_type(),
            occurred_at: event.occurred_at(),
            due_date: None,
            admin_note: None,
            was_overdue: None,
        };
        match event {
            DomainEvent::LoanApproved(e) => response.due_date = Some(e.due_date),
            DomainEvent::LoanRejected(e) => response.admin_note = e.admin_note,
            DomainEvent::LoanReturned(e) => response.was_overdue = Some(e.was_overdue),
            DomainEvent::LoanReserved(_) | DomainEvent::LoanCancelled(_) => {}
        }
        response
    }
}

/// 管理ダッシュボードの集計レスポンス
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub total_books: usize,
    pub total_loans: usize,
    pub active_loans: usize,
    pub reserved_loans: usize,
    pub available_copies: u64,
}

impl From<DashboardStats> for StatsResponse {
    fn from(stats: DashboardStats) -> Self {
        Self {
            total_books: stats.total_books,
            total_loans: stats.total_loans,
            active_loans: stats.active_loans,
            reserved_loans: stats.reserved_loans,
            available_copies: stats.available_copies,
        }
    }
}

/// エラーレスポンス
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}

/// ステータスクエリパラメータのパースとバリデーション
pub fn parse_status_filter(status: &str) -> Result<LoanStatus, String> {
    status.parse::<LoanStatus>()
}
