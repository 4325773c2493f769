use crate::application::{LendingError, ServiceDependencies, catalog, gateway, loan, review};
use crate::domain::{
    commands::{ApproveLoan, CancelLoan, RejectLoan, ReturnLoan},
    value_objects::{BookId, LoanId, ReviewId},
};
use crate::ports::AuthService;
use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use super::{
    auth::AuthenticatedActor,
    error::ApiError,
    types::{
        BookResponse, CreateBookRequest, CreateReviewRequest, ListLoansQuery, LoanEventResponse,
        LoanResponse, RejectLoanRequest, ReviewResponse, ReviewResponseRequest, StatsResponse,
        UpdateBookRequest, parse_status_filter,
    },
};

// ============================================================================
// State
// ============================================================================

/// ハンドラー間で共有されるアプリケーション状態
#[derive(Clone)]
pub struct AppState {
    pub service_deps: ServiceDependencies,
    pub auth: Arc<dyn AuthService>,
}

// ============================================================================
// Books
// ============================================================================

/// GET /books - 書籍一覧（平均評価・レビュー付き）
pub async fn list_books(
    State(state): State<Arc<AppState>>,
    _actor: AuthenticatedActor,
) -> Result<Json<Vec<BookResponse>>, ApiError> {
    let books = catalog::list_books(&state.service_deps).await?;
    Ok(Json(books.into_iter().map(BookResponse::from).collect()))
}

/// GET /books/:id - 書籍詳細
pub async fn get_book(
    State(state): State<Arc<AppState>>,
    _actor: AuthenticatedActor,
    Path(book_id): Path<Uuid>,
) -> Result<Json<BookResponse>, ApiError> {
    let book = catalog::get_book(&state.service_deps, BookId::from_uuid(book_id)).await?;
    Ok(Json(BookResponse::from(book)))
}

/// POST /books - 書籍を登録（管理者のみ）
pub async fn create_book(
    State(state): State<Arc<AppState>>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Json(req): Json<CreateBookRequest>,
) -> Result<(StatusCode, Json<BookResponse>), ApiError> {
    let book =
        catalog::create_book(&state.service_deps, &actor, req.into(), Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(BookResponse::from(book))))
}

/// PUT /books/:id - 書籍を更新（管理者のみ）
///
/// `copiesTotal`の変更は貸出中の冊数を維持したまま貸出可能数を調整する。
pub async fn update_book(
    State(state): State<Arc<AppState>>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(book_id): Path<Uuid>,
    Json(req): Json<UpdateBookRequest>,
) -> Result<Json<BookResponse>, ApiError> {
    let book = catalog::update_book(
        &state.service_deps,
        &actor,
        BookId::from_uuid(book_id),
        req.into(),
        Utc::now(),
    )
    .await?;
    Ok(Json(BookResponse::from(book)))
}

/// DELETE /books/:id - 書籍を削除（管理者のみ）
///
/// 予約中・貸出中の蔵書が残っている場合は409。
pub async fn delete_book(
    State(state): State<Arc<AppState>>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(book_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    catalog::delete_book(&state.service_deps, &actor, BookId::from_uuid(book_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Loans
// ============================================================================

/// POST /loans/reserve/:id - 書籍を予約
///
/// 1冊を保留し、RESERVED状態の貸出を作成する。在庫切れは409。
pub async fn reserve_book(
    State(state): State<Arc<AppState>>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(book_id): Path<Uuid>,
) -> Result<(StatusCode, Json<LoanResponse>), ApiError> {
    let now = Utc::now();
    let loan =
        gateway::reserve_book(&state.service_deps, &actor, BookId::from_uuid(book_id), now)
            .await?;
    Ok((StatusCode::CREATED, Json(LoanResponse::from_loan(loan, now))))
}

/// POST /loans/approve/:id - 予約を承認（管理者のみ）
pub async fn approve_loan(
    State(state): State<Arc<AppState>>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(loan_id): Path<Uuid>,
) -> Result<Json<LoanResponse>, ApiError> {
    let now = Utc::now();
    let cmd = ApproveLoan {
        loan_id: LoanId::from_uuid(loan_id),
        approved_at: now,
    };
    let loan = gateway::approve_loan(&state.service_deps, &actor, cmd).await?;
    Ok(Json(LoanResponse::from_loan(loan, now)))
}

/// POST /loans/reject/:id - 予約を却下（管理者のみ）
///
/// 本文は省略可。空でない本文は`{"adminNote": string | null}`として読み、
/// 読めなければ却下せずにバリデーションエラーを返す。
pub async fn reject_loan(
    State(state): State<Arc<AppState>>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(loan_id): Path<Uuid>,
    body: Bytes,
) -> Result<Json<LoanResponse>, ApiError> {
    let now = Utc::now();
    let req = parse_reject_body(&body)?;
    let cmd = RejectLoan {
        loan_id: LoanId::from_uuid(loan_id),
        admin_note: req.admin_note,
        rejected_at: now,
    };
    let loan = gateway::reject_loan(&state.service_deps, &actor, cmd).await?;
    Ok(Json(LoanResponse::from_loan(loan, now)))
}

fn parse_reject_body(body: &[u8]) -> Result<RejectLoanRequest, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(RejectLoanRequest::default());
    }
    serde_json::from_slice(body).map_err(|e| {
        ApiError::Lending(LendingError::Validation(format!(
            "invalid reject body: {}",
            e
        )))
    })
}

/// POST /loans/cancel/:id - 予約を取り消し（本人または管理者）
pub async fn cancel_loan(
    State(state): State<Arc<AppState>>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(loan_id): Path<Uuid>,
) -> Result<Json<LoanResponse>, ApiError> {
    let now = Utc::now();
    let cmd = CancelLoan {
        loan_id: LoanId::from_uuid(loan_id),
        cancelled_at: now,
    };
    let loan = gateway::cancel_loan(&state.service_deps, &actor, cmd).await?;
    Ok(Json(LoanResponse::from_loan(loan, now)))
}

/// POST /loans/return/:id - 返却を記録（本人または管理者）
pub async fn return_loan(
    State(state): State<Arc<AppState>>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(loan_id): Path<Uuid>,
) -> Result<Json<LoanResponse>, ApiError> {
    let now = Utc::now();
    let cmd = ReturnLoan {
        loan_id: LoanId::from_uuid(loan_id),
        returned_at: now,
    };
    let loan = gateway::return_loan(&state.service_deps, &actor, cmd).await?;
    Ok(Json(LoanResponse::from_loan(loan, now)))
}

/// GET /loans - 貸出一覧
///
/// 利用者は自分の貸出のみ、管理者は全件。
/// `status`（RESERVED, BORROWED, RETURNED, REJECTED, CANCELLED）で絞り込める。
pub async fn list_loans(
    State(state): State<Arc<AppState>>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Query(query): Query<ListLoansQuery>,
) -> Result<Json<Vec<LoanResponse>>, ApiError> {
    let status = query
        .status
        .as_deref()
        .map(parse_status_filter)
        .transpose()
        .map_err(ApiError::BadRequest)?;

    let loans = loan::list_loans(&state.service_deps, &actor, status, Utc::now()).await?;
    Ok(Json(loans.into_iter().map(LoanResponse::from).collect()))
}

/// GET /loans/:id - 貸出詳細（本人または管理者）
pub async fn get_loan(
    State(state): State<Arc<AppState>>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(loan_id): Path<Uuid>,
) -> Result<Json<LoanResponse>, ApiError> {
    let details = loan::get_loan(
        &state.service_deps,
        &actor,
        LoanId::from_uuid(loan_id),
        Utc::now(),
    )
    .await?;
    Ok(Json(LoanResponse::from(details)))
}

/// GET /loans/:id/events - 貸出の状態変更履歴（本人または管理者）
pub async fn loan_events(
    State(state): State<Arc<AppState>>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(loan_id): Path<Uuid>,
) -> Result<Json<Vec<LoanEventResponse>>, ApiError> {
    let events =
        loan::loan_events(&state.service_deps, &actor, LoanId::from_uuid(loan_id)).await?;
    Ok(Json(events.into_iter().map(LoanEventResponse::from).collect()))
}

// ============================================================================
// Reviews
// ============================================================================

/// POST /reviews/:id - 書籍にレビューを投稿
pub async fn add_review(
    State(state): State<Arc<AppState>>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(book_id): Path<Uuid>,
    Json(req): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<ReviewResponse>), ApiError> {
    let review = review::add_review(
        &state.service_deps,
        &actor,
        BookId::from_uuid(book_id),
        req.rating,
        req.comment,
        Utc::now(),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(ReviewResponse::from(review))))
}

/// GET /reviews/book/:id - 書籍のレビュー一覧
pub async fn list_reviews(
    State(state): State<Arc<AppState>>,
    _actor: AuthenticatedActor,
    Path(book_id): Path<Uuid>,
) -> Result<Json<Vec<ReviewResponse>>, ApiError> {
    let reviews = review::list_reviews(&state.service_deps, BookId::from_uuid(book_id)).await?;
    Ok(Json(reviews.into_iter().map(ReviewResponse::from).collect()))
}

/// POST /reviews/:id/response - レビューに返信（管理者のみ）
pub async fn respond_to_review(
    State(state): State<Arc<AppState>>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(review_id): Path<Uuid>,
    Json(req): Json<ReviewResponseRequest>,
) -> Result<Json<ReviewResponse>, ApiError> {
    let review = review::respond_to_review(
        &state.service_deps,
        &actor,
        ReviewId::from_uuid(review_id),
        &req.response,
    )
    .await?;
    Ok(Json(ReviewResponse::from(review)))
}

// ============================================================================
// Admin
// ============================================================================

/// GET /stats - 管理ダッシュボードの集計（管理者のみ）
pub async fn dashboard_stats(
    State(state): State<Arc<AppState>>,
    AuthenticatedActor(actor): AuthenticatedActor,
) -> Result<Json<StatsResponse>, ApiError> {
    let stats = catalog::dashboard_stats(&state.service_deps, &actor).await?;
    Ok(Json(StatsResponse::from(stats)))
}
