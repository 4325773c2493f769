use crate::application::LendingError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::types::ErrorResponse;

/// API層のエラー型
///
/// アプリケーション層のエラーに加え、認証とリクエスト形式のエラーを持つ。
#[derive(Debug)]
pub enum ApiError {
    /// アプリケーション層のエラー
    Lending(LendingError),
    /// トークンがない、または無効
    Unauthenticated(&'static str),
    /// クエリパラメータ等の形式エラー
    BadRequest(String),
    /// 認証サービスの障害
    AuthServiceError(Box<dyn std::error::Error + Send + Sync>),
}

impl From<LendingError> for ApiError {
    fn from(err: LendingError) -> Self {
        ApiError::Lending(err)
    }
}

fn internal_error(context: &str, err: &dyn std::fmt::Display) -> (StatusCode, &'static str, String) {
    // 内部エラーの詳細はログに記録し、クライアントには一般的なメッセージのみを返す
    tracing::error!(error = %err, "{}", context);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An unexpected error occurred".to_string(),
    )
}

fn map_lending_error(err: LendingError) -> (StatusCode, &'static str, String) {
    let message = err.to_string();
    match err {
        // 404 Not Found - リクエストされたリソースが存在しない
        LendingError::BookNotFound(_) => (StatusCode::NOT_FOUND, "BOOK_NOT_FOUND", message),
        LendingError::LoanNotFound(_) => (StatusCode::NOT_FOUND, "LOAN_NOT_FOUND", message),
        LendingError::ReviewNotFound(_) => (StatusCode::NOT_FOUND, "REVIEW_NOT_FOUND", message),

        // 409 Conflict - 現在の状態と両立しない
        LendingError::OutOfStock(_) => (StatusCode::CONFLICT, "OUT_OF_STOCK", message),
        LendingError::InvalidTransition { .. } => {
            (StatusCode::CONFLICT, "INVALID_TRANSITION", message)
        }
        LendingError::BookInUse { .. } => (StatusCode::CONFLICT, "BOOK_IN_USE", message),

        // 403 Forbidden - ロール・所有者チェックの失敗
        LendingError::Unauthorized(_) => (StatusCode::FORBIDDEN, "FORBIDDEN", message),

        // 422 Unprocessable Entity - 入力値の検証エラー
        LendingError::Validation(_) => {
            (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR", message)
        }

        // 500 Internal Server Error - システム障害
        LendingError::LedgerError(ref e) => internal_error("Inventory ledger error", e),
        LendingError::CatalogError(ref e) => internal_error("Catalog store error", e),
        LendingError::LoanStoreError(ref e) => internal_error("Loan store error", e),
        LendingError::EventStoreError(ref e) => internal_error("Event store error", e),
        LendingError::ReviewStoreError(ref e) => internal_error("Review store error", e),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ApiError::Lending(err) => map_lending_error(err),
            ApiError::Unauthenticated(msg) => {
                (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED", msg.to_string())
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::AuthServiceError(ref e) => internal_error("Auth service error", e),
        };

        let body = Json(ErrorResponse::new(error_type, message));
        (status, body).into_response()
    }
}
