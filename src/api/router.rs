use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers::{
    AppState, add_review, approve_loan, cancel_loan, create_book, dashboard_stats, delete_book,
    get_book, get_loan, list_books, list_loans, list_reviews, loan_events, reject_loan,
    reserve_book, respond_to_review, return_loan, update_book,
};

/// Creates the API router with all lending endpoints
///
/// Every route except `/health` requires `Authorization: Bearer <token>`.
///
/// Catalog:
/// - GET /books, GET /books/:id
/// - POST /books, PUT /books/:id, DELETE /books/:id (ADMIN)
///
/// Loans:
/// - POST /loans/reserve/:id - Reserve a copy of a book
/// - POST /loans/approve/:id, POST /loans/reject/:id (ADMIN)
/// - POST /loans/cancel/:id, POST /loans/return/:id (owner or ADMIN)
/// - GET /loans, GET /loans/:id, GET /loans/:id/events
///
/// Reviews:
/// - POST /reviews/:id - Review a book
/// - GET /reviews/book/:id
/// - POST /reviews/:id/response (ADMIN)
///
/// Admin:
/// - GET /stats
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check endpoint
        .route("/health", get(health_check))
        // Catalog
        .route("/books", get(list_books).post(create_book))
        .route(
            "/books/:id",
            get(get_book).put(update_book).delete(delete_book),
        )
        // Loan lifecycle
        .route("/loans", get(list_loans))
        .route("/loans/reserve/:id", post(reserve_book))
        .route("/loans/approve/:id", post(approve_loan))
        .route("/loans/reject/:id", post(reject_loan))
        .route("/loans/cancel/:id", post(cancel_loan))
        .route("/loans/return/:id", post(return_loan))
        .route("/loans/:id", get(get_loan))
        .route("/loans/:id/events", get(loan_events))
        // Reviews
        .route("/reviews/:id", post(add_review))
        .route("/reviews/:id/response", post(respond_to_review))
        .route("/reviews/book/:id", get(list_reviews))
        // Admin dashboard
        .route("/stats", get(dashboard_stats))
        // Add tracing middleware
        .layer(TraceLayer::new_for_http())
        // Add application state
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
