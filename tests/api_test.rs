use axum::body::Body;
use axum::http::{Request, StatusCode};
use rusty_lending::domain::value_objects::*;
use serde_json::{Value, json};
use tower::ServiceExt;

mod common;

const ADMIN_TOKEN: &str = "admin-token";
const ALICE_TOKEN: &str = "alice-token";
const BOB_TOKEN: &str = "bob-token";

// ============================================================================
// ヘルパー関数
// ============================================================================

fn test_app() -> axum::Router {
    let (app, _) = common::memory_app(&[
        (ADMIN_TOKEN, Actor::admin(UserId::new())),
        (ALICE_TOKEN, Actor::user(UserId::new())),
        (BOB_TOKEN, Actor::user(UserId::new())),
    ]);
    app
}

async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn create_book(app: &axum::Router, copies_total: i64) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/books",
        Some(ADMIN_TOKEN),
        Some(json!({
            "title": "Kindred",
            "author": "Octavia E. Butler",
            "copiesTotal": copies_total,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

// ============================================================================
// 認証
// ============================================================================

#[tokio::test]
async fn test_health_needs_no_token() {
    let app = test_app();
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_missing_or_unknown_token_is_401() {
    let app = test_app();

    let (status, body) = send(&app, "GET", "/books", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "UNAUTHENTICATED");

    let (status, _) = send(&app, "GET", "/books", Some("forged"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_user_cannot_create_book() {
    let app = test_app();
    let (status, body) = send(
        &app,
        "POST",
        "/books",
        Some(ALICE_TOKEN),
        Some(json!({ "title": "T", "author": "A", "copiesTotal": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "FORBIDDEN");
}

// ============================================================================
// 貸出フロー
// ============================================================================

#[tokio::test]
async fn test_full_loan_flow() {
    let app = test_app();
    let book_id = create_book(&app, 1).await;

    // 予約
    let (status, loan) = send(
        &app,
        "POST",
        &format!("/loans/reserve/{}", book_id),
        Some(ALICE_TOKEN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(loan["status"], "RESERVED");
    assert_eq!(loan["type"], "RESERVATION");
    let loan_id = loan["id"].as_str().unwrap().to_string();

    // 在庫切れ
    let (status, body) = send(
        &app,
        "POST",
        &format!("/loans/reserve/{}", book_id),
        Some(BOB_TOKEN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "OUT_OF_STOCK");

    // 承認
    let (status, loan) = send(
        &app,
        "POST",
        &format!("/loans/approve/{}", loan_id),
        Some(ADMIN_TOKEN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(loan["status"], "BORROWED");
    assert_eq!(loan["type"], "LOAN");
    assert!(loan["dueDate"].is_string());
    assert_eq!(loan["overdue"], false);

    // 本人の一覧
    let (status, loans) = send(&app, "GET", "/loans?status=BORROWED", Some(ALICE_TOKEN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(loans.as_array().unwrap().len(), 1);
    assert_eq!(loans[0]["book"]["title"], "Kindred");

    // 他人は見られない
    let (status, _) = send(&app, "GET", &format!("/loans/{}", loan_id), Some(BOB_TOKEN), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // 返却
    let (status, loan) = send(
        &app,
        "POST",
        &format!("/loans/return/{}", loan_id),
        Some(ALICE_TOKEN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(loan["status"], "RETURNED");
    assert!(loan["returnDate"].is_string());

    // 二重返却は409
    let (status, body) = send(
        &app,
        "POST",
        &format!("/loans/return/{}", loan_id),
        Some(ALICE_TOKEN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "INVALID_TRANSITION");

    // 在庫は戻っている
    let (_, book) = send(&app, "GET", &format!("/books/{}", book_id), Some(BOB_TOKEN), None).await;
    assert_eq!(book["copiesAvail"], 1);
    assert_eq!(book["copiesTotal"], 1);

    // 履歴
    let (status, events) = send(
        &app,
        "GET",
        &format!("/loans/{}/events", loan_id),
        Some(ADMIN_TOKEN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let types: Vec<&str> = events
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["eventType"].as_str().unwrap())
        .collect();
    assert_eq!(types, vec!["LoanReserved", "LoanApproved", "LoanReturned"]);
}

#[tokio::test]
async fn test_reject_with_and_without_note() {
    let app = test_app();
    let book_id = create_book(&app, 2).await;

    let (_, first) = send(&app, "POST", &format!("/loans/reserve/{}", book_id), Some(ALICE_TOKEN), None).await;
    let (_, second) = send(&app, "POST", &format!("/loans/reserve/{}", book_id), Some(BOB_TOKEN), None).await;

    let (status, rejected) = send(
        &app,
        "POST",
        &format!("/loans/reject/{}", first["id"].as_str().unwrap()),
        Some(ADMIN_TOKEN),
        Some(json!({ "adminNote": "damaged copy" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rejected["status"], "REJECTED");
    assert_eq!(rejected["adminNote"], "damaged copy");

    let (status, rejected) = send(
        &app,
        "POST",
        &format!("/loans/reject/{}", second["id"].as_str().unwrap()),
        Some(ADMIN_TOKEN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rejected["adminNote"], Value::Null);

    let (_, book) = send(&app, "GET", &format!("/books/{}", book_id), Some(ADMIN_TOKEN), None).await;
    assert_eq!(book["copiesAvail"], 2);
}

#[tokio::test]
async fn test_reject_with_unreadable_body_is_422_and_keeps_reservation() {
    let app = test_app();
    let book_id = create_book(&app, 1).await;
    let (_, reserved) = send(&app, "POST", &format!("/loans/reserve/{}", book_id), Some(ALICE_TOKEN), None).await;
    let loan_uri = format!("/loans/{}", reserved["id"].as_str().unwrap());
    let reject_uri = format!("/loans/reject/{}", reserved["id"].as_str().unwrap());

    let (status, body) = send(
        &app,
        "POST",
        &reject_uri,
        Some(ADMIN_TOKEN),
        Some(json!({ "adminNote": ["damaged copy"] })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "VALIDATION_ERROR");

    let request = Request::builder()
        .method("POST")
        .uri(&reject_uri)
        .header("authorization", format!("Bearer {}", ADMIN_TOKEN))
        .header("content-type", "application/json")
        .body(Body::from("{\"adminNote\": "))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let (_, loan) = send(&app, "GET", &loan_uri, Some(ADMIN_TOKEN), None).await;
    assert_eq!(loan["status"], "RESERVED");
    let (_, book) = send(&app, "GET", &format!("/books/{}", book_id), Some(ADMIN_TOKEN), None).await;
    assert_eq!(book["copiesAvail"], 0);
}

#[tokio::test]
async fn test_owner_can_cancel_reservation() {
    let app = test_app();
    let book_id = create_book(&app, 1).await;
    let (_, loan) = send(&app, "POST", &format!("/loans/reserve/{}", book_id), Some(ALICE_TOKEN), None).await;
    let loan_id = loan["id"].as_str().unwrap();

    let (status, _) = send(&app, "POST", &format!("/loans/cancel/{}", loan_id), Some(BOB_TOKEN), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, loan) = send(&app, "POST", &format!("/loans/cancel/{}", loan_id), Some(ALICE_TOKEN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(loan["status"], "CANCELLED");
}

#[tokio::test]
async fn test_invalid_status_filter_is_400() {
    let app = test_app();
    let (status, body) = send(&app, "GET", "/loans?status=LOST", Some(ALICE_TOKEN), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_unknown_loan_is_404() {
    let app = test_app();
    let (status, body) = send(
        &app,
        "POST",
        &format!("/loans/approve/{}", LoanId::new()),
        Some(ADMIN_TOKEN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "LOAN_NOT_FOUND");
}

// ============================================================================
// カタログ
// ============================================================================

#[tokio::test]
async fn test_book_validation_is_422() {
    let app = test_app();
    let (status, body) = send(
        &app,
        "POST",
        "/books",
        Some(ADMIN_TOKEN),
        Some(json!({ "title": "  ", "author": "A", "copiesTotal": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "VALIDATION_ERROR");

    let (status, _) = send(
        &app,
        "POST",
        "/books",
        Some(ADMIN_TOKEN),
        Some(json!({ "title": "T", "author": "A", "copiesTotal": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_update_copies_keeps_loans_on_hold() {
    let app = test_app();
    let book_id = create_book(&app, 2).await;
    send(&app, "POST", &format!("/loans/reserve/{}", book_id), Some(ALICE_TOKEN), None).await;
    send(&app, "POST", &format!("/loans/reserve/{}", book_id), Some(BOB_TOKEN), None).await;

    let (status, book) = send(
        &app,
        "PUT",
        &format!("/books/{}", book_id),
        Some(ADMIN_TOKEN),
        Some(json!({ "copiesTotal": 5, "title": "Kindred (25th anniversary)" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(book["copiesTotal"], 5);
    assert_eq!(book["copiesAvail"], 3);
    assert_eq!(book["title"], "Kindred (25th anniversary)");

    // 貸出中の冊数を下回る変更は拒否し、書誌情報も変えない
    let (status, _) = send(
        &app,
        "PUT",
        &format!("/books/{}", book_id),
        Some(ADMIN_TOKEN),
        Some(json!({ "copiesTotal": 1, "title": "Renamed" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (_, book) = send(&app, "GET", &format!("/books/{}", book_id), Some(ADMIN_TOKEN), None).await;
    assert_eq!(book["copiesTotal"], 5);
    assert_eq!(book["title"], "Kindred (25th anniversary)");
}

#[tokio::test]
async fn test_delete_book_in_use_is_409() {
    let app = test_app();
    let book_id = create_book(&app, 1).await;
    let (_, loan) = send(&app, "POST", &format!("/loans/reserve/{}", book_id), Some(ALICE_TOKEN), None).await;

    let (status, body) = send(&app, "DELETE", &format!("/books/{}", book_id), Some(ADMIN_TOKEN), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "BOOK_IN_USE");

    send(
        &app,
        "POST",
        &format!("/loans/cancel/{}", loan["id"].as_str().unwrap()),
        Some(ALICE_TOKEN),
        None,
    )
    .await;

    let (status, _) = send(&app, "DELETE", &format!("/books/{}", book_id), Some(ADMIN_TOKEN), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "GET", &format!("/books/{}", book_id), Some(ADMIN_TOKEN), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // 貸出の履歴は書籍削除後も残る
    let (status, loan) = send(
        &app,
        "GET",
        &format!("/loans/{}", loan["id"].as_str().unwrap()),
        Some(ALICE_TOKEN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(loan["status"], "CANCELLED");
}

// ============================================================================
// レビューと集計
// ============================================================================

#[tokio::test]
async fn test_reviews_and_average_rating() {
    let app = test_app();
    let book_id = create_book(&app, 1).await;

    let (_, book) = send(&app, "GET", &format!("/books/{}", book_id), Some(ALICE_TOKEN), None).await;
    assert_eq!(book["averageRating"], 0.0);
    assert_eq!(book["reviewCount"], 0);

    let (status, review) = send(
        &app,
        "POST",
        &format!("/reviews/{}", book_id),
        Some(ALICE_TOKEN),
        Some(json!({ "rating": 5, "comment": "Unforgettable" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(review["rating"], 5);

    send(
        &app,
        "POST",
        &format!("/reviews/{}", book_id),
        Some(BOB_TOKEN),
        Some(json!({ "rating": 4 })),
    )
    .await;

    let (status, _) = send(
        &app,
        "POST",
        &format!("/reviews/{}", book_id),
        Some(BOB_TOKEN),
        Some(json!({ "rating": 6 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (_, book) = send(&app, "GET", &format!("/books/{}", book_id), Some(ALICE_TOKEN), None).await;
    assert_eq!(book["averageRating"], 4.5);
    assert_eq!(book["reviewCount"], 2);

    let review_id = review["id"].as_str().unwrap();
    let (status, _) = send(
        &app,
        "POST",
        &format!("/reviews/{}/response", review_id),
        Some(ALICE_TOKEN),
        Some(json!({ "response": "Thanks" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, answered) = send(
        &app,
        "POST",
        &format!("/reviews/{}/response", review_id),
        Some(ADMIN_TOKEN),
        Some(json!({ "response": "Thanks for reading!" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(answered["response"], "Thanks for reading!");

    let (status, reviews) = send(
        &app,
        "GET",
        &format!("/reviews/book/{}", book_id),
        Some(BOB_TOKEN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reviews.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_dashboard_stats() {
    let app = test_app();
    let first = create_book(&app, 2).await;
    create_book(&app, 3).await;

    let (_, loan) = send(&app, "POST", &format!("/loans/reserve/{}", first), Some(ALICE_TOKEN), None).await;
    send(&app, "POST", &format!("/loans/reserve/{}", first), Some(BOB_TOKEN), None).await;
    send(
        &app,
        "POST",
        &format!("/loans/approve/{}", loan["id"].as_str().unwrap()),
        Some(ADMIN_TOKEN),
        None,
    )
    .await;

    let (status, _) = send(&app, "GET", "/stats", Some(ALICE_TOKEN), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, stats) = send(&app, "GET", "/stats", Some(ADMIN_TOKEN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["totalBooks"], 2);
    assert_eq!(stats["totalLoans"], 2);
    assert_eq!(stats["activeLoans"], 1);
    assert_eq!(stats["reservedLoans"], 1);
    assert_eq!(stats["availableCopies"], 3);
}
