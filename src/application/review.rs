use crate::application::{LendingError, Result, ServiceDependencies, gateway::require_admin};
use crate::domain::{
    review::{self, RatingSummary, Review},
    value_objects::{Actor, BookId, ReviewId},
};
use chrono::{DateTime, Utc};

async fn ensure_book_exists(deps: &ServiceDependencies, book_id: BookId) -> Result<()> {
    deps.books
        .get(book_id)
        .await
        .map_err(LendingError::CatalogError)?
        .map(|_| ())
        .ok_or(LendingError::BookNotFound(book_id))
}

/// レビューを投稿する
///
/// 評価は1〜5。書籍が存在しない場合は`BookNotFound`。
pub async fn add_review(
    deps: &ServiceDependencies,
    actor: &Actor,
    book_id: BookId,
    rating: i32,
    comment: Option<String>,
    now: DateTime<Utc>,
) -> Result<Review> {
    let review = review::write_review(book_id, actor.user_id, rating, comment, now)?;
    ensure_book_exists(deps, book_id).await?;

    deps.reviews
        .insert(review.clone())
        .await
        .map_err(LendingError::ReviewStoreError)?;

    tracing::info!(
        review_id = %review.review_id,
        book_id = %book_id,
        rating = review.rating.value(),
        "Review added"
    );

    Ok(review)
}

/// 書籍のレビュー一覧
pub async fn list_reviews(deps: &ServiceDependencies, book_id: BookId) -> Result<Vec<Review>> {
    ensure_book_exists(deps, book_id).await?;
    deps.reviews
        .find_by_book(book_id)
        .await
        .map_err(LendingError::ReviewStoreError)
}

/// 書籍のレビューと平均評価
///
/// 平均はキャッシュせず、読み取りのたびに計算する。書籍の存在は確認しない。
pub(crate) async fn reviews_with_rating(
    deps: &ServiceDependencies,
    book_id: BookId,
) -> Result<(Vec<Review>, RatingSummary)> {
    let reviews = deps
        .reviews
        .find_by_book(book_id)
        .await
        .map_err(LendingError::ReviewStoreError)?;
    let rating = review::average_rating(&reviews);
    Ok((reviews, rating))
}

/// 書籍の平均評価（レビューがなければ0）
pub async fn average_rating(deps: &ServiceDependencies, book_id: BookId) -> Result<RatingSummary> {
    ensure_book_exists(deps, book_id).await?;
    let (_, rating) = reviews_with_rating(deps, book_id).await?;
    Ok(rating)
}

/// レビューに管理者の返信を付ける（管理者のみ）
pub async fn respond_to_review(
    deps: &ServiceDependencies,
    actor: &Actor,
    review_id: ReviewId,
    response: &str,
) -> Result<Review> {
    require_admin(actor, "respond to review")?;

    let current = deps
        .reviews
        .get(review_id)
        .await
        .map_err(LendingError::ReviewStoreError)?
        .ok_or(LendingError::ReviewNotFound(review_id))?;
    let answered = review::respond(&current, response)?;

    let saved = deps
        .reviews
        .save_response(review_id, answered.response.as_deref().unwrap_or_default())
        .await
        .map_err(LendingError::ReviewStoreError)?;
    if !saved {
        return Err(LendingError::ReviewNotFound(review_id));
    }

    Ok(answered)
}
