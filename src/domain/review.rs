use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BookId, Rating, ReviewId, ReviewValidationError, UserId};

/// Review - 利用者による書籍の評価
///
/// 貸出状態とは独立している。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub review_id: ReviewId,
    pub book_id: BookId,
    pub user_id: UserId,
    pub rating: Rating,
    pub comment: Option<String>,
    pub response: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// 純粋関数：レビューを作成する
pub fn write_review(
    book_id: BookId,
    user_id: UserId,
    rating: i32,
    comment: Option<String>,
    created_at: DateTime<Utc>,
) -> Result<Review, ReviewValidationError> {
    let rating = Rating::try_from(rating)?;
    let comment = comment
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());

    Ok(Review {
        review_id: ReviewId::new(),
        book_id,
        user_id,
        rating,
        comment,
        response: None,
        created_at,
    })
}

/// 純粋関数：管理者の返信を設定する（既存の返信は上書き）
pub fn respond(review: &Review, response: &str) -> Result<Review, ReviewValidationError> {
    let response = response.trim();
    if response.is_empty() {
        return Err(ReviewValidationError::EmptyResponse);
    }
    Ok(Review {
        response: Some(response.to_string()),
        ..review.clone()
    })
}

/// 評価の集計
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RatingSummary {
    pub average: f64,
    pub count: usize,
}

/// 純粋関数：平均評価
///
/// レビューがない場合は0。
pub fn average_rating(reviews: &[Review]) -> RatingSummary {
    if reviews.is_empty() {
        return RatingSummary {
            average: 0.0,
            count: 0,
        };
    }
    let sum: u32 = reviews.iter().map(|r| r.rating.value() as u32).sum();
    RatingSummary {
        average: sum as f64 / reviews.len() as f64,
        count: reviews.len(),
    }
}
