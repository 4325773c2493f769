use crate::domain::{
    review::Review,
    value_objects::{BookId, Rating, ReviewId, UserId},
};
use crate::ports::review_repository::{Result, ReviewRepository};
use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};

fn map_row_to_review(row: &PgRow) -> Result<Review> {
    let rating: i16 = row.get("rating");
    let rating = Rating::try_from(i32::from(rating))?;

    Ok(Review {
        review_id: ReviewId::from_uuid(row.get("review_id")),
        book_id: BookId::from_uuid(row.get("book_id")),
        user_id: UserId::from_uuid(row.get("user_id")),
        rating,
        comment: row.get("comment"),
        response: row.get("response"),
        created_at: row.get("created_at"),
    })
}

/// ReviewRepositoryのPostgreSQL実装
pub struct PostgresReviewRepository {
    pool: PgPool,
}

impl PostgresReviewRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReviewRepository for PostgresReviewRepository {
    async fn insert(&self, review: Review) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO reviews (review_id, book_id, user_id, rating, comment, response, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(review.review_id.value())
        .bind(review.book_id.value())
        .bind(review.user_id.value())
        .bind(i16::from(review.rating.value()))
        .bind(&review.comment)
        .bind(&review.response)
        .bind(review.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, review_id: ReviewId) -> Result<Option<Review>> {
        let row = sqlx::query(
            r#"
            SELECT review_id, book_id, user_id, rating, comment, response, created_at
            FROM reviews
            WHERE review_id = $1
            "#,
        )
        .bind(review_id.value())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_row_to_review).transpose()
    }

    async fn find_by_book(&self, book_id: BookId) -> Result<Vec<Review>> {
        let rows = sqlx::query(
            r#"
            SELECT review_id, book_id, user_id, rating, comment, response, created_at
            FROM reviews
            WHERE book_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(book_id.value())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_row_to_review).collect()
    }

    async fn save_response(&self, review_id: ReviewId, response: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE reviews SET response = $2 WHERE review_id = $1")
            .bind(review_id.value())
            .bind(response)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }
}
