use crate::domain::{
    review::Review,
    value_objects::{BookId, ReviewId},
};
use crate::ports::review_repository::{Result, ReviewRepository};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// レビューリポジトリのインメモリ実装
pub struct InMemoryReviewRepository {
    reviews: Mutex<HashMap<ReviewId, Review>>,
}

impl InMemoryReviewRepository {
    pub fn new() -> Self {
        Self {
            reviews: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ReviewId, Review>> {
        self.reviews.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for InMemoryReviewRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReviewRepository for InMemoryReviewRepository {
    async fn insert(&self, review: Review) -> Result<()> {
        self.lock().insert(review.review_id, review);
        Ok(())
    }

    async fn get(&self, review_id: ReviewId) -> Result<Option<Review>> {
        Ok(self.lock().get(&review_id).cloned())
    }

    async fn find_by_book(&self, book_id: BookId) -> Result<Vec<Review>> {
        let mut reviews: Vec<Review> = self
            .lock()
            .values()
            .filter(|r| r.book_id == book_id)
            .cloned()
            .collect();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reviews)
    }

    async fn save_response(&self, review_id: ReviewId, response: &str) -> Result<bool> {
        match self.lock().get_mut(&review_id) {
            Some(review) => {
                review.response = Some(response.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
