use crate::domain::{
    review::Review,
    value_objects::{BookId, ReviewId},
};
use async_trait::async_trait;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// レビューリポジトリポート
#[async_trait]
pub trait ReviewRepository: Send + Sync {
    async fn insert(&self, review: Review) -> Result<()>;

    async fn get(&self, review_id: ReviewId) -> Result<Option<Review>>;

    /// 書籍のレビューを新しい順で取得する
    async fn find_by_book(&self, book_id: BookId) -> Result<Vec<Review>>;

    /// 管理者の返信を保存する。レビューが存在しない場合は`false`
    async fn save_response(&self, review_id: ReviewId, response: &str) -> Result<bool>;
}
