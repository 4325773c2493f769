use crate::domain::{
    book::{Book, BookDetails},
    value_objects::BookId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// 削除の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
    /// 予約中・貸出中の蔵書が残っている
    InUse { on_loan: u32 },
}

/// カタログストアポート
///
/// 書籍レコードの保存と取得を抽象化する。
/// 蔵書数カウンタの変更はこのポートでは行わず、`InventoryLedger`に任せる。
#[async_trait]
pub trait BookRepository: Send + Sync {
    /// 新しい書籍を保存する
    async fn insert(&self, book: Book) -> Result<()>;

    /// IDで書籍を取得する
    async fn get(&self, book_id: BookId) -> Result<Option<Book>>;

    /// 全書籍をタイトル順で取得する
    async fn list(&self) -> Result<Vec<Book>>;

    /// 書誌情報を更新する
    ///
    /// 書籍が存在しない場合は`false`を返す。
    async fn update_details(
        &self,
        book_id: BookId,
        details: BookDetails,
        updated_at: DateTime<Utc>,
    ) -> Result<bool>;

    /// 全冊が書架にある場合に限り書籍を削除する
    ///
    /// 判定と削除は台帳と同じ排他範囲で行い、同時に予約が入っても
    /// 貸出中の書籍を消さない。
    async fn delete_if_idle(&self, book_id: BookId) -> Result<DeleteOutcome>;
}
