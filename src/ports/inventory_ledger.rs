use crate::domain::{
    errors::InventoryError,
    inventory::{CopyCounter, Release},
    value_objects::BookId,
};
use async_trait::async_trait;
use thiserror::Error;

/// 台帳のエラー
#[derive(Debug, Error)]
pub enum LedgerError {
    /// 書籍が存在しない
    #[error("Book {0} not found")]
    BookNotFound(BookId),

    /// 蔵書数の不変条件に反する操作
    #[error("Inventory rule violated for book {book_id}: {error:?}")]
    Inventory {
        book_id: BookId,
        error: InventoryError,
    },

    /// 永続化層のエラー
    #[error("Ledger storage error")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl LedgerError {
    pub fn inventory(book_id: BookId, error: InventoryError) -> Self {
        LedgerError::Inventory { book_id, error }
    }
}

pub type LedgerResult<T> = std::result::Result<T, LedgerError>;

/// 在庫台帳ポート
///
/// 書籍ごとの「読み取り→判定→書き込み」を1つの不可分な単位として実行する。
/// 同じ書籍への同時呼び出しは直列化され、中間状態は他の呼び出しから見えない。
/// 貸出の状態は一切参照しない（呼び出し側は貸出ライフサイクルのみ）。
#[async_trait]
pub trait InventoryLedger: Send + Sync {
    /// 1冊を保留する
    ///
    /// 貸出可能数が0なら`InventoryError::OutOfStock`で失敗し、カウンタは変化しない。
    async fn reserve_copy(&self, book_id: BookId) -> LedgerResult<CopyCounter>;

    /// 1冊を解放する
    ///
    /// 総数を超える場合は飽和し`Release::Saturated`を返す。
    async fn release_copy(&self, book_id: BookId) -> LedgerResult<Release>;

    /// 総冊数を変更する（貸出中の冊数は維持）
    async fn resize(&self, book_id: BookId, new_total: u32) -> LedgerResult<CopyCounter>;
}
