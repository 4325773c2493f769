use crate::domain::{
    loan::{Loan, LoanStatus},
    value_objects::{BookId, LoanId, UserId},
};
use async_trait::async_trait;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// 貸出リポジトリポート
///
/// 貸出の現在状態を保存する。貸出は削除されず、状態遷移のみ行われる。
#[async_trait]
pub trait LoanRepository: Send + Sync {
    /// 新しい貸出を保存する
    async fn insert(&self, loan: Loan) -> Result<()>;

    /// IDで貸出を取得する
    async fn get(&self, loan_id: LoanId) -> Result<Option<Loan>>;

    /// 現在の状態が`expected`の場合に限り貸出を上書きする（compare-and-set）
    ///
    /// 同じ貸出への同時遷移のうち1つだけが成功する。
    /// 状態が既に変わっていた場合は`false`を返し、何も書き込まない。
    async fn save_if_status(&self, loan: &Loan, expected: LoanStatus) -> Result<bool>;

    /// 全貸出を作成日時の新しい順で取得する
    async fn find_all(&self) -> Result<Vec<Loan>>;

    /// 利用者の貸出を作成日時の新しい順で取得する
    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<Loan>>;

    /// 書籍の予約中・貸出中の件数
    async fn count_holding_for_book(&self, book_id: BookId) -> Result<u32>;
}
