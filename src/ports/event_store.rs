use crate::domain::{events::DomainEvent, value_objects::LoanId};
use async_trait::async_trait;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// イベントストアポート
///
/// 貸出の状態遷移履歴を追記専用ログとして保存する。
/// 現在状態は`LoanRepository`が持ち、ここは監査用の履歴。
#[async_trait]
pub trait EventStore: Send + Sync {
    /// 貸出の履歴にイベントを1件追記する
    async fn append(&self, loan_id: LoanId, event: DomainEvent) -> Result<()>;

    /// 貸出の履歴を追記順に読み込む
    async fn load(&self, loan_id: LoanId) -> Result<Vec<DomainEvent>>;
}
