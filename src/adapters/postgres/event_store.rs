use crate::domain::{events::DomainEvent, value_objects::LoanId};
use crate::ports::event_store::{EventStore, Result};
use async_trait::async_trait;
use sqlx::PgPool;

/// EventStoreのPostgreSQL実装
///
/// `loan_events`テーブルに貸出ごとの連番付きで追記する。
/// イベント本体はJSONBで保存する。
pub struct PostgresEventStore {
    pool: PgPool,
}

impl PostgresEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventStore for PostgresEventStore {
    /// 連番は既存の最大値+1。同じ連番の同時追記は一意制約で失敗する
    async fn append(&self, loan_id: LoanId, event: DomainEvent) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO loan_events (
                aggregate_id,
                aggregate_version,
                event_type,
                event_data,
                occurred_at
            )
            SELECT $1, COALESCE(MAX(aggregate_version), 0) + 1, $2, $3, $4
            FROM loan_events
            WHERE aggregate_id = $1
            "#,
        )
        .bind(loan_id.value())
        .bind(event.event_type())
        .bind(serde_json::to_value(&event)?)
        .bind(event.occurred_at())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn load(&self, loan_id: LoanId) -> Result<Vec<DomainEvent>> {
        let rows: Vec<serde_json::Value> = sqlx::query_scalar(
            r#"
            SELECT event_data
            FROM loan_events
            WHERE aggregate_id = $1
            ORDER BY aggregate_version ASC
            "#,
        )
        .bind(loan_id.value())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|data| serde_json::from_value(data).map_err(Into::into))
            .collect()
    }
}
