use crate::domain::{events::DomainEvent, value_objects::LoanId};
use crate::ports::event_store::{EventStore, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// イベントストアのインメモリ実装
pub struct InMemoryEventStore {
    streams: Mutex<HashMap<LoanId, Vec<DomainEvent>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self {
            streams: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(&self, loan_id: LoanId, event: DomainEvent) -> Result<()> {
        self.streams
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(loan_id)
            .or_default()
            .push(event);
        Ok(())
    }

    async fn load(&self, loan_id: LoanId) -> Result<Vec<DomainEvent>> {
        Ok(self
            .streams
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&loan_id)
            .cloned()
            .unwrap_or_default())
    }
}
