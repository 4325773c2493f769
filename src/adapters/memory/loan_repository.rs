use crate::domain::{
    loan::{Loan, LoanStatus},
    value_objects::{BookId, LoanId, UserId},
};
use crate::ports::loan_repository::{LoanRepository, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// 貸出リポジトリのインメモリ実装
pub struct InMemoryLoanRepository {
    loans: Mutex<HashMap<LoanId, Loan>>,
}

impl InMemoryLoanRepository {
    pub fn new() -> Self {
        Self {
            loans: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<LoanId, Loan>> {
        self.loans.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn newest_first(mut loans: Vec<Loan>) -> Vec<Loan> {
        loans.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        loans
    }
}

impl Default for InMemoryLoanRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LoanRepository for InMemoryLoanRepository {
    async fn insert(&self, loan: Loan) -> Result<()> {
        self.lock().insert(loan.loan_id, loan);
        Ok(())
    }

    async fn get(&self, loan_id: LoanId) -> Result<Option<Loan>> {
        Ok(self.lock().get(&loan_id).cloned())
    }

    async fn save_if_status(&self, loan: &Loan, expected: LoanStatus) -> Result<bool> {
        let mut loans = self.lock();
        match loans.get_mut(&loan.loan_id) {
            Some(current) if current.status == expected => {
                *current = loan.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn find_all(&self) -> Result<Vec<Loan>> {
        let loans = self.lock().values().cloned().collect();
        Ok(Self::newest_first(loans))
    }

    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<Loan>> {
        let loans = self
            .lock()
            .values()
            .filter(|l| l.user_id == user_id)
            .cloned()
            .collect();
        Ok(Self::newest_first(loans))
    }

    async fn count_holding_for_book(&self, book_id: BookId) -> Result<u32> {
        let count = self
            .lock()
            .values()
            .filter(|l| l.book_id == book_id && l.status.holds_copy())
            .count();
        Ok(u32::try_from(count)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::loan;
    use chrono::Utc;

    #[tokio::test]
    async fn test_save_if_status_only_one_writer_wins() {
        let repo = InMemoryLoanRepository::new();
        let (reserved, _) = loan::reserve(BookId::new(), UserId::new(), Utc::now());
        repo.insert(reserved.clone()).await.unwrap();

        let (cancelled, _) = loan::cancel(&reserved, Utc::now()).unwrap();
        let (rejected, _) = loan::reject(&reserved, None, Utc::now()).unwrap();

        assert!(repo.save_if_status(&cancelled, LoanStatus::Reserved).await.unwrap());
        assert!(!repo.save_if_status(&rejected, LoanStatus::Reserved).await.unwrap());

        let stored = repo.get(reserved.loan_id).await.unwrap().unwrap();
        assert_eq!(stored.status, LoanStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_save_if_status_unknown_loan() {
        let repo = InMemoryLoanRepository::new();
        let (reserved, _) = loan::reserve(BookId::new(), UserId::new(), Utc::now());
        assert!(!repo.save_if_status(&reserved, LoanStatus::Reserved).await.unwrap());
    }

    #[tokio::test]
    async fn test_count_holding_for_book() {
        let repo = InMemoryLoanRepository::new();
        let book_id = BookId::new();
        let (first, _) = loan::reserve(book_id, UserId::new(), Utc::now());
        let (second, _) = loan::reserve(book_id, UserId::new(), Utc::now());
        let (other_book, _) = loan::reserve(BookId::new(), UserId::new(), Utc::now());
        repo.insert(first.clone()).await.unwrap();
        repo.insert(second).await.unwrap();
        repo.insert(other_book).await.unwrap();

        assert_eq!(repo.count_holding_for_book(book_id).await.unwrap(), 2);

        let (cancelled, _) = loan::cancel(&first, Utc::now()).unwrap();
        repo.save_if_status(&cancelled, LoanStatus::Reserved).await.unwrap();
        assert_eq!(repo.count_holding_for_book(book_id).await.unwrap(), 1);
    }
}
