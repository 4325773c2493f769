use crate::domain::{
    loan::{Loan, LoanStatus, LoanType},
    value_objects::{BookId, LoanId, UserId},
};
use crate::ports::loan_repository::{LoanRepository, Result};
use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use std::str::FromStr;

const SELECT_LOAN: &str = r#"
    SELECT
        loan_id,
        book_id,
        user_id,
        loan_type,
        status,
        start_date,
        due_date,
        return_date,
        admin_note,
        created_at,
        updated_at
    FROM loans
"#;

fn invalid_data(message: String) -> Box<dyn std::error::Error + Send + Sync> {
    Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, message))
}

/// PostgreSQLの行データをLoanに変換する
///
/// 状態・種別は文字列から変換し、未知の値はエラーにする。
fn map_row_to_loan(row: &PgRow) -> Result<Loan> {
    let status_str: &str = row.get("status");
    let status = LoanStatus::from_str(status_str).map_err(invalid_data)?;

    let loan_type_str: &str = row.get("loan_type");
    let loan_type = LoanType::from_str(loan_type_str).map_err(invalid_data)?;

    Ok(Loan {
        loan_id: LoanId::from_uuid(row.get("loan_id")),
        book_id: BookId::from_uuid(row.get("book_id")),
        user_id: UserId::from_uuid(row.get("user_id")),
        loan_type,
        status,
        start_date: row.get("start_date"),
        due_date: row.get("due_date"),
        return_date: row.get("return_date"),
        admin_note: row.get("admin_note"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

/// LoanRepositoryのPostgreSQL実装
pub struct PostgresLoanRepository {
    pool: PgPool,
}

impl PostgresLoanRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LoanRepository for PostgresLoanRepository {
    async fn insert(&self, loan: Loan) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO loans (
                loan_id,
                book_id,
                user_id,
                loan_type,
                status,
                start_date,
                due_date,
                return_date,
                admin_note,
                created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(loan.loan_id.value())
        .bind(loan.book_id.value())
        .bind(loan.user_id.value())
        .bind(loan.loan_type.as_str())
        .bind(loan.status.as_str())
        .bind(loan.start_date)
        .bind(loan.due_date)
        .bind(loan.return_date)
        .bind(&loan.admin_note)
        .bind(loan.created_at)
        .bind(loan.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, loan_id: LoanId) -> Result<Option<Loan>> {
        let row = sqlx::query(&format!("{SELECT_LOAN} WHERE loan_id = $1"))
            .bind(loan_id.value())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(map_row_to_loan).transpose()
    }

    /// 状態列を条件にした単一UPDATEでcompare-and-setを行う
    async fn save_if_status(&self, loan: &Loan, expected: LoanStatus) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE loans
            SET
                loan_type = $3,
                status = $4,
                start_date = $5,
                due_date = $6,
                return_date = $7,
                admin_note = $8,
                updated_at = $9
            WHERE loan_id = $1 AND status = $2
            "#,
        )
        .bind(loan.loan_id.value())
        .bind(expected.as_str())
        .bind(loan.loan_type.as_str())
        .bind(loan.status.as_str())
        .bind(loan.start_date)
        .bind(loan.due_date)
        .bind(loan.return_date)
        .bind(&loan.admin_note)
        .bind(loan.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn find_all(&self) -> Result<Vec<Loan>> {
        let rows = sqlx::query(&format!("{SELECT_LOAN} ORDER BY created_at DESC"))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(map_row_to_loan).collect()
    }

    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<Loan>> {
        let rows = sqlx::query(&format!(
            "{SELECT_LOAN} WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id.value())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_row_to_loan).collect()
    }

    async fn count_holding_for_book(&self, book_id: BookId) -> Result<u32> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM loans
            WHERE book_id = $1 AND status IN ('RESERVED', 'BORROWED')
            "#,
        )
        .bind(book_id.value())
        .fetch_one(&self.pool)
        .await?;

        Ok(u32::try_from(count)?)
    }
}
