//! 呼び出し元のロール・所有者を確認してから貸出ライフサイクルへ転送する。
//!
//! 認証そのもの（トークン検証）は外部の認証コンテキストに委譲済みで、
//! ここに届く`Actor`は検証済みの値。

use crate::application::{LendingError, Result, ServiceDependencies, loan};
use crate::domain::{
    commands::*,
    loan::Loan,
    value_objects::{Actor, BookId, LoanId},
};
use chrono::{DateTime, Utc};

/// 管理者であることを要求する
pub fn require_admin(actor: &Actor, operation: &str) -> Result<()> {
    if !actor.is_admin() {
        tracing::warn!(user_id = %actor.user_id, operation, "Admin operation refused");
        return Err(LendingError::Unauthorized(format!(
            "{} requires the ADMIN role",
            operation
        )));
    }
    Ok(())
}

/// 本人または管理者であることを要求する
async fn require_owner_or_admin(
    deps: &ServiceDependencies,
    actor: &Actor,
    loan_id: LoanId,
    operation: &str,
) -> Result<()> {
    let loan = loan::load_loan(deps, loan_id).await?;
    if !actor.can_act_for(loan.user_id) {
        tracing::warn!(
            user_id = %actor.user_id,
            loan_id = %loan_id,
            operation,
            "Operation on another user's loan refused"
        );
        return Err(LendingError::Unauthorized(format!(
            "cannot {} loan {} owned by another user",
            operation, loan_id
        )));
    }
    Ok(())
}

/// 呼び出し元本人の名義で書籍を予約する
pub async fn reserve_book(
    deps: &ServiceDependencies,
    actor: &Actor,
    book_id: BookId,
    reserved_at: DateTime<Utc>,
) -> Result<Loan> {
    loan::reserve(
        deps,
        ReserveBook {
            book_id,
            user_id: actor.user_id,
            reserved_at,
        },
    )
    .await
}

/// 予約を承認する（管理者のみ）
pub async fn approve_loan(
    deps: &ServiceDependencies,
    actor: &Actor,
    cmd: ApproveLoan,
) -> Result<Loan> {
    require_admin(actor, "approve")?;
    loan::approve(deps, cmd).await
}

/// 予約を却下する（管理者のみ）
pub async fn reject_loan(deps: &ServiceDependencies, actor: &Actor, cmd: RejectLoan) -> Result<Loan> {
    require_admin(actor, "reject")?;
    loan::reject(deps, cmd).await
}

/// 予約を取り消す（本人または管理者）
pub async fn cancel_loan(deps: &ServiceDependencies, actor: &Actor, cmd: CancelLoan) -> Result<Loan> {
    require_owner_or_admin(deps, actor, cmd.loan_id, "cancel").await?;
    loan::cancel(deps, cmd).await
}

/// 返却を記録する（本人または管理者）
pub async fn return_loan(deps: &ServiceDependencies, actor: &Actor, cmd: ReturnLoan) -> Result<Loan> {
    require_owner_or_admin(deps, actor, cmd.loan_id, "return").await?;
    loan::return_loan(deps, cmd).await
}
