use crate::application::{LendingError, Result, ServiceDependencies};
use crate::domain::{
    DomainEvent, LoanStatus,
    book::Book,
    loan::{self, Loan, replay_events},
    value_objects::{Actor, BookId, LoanId},
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

use super::lifecycle::load_loan;

/// 貸出の表示用ビュー
///
/// 延滞は保存せず、問い合わせ時刻から導出する。
#[derive(Debug, Clone)]
pub struct LoanDetails {
    pub loan: Loan,
    pub book: Option<Book>,
    pub overdue: bool,
}

fn to_details(loan: Loan, book: Option<Book>, now: DateTime<Utc>) -> LoanDetails {
    let overdue = loan::is_overdue(&loan, now);
    LoanDetails {
        loan,
        book,
        overdue,
    }
}

fn ensure_can_view(actor: &Actor, loan: &Loan) -> Result<()> {
    if !actor.can_act_for(loan.user_id) {
        return Err(LendingError::Unauthorized(format!(
            "loan {} belongs to another user",
            loan.loan_id
        )));
    }
    Ok(())
}

/// 貸出を1件取得する（本人または管理者）
pub async fn get_loan(
    deps: &ServiceDependencies,
    actor: &Actor,
    loan_id: LoanId,
    now: DateTime<Utc>,
) -> Result<LoanDetails> {
    let loan = load_loan(deps, loan_id).await?;
    ensure_can_view(actor, &loan)?;

    let book = deps
        .books
        .get(loan.book_id)
        .await
        .map_err(LendingError::CatalogError)?;

    Ok(to_details(loan, book, now))
}

/// 貸出一覧を取得する
///
/// 管理者は全件、利用者は自分の貸出のみ。`status`指定時はその状態だけに絞る。
pub async fn list_loans(
    deps: &ServiceDependencies,
    actor: &Actor,
    status: Option<LoanStatus>,
    now: DateTime<Utc>,
) -> Result<Vec<LoanDetails>> {
    let loans = if actor.is_admin() {
        deps.loans.find_all().await
    } else {
        deps.loans.find_by_user(actor.user_id).await
    }
    .map_err(LendingError::LoanStoreError)?;

    let loans: Vec<Loan> = loans
        .into_iter()
        .filter(|l| status.is_none_or(|s| l.status == s))
        .collect();

    // 同じ書籍は1回だけ引く
    let mut books: HashMap<BookId, Option<Book>> = HashMap::new();
    for loan in &loans {
        if !books.contains_key(&loan.book_id) {
            let book = deps
                .books
                .get(loan.book_id)
                .await
                .map_err(LendingError::CatalogError)?;
            books.insert(loan.book_id, book);
        }
    }

    Ok(loans
        .into_iter()
        .map(|l| {
            let book = books.get(&l.book_id).cloned().flatten();
            to_details(l, book, now)
        })
        .collect())
}

/// 貸出の状態変更履歴を取得する（本人または管理者）
///
/// 履歴を再生して現在状態と突き合わせる。履歴は追記失敗で欠けることがあるため、
/// 不一致は警告ログのみで、履歴はそのまま返す。
pub async fn loan_events(
    deps: &ServiceDependencies,
    actor: &Actor,
    loan_id: LoanId,
) -> Result<Vec<DomainEvent>> {
    let loan = load_loan(deps, loan_id).await?;
    ensure_can_view(actor, &loan)?;

    let events = deps
        .event_store
        .load(loan_id)
        .await
        .map_err(LendingError::EventStoreError)?;

    if replay_events(&events).as_ref() != Some(&loan) {
        tracing::warn!(
            loan_id = %loan_id,
            status = %loan.status,
            events = events.len(),
            "Loan history does not replay to the stored loan"
        );
    }

    Ok(events)
}
