use crate::application::{LendingError, LendingPolicy, Result, ServiceDependencies};
use crate::domain::{
    self, ApproveError, DomainEvent, InventoryError, LoanAction, Release,
    commands::*,
    loan::Loan,
    value_objects::{BookId, LoanId},
};
use crate::ports::LedgerError;

/// 貸出を取得する。存在しなければ`LoanNotFound`
pub(crate) async fn load_loan(deps: &ServiceDependencies, loan_id: LoanId) -> Result<Loan> {
    deps.loans
        .get(loan_id)
        .await
        .map_err(LendingError::LoanStoreError)?
        .ok_or(LendingError::LoanNotFound(loan_id))
}

/// 状態変更履歴を追記する
///
/// 現在状態は既に確定しているため、履歴の追記失敗で操作全体を失敗させない。
/// 失敗はエラーログに残す。
async fn record_event(deps: &ServiceDependencies, loan_id: LoanId, event: DomainEvent) {
    let event_type = event.event_type();
    if let Err(e) = deps.event_store.append(loan_id, event).await {
        tracing::error!(
            loan_id = %loan_id,
            event_type,
            error = %e,
            "Failed to append loan event to history"
        );
    }
}

/// compare-and-setに負けた場合のエラーを組み立てる
///
/// 最新の状態を読み直し、エラーに現在の状態を含める。
async fn lost_race(deps: &ServiceDependencies, loan_id: LoanId, action: LoanAction) -> LendingError {
    match load_loan(deps, loan_id).await {
        Ok(current) => LendingError::InvalidTransition {
            loan_id,
            from: current.status,
            action: action.as_str(),
        },
        Err(e) => e,
    }
}

/// 解放結果を貸出ルールに照らして確認する
///
/// 飽和（二重解放）はプログラムの誤り。常にエラーログに残し、
/// 厳格モードではエラーとして返す。カウンタはどちらの場合も総数を超えない。
pub(crate) fn check_release(
    policy: &LendingPolicy,
    book_id: BookId,
    release: Release,
) -> Result<domain::CopyCounter> {
    match release {
        Release::Released(counter) => Ok(counter),
        Release::Saturated(counter) => {
            tracing::error!(
                book_id = %book_id,
                copies_total = counter.total(),
                "Released a copy of a book whose copies were all available"
            );
            if policy.strict_release {
                return Err(LendingError::LedgerError(LedgerError::inventory(
                    book_id,
                    InventoryError::OverRelease,
                )));
            }
            Ok(counter)
        }
    }
}

/// 蔵書を解放する遷移（却下・取消・返却）を確定する
///
/// 1. 期待する状態からのcompare-and-setで貸出を保存（1つの貸出が解放するのは1回だけ）
/// 2. 台帳で1冊解放
/// 3. 解放に失敗したら貸出を元の状態に戻す（補償）
/// 4. 履歴を追記
///
/// 厳格モードの二重解放エラーは、遷移と履歴を確定させた後に返す。
async fn commit_releasing_transition(
    deps: &ServiceDependencies,
    previous: &Loan,
    updated: Loan,
    action: LoanAction,
    event: DomainEvent,
) -> Result<Loan> {
    let saved = deps
        .loans
        .save_if_status(&updated, previous.status)
        .await
        .map_err(LendingError::LoanStoreError)?;
    if !saved {
        return Err(lost_race(deps, previous.loan_id, action).await);
    }

    let release = match deps.ledger.release_copy(previous.book_id).await {
        Ok(release) => release,
        Err(e) => {
            tracing::error!(
                loan_id = %previous.loan_id,
                book_id = %previous.book_id,
                error = %e,
                "Failed to release copy, reverting loan status"
            );
            if let Err(revert) = deps.loans.save_if_status(previous, updated.status).await {
                tracing::error!(
                    loan_id = %previous.loan_id,
                    error = %revert,
                    "Failed to revert loan status after release failure"
                );
            }
            return Err(e.into());
        }
    };
    // 二重解放でも遷移自体は確定しているため、履歴は先に残す
    let checked = check_release(&deps.policy, previous.book_id, release);

    record_event(deps, updated.loan_id, event).await;

    tracing::info!(
        loan_id = %updated.loan_id,
        book_id = %updated.book_id,
        from = %previous.status,
        to = %updated.status,
        "Loan transitioned and copy released"
    );

    checked.map(|_| updated)
}

/// 書籍を予約する
///
/// 処理順序：
/// 1. 台帳で1冊保留（在庫切れならここで失敗し、何も変化しない）
/// 2. RESERVED状態の貸出を生成・保存
/// 3. 保存に失敗したら保留を解放（補償）
///
/// # エラー
/// - BookNotFound: 書籍が存在しない
/// - OutOfStock: 貸出可能な蔵書がない
pub async fn reserve(deps: &ServiceDependencies, cmd: ReserveBook) -> Result<Loan> {
    let counter = deps
        .ledger
        .reserve_copy(cmd.book_id)
        .await
        .map_err(LendingError::from)
        .inspect_err(|e| {
            if matches!(e, LendingError::OutOfStock(_)) {
                tracing::warn!(book_id = %cmd.book_id, user_id = %cmd.user_id, "Reservation refused: out of stock");
            }
        })?;

    let (loan, event) = domain::loan::reserve(cmd.book_id, cmd.user_id, cmd.reserved_at);

    if let Err(e) = deps.loans.insert(loan.clone()).await {
        tracing::error!(
            book_id = %cmd.book_id,
            error = %e,
            "Failed to persist reservation, releasing held copy"
        );
        match deps.ledger.release_copy(cmd.book_id).await {
            Ok(release) => {
                // 補償の結果は元のエラーより優先しない
                let _ = check_release(&deps.policy, cmd.book_id, release);
            }
            Err(release_err) => tracing::error!(
                book_id = %cmd.book_id,
                error = %release_err,
                "Compensating release failed; inventory needs reconciliation"
            ),
        }
        return Err(LendingError::LoanStoreError(e));
    }

    record_event(deps, loan.loan_id, DomainEvent::LoanReserved(event)).await;

    tracing::info!(
        loan_id = %loan.loan_id,
        book_id = %loan.book_id,
        user_id = %loan.user_id,
        copies_avail = counter.available(),
        "Book reserved"
    );

    Ok(loan)
}

/// 予約を承認する
///
/// 在庫は予約時に保留済みのため台帳は呼ばない。
pub async fn approve(deps: &ServiceDependencies, cmd: ApproveLoan) -> Result<Loan> {
    let loan = load_loan(deps, cmd.loan_id).await?;

    let (approved, event) =
        domain::loan::approve(&loan, cmd.approved_at, deps.policy.loan_period).map_err(
            |e| match e {
                ApproveError::Transition(e) => LendingError::invalid_transition(loan.loan_id, e),
                ApproveError::DueDateOutOfRange => LendingError::Validation(format!(
                    "due date for loan {} approved at {} is out of range",
                    loan.loan_id, cmd.approved_at
                )),
            },
        )?;

    let saved = deps
        .loans
        .save_if_status(&approved, loan.status)
        .await
        .map_err(LendingError::LoanStoreError)?;
    if !saved {
        return Err(lost_race(deps, loan.loan_id, LoanAction::Approve).await);
    }

    record_event(deps, approved.loan_id, DomainEvent::LoanApproved(event)).await;

    tracing::info!(
        loan_id = %approved.loan_id,
        due_date = ?approved.due_date,
        "Loan approved"
    );

    Ok(approved)
}

/// 予約を却下する（蔵書を解放し、メモを記録）
pub async fn reject(deps: &ServiceDependencies, cmd: RejectLoan) -> Result<Loan> {
    let loan = load_loan(deps, cmd.loan_id).await?;

    let (rejected, event) = domain::loan::reject(&loan, cmd.admin_note, cmd.rejected_at)
        .map_err(|e| LendingError::invalid_transition(loan.loan_id, e))?;

    commit_releasing_transition(
        deps,
        &loan,
        rejected,
        LoanAction::Reject,
        DomainEvent::LoanRejected(event),
    )
    .await
}

/// 予約を取り消す（蔵書を解放）
pub async fn cancel(deps: &ServiceDependencies, cmd: CancelLoan) -> Result<Loan> {
    let loan = load_loan(deps, cmd.loan_id).await?;

    let (cancelled, event) = domain::loan::cancel(&loan, cmd.cancelled_at)
        .map_err(|e| LendingError::invalid_transition(loan.loan_id, e))?;

    commit_releasing_transition(
        deps,
        &loan,
        cancelled,
        LoanAction::Cancel,
        DomainEvent::LoanCancelled(event),
    )
    .await
}

/// 書籍を返却する（蔵書を解放し、返却日を記録）
pub async fn return_loan(deps: &ServiceDependencies, cmd: ReturnLoan) -> Result<Loan> {
    let loan = load_loan(deps, cmd.loan_id).await?;

    let (returned, event) = domain::loan::return_loan(&loan, cmd.returned_at)
        .map_err(|e| LendingError::invalid_transition(loan.loan_id, e))?;

    if event.was_overdue {
        tracing::info!(loan_id = %loan.loan_id, "Overdue loan returned");
    }

    commit_releasing_transition(
        deps,
        &loan,
        returned,
        LoanAction::Return,
        DomainEvent::LoanReturned(event),
    )
    .await
}
