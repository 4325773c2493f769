use crate::application::{
    LendingError, Result, ServiceDependencies, gateway::require_admin, review::reviews_with_rating,
};
use crate::domain::{
    LoanStatus,
    book::{self, Book, BookDetails, BookPatch},
    review::{RatingSummary, Review},
    value_objects::{Actor, BookId},
};
use crate::ports::DeleteOutcome;
use chrono::{DateTime, Utc};
use futures::future::try_join_all;

/// 書籍登録の入力
#[derive(Debug, Clone)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub description: Option<String>,
    pub copies_total: i64,
}

/// レビュー付きの書籍
#[derive(Debug, Clone)]
pub struct BookWithReviews {
    pub book: Book,
    pub reviews: Vec<Review>,
    pub rating: RatingSummary,
}

/// 管理ダッシュボードの集計値
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardStats {
    pub total_books: usize,
    pub total_loans: usize,
    /// 貸出中（BORROWED）の件数
    pub active_loans: usize,
    /// 承認待ち（RESERVED）の件数
    pub reserved_loans: usize,
    /// 全書籍の貸出可能冊数の合計
    pub available_copies: u64,
}

async fn load_book(deps: &ServiceDependencies, book_id: BookId) -> Result<Book> {
    deps.books
        .get(book_id)
        .await
        .map_err(LendingError::CatalogError)?
        .ok_or(LendingError::BookNotFound(book_id))
}

async fn with_reviews(deps: &ServiceDependencies, book: Book) -> Result<BookWithReviews> {
    let (reviews, rating) = reviews_with_rating(deps, book.book_id).await?;
    Ok(BookWithReviews {
        book,
        reviews,
        rating,
    })
}

/// 書籍一覧（レビューと平均評価付き）
pub async fn list_books(deps: &ServiceDependencies) -> Result<Vec<BookWithReviews>> {
    let books = deps.books.list().await.map_err(LendingError::CatalogError)?;
    try_join_all(books.into_iter().map(|b| with_reviews(deps, b))).await
}

/// 書籍を1件取得する（レビューと平均評価付き）
pub async fn get_book(deps: &ServiceDependencies, book_id: BookId) -> Result<BookWithReviews> {
    let book = load_book(deps, book_id).await?;
    with_reviews(deps, book).await
}

/// 書籍を登録する（管理者のみ）
pub async fn create_book(
    deps: &ServiceDependencies,
    actor: &Actor,
    input: NewBook,
    now: DateTime<Utc>,
) -> Result<Book> {
    require_admin(actor, "create book")?;

    let details = BookDetails::new(&input.title, &input.author, input.isbn, input.description)?;
    let book = book::create_book(details, input.copies_total, now)?;

    deps.books
        .insert(book.clone())
        .await
        .map_err(LendingError::CatalogError)?;

    tracing::info!(
        book_id = %book.book_id,
        copies_total = book.copies.total(),
        "Book created"
    );

    Ok(book)
}

/// 書籍を更新する（管理者のみ）
///
/// 総冊数の変更は台帳のresizeを通し、貸出中の冊数を維持する。
///
/// 処理順序：
/// 1. 書誌情報を保存
/// 2. 総冊数が変わる場合のみ台帳でresize
/// 3. resizeに失敗したら書誌情報を元に戻す（補償）
pub async fn update_book(
    deps: &ServiceDependencies,
    actor: &Actor,
    book_id: BookId,
    patch: BookPatch,
    now: DateTime<Utc>,
) -> Result<Book> {
    require_admin(actor, "update book")?;

    let current = load_book(deps, book_id).await?;
    let (details, new_total) = book::apply_patch(&current, patch)?;

    let updated = deps
        .books
        .update_details(book_id, details, now)
        .await
        .map_err(LendingError::CatalogError)?;
    if !updated {
        return Err(LendingError::BookNotFound(book_id));
    }

    if let Some(total) = new_total.filter(|t| *t != current.copies.total()) {
        match deps.ledger.resize(book_id, total).await {
            Ok(counter) => tracing::info!(
                book_id = %book_id,
                copies_total = counter.total(),
                copies_avail = counter.available(),
                "Book copies resized"
            ),
            Err(e) => {
                tracing::warn!(
                    book_id = %book_id,
                    copies_total = total,
                    error = %e,
                    "Resize refused, restoring previous book details"
                );
                if let Err(restore) = deps
                    .books
                    .update_details(book_id, current.details(), current.updated_at)
                    .await
                {
                    tracing::error!(
                        book_id = %book_id,
                        error = %restore,
                        "Failed to restore book details after resize failure"
                    );
                }
                return Err(e.into());
            }
        }
    }

    load_book(deps, book_id).await
}

/// 書籍を削除する（管理者のみ）
///
/// 予約中・貸出中の蔵書が残っている場合は`BookInUse`。
pub async fn delete_book(deps: &ServiceDependencies, actor: &Actor, book_id: BookId) -> Result<()> {
    require_admin(actor, "delete book")?;

    match deps
        .books
        .delete_if_idle(book_id)
        .await
        .map_err(LendingError::CatalogError)?
    {
        DeleteOutcome::Deleted => {
            tracing::info!(book_id = %book_id, "Book deleted");
            Ok(())
        }
        DeleteOutcome::NotFound => Err(LendingError::BookNotFound(book_id)),
        DeleteOutcome::InUse { on_loan } => {
            tracing::warn!(book_id = %book_id, on_loan, "Refused to delete book with active loans");
            Err(LendingError::BookInUse { book_id, on_loan })
        }
    }
}

/// 管理ダッシュボードの集計（管理者のみ）
pub async fn dashboard_stats(deps: &ServiceDependencies, actor: &Actor) -> Result<DashboardStats> {
    require_admin(actor, "dashboard stats")?;

    let books = deps.books.list().await.map_err(LendingError::CatalogError)?;
    let loans = deps
        .loans
        .find_all()
        .await
        .map_err(LendingError::LoanStoreError)?;

    Ok(DashboardStats {
        total_books: books.len(),
        total_loans: loans.len(),
        active_loans: loans
            .iter()
            .filter(|l| l.status == LoanStatus::Borrowed)
            .count(),
        reserved_loans: loans
            .iter()
            .filter(|l| l.status == LoanStatus::Reserved)
            .count(),
        available_copies: books.iter().map(|b| b.copies.available() as u64).sum(),
    })
}
