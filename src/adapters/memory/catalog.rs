use crate::domain::{
    book::{Book, BookDetails},
    inventory::{CopyCounter, Release},
    value_objects::BookId,
};
use crate::ports::catalog::{BookRepository, DeleteOutcome, Result};
use crate::ports::inventory_ledger::{InventoryLedger, LedgerError, LedgerResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// カタログストアと在庫台帳のインメモリ実装
///
/// 書籍レコードと蔵書数カウンタを同じマップに持ち、1つのロックで保護する。
/// 「読み取り→判定→書き込み」はロックを保持したまま行うため、
/// 同じ書籍への保留・解放は直列化される。
pub struct InMemoryCatalog {
    books: Mutex<HashMap<BookId, Book>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self {
            books: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<BookId, Book>> {
        // 保持中にpanicしても、各操作はカウンタを1回で書き換えるため中身は整合している
        self.books.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// ロックを保持したままカウンタを更新する
    fn update_counter<T>(
        &self,
        book_id: BookId,
        f: impl FnOnce(CopyCounter) -> LedgerResult<(CopyCounter, T)>,
    ) -> LedgerResult<T> {
        let mut books = self.lock();
        let book = books
            .get_mut(&book_id)
            .ok_or(LedgerError::BookNotFound(book_id))?;
        let (counter, result) = f(book.copies)?;
        book.copies = counter;
        Ok(result)
    }
}

impl Default for InMemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BookRepository for InMemoryCatalog {
    async fn insert(&self, book: Book) -> Result<()> {
        self.lock().insert(book.book_id, book);
        Ok(())
    }

    async fn get(&self, book_id: BookId) -> Result<Option<Book>> {
        Ok(self.lock().get(&book_id).cloned())
    }

    async fn list(&self) -> Result<Vec<Book>> {
        let mut books: Vec<Book> = self.lock().values().cloned().collect();
        books.sort_by(|a, b| a.title.cmp(&b.title).then(a.created_at.cmp(&b.created_at)));
        Ok(books)
    }

    async fn update_details(
        &self,
        book_id: BookId,
        details: BookDetails,
        updated_at: DateTime<Utc>,
    ) -> Result<bool> {
        let mut books = self.lock();
        let Some(book) = books.get_mut(&book_id) else {
            return Ok(false);
        };
        book.title = details.title;
        book.author = details.author;
        book.isbn = details.isbn;
        book.description = details.description;
        book.updated_at = updated_at;
        Ok(true)
    }

    async fn delete_if_idle(&self, book_id: BookId) -> Result<DeleteOutcome> {
        let mut books = self.lock();
        let Some(book) = books.get(&book_id) else {
            return Ok(DeleteOutcome::NotFound);
        };
        if !book.copies.is_idle() {
            return Ok(DeleteOutcome::InUse {
                on_loan: book.copies.on_loan(),
            });
        }
        books.remove(&book_id);
        Ok(DeleteOutcome::Deleted)
    }
}

#[async_trait]
impl InventoryLedger for InMemoryCatalog {
    async fn reserve_copy(&self, book_id: BookId) -> LedgerResult<CopyCounter> {
        self.update_counter(book_id, |counter| {
            let held = counter
                .hold()
                .map_err(|e| LedgerError::inventory(book_id, e))?;
            Ok((held, held))
        })
    }

    async fn release_copy(&self, book_id: BookId) -> LedgerResult<Release> {
        self.update_counter(book_id, |counter| {
            let release = counter.release();
            Ok((release.counter(), release))
        })
    }

    async fn resize(&self, book_id: BookId, new_total: u32) -> LedgerResult<CopyCounter> {
        self.update_counter(book_id, |counter| {
            let resized = counter
                .resize(new_total)
                .map_err(|e| LedgerError::inventory(book_id, e))?;
            Ok((resized, resized))
        })
    }
}
