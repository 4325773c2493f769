use crate::domain::{
    InventoryError,
    book::{Book, BookDetails},
    inventory::{CopyCounter, Release},
    value_objects::BookId,
};
use crate::ports::catalog::{BookRepository, DeleteOutcome, Result};
use crate::ports::inventory_ledger::{InventoryLedger, LedgerError, LedgerResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};

fn storage(err: sqlx::Error) -> LedgerError {
    LedgerError::Storage(Box::new(err))
}

/// 列の整数値を冊数に変換する
fn to_count(book_id: BookId, total: i32, available: i32) -> LedgerResult<CopyCounter> {
    let total = u32::try_from(total).unwrap_or(0);
    let available = u32::try_from(available).unwrap_or(u32::MAX);
    CopyCounter::restore(total, available).map_err(|e| LedgerError::inventory(book_id, e))
}

fn counter_from_row(book_id: BookId, row: &PgRow) -> LedgerResult<CopyCounter> {
    to_count(book_id, row.get("copies_total"), row.get("copies_avail"))
}

/// PostgreSQLの行データをBookに変換する
fn map_row_to_book(row: &PgRow) -> Result<Book> {
    let book_id = BookId::from_uuid(row.get("book_id"));
    let copies = counter_from_row(book_id, row)?;

    Ok(Book {
        book_id,
        title: row.get("title"),
        author: row.get("author"),
        isbn: row.get("isbn"),
        description: row.get("description"),
        copies,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

/// カタログストアと在庫台帳のPostgreSQL実装
///
/// 蔵書数は`books`テーブルの`copies_total`/`copies_avail`列に持つ。
/// 保留・解放は条件付きの単一UPDATE、総冊数の変更と削除は
/// 行ロック（`SELECT ... FOR UPDATE`）を取ったトランザクションで行う。
pub struct PostgresCatalog {
    pool: PgPool,
}

impl PostgresCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn lock_counter(
        tx: &mut Transaction<'_, Postgres>,
        book_id: BookId,
    ) -> LedgerResult<Option<CopyCounter>> {
        let row = sqlx::query(
            r#"
            SELECT copies_total, copies_avail
            FROM books
            WHERE book_id = $1
            FOR UPDATE
            "#,
        )
        .bind(book_id.value())
        .fetch_optional(&mut **tx)
        .await
        .map_err(storage)?;

        row.as_ref()
            .map(|r| counter_from_row(book_id, r))
            .transpose()
    }

    async fn book_exists(&self, book_id: BookId) -> LedgerResult<bool> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM books WHERE book_id = $1)")
            .bind(book_id.value())
            .fetch_one(&self.pool)
            .await
            .map_err(storage)
    }
}

#[async_trait]
impl BookRepository for PostgresCatalog {
    async fn insert(&self, book: Book) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO books (
                book_id,
                title,
                author,
                isbn,
                description,
                copies_total,
                copies_avail,
                created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(book.book_id.value())
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(&book.description)
        .bind(i32::try_from(book.copies.total())?)
        .bind(i32::try_from(book.copies.available())?)
        .bind(book.created_at)
        .bind(book.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, book_id: BookId) -> Result<Option<Book>> {
        let row = sqlx::query(
            r#"
            SELECT book_id, title, author, isbn, description,
                   copies_total, copies_avail, created_at, updated_at
            FROM books
            WHERE book_id = $1
            "#,
        )
        .bind(book_id.value())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_row_to_book).transpose()
    }

    async fn list(&self) -> Result<Vec<Book>> {
        let rows = sqlx::query(
            r#"
            SELECT book_id, title, author, isbn, description,
                   copies_total, copies_avail, created_at, updated_at
            FROM books
            ORDER BY title ASC, created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_row_to_book).collect()
    }

    async fn update_details(
        &self,
        book_id: BookId,
        details: BookDetails,
        updated_at: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE books
            SET title = $2, author = $3, isbn = $4, description = $5, updated_at = $6
            WHERE book_id = $1
            "#,
        )
        .bind(book_id.value())
        .bind(&details.title)
        .bind(&details.author)
        .bind(&details.isbn)
        .bind(&details.description)
        .bind(updated_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_if_idle(&self, book_id: BookId) -> Result<DeleteOutcome> {
        let mut tx = self.pool.begin().await?;

        let Some(counter) = Self::lock_counter(&mut tx, book_id).await? else {
            return Ok(DeleteOutcome::NotFound);
        };
        if !counter.is_idle() {
            return Ok(DeleteOutcome::InUse {
                on_loan: counter.on_loan(),
            });
        }

        sqlx::query("DELETE FROM books WHERE book_id = $1")
            .bind(book_id.value())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(DeleteOutcome::Deleted)
    }
}

#[async_trait]
impl InventoryLedger for PostgresCatalog {
    /// 貸出可能数が残っている場合に限り1減らす
    ///
    /// 判定と更新は1つのUPDATE文で行い、同時実行でも負にならない。
    async fn reserve_copy(&self, book_id: BookId) -> LedgerResult<CopyCounter> {
        let row = sqlx::query(
            r#"
            UPDATE books
            SET copies_avail = copies_avail - 1
            WHERE book_id = $1 AND copies_avail > 0
            RETURNING copies_total, copies_avail
            "#,
        )
        .bind(book_id.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;

        match row {
            Some(row) => counter_from_row(book_id, &row),
            None if self.book_exists(book_id).await? => {
                Err(LedgerError::inventory(book_id, InventoryError::OutOfStock))
            }
            None => Err(LedgerError::BookNotFound(book_id)),
        }
    }

    /// 1冊戻す（総冊数で飽和）
    ///
    /// 更新前の値も返し、既に満杯だった場合は`Release::Saturated`とする。
    async fn release_copy(&self, book_id: BookId) -> LedgerResult<Release> {
        let row = sqlx::query(
            r#"
            WITH previous AS (
                SELECT book_id, copies_avail
                FROM books
                WHERE book_id = $1
                FOR UPDATE
            )
            UPDATE books b
            SET copies_avail = LEAST(b.copies_avail + 1, b.copies_total)
            FROM previous
            WHERE b.book_id = previous.book_id
            RETURNING b.copies_total, b.copies_avail, previous.copies_avail AS previous_avail
            "#,
        )
        .bind(book_id.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?
        .ok_or(LedgerError::BookNotFound(book_id))?;

        let counter = counter_from_row(book_id, &row)?;
        let previous_avail: i32 = row.get("previous_avail");
        if i64::from(previous_avail) >= i64::from(counter.total()) {
            Ok(Release::Saturated(counter))
        } else {
            Ok(Release::Released(counter))
        }
    }

    async fn resize(&self, book_id: BookId, new_total: u32) -> LedgerResult<CopyCounter> {
        let mut tx = self.pool.begin().await.map_err(storage)?;

        let counter = Self::lock_counter(&mut tx, book_id)
            .await?
            .ok_or(LedgerError::BookNotFound(book_id))?;
        let resized = counter
            .resize(new_total)
            .map_err(|e| LedgerError::inventory(book_id, e))?;

        let total = i32::try_from(resized.total())
            .map_err(|e| LedgerError::Storage(Box::new(e)))?;
        let available = i32::try_from(resized.available())
            .map_err(|e| LedgerError::Storage(Box::new(e)))?;

        sqlx::query(
            r#"
            UPDATE books
            SET copies_total = $2, copies_avail = $3
            WHERE book_id = $1
            "#,
        )
        .bind(book_id.value())
        .bind(total)
        .bind(available)
        .execute(&mut *tx)
        .await
        .map_err(storage)?;

        tx.commit().await.map_err(storage)?;
        Ok(resized)
    }
}
