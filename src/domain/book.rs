use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BookId, BookValidationError, CopyCounter};

/// Book - カタログ上の1タイトルと蔵書数
///
/// `copies`は台帳（InventoryLedger）経由でのみ変化する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub book_id: BookId,
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub description: Option<String>,
    pub copies: CopyCounter,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 書籍の書誌情報（蔵書数以外）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookDetails {
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub description: Option<String>,
}

impl Book {
    /// 現在の書誌情報
    pub fn details(&self) -> BookDetails {
        BookDetails {
            title: self.title.clone(),
            author: self.author.clone(),
            isbn: self.isbn.clone(),
            description: self.description.clone(),
        }
    }
}

/// 書誌情報の部分更新
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookPatch {
    pub title: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub description: Option<String>,
    pub copies_total: Option<i64>,
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate_copies_total(copies_total: i64) -> Result<u32, BookValidationError> {
    u32::try_from(copies_total)
        .ok()
        .filter(|n| *n > 0)
        .ok_or(BookValidationError::InvalidCopiesTotal(copies_total))
}

impl BookDetails {
    /// 入力を検証して書誌情報を作る
    ///
    /// タイトルと著者は必須（空白のみは不可）。
    pub fn new(
        title: &str,
        author: &str,
        isbn: Option<String>,
        description: Option<String>,
    ) -> Result<Self, BookValidationError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(BookValidationError::EmptyTitle);
        }
        let author = author.trim();
        if author.is_empty() {
            return Err(BookValidationError::EmptyAuthor);
        }
        Ok(Self {
            title: title.to_string(),
            author: author.to_string(),
            isbn: normalize_optional(isbn),
            description: normalize_optional(description),
        })
    }
}

/// 純粋関数：書籍を登録する
pub fn create_book(
    details: BookDetails,
    copies_total: i64,
    created_at: DateTime<Utc>,
) -> Result<Book, BookValidationError> {
    let total = validate_copies_total(copies_total)?;
    let copies =
        CopyCounter::new(total).map_err(|_| BookValidationError::InvalidCopiesTotal(copies_total))?;

    Ok(Book {
        book_id: BookId::new(),
        title: details.title,
        author: details.author,
        isbn: details.isbn,
        description: details.description,
        copies,
        created_at,
        updated_at: created_at,
    })
}

/// 純粋関数：書誌情報の変更を適用する
///
/// 蔵書数はここでは変更しない。`patch.copies_total`は検証済みの値として
/// 別途返し、台帳のresizeに渡す。
pub fn apply_patch(
    book: &Book,
    patch: BookPatch,
) -> Result<(BookDetails, Option<u32>), BookValidationError> {
    let details = BookDetails::new(
        patch.title.as_deref().unwrap_or(&book.title),
        patch.author.as_deref().unwrap_or(&book.author),
        patch.isbn.or_else(|| book.isbn.clone()),
        patch.description.or_else(|| book.description.clone()),
    )?;

    let new_total = patch.copies_total.map(validate_copies_total).transpose()?;

    Ok((details, new_total))
}
