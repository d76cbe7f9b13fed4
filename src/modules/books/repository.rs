//! Entity store contracts consumed by the books service.
//!
//! Implementations live in [`super::postgres`] and [`super::memory`] and must
//! not leak driver types past `StoreError`.

use async_trait::async_trait;
use thiserror::Error;

use super::models::{Author, Book, BookId, PageRequest, Publisher, Tag};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database failure: {0}")]
    Database(#[source] sqlx::Error),

    /// A natural-key unique index rejected the write, typically a concurrent
    /// insert between reconciliation and persistence.
    #[error("duplicate entity: {0}")]
    Duplicate(String),

    /// The candidate points at an identity the store does not hold.
    #[error("unknown reference: {0}")]
    UnknownReference(String),

    #[error("corrupt row: {0}")]
    Corrupt(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return StoreError::Duplicate(db_err.message().to_string());
            }
            if db_err.is_foreign_key_violation() {
                return StoreError::UnknownReference(db_err.message().to_string());
            }
        }
        StoreError::Database(err)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait BooksRepository: Send + Sync {
    /// Persist a book with its location and sub-entities, assigning every
    /// missing identity. Any identity carried by `book` itself is ignored.
    async fn add_book(&self, book: Book) -> StoreResult<Book>;

    async fn get_book(&self, id: BookId) -> StoreResult<Option<Book>>;

    /// Removing an unknown id succeeds without effect.
    async fn remove_book(&self, id: BookId) -> StoreResult<()>;

    async fn count_books(&self) -> StoreResult<i64>;

    async fn list_books(&self, page: PageRequest) -> StoreResult<Vec<Book>>;
}

#[async_trait]
pub trait PublisherRepository: Send + Sync {
    async fn find_publisher_by_name(&self, name: &str) -> StoreResult<Option<Publisher>>;
}

#[async_trait]
pub trait AuthorsRepository: Send + Sync {
    async fn find_author_by_name(
        &self,
        first_name: &str,
        last_name: &str,
    ) -> StoreResult<Option<Author>>;
}

#[async_trait]
pub trait TagsRepository: Send + Sync {
    async fn find_tag_by_name(&self, name: &str) -> StoreResult<Option<Tag>>;
}
