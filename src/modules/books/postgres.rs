//! Postgres-backed entity store for the catalog tables.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::models::{
    Author, Book, BookId, Location, LocationType, OrderBy, PageRequest, Publisher, Tag,
};
use super::repository::{
    AuthorsRepository, BooksRepository, PublisherRepository, StoreError, StoreResult,
    TagsRepository,
};

/// Column list for `books` queries.
const BOOK_COLUMNS: &str = "id, title, subtitle, isbn, publication_year, publisher_id";

#[derive(Debug, sqlx::FromRow)]
struct BookRow {
    id: Uuid,
    title: String,
    subtitle: Option<String>,
    isbn: Option<String>,
    publication_year: Option<i32>,
    publisher_id: Option<Uuid>,
}

#[derive(Debug, sqlx::FromRow)]
struct LocationRow {
    id: Uuid,
    kind: String,
    value: String,
    book_id: Uuid,
}

impl TryFrom<LocationRow> for Location {
    type Error = StoreError;

    fn try_from(row: LocationRow) -> Result<Self, Self::Error> {
        let kind: LocationType = row.kind.parse().map_err(StoreError::Corrupt)?;
        Ok(Location {
            id: Some(row.id),
            kind,
            value: row.value,
            book_id: Some(row.book_id),
        })
    }
}

/// Catalog store over a shared connection pool.
#[derive(Debug, Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Attach publisher, location, authors and tags to a book row.
    async fn hydrate(&self, row: BookRow) -> StoreResult<Book> {
        let publisher = match row.publisher_id {
            Some(publisher_id) => {
                sqlx::query_as::<_, Publisher>("SELECT id, name FROM publishers WHERE id = $1")
                    .bind(publisher_id)
                    .fetch_optional(&self.pool)
                    .await?
            }
            None => None,
        };

        let location = sqlx::query_as::<_, LocationRow>(
            "SELECT id, kind, value, book_id FROM locations WHERE book_id = $1",
        )
        .bind(row.id)
        .fetch_optional(&self.pool)
        .await?
        .map(Location::try_from)
        .transpose()?;

        let authors = sqlx::query_as::<_, Author>(
            "SELECT a.id, a.first_name, a.last_name \
             FROM book_authors ba \
             JOIN authors a ON a.id = ba.author_id \
             WHERE ba.book_id = $1 \
             ORDER BY ba.position",
        )
        .bind(row.id)
        .fetch_all(&self.pool)
        .await?;

        let tags = sqlx::query_as::<_, Tag>(
            "SELECT t.id, t.name \
             FROM book_tags bt \
             JOIN tags t ON t.id = bt.tag_id \
             WHERE bt.book_id = $1 \
             ORDER BY bt.position",
        )
        .bind(row.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Book {
            id: Some(row.id),
            title: row.title,
            subtitle: row.subtitle,
            isbn: row.isbn,
            publication_year: row.publication_year,
            publisher,
            location,
            authors,
            tags,
        })
    }
}

/// The stored publisher for a carried identity, or a freshly inserted row.
async fn ensure_publisher(
    tx: &mut Transaction<'_, Postgres>,
    publisher: Publisher,
) -> StoreResult<Publisher> {
    if let Some(id) = publisher.id {
        return sqlx::query_as::<_, Publisher>("SELECT id, name FROM publishers WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| StoreError::UnknownReference(format!("publisher {id}")));
    }

    let stored = sqlx::query_as::<_, Publisher>(
        "INSERT INTO publishers (id, name) VALUES ($1, $2) RETURNING id, name",
    )
    .bind(Uuid::now_v7())
    .bind(&publisher.name)
    .fetch_one(&mut **tx)
    .await?;
    Ok(stored)
}

/// Insert new authors once per natural key within a submission.
async fn ensure_authors(
    tx: &mut Transaction<'_, Postgres>,
    authors: Vec<Author>,
) -> StoreResult<Vec<Author>> {
    let mut inserted: HashMap<(String, String), Author> = HashMap::new();
    let mut resolved = Vec::with_capacity(authors.len());

    for author in authors {
        if let Some(id) = author.id {
            let stored = sqlx::query_as::<_, Author>(
                "SELECT id, first_name, last_name FROM authors WHERE id = $1",
            )
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| StoreError::UnknownReference(format!("author {id}")))?;
            resolved.push(stored);
            continue;
        }

        let key = (author.first_name.clone(), author.last_name.clone());
        if let Some(existing) = inserted.get(&key) {
            resolved.push(existing.clone());
            continue;
        }

        let stored = sqlx::query_as::<_, Author>(
            "INSERT INTO authors (id, first_name, last_name) VALUES ($1, $2, $3) \
             RETURNING id, first_name, last_name",
        )
        .bind(Uuid::now_v7())
        .bind(&author.first_name)
        .bind(&author.last_name)
        .fetch_one(&mut **tx)
        .await?;
        inserted.insert(key, stored.clone());
        resolved.push(stored);
    }

    Ok(resolved)
}

async fn ensure_tags(tx: &mut Transaction<'_, Postgres>, tags: Vec<Tag>) -> StoreResult<Vec<Tag>> {
    let mut inserted: HashMap<String, Tag> = HashMap::new();
    let mut resolved = Vec::with_capacity(tags.len());

    for tag in tags {
        if let Some(id) = tag.id {
            let stored = sqlx::query_as::<_, Tag>("SELECT id, name FROM tags WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut **tx)
                .await?
                .ok_or_else(|| StoreError::UnknownReference(format!("tag {id}")))?;
            resolved.push(stored);
            continue;
        }

        if let Some(existing) = inserted.get(&tag.name) {
            resolved.push(existing.clone());
            continue;
        }

        let stored = sqlx::query_as::<_, Tag>(
            "INSERT INTO tags (id, name) VALUES ($1, $2) RETURNING id, name",
        )
        .bind(Uuid::now_v7())
        .bind(&tag.name)
        .fetch_one(&mut **tx)
        .await?;
        inserted.insert(tag.name, stored.clone());
        resolved.push(stored);
    }

    Ok(resolved)
}

/// Keep the first occurrence of each identity.
fn first_occurrences<T>(items: Vec<T>, id: impl Fn(&T) -> Option<Uuid>) -> Vec<T> {
    let mut seen = std::collections::HashSet::new();
    items
        .into_iter()
        .filter(|item| id(item).map_or(true, |id| seen.insert(id)))
        .collect()
}

#[async_trait]
impl BooksRepository for PgCatalogStore {
    async fn add_book(&self, book: Book) -> StoreResult<Book> {
        let mut tx = self.pool.begin().await?;
        let book_id = Uuid::now_v7();

        let publisher = match book.publisher {
            Some(publisher) => Some(ensure_publisher(&mut tx, publisher).await?),
            None => None,
        };
        let authors = first_occurrences(ensure_authors(&mut tx, book.authors).await?, |a| a.id);
        let tags = first_occurrences(ensure_tags(&mut tx, book.tags).await?, |t| t.id);

        let query = format!(
            "INSERT INTO books ({BOOK_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {BOOK_COLUMNS}"
        );
        let row = sqlx::query_as::<_, BookRow>(&query)
            .bind(book_id)
            .bind(&book.title)
            .bind(&book.subtitle)
            .bind(&book.isbn)
            .bind(book.publication_year)
            .bind(publisher.as_ref().and_then(|p| p.id))
            .fetch_one(&mut *tx)
            .await?;

        let location = match book.location {
            Some(location) => {
                let stored = sqlx::query_as::<_, LocationRow>(
                    "INSERT INTO locations (id, kind, value, book_id) VALUES ($1, $2, $3, $4) \
                     RETURNING id, kind, value, book_id",
                )
                .bind(Uuid::now_v7())
                .bind(location.kind.as_str())
                .bind(&location.value)
                .bind(book_id)
                .fetch_one(&mut *tx)
                .await?;
                Some(Location::try_from(stored)?)
            }
            None => None,
        };

        for (position, author) in authors.iter().enumerate() {
            sqlx::query(
                "INSERT INTO book_authors (book_id, author_id, position) VALUES ($1, $2, $3)",
            )
            .bind(book_id)
            .bind(author.id)
            .bind(position as i32)
            .execute(&mut *tx)
            .await?;
        }

        for (position, tag) in tags.iter().enumerate() {
            sqlx::query("INSERT INTO book_tags (book_id, tag_id, position) VALUES ($1, $2, $3)")
                .bind(book_id)
                .bind(tag.id)
                .bind(position as i32)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        Ok(Book {
            id: Some(row.id),
            title: row.title,
            subtitle: row.subtitle,
            isbn: row.isbn,
            publication_year: row.publication_year,
            publisher,
            location,
            authors,
            tags,
        })
    }

    async fn get_book(&self, id: BookId) -> StoreResult<Option<Book>> {
        let query = format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = $1");
        let row = sqlx::query_as::<_, BookRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    async fn remove_book(&self, id: BookId) -> StoreResult<()> {
        // Location and link rows cascade.
        sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn count_books(&self) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn list_books(&self, page: PageRequest) -> StoreResult<Vec<Book>> {
        let direction = match page.order_by {
            OrderBy::Asc => "ASC",
            OrderBy::Desc => "DESC",
        };
        let query = format!(
            "SELECT {BOOK_COLUMNS} FROM books \
             ORDER BY title {direction}, id {direction} \
             LIMIT $1 OFFSET $2"
        );
        let rows = sqlx::query_as::<_, BookRow>(&query)
            .bind(i64::from(page.results_per_page))
            .bind(i64::from(page.offset))
            .fetch_all(&self.pool)
            .await?;

        let mut books = Vec::with_capacity(rows.len());
        for row in rows {
            books.push(self.hydrate(row).await?);
        }
        Ok(books)
    }
}

#[async_trait]
impl PublisherRepository for PgCatalogStore {
    async fn find_publisher_by_name(&self, name: &str) -> StoreResult<Option<Publisher>> {
        let publisher =
            sqlx::query_as::<_, Publisher>("SELECT id, name FROM publishers WHERE name = $1")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;
        Ok(publisher)
    }
}

#[async_trait]
impl AuthorsRepository for PgCatalogStore {
    async fn find_author_by_name(
        &self,
        first_name: &str,
        last_name: &str,
    ) -> StoreResult<Option<Author>> {
        let author = sqlx::query_as::<_, Author>(
            "SELECT id, first_name, last_name FROM authors \
             WHERE first_name = $1 AND last_name = $2",
        )
        .bind(first_name)
        .bind(last_name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(author)
    }
}

#[async_trait]
impl TagsRepository for PgCatalogStore {
    async fn find_tag_by_name(&self, name: &str) -> StoreResult<Option<Tag>> {
        let tag = sqlx::query_as::<_, Tag>("SELECT id, name FROM tags WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_location_kind_is_reported_as_corrupt() {
        let row = LocationRow {
            id: Uuid::now_v7(),
            kind: "basement".to_string(),
            value: "B1".to_string(),
            book_id: Uuid::now_v7(),
        };

        assert!(matches!(Location::try_from(row), Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn first_occurrence_wins_position() {
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        let kept = first_occurrences(vec![Some(a), Some(b), Some(a), None, None], |id| *id);
        assert_eq!(kept, vec![Some(a), Some(b), None, None]);
    }
}
