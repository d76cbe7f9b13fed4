//! Process-local entity store with the same contract as the Postgres store:
//! store-assigned identities, natural-key uniqueness, all-or-nothing inserts
//! and `(title, id)` ordering.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::models::{Author, Book, BookId, Location, OrderBy, PageRequest, Publisher, Tag};
use super::repository::{
    AuthorsRepository, BooksRepository, PublisherRepository, StoreError, StoreResult,
    TagsRepository,
};

#[derive(Debug, Clone, Default)]
struct Tables {
    books: HashMap<BookId, Book>,
    publishers: HashMap<Uuid, Publisher>,
    authors: HashMap<Uuid, Author>,
    tags: HashMap<Uuid, Tag>,
}

impl Tables {
    fn resolve_publisher(&mut self, publisher: Publisher) -> StoreResult<Publisher> {
        if let Some(id) = publisher.id {
            return self
                .publishers
                .get(&id)
                .cloned()
                .ok_or_else(|| StoreError::UnknownReference(format!("publisher {id}")));
        }

        // Empty names are not a natural key; each one is its own publisher.
        if !publisher.name.is_empty()
            && self.publishers.values().any(|p| p.name == publisher.name)
        {
            return Err(StoreError::Duplicate(format!("publisher '{}'", publisher.name)));
        }

        let id = Uuid::now_v7();
        let stored = Publisher {
            id: Some(id),
            ..publisher
        };
        self.publishers.insert(id, stored.clone());
        Ok(stored)
    }

    fn resolve_author(&mut self, author: Author, fresh: &mut HashSet<Uuid>) -> StoreResult<Author> {
        if let Some(id) = author.id {
            return self
                .authors
                .get(&id)
                .cloned()
                .ok_or_else(|| StoreError::UnknownReference(format!("author {id}")));
        }

        let existing = self
            .authors
            .values()
            .find(|a| a.first_name == author.first_name && a.last_name == author.last_name);
        if let Some(existing) = existing {
            // Repeated within this submission: same row, not a conflict.
            if existing.id.is_some_and(|id| fresh.contains(&id)) {
                return Ok(existing.clone());
            }
            return Err(StoreError::Duplicate(format!(
                "author '{} {}'",
                author.first_name, author.last_name
            )));
        }

        let id = Uuid::now_v7();
        let stored = Author {
            id: Some(id),
            ..author
        };
        fresh.insert(id);
        self.authors.insert(id, stored.clone());
        Ok(stored)
    }

    fn resolve_tag(&mut self, tag: Tag, fresh: &mut HashSet<Uuid>) -> StoreResult<Tag> {
        if let Some(id) = tag.id {
            return self
                .tags
                .get(&id)
                .cloned()
                .ok_or_else(|| StoreError::UnknownReference(format!("tag {id}")));
        }

        if let Some(existing) = self.tags.values().find(|t| t.name == tag.name) {
            if existing.id.is_some_and(|id| fresh.contains(&id)) {
                return Ok(existing.clone());
            }
            return Err(StoreError::Duplicate(format!("tag '{}'", tag.name)));
        }

        let id = Uuid::now_v7();
        let stored = Tag { id: Some(id), ..tag };
        fresh.insert(id);
        self.tags.insert(id, stored.clone());
        Ok(stored)
    }
}

/// Drop repeated identities, keeping the first occurrence.
fn dedup_by_id<T>(items: Vec<T>, id: impl Fn(&T) -> Option<Uuid>) -> Vec<T> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| id(item).map_or(true, |id| seen.insert(id)))
        .collect()
}

/// Single-process store for local runs and tests.
///
/// `add_book` clones every table before writing and swaps the copy in on
/// success, so each insert costs O(rows). Not meant for large catalogs.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) async fn publisher_count(&self) -> usize {
        self.tables.read().await.publishers.len()
    }

    #[cfg(test)]
    pub(crate) async fn author_count(&self) -> usize {
        self.tables.read().await.authors.len()
    }

    #[cfg(test)]
    pub(crate) async fn tag_count(&self) -> usize {
        self.tables.read().await.tags.len()
    }
}

#[async_trait]
impl BooksRepository for InMemoryStore {
    async fn add_book(&self, book: Book) -> StoreResult<Book> {
        let mut guard = self.tables.write().await;
        // Work on a copy so a failed insert leaves no partial rows behind.
        let mut tables = guard.clone();
        let book_id = Uuid::now_v7();

        let publisher = book
            .publisher
            .map(|publisher| tables.resolve_publisher(publisher))
            .transpose()?;

        let mut fresh = HashSet::new();
        let authors = book
            .authors
            .into_iter()
            .map(|author| tables.resolve_author(author, &mut fresh))
            .collect::<StoreResult<Vec<_>>>()?;
        let tags = book
            .tags
            .into_iter()
            .map(|tag| tables.resolve_tag(tag, &mut fresh))
            .collect::<StoreResult<Vec<_>>>()?;

        let location = book.location.map(|location| Location {
            id: Some(Uuid::now_v7()),
            book_id: Some(book_id),
            ..location
        });

        let stored = Book {
            id: Some(book_id),
            title: book.title,
            subtitle: book.subtitle,
            isbn: book.isbn,
            publication_year: book.publication_year,
            publisher,
            location,
            authors: dedup_by_id(authors, |a| a.id),
            tags: dedup_by_id(tags, |t| t.id),
        };
        tables.books.insert(book_id, stored.clone());
        *guard = tables;

        Ok(stored)
    }

    async fn get_book(&self, id: BookId) -> StoreResult<Option<Book>> {
        Ok(self.tables.read().await.books.get(&id).cloned())
    }

    async fn remove_book(&self, id: BookId) -> StoreResult<()> {
        self.tables.write().await.books.remove(&id);
        Ok(())
    }

    async fn count_books(&self) -> StoreResult<i64> {
        Ok(self.tables.read().await.books.len() as i64)
    }

    async fn list_books(&self, page: PageRequest) -> StoreResult<Vec<Book>> {
        let tables = self.tables.read().await;
        let mut books: Vec<&Book> = tables.books.values().collect();
        books.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.id.cmp(&b.id)));
        if page.order_by == OrderBy::Desc {
            books.reverse();
        }

        Ok(books
            .into_iter()
            .skip(page.offset as usize)
            .take(page.results_per_page as usize)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl PublisherRepository for InMemoryStore {
    async fn find_publisher_by_name(&self, name: &str) -> StoreResult<Option<Publisher>> {
        let tables = self.tables.read().await;
        Ok(tables.publishers.values().find(|p| p.name == name).cloned())
    }
}

#[async_trait]
impl AuthorsRepository for InMemoryStore {
    async fn find_author_by_name(
        &self,
        first_name: &str,
        last_name: &str,
    ) -> StoreResult<Option<Author>> {
        let tables = self.tables.read().await;
        Ok(tables
            .authors
            .values()
            .find(|a| a.first_name == first_name && a.last_name == last_name)
            .cloned())
    }
}

#[async_trait]
impl TagsRepository for InMemoryStore {
    async fn find_tag_by_name(&self, name: &str) -> StoreResult<Option<Tag>> {
        let tables = self.tables.read().await;
        Ok(tables.tags.values().find(|t| t.name == name).cloned())
    }
}
