use std::sync::Arc;

use super::dto::BookDto;
use super::error::CatalogError;
use super::models::{Book, BookId, PageRequest};
use super::reconcile::{reconcile_authors, reconcile_publisher, reconcile_tags};
use super::repository::{AuthorsRepository, BooksRepository, PublisherRepository, TagsRepository};

/// Book operations over the entity store.
///
/// Holds no mutable state of its own; safe to share across requests.
#[derive(Clone)]
pub struct BooksService {
    books: Arc<dyn BooksRepository>,
    publishers: Arc<dyn PublisherRepository>,
    authors: Arc<dyn AuthorsRepository>,
    tags: Arc<dyn TagsRepository>,
}

impl BooksService {
    pub fn new(
        books: Arc<dyn BooksRepository>,
        publishers: Arc<dyn PublisherRepository>,
        authors: Arc<dyn AuthorsRepository>,
        tags: Arc<dyn TagsRepository>,
    ) -> Self {
        Self {
            books,
            publishers,
            authors,
            tags,
        }
    }

    /// Build a service whose four contracts are served by one store.
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: BooksRepository + PublisherRepository + AuthorsRepository + TagsRepository + 'static,
    {
        Self::new(store.clone(), store.clone(), store.clone(), store)
    }

    /// Validate, reconcile against existing publishers/authors/tags, then
    /// persist.
    ///
    /// Reconciliation lookups and the final insert are separate store calls;
    /// a sub-entity inserted concurrently in between surfaces as
    /// `StoreError::Duplicate`.
    pub async fn add_book(&self, candidate: BookDto) -> Result<BookDto, CatalogError> {
        if candidate.title.trim().is_empty() {
            return Err(CatalogError::validation("title", "is required"));
        }

        let candidate = reconcile_publisher(candidate, self.publishers.as_ref()).await?;
        let candidate = reconcile_authors(candidate, self.authors.as_ref()).await?;
        let candidate = reconcile_tags(candidate, self.tags.as_ref()).await?;

        let mut entity = Book::from(candidate);
        entity.id = None;

        let stored = self.books.add_book(entity).await?;
        tracing::info!(
            book_id = ?stored.id,
            title = %stored.title,
            authors = stored.authors.len(),
            tags = stored.tags.len(),
            "book added"
        );

        Ok(BookDto::from(stored))
    }

    pub async fn get_book(&self, id: BookId) -> Result<Option<BookDto>, CatalogError> {
        let book = self.books.get_book(id).await?;
        Ok(book.map(BookDto::from))
    }

    pub async fn remove_book(&self, id: BookId) -> Result<(), CatalogError> {
        self.books.remove_book(id).await?;
        tracing::info!(book_id = %id, "book removed");
        Ok(())
    }

    pub async fn count_books(&self) -> Result<i64, CatalogError> {
        Ok(self.books.count_books().await?)
    }

    /// One page of books in the store's ordering. Paging and ordering are
    /// applied by the store.
    pub async fn list_books(&self, page: PageRequest) -> Result<Vec<BookDto>, CatalogError> {
        if page.results_per_page == 0 {
            return Err(CatalogError::validation(
                "resultsPerPage",
                "must be at least 1",
            ));
        }

        let books = self.books.list_books(page).await?;
        Ok(books.into_iter().map(BookDto::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::books::dto::{AuthorDto, LocationDto, PublisherDto, TagDto};
    use crate::modules::books::memory::InMemoryStore;
    use crate::modules::books::models::{Author, LocationType, OrderBy, Publisher, Tag};
    use crate::modules::books::repository::{StoreError, StoreResult};
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    /// Wraps the in-memory store, counting every lookup.
    struct CountingLookups {
        inner: Arc<InMemoryStore>,
        lookups: AtomicUsize,
    }

    impl CountingLookups {
        fn new(inner: Arc<InMemoryStore>) -> Arc<Self> {
            Arc::new(Self {
                inner,
                lookups: AtomicUsize::new(0),
            })
        }

        fn lookups(&self) -> usize {
            self.lookups.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PublisherRepository for CountingLookups {
        async fn find_publisher_by_name(&self, name: &str) -> StoreResult<Option<Publisher>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.inner.find_publisher_by_name(name).await
        }
    }

    #[async_trait]
    impl AuthorsRepository for CountingLookups {
        async fn find_author_by_name(
            &self,
            first: &str,
            last: &str,
        ) -> StoreResult<Option<Author>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.inner.find_author_by_name(first, last).await
        }
    }

    #[async_trait]
    impl TagsRepository for CountingLookups {
        async fn find_tag_by_name(&self, name: &str) -> StoreResult<Option<Tag>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.inner.find_tag_by_name(name).await
        }
    }

    /// Publisher lookups that never find anything, standing in for a
    /// concurrent writer racing the reconciliation step.
    struct BlindPublishers;

    #[async_trait]
    impl PublisherRepository for BlindPublishers {
        async fn find_publisher_by_name(&self, _name: &str) -> StoreResult<Option<Publisher>> {
            Ok(None)
        }
    }

    fn counting_service(store: &Arc<InMemoryStore>) -> (BooksService, Arc<CountingLookups>) {
        let lookups = CountingLookups::new(store.clone());
        let service = BooksService::new(
            store.clone(),
            lookups.clone(),
            lookups.clone(),
            lookups.clone(),
        );
        (service, lookups)
    }

    fn candidate(title: &str) -> BookDto {
        BookDto {
            title: title.to_string(),
            ..BookDto::default()
        }
    }

    fn full_candidate() -> BookDto {
        BookDto {
            id: None,
            title: "Mort".to_string(),
            subtitle: Some("A Discworld Novel".to_string()),
            isbn: Some("978-0552131063".to_string()),
            publication_year: Some(1987),
            publisher: Some(PublisherDto::new("Corgi")),
            location: Some(LocationDto {
                id: None,
                kind: LocationType::Shelf,
                value: "F-3".to_string(),
            }),
            authors: vec![AuthorDto::new("Terry", "Pratchett")],
            tags: vec![TagDto::new("fantasy"), TagDto::new("death")],
        }
    }

    #[tokio::test]
    async fn add_book_returns_book_with_assigned_id() {
        let store = Arc::new(InMemoryStore::new());
        let service = BooksService::from_store(store.clone());

        let created = service.add_book(full_candidate()).await.unwrap();

        let id = created.id.expect("store assigns an id");
        assert_eq!(created.title, "Mort");
        assert!(created.publisher.as_ref().unwrap().id.is_some());
        assert!(created.location.as_ref().unwrap().id.is_some());
        assert!(created.authors.iter().all(|a| a.id.is_some()));
        assert_eq!(service.get_book(id).await.unwrap(), Some(created));
    }

    #[tokio::test]
    async fn client_supplied_book_id_is_discarded() {
        let store = Arc::new(InMemoryStore::new());
        let service = BooksService::from_store(store);
        let forged = Uuid::now_v7();

        let created = service
            .add_book(BookDto {
                id: Some(forged),
                ..candidate("Eric")
            })
            .await
            .unwrap();

        assert_ne!(created.id, Some(forged));
        assert!(service.get_book(forged).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn existing_publisher_is_reused_not_duplicated() {
        let store = Arc::new(InMemoryStore::new());
        let service = BooksService::from_store(store.clone());

        let first = service.add_book(full_candidate()).await.unwrap();
        let second = service
            .add_book(BookDto {
                title: "Reaper Man".to_string(),
                ..full_candidate()
            })
            .await
            .unwrap();

        assert_eq!(first.publisher.unwrap().id, second.publisher.unwrap().id);
        assert_eq!(first.authors[0].id, second.authors[0].id);
        assert_eq!(store.publisher_count().await, 1);
        assert_eq!(store.author_count().await, 1);
        assert_eq!(store.tag_count().await, 2);
    }

    #[tokio::test]
    async fn unknown_publisher_is_created_with_its_name() {
        let store = Arc::new(InMemoryStore::new());
        let service = BooksService::from_store(store.clone());

        let created = service
            .add_book(BookDto {
                publisher: Some(PublisherDto::new("Doubleday")),
                ..candidate("Sourcery")
            })
            .await
            .unwrap();

        let publisher = store.find_publisher_by_name("Doubleday").await.unwrap().unwrap();
        assert_eq!(created.publisher.unwrap().id, publisher.id);
    }

    #[tokio::test]
    async fn absent_publisher_skips_lookup_and_stays_absent() {
        let store = Arc::new(InMemoryStore::new());
        let (service, lookups) = counting_service(&store);

        let created = service.add_book(candidate("Pyramids")).await.unwrap();

        assert_eq!(created.publisher, None);
        assert_eq!(lookups.lookups(), 0);
    }

    #[tokio::test]
    async fn empty_publisher_name_is_stored_as_a_new_publisher_each_time() {
        let store = Arc::new(InMemoryStore::new());
        let (service, lookups) = counting_service(&store);
        let unnamed = |title: &str| BookDto {
            publisher: Some(PublisherDto::new("")),
            ..candidate(title)
        };

        let first = service.add_book(unnamed("Strata")).await.unwrap();
        let second = service.add_book(unnamed("Dark Side")).await.unwrap();

        assert_eq!(lookups.lookups(), 0);
        let first = first.publisher.unwrap();
        let second = second.publisher.unwrap();
        assert_eq!(second.name, "");
        assert!(first.id.is_some() && second.id.is_some());
        assert_ne!(first.id, second.id);
        assert_eq!(store.publisher_count().await, 2);
    }

    #[tokio::test]
    async fn found_authors_are_persisted_ahead_of_new_ones() {
        let store = Arc::new(InMemoryStore::new());
        let service = BooksService::from_store(store.clone());
        let seeded = service
            .add_book(BookDto {
                authors: vec![AuthorDto::new("Terry", "Pratchett")],
                ..candidate("Guards! Guards!")
            })
            .await
            .unwrap();
        let pratchett = seeded.authors[0].clone();

        let created = service
            .add_book(BookDto {
                authors: vec![
                    AuthorDto::new("Neil", "Gaiman"),
                    AuthorDto::new("Terry", "Pratchett"),
                ],
                ..candidate("Good Omens")
            })
            .await
            .unwrap();

        assert_eq!(created.authors[0], pratchett);
        assert_eq!(created.authors[1].first_name, "Neil");
        assert!(created.authors[1].id.is_some());
    }

    #[tokio::test]
    async fn new_authors_keep_submission_order() {
        let store = Arc::new(InMemoryStore::new());
        let service = BooksService::from_store(store);

        let created = service
            .add_book(BookDto {
                authors: vec![
                    AuthorDto::new("Neil", "Gaiman"),
                    AuthorDto::new("Terry", "Pratchett"),
                ],
                ..candidate("Good Omens")
            })
            .await
            .unwrap();

        let names: Vec<&str> = created.authors.iter().map(|a| a.last_name.as_str()).collect();
        assert_eq!(names, vec!["Gaiman", "Pratchett"]);
    }

    #[tokio::test]
    async fn empty_title_is_rejected_before_any_store_call() {
        let store = Arc::new(InMemoryStore::new());
        let (service, lookups) = counting_service(&store);

        for title in ["", "   "] {
            let result = service
                .add_book(BookDto {
                    title: title.to_string(),
                    ..full_candidate()
                })
                .await;
            assert_matches!(result, Err(CatalogError::Validation { field: "title", .. }));
        }

        assert_eq!(lookups.lookups(), 0);
        assert_eq!(service.count_books().await.unwrap(), 0);
        assert_eq!(store.publisher_count().await, 0);
    }

    #[tokio::test]
    async fn lost_lookup_race_surfaces_as_duplicate() {
        let store = Arc::new(InMemoryStore::new());
        BooksService::from_store(store.clone())
            .add_book(full_candidate())
            .await
            .unwrap();

        let racing = BooksService::new(
            store.clone(),
            Arc::new(BlindPublishers),
            store.clone(),
            store.clone(),
        );
        let result = racing.add_book(full_candidate()).await;

        assert_matches!(result, Err(CatalogError::Store(StoreError::Duplicate(_))));
        assert_eq!(store.publisher_count().await, 1);
        assert_eq!(racing.count_books().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn get_book_for_unknown_id_is_absent() {
        let service = BooksService::from_store(Arc::new(InMemoryStore::new()));

        assert_eq!(service.get_book(Uuid::now_v7()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn removed_book_is_absent() {
        let service = BooksService::from_store(Arc::new(InMemoryStore::new()));
        let id = service
            .add_book(full_candidate())
            .await
            .unwrap()
            .id
            .unwrap();

        service.remove_book(id).await.unwrap();
        service.remove_book(id).await.unwrap();

        assert_eq!(service.get_book(id).await.unwrap(), None);
        assert_eq!(service.count_books().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn count_matches_stored_rows() {
        let service = BooksService::from_store(Arc::new(InMemoryStore::new()));
        assert_eq!(service.count_books().await.unwrap(), 0);

        for n in 0..37 {
            service
                .add_book(candidate(&format!("Volume {n:02}")))
                .await
                .unwrap();
        }

        assert_eq!(service.count_books().await.unwrap(), 37);
    }

    #[tokio::test]
    async fn list_returns_whole_small_catalog_in_order() {
        let service = BooksService::from_store(Arc::new(InMemoryStore::new()));
        for title in [
            "Jingo",
            "Eric",
            "Mort",
            "Carpe Jugulum",
            "Hogfather",
            "Maskerade",
            "Thud!",
            "Snuff",
            "Nation",
            "Dodger",
        ] {
            service.add_book(candidate(title)).await.unwrap();
        }

        let ascending = service
            .list_books(PageRequest::new(25, 0, OrderBy::Asc))
            .await
            .unwrap();
        let titles: Vec<&str> = ascending.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "Carpe Jugulum",
                "Dodger",
                "Eric",
                "Hogfather",
                "Jingo",
                "Maskerade",
                "Mort",
                "Nation",
                "Snuff",
                "Thud!"
            ]
        );

        let descending = service
            .list_books(PageRequest::new(3, 1, OrderBy::Desc))
            .await
            .unwrap();
        let titles: Vec<&str> = descending.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["Snuff", "Nation", "Mort"]);
    }

    #[tokio::test]
    async fn zero_page_size_is_rejected() {
        let service = BooksService::from_store(Arc::new(InMemoryStore::new()));

        let result = service.list_books(PageRequest::new(0, 0, OrderBy::Asc)).await;

        assert_matches!(result, Err(CatalogError::Validation { field: "resultsPerPage", .. }));
    }
}
