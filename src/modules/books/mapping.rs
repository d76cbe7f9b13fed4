//! Field-for-field conversion between wire forms and storage entities.
//!
//! | Wire            | Storage          |
//! |-----------------|------------------|
//! | `BookDto`       | `Book`           |
//! | `AuthorDto`     | `Author`         |
//! | `PublisherDto`  | `Publisher`      |
//! | `TagDto`        | `Tag`            |
//! | `LocationDto`   | `Location`       |
//!
//! `Location::book_id` has no wire counterpart: it is dropped going out and
//! left unset coming in (the store fills it when persisting the book).

use super::dto::{AuthorDto, BookDto, LocationDto, PublisherDto, TagDto};
use super::models::{Author, Book, Location, Publisher, Tag};

impl From<BookDto> for Book {
    fn from(dto: BookDto) -> Self {
        Self {
            id: dto.id,
            title: dto.title,
            subtitle: dto.subtitle,
            isbn: dto.isbn,
            publication_year: dto.publication_year,
            publisher: dto.publisher.map(Publisher::from),
            location: dto.location.map(Location::from),
            authors: dto.authors.into_iter().map(Author::from).collect(),
            tags: dto.tags.into_iter().map(Tag::from).collect(),
        }
    }
}

impl From<Book> for BookDto {
    fn from(book: Book) -> Self {
        Self {
            id: book.id,
            title: book.title,
            subtitle: book.subtitle,
            isbn: book.isbn,
            publication_year: book.publication_year,
            publisher: book.publisher.map(PublisherDto::from),
            location: book.location.map(LocationDto::from),
            authors: book.authors.into_iter().map(AuthorDto::from).collect(),
            tags: book.tags.into_iter().map(TagDto::from).collect(),
        }
    }
}

impl From<AuthorDto> for Author {
    fn from(dto: AuthorDto) -> Self {
        Self {
            id: dto.id,
            first_name: dto.first_name,
            last_name: dto.last_name,
        }
    }
}

impl From<Author> for AuthorDto {
    fn from(author: Author) -> Self {
        Self {
            id: author.id,
            first_name: author.first_name,
            last_name: author.last_name,
        }
    }
}

impl From<PublisherDto> for Publisher {
    fn from(dto: PublisherDto) -> Self {
        Self {
            id: dto.id,
            name: dto.name,
        }
    }
}

impl From<Publisher> for PublisherDto {
    fn from(publisher: Publisher) -> Self {
        Self {
            id: publisher.id,
            name: publisher.name,
        }
    }
}

impl From<TagDto> for Tag {
    fn from(dto: TagDto) -> Self {
        Self {
            id: dto.id,
            name: dto.name,
        }
    }
}

impl From<Tag> for TagDto {
    fn from(tag: Tag) -> Self {
        Self {
            id: tag.id,
            name: tag.name,
        }
    }
}

impl From<LocationDto> for Location {
    fn from(dto: LocationDto) -> Self {
        Self {
            id: dto.id,
            kind: dto.kind,
            value: dto.value,
            book_id: None,
        }
    }
}

impl From<Location> for LocationDto {
    fn from(location: Location) -> Self {
        Self {
            id: location.id,
            kind: location.kind,
            value: location.value,
        }
    }
}
