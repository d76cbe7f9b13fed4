//! Natural-key reconciliation of a candidate book's publisher, authors and tags.
//!
//! Each step takes the candidate by value and returns the rewritten
//! candidate. Steps only read from the store; a miss is the "create new"
//! path, not an error.

use super::dto::{AuthorDto, BookDto, PublisherDto, TagDto};
use super::repository::{AuthorsRepository, PublisherRepository, StoreResult, TagsRepository};

/// Replace the publisher with the stored record of the same name, if any.
///
/// No lookup happens when the publisher is absent or its name is empty.
pub async fn reconcile_publisher(
    mut candidate: BookDto,
    publishers: &dyn PublisherRepository,
) -> StoreResult<BookDto> {
    let Some(name) = candidate
        .publisher
        .as_ref()
        .map(|publisher| publisher.name.as_str())
        .filter(|name| !name.is_empty())
    else {
        return Ok(candidate);
    };

    let existing = publishers.find_publisher_by_name(name).await?;
    if let Some(existing) = existing {
        tracing::debug!(publisher = %existing.name, "reusing existing publisher");
        candidate.publisher = Some(PublisherDto::from(existing));
    }

    Ok(candidate)
}

/// Swap authors matching a stored `(first_name, last_name)` for the stored
/// record.
///
/// When at least one author matches, the list becomes every match followed by
/// every miss, each group in submission order. With no match the list is
/// returned exactly as submitted.
pub async fn reconcile_authors(
    mut candidate: BookDto,
    authors: &dyn AuthorsRepository,
) -> StoreResult<BookDto> {
    if candidate.authors.is_empty() {
        return Ok(candidate);
    }

    let mut found = Vec::new();
    let mut missing = Vec::new();
    for incoming in &candidate.authors {
        match authors
            .find_author_by_name(&incoming.first_name, &incoming.last_name)
            .await?
        {
            Some(existing) => found.push(AuthorDto::from(existing)),
            None => missing.push(incoming.clone()),
        }
    }

    tracing::debug!(found = found.len(), missing = missing.len(), "reconciled authors");
    if let Some(rebuilt) = found_first(found, missing) {
        candidate.authors = rebuilt;
    }

    Ok(candidate)
}

/// Same policy as [`reconcile_authors`], keyed by tag name.
pub async fn reconcile_tags(
    mut candidate: BookDto,
    tags: &dyn TagsRepository,
) -> StoreResult<BookDto> {
    if candidate.tags.is_empty() {
        return Ok(candidate);
    }

    let mut found = Vec::new();
    let mut missing = Vec::new();
    for incoming in &candidate.tags {
        match tags.find_tag_by_name(&incoming.name).await? {
            Some(existing) => found.push(TagDto::from(existing)),
            None => missing.push(incoming.clone()),
        }
    }

    tracing::debug!(found = found.len(), missing = missing.len(), "reconciled tags");
    if let Some(rebuilt) = found_first(found, missing) {
        candidate.tags = rebuilt;
    }

    Ok(candidate)
}

/// `None` when nothing matched, so the caller keeps the original list.
fn found_first<T>(mut found: Vec<T>, missing: Vec<T>) -> Option<Vec<T>> {
    if found.is_empty() {
        return None;
    }
    found.extend(missing);
    Some(found)
}
