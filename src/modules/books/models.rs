//! Storage-side catalog entities.
//!
//! An `id` of `None` marks a row the store has not assigned an identity to
//! yet. Everything returned by a store carries `Some`.

use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

pub type BookId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Book {
    pub id: Option<BookId>,
    pub title: String,
    pub subtitle: Option<String>,
    pub isbn: Option<String>,
    pub publication_year: Option<i32>,
    pub publisher: Option<Publisher>,
    pub location: Option<Location>,
    pub authors: Vec<Author>,
    pub tags: Vec<Tag>,
}

/// Natural key: `(first_name, last_name)`, exact match.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Author {
    pub id: Option<Uuid>,
    pub first_name: String,
    pub last_name: String,
}

/// Natural key: `name`, exact match.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Publisher {
    pub id: Option<Uuid>,
    pub name: String,
}

/// Natural key: `name`, exact match.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Tag {
    pub id: Option<Uuid>,
    pub name: String,
}

/// Physical placement of a book. Created and removed with its book, never
/// shared or reconciled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub id: Option<Uuid>,
    pub kind: LocationType,
    pub value: String,
    pub book_id: Option<BookId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationType {
    Shelf,
    Room,
    Building,
}

impl LocationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationType::Shelf => "shelf",
            LocationType::Room => "room",
            LocationType::Building => "building",
        }
    }
}

impl fmt::Display for LocationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LocationType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "shelf" => Ok(LocationType::Shelf),
            "room" => Ok(LocationType::Room),
            "building" => Ok(LocationType::Building),
            other => Err(format!("unknown location type '{other}'")),
        }
    }
}

/// Listing direction over the store's ordering key (title, then id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderBy {
    #[default]
    #[serde(alias = "ascending")]
    Asc,
    #[serde(alias = "descending")]
    Desc,
}

/// One page of a book listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub results_per_page: u32,
    pub offset: u32,
    pub order_by: OrderBy,
}

impl PageRequest {
    pub fn new(results_per_page: u32, offset: u32, order_by: OrderBy) -> Self {
        Self {
            results_per_page,
            offset,
            order_by,
        }
    }
}
