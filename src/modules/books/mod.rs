pub mod dto;
pub mod error;
pub mod mapping;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod reconcile;
pub mod repository;
pub mod routes;
pub mod service;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use libris_kernel::settings::CatalogSettings;
use libris_kernel::{InitCtx, Migration, Module};
use serde_json::json;

use routes::BooksState;
use service::BooksService;

/// Catalog schema. Natural keys are unique so a lost reconciliation race
/// fails instead of storing a second row. Publishers with an empty name are
/// never reconciled and stay out of the name index.
const CATALOG_SCHEMA: &str = r#"
CREATE TABLE publishers (
    id   UUID PRIMARY KEY,
    name TEXT NOT NULL
);

CREATE UNIQUE INDEX publishers_name_key ON publishers (name) WHERE name <> '';

CREATE TABLE authors (
    id         UUID PRIMARY KEY,
    first_name TEXT NOT NULL,
    last_name  TEXT NOT NULL,
    UNIQUE (first_name, last_name)
);

CREATE TABLE tags (
    id   UUID PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE books (
    id               UUID PRIMARY KEY,
    title            TEXT NOT NULL CHECK (btrim(title) <> ''),
    subtitle         TEXT,
    isbn             TEXT,
    publication_year INTEGER,
    publisher_id     UUID REFERENCES publishers (id)
);

CREATE INDEX books_title_id_idx ON books (title, id);

CREATE TABLE locations (
    id      UUID PRIMARY KEY,
    kind    TEXT NOT NULL CHECK (kind IN ('shelf', 'room', 'building')),
    value   TEXT NOT NULL,
    book_id UUID NOT NULL UNIQUE REFERENCES books (id) ON DELETE CASCADE
);

CREATE TABLE book_authors (
    book_id   UUID NOT NULL REFERENCES books (id) ON DELETE CASCADE,
    author_id UUID NOT NULL REFERENCES authors (id),
    position  INTEGER NOT NULL,
    PRIMARY KEY (book_id, author_id)
);

CREATE TABLE book_tags (
    book_id  UUID NOT NULL REFERENCES books (id) ON DELETE CASCADE,
    tag_id   UUID NOT NULL REFERENCES tags (id),
    position INTEGER NOT NULL,
    PRIMARY KEY (book_id, tag_id)
);
"#;

/// Migrations owned by the books module, in application order.
pub fn migrations() -> Vec<Migration> {
    vec![Migration {
        id: "001_catalog",
        up: CATALOG_SCHEMA,
    }]
}

/// The catalog feature module: service, HTTP routes, schema.
pub struct BooksModule {
    service: Arc<BooksService>,
    catalog: CatalogSettings,
}

impl BooksModule {
    pub fn new(service: Arc<BooksService>, catalog: CatalogSettings) -> Self {
        Self { service, catalog }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            backend = ?ctx.settings.database.backend,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(BooksState {
            service: self.service.clone(),
            catalog: self.catalog.clone(),
        })
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(openapi_fragment())
    }

    fn migrations(&self) -> Vec<Migration> {
        migrations()
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

fn error_response(description: &str) -> serde_json::Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/ErrorResponse" }
            }
        }
    })
}

fn book_response(description: &str) -> serde_json::Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/Book" }
            }
        }
    })
}

fn openapi_fragment() -> serde_json::Value {
    let id_param = json!({
        "name": "id",
        "in": "path",
        "required": true,
        "schema": { "type": "string", "format": "uuid" }
    });

    json!({
        "paths": {
            "/": {
                "get": {
                    "summary": "List books",
                    "tags": ["Books"],
                    "parameters": [
                        {
                            "name": "resultsPerPage",
                            "in": "query",
                            "schema": { "type": "integer", "minimum": 1 }
                        },
                        {
                            "name": "offset",
                            "in": "query",
                            "schema": { "type": "integer", "minimum": 0 }
                        },
                        {
                            "name": "orderBy",
                            "in": "query",
                            "schema": { "type": "string", "enum": ["asc", "desc"] }
                        }
                    ],
                    "responses": {
                        "200": {
                            "description": "One page of books ordered by title",
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "type": "array",
                                        "items": { "$ref": "#/components/schemas/Book" }
                                    }
                                }
                            }
                        },
                        "422": error_response("Invalid page size"),
                        "500": error_response("Internal server error")
                    }
                },
                "post": {
                    "summary": "Add a book, reusing known publishers, authors and tags",
                    "tags": ["Books"],
                    "requestBody": {
                        "required": true,
                        "content": {
                            "application/json": {
                                "schema": { "$ref": "#/components/schemas/Book" }
                            }
                        }
                    },
                    "responses": {
                        "201": book_response("Stored book"),
                        "400": error_response("Unknown publisher, author or tag id"),
                        "409": error_response(
                            "Concurrent insert of the same publisher, author or tag"
                        ),
                        "422": error_response("Missing title"),
                        "500": error_response("Internal server error")
                    }
                }
            },
            "/{id}": {
                "get": {
                    "summary": "Get a book",
                    "tags": ["Books"],
                    "parameters": [id_param.clone()],
                    "responses": {
                        "200": book_response("The book"),
                        "404": error_response("No book with this id"),
                        "500": error_response("Internal server error")
                    }
                },
                "delete": {
                    "summary": "Remove a book",
                    "tags": ["Books"],
                    "parameters": [id_param],
                    "responses": {
                        "204": { "description": "Removed, or never existed" },
                        "500": error_response("Internal server error")
                    }
                }
            },
            "/count": {
                "get": {
                    "summary": "Count books",
                    "tags": ["Books"],
                    "responses": {
                        "200": {
                            "description": "Number of stored books",
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "type": "object",
                                        "properties": { "count": { "type": "integer" } },
                                        "required": ["count"]
                                    }
                                }
                            }
                        },
                        "500": error_response("Internal server error")
                    }
                }
            },
            "/health": {
                "get": {
                    "summary": "Books health check",
                    "tags": ["Books"],
                    "responses": {
                        "200": {
                            "description": "OK",
                            "content": { "text/plain": { "schema": { "type": "string" } } }
                        }
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "Book": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "string", "format": "uuid", "readOnly": true },
                        "title": { "type": "string" },
                        "subtitle": { "type": "string", "nullable": true },
                        "isbn": { "type": "string", "nullable": true },
                        "publicationYear": { "type": "integer", "nullable": true },
                        "publisher": { "$ref": "#/components/schemas/Publisher" },
                        "location": { "$ref": "#/components/schemas/Location" },
                        "authors": {
                            "type": "array",
                            "items": { "$ref": "#/components/schemas/Author" }
                        },
                        "tags": { "type": "array", "items": { "$ref": "#/components/schemas/Tag" } }
                    },
                    "required": ["title"]
                },
                "Author": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "string", "format": "uuid" },
                        "firstName": { "type": "string" },
                        "lastName": { "type": "string" }
                    },
                    "required": ["firstName", "lastName"]
                },
                "Publisher": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "string", "format": "uuid" },
                        "name": { "type": "string" }
                    },
                    "required": ["name"]
                },
                "Tag": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "string", "format": "uuid" },
                        "name": { "type": "string" }
                    },
                    "required": ["name"]
                },
                "Location": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "string", "format": "uuid", "readOnly": true },
                        "type": { "type": "string", "enum": ["shelf", "room", "building"] },
                        "value": { "type": "string" }
                    },
                    "required": ["type", "value"]
                }
            }
        }
    })
}

/// Create the books module over an already chosen service.
pub fn create_module(service: Arc<BooksService>, catalog: CatalogSettings) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(service, catalog))
}
