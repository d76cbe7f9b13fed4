//! HTTP handlers for the books module, mounted under `/api/books`.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use libris_http::error::AppError;
use libris_kernel::settings::CatalogSettings;
use serde::{Deserialize, Serialize};

use super::dto::BookDto;
use super::models::{BookId, OrderBy, PageRequest};
use super::service::BooksService;

#[derive(Clone)]
pub struct BooksState {
    pub service: Arc<BooksService>,
    pub catalog: CatalogSettings,
}

/// Query string of `GET /api/books`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub results_per_page: Option<u32>,
    pub offset: Option<u32>,
    pub order_by: Option<OrderBy>,
}

impl ListQuery {
    /// Fill defaults and cap the page size at the configured maximum.
    pub fn into_page(self, catalog: &CatalogSettings) -> PageRequest {
        let results_per_page = self
            .results_per_page
            .unwrap_or(catalog.default_results_per_page)
            .min(catalog.max_results_per_page);
        PageRequest::new(
            results_per_page,
            self.offset.unwrap_or(0),
            self.order_by.unwrap_or_default(),
        )
    }
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: i64,
}

pub fn router(state: BooksState) -> Router {
    Router::new()
        .route("/", get(list_books).post(add_book))
        .route("/count", get(count_books))
        .route("/health", get(health_check))
        .route("/{id}", get(get_book).delete(remove_book))
        .with_state(state)
}

async fn add_book(
    State(state): State<BooksState>,
    Json(candidate): Json<BookDto>,
) -> Result<(StatusCode, Json<BookDto>), AppError> {
    let created = state.service.add_book(candidate).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_book(
    State(state): State<BooksState>,
    Path(id): Path<BookId>,
) -> Result<Json<BookDto>, AppError> {
    state
        .service
        .get_book(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("book {id} does not exist")))
}

async fn remove_book(
    State(state): State<BooksState>,
    Path(id): Path<BookId>,
) -> Result<StatusCode, AppError> {
    state.service.remove_book(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn count_books(State(state): State<BooksState>) -> Result<Json<CountResponse>, AppError> {
    let count = state.service.count_books().await?;
    Ok(Json(CountResponse { count }))
}

async fn list_books(
    State(state): State<BooksState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<BookDto>>, AppError> {
    let page = query.into_page(&state.catalog);
    let books = state.service.list_books(page).await?;
    Ok(Json(books))
}

async fn health_check() -> &'static str {
    "books module is healthy"
}
