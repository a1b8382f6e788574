pub mod models;
pub mod query;
pub mod repository;

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::json;
use shelf_db::TableMapping;
use shelf_http::error::AppError;
use shelf_kernel::{InitCtx, Module};
use utoipa::OpenApi;

use models::{Book, NewBook, BOOK_TABLE};
use query::FindBookQuery;
use repository::BookRepository;

/// Books module: the `book` table and its HTTP surface.
pub struct BooksModule {
    books: Arc<dyn BookRepository>,
}

impl BooksModule {
    pub fn new(books: Arc<dyn BookRepository>) -> Self {
        Self { books }
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
            backend = ctx.store.backend(),
            query_style = self.books.style(),
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/", get(list_books).post(create_book).delete(delete_books))
            .with_state(self.books.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        match serde_json::to_value(BooksApi::openapi()) {
            Ok(spec) => Some(spec),
            Err(err) => {
                tracing::warn!(
                    module = self.name(),
                    error = %err,
                    "failed to render OpenAPI fragment"
                );
                None
            }
        }
    }

    fn tables(&self) -> Vec<TableMapping> {
        vec![BOOK_TABLE.clone()]
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(list_books, create_book, delete_books),
    components(schemas(Book, NewBook)),
    tags((name = "Books", description = "Book catalogue"))
)]
struct BooksApi;

/// Run a blocking repository call off the async runtime.
async fn blocking<T, F>(call: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: FnOnce() -> shelf_db::Result<T> + Send + 'static,
{
    let result = tokio::task::spawn_blocking(call)
        .await
        .context("repository task panicked")?;
    Ok(result.context("store request failed")?)
}

/// Find books by optional title, author and publication year
#[utoipa::path(
    get,
    path = "/",
    tag = "Books",
    params(FindBookQuery),
    responses(
        (status = 200, description = "One page of matching books", body = [Book]),
        (status = 400, description = "Malformed query string"),
        (status = 500, description = "Store failure")
    )
)]
async fn list_books(
    State(books): State<Arc<dyn BookRepository>>,
    query: Result<Query<FindBookQuery>, QueryRejection>,
) -> Result<Json<Vec<Book>>, AppError> {
    let Query(query) = query.map_err(|rejection| {
        AppError::bad_request(
            vec![json!({ "query": rejection.body_text() })],
            "invalid book query",
        )
    })?;
    let found = blocking(move || books.find_page(&query)).await?;
    Ok(Json(found))
}

/// Catalogue a new book
#[utoipa::path(
    post,
    path = "/",
    tag = "Books",
    request_body = NewBook,
    responses(
        (status = 201, description = "Book saved with its assigned identity", body = Book),
        (status = 400, description = "Malformed body"),
        (status = 500, description = "Store failure")
    )
)]
async fn create_book(
    State(books): State<Arc<dyn BookRepository>>,
    body: Result<Json<NewBook>, JsonRejection>,
) -> Result<(StatusCode, Json<Book>), AppError> {
    let Json(new_book) = body.map_err(|rejection| {
        AppError::bad_request(
            vec![json!({ "body": rejection.body_text() })],
            "invalid book",
        )
    })?;
    let saved = blocking(move || books.save(Book::from(new_book))).await?;
    tracing::info!(id = ?saved.id(), title = %saved.title, "book saved");
    Ok((StatusCode::CREATED, Json(saved)))
}

/// Remove every book
#[utoipa::path(
    delete,
    path = "/",
    tag = "Books",
    responses(
        (status = 204, description = "All books removed"),
        (status = 500, description = "Store failure")
    )
)]
async fn delete_books(
    State(books): State<Arc<dyn BookRepository>>,
) -> Result<StatusCode, AppError> {
    blocking(move || books.delete_all()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Create the books module over `books`.
pub fn create_module(books: Arc<dyn BookRepository>) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(books))
}
