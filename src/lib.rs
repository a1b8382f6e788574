//! Shelf application library
//!
//! A book catalogue whose lookups can be expressed as criteria
//! specifications, fluent typed queries, or JPQL-like templates.

pub mod app;
pub mod modules;

pub use app::App;
pub use modules::books::models::Book;
pub use modules::books::query::FindBookQuery;
pub use modules::books::repository::{self, BookRepository};
