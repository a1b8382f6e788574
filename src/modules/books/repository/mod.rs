//! Book lookups in three query styles behind one trait.

use std::sync::Arc;

use shelf_db::{Page, Store};
use shelf_kernel::settings::QueryStyle;

use super::models::Book;
use super::query::FindBookQuery;

pub mod fluent;
pub mod specification;
pub mod template;

pub use fluent::FluentRepository;
pub use specification::SpecificationRepository;
pub use template::TemplateRepository;

/// Filtered, paginated access to books.
///
/// Implementations are blocking; store errors are returned unchanged.
pub trait BookRepository: Send + Sync {
    /// Short name of the query style, used in logs.
    fn style(&self) -> &'static str;

    /// Books matching every present filter of `query` in identity order,
    /// restricted to `page` when one is given.
    fn find(&self, query: &FindBookQuery, page: Option<Page>) -> shelf_db::Result<Vec<Book>>;

    /// Every matching book; the paging fields of `query` are ignored.
    fn find_all(&self, query: &FindBookQuery) -> shelf_db::Result<Vec<Book>> {
        self.find(query, None)
    }

    /// The page of matching books selected by `query.to_page()`.
    fn find_page(&self, query: &FindBookQuery) -> shelf_db::Result<Vec<Book>> {
        self.find(query, Some(query.to_page()))
    }

    fn save(&self, book: Book) -> shelf_db::Result<Book>;

    fn delete_all(&self) -> shelf_db::Result<()>;
}

/// Repository for the configured query style.
pub fn repository(style: QueryStyle, store: Arc<dyn Store>) -> Arc<dyn BookRepository> {
    match style {
        QueryStyle::Specification => Arc::new(SpecificationRepository::new(store)),
        QueryStyle::Fluent => Arc::new(FluentRepository::new(store)),
        QueryStyle::Template => Arc::new(TemplateRepository::new(store)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelf_db::{Entity, MemoryStore, SqliteStore};
    use time::macros::date;
    use time::Date;

    const STYLES: [QueryStyle; 3] = [
        QueryStyle::Specification,
        QueryStyle::Fluent,
        QueryStyle::Template,
    ];

    fn stores() -> Vec<Arc<dyn Store>> {
        let stores: Vec<Arc<dyn Store>> = vec![
            Arc::new(SqliteStore::open_in_memory().unwrap()),
            Arc::new(MemoryStore::new()),
        ];
        for store in &stores {
            store.ensure_table(Book::mapping()).unwrap();
        }
        stores
    }

    /// Every style over every store, each on a fresh table.
    fn each_repository(mut test: impl FnMut(&dyn BookRepository, &str)) {
        for style in STYLES {
            for store in stores() {
                let label = format!("{}/{}", style, store.backend());
                test(repository(style, store).as_ref(), &label);
            }
        }
    }

    fn seed(repository: &dyn BookRepository) {
        for (title, author, published_at) in [
            ("title1", "author1", date!(2023 - 01 - 01)),
            ("title1", "author1", date!(2024 - 01 - 01)),
            ("title1", "author2", date!(2024 - 01 - 01)),
            ("title2", "author2", date!(2024 - 01 - 01)),
            ("title3", "author3", date!(2024 - 01 - 01)),
        ] {
            repository
                .save(Book::new(title, author, published_at))
                .unwrap();
        }
    }

    #[test]
    fn find_by_title_and_author() {
        each_repository(|repository, label| {
            // given
            seed(repository);
            let query = FindBookQuery::new().title("title1").author("author1");

            // when
            let books = repository.find_all(&query).unwrap();

            // then
            assert_eq!(books.len(), 2, "{label}");
            for book in &books {
                assert_eq!(book.title, "title1", "{label}");
                assert_eq!(book.author, "author1", "{label}");
            }
        });
    }

    #[test]
    fn find_by_title_and_author_and_published_year() {
        each_repository(|repository, label| {
            // given
            seed(repository);
            let query = FindBookQuery::new()
                .title("title1")
                .author("author1")
                .published_year(2024);

            // when
            let books = repository.find_all(&query).unwrap();

            // then
            assert_eq!(books.len(), 1, "{label}");
            assert_eq!(books[0].published_at.year(), 2024, "{label}");
        });
    }

    #[test]
    fn filters_are_independent() {
        let queries = (0..8u8).map(|mask| {
            let mut query = FindBookQuery::new();
            if mask & 1 != 0 {
                query = query.title("title1");
            }
            if mask & 2 != 0 {
                query = query.author("author2");
            }
            if mask & 4 != 0 {
                query = query.published_year(2024);
            }
            query
        });
        for query in queries {
            each_repository(|repository, label| {
                seed(repository);
                let books = repository.find_all(&query).unwrap();
                let expected: Vec<Book> = repository
                    .find_all(&FindBookQuery::new())
                    .unwrap()
                    .into_iter()
                    .filter(|book| query.title.as_ref().map_or(true, |t| &book.title == t))
                    .filter(|book| query.author.as_ref().map_or(true, |a| &book.author == a))
                    .filter(|book| {
                        query
                            .published_year
                            .map_or(true, |y| book.published_at.year() == y)
                    })
                    .collect();
                assert_eq!(books, expected, "{label} {query:?}");
            });
        }
    }

    #[test]
    fn styles_agree_on_every_query() {
        let queries = [
            FindBookQuery::new(),
            FindBookQuery::new().title("title1"),
            FindBookQuery::new().author("author2").published_year(2024),
            FindBookQuery::new().published_year(2023),
            FindBookQuery::new().title("missing"),
        ];
        for query in &queries {
            let mut results: Vec<(String, Vec<(String, String, Date)>)> = Vec::new();
            each_repository(|repository, label| {
                seed(repository);
                let books = repository.find_all(query).unwrap();
                let rows = books
                    .into_iter()
                    .map(|book| (book.title, book.author, book.published_at))
                    .collect();
                results.push((label.to_string(), rows));
            });
            let (first_label, first) = &results[0];
            for (label, rows) in &results[1..] {
                assert_eq!(rows, first, "{label} disagrees with {first_label} on {query:?}");
            }
        }
    }

    #[test]
    fn year_boundaries_are_inclusive() {
        each_repository(|repository, label| {
            for published_at in [
                date!(2023 - 12 - 31),
                date!(2024 - 01 - 01),
                date!(2024 - 06 - 15),
                date!(2024 - 12 - 31),
                date!(2025 - 01 - 01),
            ] {
                repository
                    .save(Book::new("t", "a", published_at))
                    .unwrap();
            }

            let books = repository
                .find_all(&FindBookQuery::new().published_year(2024))
                .unwrap();

            let dates: Vec<Date> = books.iter().map(|book| book.published_at).collect();
            assert_eq!(
                dates,
                vec![date!(2024 - 01 - 01), date!(2024 - 06 - 15), date!(2024 - 12 - 31)],
                "{label}"
            );
        });
    }

    #[test]
    fn empty_filter_returns_everything() {
        each_repository(|repository, label| {
            seed(repository);
            assert_eq!(repository.find_all(&FindBookQuery::new()).unwrap().len(), 5, "{label}");
        });
    }

    #[test]
    fn find_all_is_not_limited_to_the_default_page() {
        each_repository(|repository, label| {
            for i in 0..25 {
                repository
                    .save(Book::new(format!("title{i}"), "author1", date!(2024 - 01 - 01)))
                    .unwrap();
            }

            let everything = repository.find_all(&FindBookQuery::new()).unwrap();
            let by_author = repository
                .find_all(&FindBookQuery::new().author("author1"))
                .unwrap();
            let first_page = repository.find_page(&FindBookQuery::new()).unwrap();

            assert_eq!(everything.len(), 25, "{label}");
            assert_eq!(by_author.len(), 25, "{label}");
            assert_eq!(first_page.len(), 20, "{label}");
        });
    }

    #[test]
    fn find_all_ignores_paging_fields() {
        each_repository(|repository, label| {
            seed(repository);
            let books = repository
                .find_all(&FindBookQuery::new().page(1, 2))
                .unwrap();
            assert_eq!(books.len(), 5, "{label}");
        });
    }

    #[test]
    fn saved_books_get_distinct_identities() {
        each_repository(|repository, label| {
            let first = repository
                .save(Book::new("same", "same", date!(2024 - 01 - 01)))
                .unwrap();
            let second = repository
                .save(Book::new("same", "same", date!(2024 - 01 - 01)))
                .unwrap();
            assert!(first.id().is_some() && second.id().is_some(), "{label}");
            assert_ne!(first.id(), second.id(), "{label}");
        });
    }

    #[test]
    fn saving_a_persisted_book_updates_it() {
        each_repository(|repository, label| {
            let mut book = repository
                .save(Book::new("draft", "author1", date!(2024 - 01 - 01)))
                .unwrap();
            book.title = "final".to_string();
            let updated = repository.save(book.clone()).unwrap();

            assert_eq!(updated, book, "{label}");
            let books = repository.find_all(&FindBookQuery::new()).unwrap();
            assert_eq!(books, vec![book], "{label}");
        });
    }

    #[test]
    fn delete_all_is_idempotent() {
        each_repository(|repository, label| {
            seed(repository);
            repository.delete_all().unwrap();
            assert!(repository.find_all(&FindBookQuery::new()).unwrap().is_empty(), "{label}");
            repository.delete_all().unwrap();
            assert!(repository.find_all(&FindBookQuery::new()).unwrap().is_empty(), "{label}");
        });
    }

    #[test]
    fn pagination_passes_through() {
        each_repository(|repository, label| {
            seed(repository);

            let books = repository
                .find_page(&FindBookQuery::new().page(1, 2))
                .unwrap();
            let titles: Vec<(&str, &str)> = books
                .iter()
                .map(|book| (book.title.as_str(), book.author.as_str()))
                .collect();
            assert_eq!(titles, vec![("title1", "author2"), ("title2", "author2")], "{label}");

            let past_the_end = repository
                .find_page(&FindBookQuery::new().page(9, 2))
                .unwrap();
            assert!(past_the_end.is_empty(), "{label}");
            let zero_sized = repository
                .find_page(&FindBookQuery::new().page(0, 0))
                .unwrap();
            assert!(zero_sized.is_empty(), "{label}");
        });
    }

    #[test]
    fn unrepresentable_year_matches_nothing() {
        each_repository(|repository, label| {
            seed(repository);
            let books = repository
                .find_all(&FindBookQuery::new().published_year(i32::MAX))
                .unwrap();
            assert!(books.is_empty(), "{label}");
        });
    }
}
