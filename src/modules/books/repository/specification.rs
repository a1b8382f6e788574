//! Criteria-style specifications: a predicate is a closure over the query
//! root and a criteria builder, composable before it is executed.

use std::marker::PhantomData;
use std::sync::Arc;

use shelf_db::{Condition, Entity, EntityRepository, Page, Select, Store, Value};

use super::BookRepository;
use crate::modules::books::models::{columns, Book};
use crate::modules::books::query::{FindBookQuery, YearRange};

/// Attribute reference handed out by [`Root::get`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Path {
    column: &'static str,
}

/// Query root for entity `E`.
pub struct Root<E> {
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Root<E> {
    fn new() -> Self {
        Self {
            _entity: PhantomData,
        }
    }

    /// Path to a mapped column of `E`.
    pub fn get(&self, column: &'static str) -> Path {
        debug_assert!(
            column == E::mapping().identity || E::mapping().position(column).is_some(),
            "{} has no column {}",
            E::name(),
            column
        );
        Path { column }
    }
}

/// Factory for predicates.
#[derive(Debug, Default, Clone, Copy)]
pub struct CriteriaBuilder;

impl CriteriaBuilder {
    pub fn equal(&self, path: Path, value: impl Into<Value>) -> Condition {
        Condition::eq(path.column, value)
    }

    pub fn between(&self, path: Path, low: impl Into<Value>, high: impl Into<Value>) -> Condition {
        Condition::between(path.column, low, high)
    }

    /// Conjunction; with no predicates this is always true.
    pub fn and(&self, predicates: Vec<Condition>) -> Condition {
        Condition::and(predicates)
    }

    pub fn conjunction(&self) -> Condition {
        Condition::True
    }

    pub fn disjunction(&self) -> Condition {
        Condition::False
    }
}

type PredicateFn<E> = dyn Fn(&Root<E>, &CriteriaBuilder) -> Condition + Send + Sync;

/// A reusable, composable predicate over `E`.
pub struct Specification<E> {
    to_predicate: Arc<PredicateFn<E>>,
}

impl<E> Clone for Specification<E> {
    fn clone(&self) -> Self {
        Self {
            to_predicate: self.to_predicate.clone(),
        }
    }
}

impl<E: Entity + 'static> Specification<E> {
    pub fn new(
        to_predicate: impl Fn(&Root<E>, &CriteriaBuilder) -> Condition + Send + Sync + 'static,
    ) -> Self {
        Self {
            to_predicate: Arc::new(to_predicate),
        }
    }

    /// Matches everything.
    pub fn unrestricted() -> Self {
        Self::new(|_, cb| cb.conjunction())
    }

    pub fn and(self, other: Specification<E>) -> Self {
        Self::new(move |root, cb| {
            cb.and(vec![
                self.to_predicate(root, cb),
                other.to_predicate(root, cb),
            ])
        })
    }

    pub fn to_predicate(&self, root: &Root<E>, cb: &CriteriaBuilder) -> Condition {
        (self.to_predicate)(root, cb)
    }

    /// Resolve against a fresh root.
    pub fn condition(&self) -> Condition {
        self.to_predicate(&Root::new(), &CriteriaBuilder)
    }
}

impl FindBookQuery {
    /// Translate the filters into a specification; the year filter becomes
    /// an inclusive BETWEEN over the publication date.
    pub fn to_specification(&self) -> Specification<Book> {
        let query = self.clone();
        Specification::new(move |root, cb| {
            let mut predicates = Vec::new();
            if let Some(title) = &query.title {
                predicates.push(cb.equal(root.get(columns::TITLE), title.as_str()));
            }
            if let Some(author) = &query.author {
                predicates.push(cb.equal(root.get(columns::AUTHOR), author.as_str()));
            }
            match query.published_range() {
                Some(YearRange::Dates(start, end)) => {
                    predicates.push(cb.between(root.get(columns::PUBLISHED_AT), start, end))
                }
                Some(YearRange::OutOfRange(_)) => predicates.push(cb.disjunction()),
                None => {}
            }
            cb.and(predicates)
        })
    }
}

/// Book access through specifications, the counterpart of a
/// specification-executing repository.
#[derive(Clone)]
pub struct SpecificationRepository {
    books: EntityRepository<Book>,
}

impl SpecificationRepository {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            books: EntityRepository::new(store),
        }
    }

    /// All books with exactly this title, unpaginated.
    pub fn find_by_title(&self, title: &str) -> shelf_db::Result<Vec<Book>> {
        let title = title.to_string();
        self.find_all_by(&Specification::new(move |root, cb| {
            cb.equal(root.get(columns::TITLE), title.as_str())
        }))
    }

    pub fn find_all_by(&self, spec: &Specification<Book>) -> shelf_db::Result<Vec<Book>> {
        self.books.find(&Select::all().filter(spec.condition()))
    }

    pub fn find_page_by(
        &self,
        spec: &Specification<Book>,
        page: Page,
    ) -> shelf_db::Result<Vec<Book>> {
        self.books.find(&Select::all().filter(spec.condition()).page(page))
    }
}

impl BookRepository for SpecificationRepository {
    fn style(&self) -> &'static str {
        "specification"
    }

    fn find(&self, query: &FindBookQuery, page: Option<Page>) -> shelf_db::Result<Vec<Book>> {
        let spec = query.to_specification();
        tracing::debug!(
            style = self.style(),
            predicate = %spec.condition(),
            ?page,
            "finding books"
        );
        match page {
            Some(page) => self.find_page_by(&spec, page),
            None => self.find_all_by(&spec),
        }
    }

    fn save(&self, book: Book) -> shelf_db::Result<Book> {
        self.books.save(book)
    }

    fn delete_all(&self) -> shelf_db::Result<()> {
        self.books.delete_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelf_db::SqliteStore;
    use time::macros::date;

    fn repository() -> SpecificationRepository {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        store.ensure_table(Book::mapping()).unwrap();
        SpecificationRepository::new(store)
    }

    #[test]
    fn empty_query_is_unrestricted() {
        assert!(FindBookQuery::new().to_specification().condition().is_true());
        assert!(Specification::<Book>::unrestricted().condition().is_true());
    }

    #[test]
    fn query_uses_between_for_year() {
        let condition = FindBookQuery::new()
            .title("title1")
            .published_year(2024)
            .to_specification()
            .condition();
        assert_eq!(
            condition,
            Condition::and([
                Condition::eq(columns::TITLE, "title1"),
                Condition::between(
                    columns::PUBLISHED_AT,
                    date!(2024 - 01 - 01),
                    date!(2024 - 12 - 31)
                ),
            ])
        );
    }

    #[test]
    fn unrepresentable_year_matches_nothing() {
        let condition = FindBookQuery::new()
            .published_year(-50_000)
            .to_specification()
            .condition();
        assert_eq!(condition, Condition::False);
    }

    #[test]
    fn specifications_compose() {
        let by_title = FindBookQuery::new().title("title1").to_specification();
        let by_author = FindBookQuery::new().author("author1").to_specification();
        assert_eq!(
            by_title.and(by_author).condition(),
            FindBookQuery::new()
                .title("title1")
                .author("author1")
                .to_specification()
                .condition()
        );
    }

    #[test]
    fn find_by_title() {
        // given
        let repository = repository();
        repository.save(Book::new("title1", "author1", date!(2024 - 01 - 01))).unwrap();
        repository.save(Book::new("title2", "author2", date!(2024 - 01 - 01))).unwrap();
        repository.save(Book::new("title3", "author3", date!(2024 - 01 - 01))).unwrap();

        // when
        let books = repository.find_by_title("title1").unwrap();

        // then
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].author, "author1");
        assert!(repository.find_by_title("title").unwrap().is_empty());
    }

    #[test]
    fn find_by_title_with_specification() {
        let repository = repository();
        repository.save(Book::new("title1", "author1", date!(2024 - 01 - 01))).unwrap();
        repository.save(Book::new("title2", "author2", date!(2024 - 01 - 01))).unwrap();

        let books = repository
            .find_all_by(&FindBookQuery::new().title("title1").to_specification())
            .unwrap();

        assert_eq!(books.len(), 1);
        assert_eq!(books[0].author, "author1");
    }
}
