//! Templated JPQL-like DSL.
//!
//! Queries are written as `select(entity).from(entity).where_and([...])`
//! inside a [`jpql`] block, can be rendered back to query text, and are
//! executed by lowering to the store's condition tree.

use std::fmt::Write as _;
use std::marker::PhantomData;
use std::sync::Arc;

use shelf_db::{Condition, Entity, EntityRepository, Page, Select, Store, Value};
use time::Date;

use super::BookRepository;
use crate::modules::books::models::{columns, Book};
use crate::modules::books::query::{FindBookQuery, YearRange};

/// Typed reference to an attribute of `E` holding values of type `V`.
pub struct Property<E, V> {
    attribute: &'static str,
    column: &'static str,
    _types: PhantomData<fn() -> (E, V)>,
}

impl<E, V> Property<E, V> {
    pub const fn new(attribute: &'static str, column: &'static str) -> Self {
        Self {
            attribute,
            column,
            _types: PhantomData,
        }
    }
}

impl<E, V> Clone for Property<E, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E, V> Copy for Property<E, V> {}

impl Book {
    pub const TITLE: Property<Book, String> = Property::new("title", columns::TITLE);
    pub const AUTHOR: Property<Book, String> = Property::new("author", columns::AUTHOR);
    pub const PUBLISHED_AT: Property<Book, Date> =
        Property::new("publishedAt", columns::PUBLISHED_AT);
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Comparison {
    Eq(Value),
    Between(Value, Value),
}

/// A single comparison on an entity attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    attribute: &'static str,
    column: &'static str,
    comparison: Comparison,
}

impl Predicate {
    fn to_condition(&self) -> Condition {
        match &self.comparison {
            Comparison::Eq(value) => Condition::eq(self.column, value.clone()),
            Comparison::Between(low, high) => {
                Condition::between(self.column, low.clone(), high.clone())
            }
        }
    }
}

/// Path expression produced by [`Jpql::path`].
pub struct PathExpression<E, V> {
    property: Property<E, V>,
}

impl<E, V: Into<Value>> PathExpression<E, V> {
    fn predicate(&self, comparison: Comparison) -> Predicate {
        Predicate {
            attribute: self.property.attribute,
            column: self.property.column,
            comparison,
        }
    }

    pub fn eq(&self, value: impl Into<V>) -> Predicate {
        let value: V = value.into();
        self.predicate(Comparison::Eq(value.into()))
    }

    /// Inclusive range.
    pub fn between(&self, low: impl Into<V>, high: impl Into<V>) -> Predicate {
        let (low, high): (V, V) = (low.into(), high.into());
        self.predicate(Comparison::Between(low.into(), high.into()))
    }
}

/// Entity reference used in `select` and `from`.
pub struct EntityRef<E> {
    _entity: PhantomData<fn() -> E>,
}

/// DSL context handed to a [`jpql`] block.
#[derive(Debug, Default, Clone, Copy)]
pub struct Jpql;

impl Jpql {
    pub fn entity<E: Entity>(&self) -> EntityRef<E> {
        EntityRef {
            _entity: PhantomData,
        }
    }

    pub fn path<E, V>(&self, property: Property<E, V>) -> PathExpression<E, V> {
        PathExpression { property }
    }

    pub fn select<E: Entity>(&self, _projection: EntityRef<E>) -> SelectStep<E> {
        SelectStep {
            _entity: PhantomData,
        }
    }
}

pub struct SelectStep<E> {
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> SelectStep<E> {
    pub fn from(self, _from: EntityRef<E>) -> SelectQuery<E> {
        SelectQuery {
            predicates: Vec::new(),
            page: None,
            _entity: PhantomData,
        }
    }
}

/// A complete select over `E`.
pub struct SelectQuery<E> {
    predicates: Vec<Predicate>,
    page: Option<Page>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> SelectQuery<E> {
    /// AND the present predicates; `None` entries are dropped.
    pub fn where_and(mut self, predicates: impl IntoIterator<Item = Option<Predicate>>) -> Self {
        self.predicates.extend(predicates.into_iter().flatten());
        self
    }

    pub fn page(mut self, page: Page) -> Self {
        self.page = Some(page);
        self
    }

    pub fn condition(&self) -> Condition {
        Condition::and(self.predicates.iter().map(Predicate::to_condition))
    }

    pub fn to_select(&self) -> Select {
        Select {
            condition: self.condition(),
            page: self.page,
        }
    }

    /// Query text with named parameters, plus the values bound to them.
    pub fn render(&self) -> (String, Vec<Value>) {
        let alias = E::name().to_lowercase();
        let mut text = format!("select {alias} from {} as {alias}", E::name());
        let mut params = Vec::new();
        for (i, predicate) in self.predicates.iter().enumerate() {
            text.push_str(if i == 0 { " where " } else { " and " });
            let _ = write!(text, "{alias}.{}", predicate.attribute);
            match &predicate.comparison {
                Comparison::Eq(value) => {
                    params.push(value.clone());
                    let _ = write!(text, " = :param{}", params.len());
                }
                Comparison::Between(low, high) => {
                    params.push(low.clone());
                    params.push(high.clone());
                    let _ = write!(
                        text,
                        " between :param{} and :param{}",
                        params.len() - 1,
                        params.len()
                    );
                }
            }
        }
        (text, params)
    }
}

/// Build a query inside a DSL block.
pub fn jpql<E: Entity>(init: impl FnOnce(&Jpql) -> SelectQuery<E>) -> SelectQuery<E> {
    init(&Jpql)
}

impl FindBookQuery {
    /// Unpaged. A year with no representable dates contributes no predicate
    /// here; [`TemplateRepository`] short-circuits that case.
    pub fn to_template(&self) -> SelectQuery<Book> {
        jpql(|dsl| {
            dsl.select(dsl.entity::<Book>())
                .from(dsl.entity::<Book>())
                .where_and([
                    self.author.as_deref().map(|author| dsl.path(Book::AUTHOR).eq(author)),
                    self.title.as_deref().map(|title| dsl.path(Book::TITLE).eq(title)),
                    self.published_range().and_then(|range| match range {
                        YearRange::Dates(start, end) => {
                            Some(dsl.path(Book::PUBLISHED_AT).between(start, end))
                        }
                        YearRange::OutOfRange(_) => None,
                    }),
                ])
        })
    }
}

#[derive(Clone)]
pub struct TemplateRepository {
    books: EntityRepository<Book>,
}

impl TemplateRepository {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            books: EntityRepository::new(store),
        }
    }

    /// Run an arbitrary DSL query.
    pub fn find_all_by(
        &self,
        init: impl FnOnce(&Jpql) -> SelectQuery<Book>,
    ) -> shelf_db::Result<Vec<Book>> {
        self.execute(&jpql(init))
    }

    fn execute(&self, query: &SelectQuery<Book>) -> shelf_db::Result<Vec<Book>> {
        let (text, params) = query.render();
        tracing::debug!(
            style = self.style(),
            query = %text,
            params = params.len(),
            page = ?query.page,
            "finding books"
        );
        self.books.find(&query.to_select())
    }
}

impl BookRepository for TemplateRepository {
    fn style(&self) -> &'static str {
        "template"
    }

    fn find(&self, query: &FindBookQuery, page: Option<Page>) -> shelf_db::Result<Vec<Book>> {
        if let Some(YearRange::OutOfRange(year)) = query.published_range() {
            tracing::debug!(style = self.style(), year, "year outside the date range");
            return Ok(Vec::new());
        }
        let mut template = query.to_template();
        if let Some(page) = page {
            template = template.page(page);
        }
        self.execute(&template)
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

    #[test]
    fn renders_query_text_with_named_params() {
        let query = FindBookQuery::new()
            .title("title1")
            .author("author1")
            .published_year(2024)
            .to_template();
        let (text, params) = query.render();
        assert_eq!(
            text,
            "select book from Book as book where book.author = :param1 \
             and book.title = :param2 and book.publishedAt between :param3 and :param4"
        );
        assert_eq!(
            params,
            vec![
                Value::from("author1"),
                Value::from("title1"),
                Value::from(date!(2024 - 01 - 01)),
                Value::from(date!(2024 - 12 - 31)),
            ]
        );
    }

    #[test]
    fn renders_without_where_when_unfiltered() {
        let (text, params) = FindBookQuery::new().to_template().render();
        assert_eq!(text, "select book from Book as book");
        assert!(params.is_empty());
        assert!(FindBookQuery::new().to_template().condition().is_true());
    }

    #[test]
    fn template_is_unpaged_until_asked() {
        let query = FindBookQuery::new().page(2, 5);
        assert_eq!(query.to_template().to_select().page, None);
        let paged = query.to_template().page(query.to_page()).to_select();
        assert_eq!(paged.page, Some(Page::new(2, 5)));
    }

    #[test]
    fn out_of_range_year_finds_nothing() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        store.ensure_table(Book::mapping()).unwrap();
        let repository = TemplateRepository::new(store);
        repository.save(Book::new("title1", "author1", date!(2024 - 01 - 01))).unwrap();

        let books = repository
            .find_all(&FindBookQuery::new().published_year(999_999))
            .unwrap();

        assert!(books.is_empty());
    }

    #[test]
    fn find_all_by_runs_custom_blocks() {
        // given
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        store.ensure_table(Book::mapping()).unwrap();
        let repository = TemplateRepository::new(store);
        repository.save(Book::new("title1", "author1", date!(2023 - 01 - 01))).unwrap();
        repository.save(Book::new("title1", "author1", date!(2024 - 01 - 01))).unwrap();
        repository.save(Book::new("title2", "author2", date!(2024 - 01 - 01))).unwrap();

        // when
        let books = repository
            .find_all_by(|dsl| {
                dsl.select(dsl.entity::<Book>())
                    .from(dsl.entity::<Book>())
                    .where_and([
                        Some(dsl.path(Book::TITLE).eq("title1")),
                        Some(dsl.path(Book::PUBLISHED_AT).between(
                            date!(2024 - 01 - 01),
                            date!(2024 - 12 - 31),
                        )),
                    ])
            })
            .unwrap();

        // then
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].published_at.year(), 2024);
    }
}
