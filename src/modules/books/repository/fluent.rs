//! Fluent typed query builder over generated-style paths.
//!
//! `QBook::book()` exposes one typed path per column. Comparisons on a path
//! yield a [`BooleanExpression`]; `where_` takes optional expressions and
//! skips the absent ones.

use std::marker::PhantomData;
use std::sync::Arc;

use shelf_db::{Condition, Entity, EntityRepository, Page, Select, Store};
use time::Date;

use super::BookRepository;
use crate::modules::books::models::{columns, Book};
use crate::modules::books::query::FindBookQuery;

/// A typed boolean expression, lowered to a [`Condition`] on fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BooleanExpression(Condition);

impl BooleanExpression {
    pub fn and(self, other: BooleanExpression) -> Self {
        BooleanExpression(Condition::and([self.0, other.0]))
    }

    pub fn into_condition(self) -> Condition {
        self.0
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StringPath(&'static str);

impl StringPath {
    pub fn eq(&self, value: impl Into<String>) -> BooleanExpression {
        BooleanExpression(Condition::eq(self.0, value.into()))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DatePath(&'static str);

impl DatePath {
    pub fn eq(&self, value: Date) -> BooleanExpression {
        BooleanExpression(Condition::eq(self.0, value))
    }

    pub fn between(&self, from: Date, to: Date) -> BooleanExpression {
        BooleanExpression(Condition::between(self.0, from, to))
    }

    /// Calendar year extracted from the date.
    pub fn year(&self) -> YearExpression {
        YearExpression(self.0)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct YearExpression(&'static str);

impl YearExpression {
    pub fn eq(&self, year: i32) -> BooleanExpression {
        BooleanExpression(Condition::year_eq(self.0, year))
    }
}

/// Query type for [`Book`].
#[derive(Debug, Clone, Copy)]
pub struct QBook {
    pub id: NumberPath,
    pub title: StringPath,
    pub author: StringPath,
    pub published_at: DatePath,
}

#[derive(Debug, Clone, Copy)]
pub struct NumberPath(&'static str);

impl NumberPath {
    pub fn eq(&self, value: i64) -> BooleanExpression {
        BooleanExpression(Condition::eq(self.0, value))
    }
}

impl QBook {
    pub const fn book() -> Self {
        Self {
            id: NumberPath(columns::ID),
            title: StringPath(columns::TITLE),
            author: StringPath(columns::AUTHOR),
            published_at: DatePath(columns::PUBLISHED_AT),
        }
    }
}

/// Typed query path for an entity.
pub trait EntityPath: Copy {
    type Entity: Entity;
}

impl EntityPath for QBook {
    type Entity = Book;
}

/// Entry point for fluent queries over a shared store.
#[derive(Clone)]
pub struct QueryFactory {
    store: Arc<dyn Store>,
}

impl QueryFactory {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub fn select_from<Q: EntityPath>(&self, _path: Q) -> FluentQuery<Q::Entity> {
        FluentQuery {
            store: self.store.clone(),
            select: Select::all(),
            _entity: PhantomData,
        }
    }
}

pub struct FluentQuery<E> {
    store: Arc<dyn Store>,
    select: Select,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> FluentQuery<E> {
    /// Restrict by the conjunction of every present expression.
    pub fn where_(
        mut self,
        expressions: impl IntoIterator<Item = Option<BooleanExpression>>,
    ) -> Self {
        let terms = expressions
            .into_iter()
            .map(|expression| expression.map(BooleanExpression::into_condition));
        self.select.condition = Condition::and([
            std::mem::replace(&mut self.select.condition, Condition::True),
            Condition::all_of(terms),
        ]);
        self
    }

    pub fn page(mut self, page: Page) -> Self {
        self.select.page = Some(page);
        self
    }

    pub fn condition(&self) -> &Condition {
        &self.select.condition
    }

    pub fn fetch(self) -> shelf_db::Result<Vec<E>> {
        EntityRepository::<E>::new(self.store).find(&self.select)
    }
}

fn title_eq(title: Option<&str>) -> Option<BooleanExpression> {
    title.map(|title| QBook::book().title.eq(title))
}

fn author_eq(author: Option<&str>) -> Option<BooleanExpression> {
    author.map(|author| QBook::book().author.eq(author))
}

fn published_year_eq(year: Option<i32>) -> Option<BooleanExpression> {
    year.map(|year| QBook::book().published_at.year().eq(year))
}

#[derive(Clone)]
pub struct FluentRepository {
    factory: QueryFactory,
    books: EntityRepository<Book>,
}

impl FluentRepository {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            factory: QueryFactory::new(store.clone()),
            books: EntityRepository::new(store),
        }
    }

    fn query(&self, query: &FindBookQuery) -> FluentQuery<Book> {
        self.factory
            .select_from(QBook::book())
            .where_([
                title_eq(query.title.as_deref()),
                author_eq(query.author.as_deref()),
                published_year_eq(query.published_year),
            ])
    }
}

impl BookRepository for FluentRepository {
    fn style(&self) -> &'static str {
        "fluent"
    }

    fn find(&self, query: &FindBookQuery, page: Option<Page>) -> shelf_db::Result<Vec<Book>> {
        let mut fluent = self.query(query);
        if let Some(page) = page {
            fluent = fluent.page(page);
        }
        tracing::debug!(
            style = self.style(),
            predicate = %fluent.condition(),
            ?page,
            "finding books"
        );
        fluent.fetch()
    }

    fn save(&self, book: Book) -> shelf_db::Result<Book> {
        self.books.save(book)
    }

    fn delete_all(&self) -> shelf_db::Result<()> {
        self.books.delete_all()
    }
}
