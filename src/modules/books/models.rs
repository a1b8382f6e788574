use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use shelf_db::{ColumnType, Entity, IdentityStrategy, Record, StoreError, TableMapping, Value};
use time::Date;
use utoipa::ToSchema;

/// Column names of the `book` table.
pub mod columns {
    pub const ID: &str = "book_id";
    pub const TITLE: &str = "title";
    pub const AUTHOR: &str = "author";
    pub const PUBLISHED_AT: &str = "published_at";
}

/// Mapping of [`Book`] onto the `book` table.
pub static BOOK_TABLE: Lazy<TableMapping> = Lazy::new(|| {
    TableMapping::new("book", columns::ID)
        .strategy(IdentityStrategy::Autoincrement)
        .column(columns::TITLE, ColumnType::Text)
        .column(columns::AUTHOR, ColumnType::Text)
        .column(columns::PUBLISHED_AT, ColumnType::Date)
});

/// A catalogued book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Book {
    /// Store-assigned identity, absent until the book is saved
    id: Option<i64>,
    /// Title of the book
    pub title: String,
    /// Author of the book
    pub author: String,
    /// Publication date
    pub published_at: Date,
}

impl Book {
    pub fn new(title: impl Into<String>, author: impl Into<String>, published_at: Date) -> Self {
        Self {
            id: None,
            title: title.into(),
            author: author.into(),
            published_at,
        }
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }
}

/// Request body for cataloguing a new book.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewBook {
    /// Title of the book
    pub title: String,
    /// Author of the book
    pub author: String,
    /// Publication date, `YYYY-MM-DD`
    pub published_at: Date,
}

impl From<NewBook> for Book {
    fn from(new: NewBook) -> Self {
        Book::new(new.title, new.author, new.published_at)
    }
}

fn text(record: &Record, column: &str) -> shelf_db::Result<String> {
    record
        .get(&BOOK_TABLE, column)?
        .as_text()
        .map(str::to_string)
        .ok_or_else(|| StoreError::mapping(column, "expected text"))
}

impl Entity for Book {
    fn name() -> &'static str {
        "Book"
    }

    fn mapping() -> &'static TableMapping {
        &BOOK_TABLE
    }

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            Value::from(self.title.as_str()),
            Value::from(self.author.as_str()),
            Value::from(self.published_at),
        ]
    }

    fn from_record(record: Record) -> shelf_db::Result<Self> {
        let published_at = record
            .get(&BOOK_TABLE, columns::PUBLISHED_AT)?
            .as_date()
            .ok_or_else(|| StoreError::mapping(columns::PUBLISHED_AT, "expected date"))?;
        Ok(Self {
            id: Some(record.id),
            title: text(&record, columns::TITLE)?,
            author: text(&record, columns::AUTHOR)?,
            published_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn new_books_have_no_identity() {
        let book = Book::new("title1", "author1", date!(2024 - 01 - 01));
        assert_eq!(book.id(), None);
        assert_eq!(book.to_values().len(), BOOK_TABLE.columns.len());
    }

    #[test]
    fn hydrates_from_record() {
        let record = Record::new(
            3,
            vec![
                Value::from("title1"),
                Value::from("author1"),
                Value::from(date!(2024 - 01 - 01)),
            ],
        );
        let book = Book::from_record(record).unwrap();
        assert_eq!(book.id(), Some(3));
        assert_eq!(book.author, "author1");
    }

    #[test]
    fn rejects_records_of_the_wrong_shape() {
        let record = Record::new(1, vec![Value::from("title1"), Value::from("author1")]);
        let err = Book::from_record(record).unwrap_err();
        assert!(err.to_string().contains(columns::PUBLISHED_AT));
    }

    #[test]
    fn serializes_dates_as_iso() {
        let json = serde_json::to_value(Book::new("t", "a", date!(2024 - 03 - 09))).unwrap();
        assert_eq!(json["published_at"], "2024-03-09");
        assert!(json["id"].is_null());
    }
}
