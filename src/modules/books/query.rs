use serde::Deserialize;
use shelf_db::Page;
use time::{Date, Month};
use utoipa::IntoParams;

pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Optional filters and paging for a book lookup.
///
/// Absent filters impose no constraint; present ones are ANDed together.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, IntoParams)]
#[serde(default)]
#[into_params(parameter_in = Query)]
pub struct FindBookQuery {
    /// Exact title
    pub title: Option<String>,
    /// Exact author
    pub author: Option<String>,
    /// Any publication date within this calendar year
    pub published_year: Option<i32>,
    /// Zero-based page number
    pub page_number: u32,
    pub page_size: u32,
}

impl Default for FindBookQuery {
    fn default() -> Self {
        Self {
            title: None,
            author: None,
            published_year: None,
            page_number: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl FindBookQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn published_year(mut self, year: i32) -> Self {
        self.published_year = Some(year);
        self
    }

    pub fn page(mut self, number: u32, size: u32) -> Self {
        self.page_number = number;
        self.page_size = size;
        self
    }

    pub fn to_page(&self) -> Page {
        Page::new(self.page_number, self.page_size)
    }

    /// Inclusive `[Jan 1, Dec 31]` bounds of the requested year, if any.
    pub fn published_range(&self) -> Option<YearRange> {
        self.published_year.map(YearRange::of)
    }
}

/// Calendar year as an inclusive date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YearRange {
    Dates(Date, Date),
    /// No representable date falls in this year, so nothing can match.
    OutOfRange(i32),
}

impl YearRange {
    pub fn of(year: i32) -> Self {
        let start = Date::from_calendar_date(year, Month::January, 1);
        let end = Date::from_calendar_date(year, Month::December, 31);
        match (start, end) {
            (Ok(start), Ok(end)) => YearRange::Dates(start, end),
            _ => YearRange::OutOfRange(year),
        }
    }
}
