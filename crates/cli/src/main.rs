use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use shelf_app::{App, Book, FindBookQuery};
use shelf_kernel::settings::{QueryStyle, Settings};
use time::Date;

/// Book catalogue with three interchangeable query styles
#[derive(Debug, Parser)]
#[command(name = "shelf", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the HTTP API
    Serve,
    /// Catalogue a book
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        author: String,
        /// Publication date, YYYY-MM-DD
        #[arg(long, value_parser = parse_date)]
        published: Date,
    },
    /// Find books, printed as JSON lines
    Find(FindArgs),
    /// Remove every book
    Clear,
}

#[derive(Debug, Args)]
struct FindArgs {
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    author: Option<String>,
    /// Calendar year of publication
    #[arg(long, allow_negative_numbers = true)]
    year: Option<i32>,
    #[arg(long, default_value_t = 0)]
    page: u32,
    #[arg(long, default_value_t = 20)]
    size: u32,
    /// Override the configured query style
    #[arg(long)]
    style: Option<QueryStyle>,
}

impl FindArgs {
    fn to_query(&self) -> FindBookQuery {
        FindBookQuery {
            title: self.title.clone(),
            author: self.author.clone(),
            published_year: self.year,
            page_number: self.page,
            page_size: self.size,
        }
    }
}

fn parse_date(raw: &str) -> Result<Date, String> {
    Date::parse(raw, time::macros::format_description!("[year]-[month]-[day]"))
        .map_err(|err| format!("expected YYYY-MM-DD: {err}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load().with_context(|| "failed to load shelf settings")?;
    shelf_telemetry::init(&settings.telemetry)?;

    let app = App::bootstrap(settings).await?;

    match cli.command {
        Command::Serve => app.serve().await?,
        Command::Add {
            title,
            author,
            published,
        } => {
            let saved = app.books().save(Book::new(title, author, published))?;
            println!("{}", serde_json::to_string(&saved)?);
        }
        Command::Find(args) => {
            let books = match args.style {
                Some(style) => app.books_in(style),
                None => app.books(),
            };
            let found = books.find_page(&args.to_query())?;
            tracing::debug!(style = books.style(), count = found.len(), "books found");
            for book in &found {
                println!("{}", serde_json::to_string(book)?);
            }
        }
        Command::Clear => {
            app.books().delete_all()?;
            tracing::info!("catalogue cleared");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn find_flags_map_onto_the_query() {
        let cli = Cli::try_parse_from([
            "shelf", "find", "--title", "title1", "--year", "2024", "--page", "1", "--size", "2",
            "--style", "template",
        ])
        .unwrap();
        let Command::Find(args) = cli.command else {
            panic!("expected find");
        };
        assert_eq!(args.style, Some(QueryStyle::Template));
        assert_eq!(
            args.to_query(),
            FindBookQuery::new().title("title1").published_year(2024).page(1, 2)
        );
    }

    #[test]
    fn rejects_malformed_dates_and_styles() {
        assert!(parse_date("2024-13-01").is_err());
        assert!(Cli::try_parse_from(["shelf", "find", "--style", "sql"]).is_err());
    }
}
