//! Application bootstrap: settings → store → modules → server.

use std::sync::Arc;

use anyhow::Context;
use shelf_db::Store;
use shelf_kernel::settings::{QueryStyle, Settings};
use shelf_kernel::{InitCtx, ModuleRegistry};

use crate::modules;
use crate::modules::books::repository::{self, BookRepository};

/// A fully initialized application.
pub struct App {
    settings: Settings,
    store: Arc<dyn Store>,
    registry: ModuleRegistry,
    books: Arc<dyn BookRepository>,
}

impl App {
    /// Open the configured store, register modules and run their init hooks.
    pub async fn bootstrap(settings: Settings) -> anyhow::Result<Self> {
        tracing::info!(
            env = ?settings.environment,
            db = %settings.database.url,
            query_style = %settings.books.query_style,
            "shelf bootstrap starting"
        );

        let store = shelf_db::open(&settings.database.url)
            .with_context(|| format!("failed to open store '{}'", settings.database.url))?;
        let books = repository::repository(settings.books.query_style, store.clone());

        let mut registry = ModuleRegistry::new();
        modules::register_all(&mut registry, books.clone());

        let ctx = InitCtx {
            settings: &settings,
            store: store.as_ref(),
        };
        registry.init_modules(&ctx).await?;

        tracing::info!(modules = registry.modules().len(), "shelf bootstrap complete");
        Ok(Self {
            settings,
            store,
            registry,
            books,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// Repository in the configured query style.
    pub fn books(&self) -> Arc<dyn BookRepository> {
        self.books.clone()
    }

    /// Repository in `style` over the same store.
    pub fn books_in(&self, style: QueryStyle) -> Arc<dyn BookRepository> {
        repository::repository(style, self.store.clone())
    }

    /// Serve HTTP until shutdown, then stop the modules.
    pub async fn serve(&self) -> anyhow::Result<()> {
        let served = shelf_http::start_server(&self.registry, &self.settings).await;
        self.registry.stop_modules().await?;
        served
    }
}
