use std::sync::Arc;

use crate::core::{Config, Result, StoreBackend};
use crate::db::DbService;
use crate::printing::{
    CategoryOrderingTable, EnqueueService, JobStore, MemoryJobStore, PollHandler, ReceiptRenderer,
    SqliteJobStore,
};

/// Shared server state
///
/// Cloned into every handler; all fields are behind `Arc`.
///
/// | Field | Meaning |
/// |-------|---------|
/// | config | immutable configuration, carries the dispatch switch |
/// | store | job store (sqlite or memory) |
/// | renderer | receipt composer with the loaded category ordering |
#[derive(Clone)]
pub struct ServerState {
    pub config: Arc<Config>,
    pub store: Arc<dyn JobStore>,
    pub renderer: Arc<ReceiptRenderer>,
}

impl ServerState {
    /// Build the state from configuration
    ///
    /// Opens the configured job store and loads the category ordering table.
    pub async fn initialize(config: &Config) -> Result<Self> {
        let store: Arc<dyn JobStore> = match config.print_store {
            StoreBackend::Sqlite => {
                let db = match &config.database_url {
                    Some(url) => DbService::connect(url).await?,
                    None => {
                        config.ensure_work_dir_structure()?;
                        let path = config.database_path();
                        let path = path.to_str().ok_or_else(|| {
                            crate::core::ServerError::Config(format!(
                                "database path is not valid UTF-8: {}",
                                path.display()
                            ))
                        })?;
                        DbService::new(path).await?
                    }
                };
                Arc::new(SqliteJobStore::new(db.pool))
            }
            StoreBackend::Memory => {
                tracing::warn!("Using in-memory job store, queued jobs are lost on restart");
                Arc::new(MemoryJobStore::new())
            }
        };

        let ordering = match &config.category_order_path {
            Some(path) => {
                let table = CategoryOrderingTable::load(path)?;
                tracing::info!(path = %path, entries = table.len(), "Category ordering loaded");
                table
            }
            None => CategoryOrderingTable::new(),
        };

        Ok(Self::with_store(config.clone(), store, ordering))
    }

    /// Assemble a state around an existing store
    pub fn with_store(
        config: Config,
        store: Arc<dyn JobStore>,
        ordering: CategoryOrderingTable,
    ) -> Self {
        let renderer = ReceiptRenderer::new(
            config.receipt_width,
            config.receipt_code_page,
            config.receipt_feed_lines,
            Arc::new(ordering),
        );

        Self {
            config: Arc::new(config),
            store,
            renderer: Arc::new(renderer),
        }
    }

    pub fn enqueue_service(&self) -> EnqueueService {
        EnqueueService::new(self.store.clone())
    }

    pub fn poll_handler(&self) -> PollHandler {
        PollHandler::new(self.store.clone())
    }

    pub fn dispatch_enabled(&self) -> bool {
        self.config.print_dispatch_enabled
    }
}
