/// Shared application state
use crate::config::{AppConfig, StorageBackend};
use crate::error::Result;
use festify_core::{Clock, DocumentStore, SystemClock};
use festify_queue::{PartyQueue, VoteDispatcher};
use festify_storage::{MemoryStore, SqliteStore};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Store and dispatcher wired from one configuration
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub dispatcher: VoteDispatcher,
}

impl AppState {
    /// Open the configured backend with the system clock
    pub async fn open(config: &AppConfig) -> Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let store: Arc<dyn DocumentStore> = match config.storage.backend {
            StorageBackend::Memory => {
                info!("Using in-memory store");
                Arc::new(MemoryStore::with_clock(clock.clone()))
            }
            StorageBackend::Sqlite => {
                ensure_database_dir(&config.storage.database_url).await?;
                let pool = festify_storage::create_pool(&config.storage.database_url).await?;
                festify_storage::run_migrations(&pool).await?;
                info!("Database connected: {}", config.storage.database_url);
                Arc::new(SqliteStore::with_clock(pool, clock.clone()))
            }
        };

        Ok(Self::new(store, clock, config))
    }

    pub fn new(store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>, config: &AppConfig) -> Self {
        Self {
            dispatcher: VoteDispatcher::new(store.clone(), clock, config.engine_config()),
            store,
        }
    }

    pub fn queue(&self) -> &PartyQueue {
        self.dispatcher.queue()
    }
}

/// SQLite creates the file on connect but not its directory
async fn ensure_database_dir(database_url: &str) -> Result<()> {
    let Some(path) = database_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() || path == ":memory:" {
        return Ok(());
    }

    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    Ok(())
}
