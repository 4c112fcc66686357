/// Vote processor configuration
use crate::error::{AppError, Result};
use festify_queue::EngineConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default = "default_storage")]
    pub storage: StorageSettings,

    #[serde(default = "default_engine")]
    pub engine: EngineSettings,

    #[serde(default = "default_ingest")]
    pub ingest: IngestSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageSettings {
    #[serde(default = "default_backend")]
    pub backend: StorageBackend,

    #[serde(default = "default_database_url")]
    pub database_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process-local; everything is lost on exit
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineSettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IngestSettings {
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// `path` defaults to `festify.toml` in the working directory; a missing
    /// default file is not an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                settings = settings.add_source(config::File::from(path.to_path_buf()));
            }
            None => {
                let default_path = PathBuf::from("festify.toml");
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }

        // Override with environment variables, e.g. FESTIFY_STORAGE__DATABASE_URL
        settings = settings.add_source(
            config::Environment::with_prefix("FESTIFY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = settings
            .build()
            .map_err(|e| AppError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::Config(e.to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.storage.backend == StorageBackend::Sqlite && self.storage.database_url.is_empty() {
            return Err(AppError::Config(
                "database URL is required for the sqlite backend (set FESTIFY_STORAGE__DATABASE_URL)"
                    .to_string(),
            ));
        }

        if self.engine.max_attempts == 0 {
            return Err(AppError::Config(
                "engine.max_attempts must be at least 1".to_string(),
            ));
        }

        if self.ingest.channel_capacity == 0 {
            return Err(AppError::Config(
                "ingest.channel_capacity must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            max_attempts: self.engine.max_attempts,
        }
    }
}

// Default values
fn default_storage() -> StorageSettings {
    StorageSettings {
        backend: default_backend(),
        database_url: default_database_url(),
    }
}

fn default_backend() -> StorageBackend {
    StorageBackend::Sqlite
}

fn default_database_url() -> String {
    "sqlite://./data/festify.db".to_string()
}

fn default_engine() -> EngineSettings {
    EngineSettings {
        max_attempts: default_max_attempts(),
    }
}

fn default_max_attempts() -> u32 {
    festify_core::DEFAULT_MAX_ATTEMPTS
}

fn default_ingest() -> IngestSettings {
    IngestSettings {
        channel_capacity: default_channel_capacity(),
    }
}

fn default_channel_capacity() -> usize {
    256
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage: default_storage(),
            engine: default_engine(),
            ingest: default_ingest(),
        }
    }
}
