//! Festify Vote Processor Library
//!
//! Configuration, store wiring and event ingestion behind the
//! `festify-votes` command.
//!
//! This library exposes the core components for testing purposes.

pub mod config;
pub mod error;
pub mod ingest;
pub mod state;

// Re-export commonly used types for convenience
pub use config::{AppConfig, StorageBackend};
pub use error::{AppError, Result};
pub use ingest::{ingest, IngestReport};
pub use state::AppState;
