pub mod config;
pub mod db;
pub mod error;

// Shared infrastructure
pub mod cache;
pub mod limiter;
pub mod notify;

// External collaborators
pub mod llm;
pub mod provider;

// Discovery pipeline
pub mod intent;
pub mod retriever;

// Saved-recipe semantic search
pub mod similarity;

// HTTP surface
pub mod api;

pub mod cli;

// Utilities
pub mod utils;

// Re-exports
pub use config::Settings;
pub use error::{Error, Result};
