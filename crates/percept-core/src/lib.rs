//! Percept Core - concept tagging and hub detection for image search.
//!
//! Percept assigns descriptive concept tags to images from their semantic
//! embeddings, and detects "hub" images that disproportionately dominate
//! top-N search results across a query workload so ranking can down-weight
//! them.
//!
//! # Architecture
//!
//! ```text
//! Embedding -> Score catalog -> Select tags -> Reconcile into tag store
//! Workload  -> Embed batches -> Top-N per query -> Hub stats + threshold
//! ```
//!
//! Tagging is a deterministic function of `(embedding, catalog snapshot,
//! config)`. Hub detection streams a query workload against the corpus and
//! flags statistical outliers; a debounced scheduler keeps the expensive
//! scan from running on every write.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use percept_core::{Config, ConceptCatalog, TagEngine};
//! use percept_core::store::memory::InMemoryTagStore;
//!
//! #[tokio::main]
//! async fn main() -> percept_core::Result<()> {
//!     let config = Config::load()?;
//!     let concepts = percept_core::snapshot::read_concepts(&config.catalog_path())?;
//!     let catalog = Arc::new(ConceptCatalog::new(concepts));
//!     let engine = TagEngine::new(catalog, Arc::new(InMemoryTagStore::new()), config.tagging);
//!
//!     let tags = engine.tag(&"img-1".into(), &[0.0; 512]).await?;
//!     println!("Tags: {tags:?}");
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod cancel;
pub mod catalog;
pub mod config;
pub mod embedding;
pub mod error;
pub mod hub;
pub mod math;
pub mod schedule;
pub mod snapshot;
pub mod store;
pub mod tagging;
pub mod types;

// Re-exports for convenient access
pub use cancel::CancelToken;
pub use catalog::{Concept, ConceptCatalog, OppositeGraph};
pub use config::Config;
pub use embedding::EmbeddingProvider;
pub use error::{ConfigError, EngineError, EngineResult, PerceptError, Result};
pub use hub::{HubDetector, HubOutcome, HubReport, QueryWorkload};
pub use schedule::{ScanJob, ScanScheduler};
pub use snapshot::OutputFormat;
pub use tagging::TagEngine;
pub use types::{ConceptId, HubStats, ImageId, ImageRecord, TagAssignment};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
