//! Citation atlas expansion engine.
//! Grows a set of publications along citation edges, prioritized by abstract
//! similarity to a center, and keeps the result resumable on disk.

pub mod atlas;
pub mod bibtex;
pub mod cartography;
pub mod config;
pub mod db;
pub mod expansion;
pub mod librarian;
pub mod logging;
pub mod model;
pub mod observer;
pub mod projection;
pub mod registry;
pub mod store;
pub mod topography;
pub mod vectorizer;

pub use atlas::{Atlas, AtlasError, AtlasHistory, AtlasResult, KernelHistory};
pub use bibtex::{parse_bibtex, BibEntry, BibtexError};
pub use cartography::{Cartographer, CartographyError, CartographyResult, ExpandOptions};
pub use config::{AtlasConfig, ConfigError};
pub use expansion::{
    iterate_expand, AtlasTracer, ExpansionConfig, ExpansionError, ExpansionOutcome,
    ExpansionSummary, StopReason, TracerError,
};
pub use librarian::{
    BatchLibrarian, CatalogSource, FetchError, FetchErrorKind, FetchOptions, Librarian,
    RetryPolicy, SourceClient, WorkerPool,
};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::publication::{
    Publication, PublicationField, PublicationRecord, PublicationValidationError,
};
pub use observer::{ExpansionObserver, LogObserver};
pub use projection::{Embeddings, Projection, ProjectionError, ProjectionResult};
pub use registry::{Backend, BackendRegistry, RegistryError};
pub use store::{AtlasStore, DirectoryAtlasStore, StoreError, StoreResult};
pub use topography::{TopographyMetric, TopographyOptions, TopographyRow};
pub use vectorizer::{BagOfWordsVectorizer, Vectorizer, VectorizerError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
