//! Bibliographic source contract.
//!
//! # Responsibility
//! - Define how the pipeline asks a bibliographic source for publications.
//! - Provide the reusable pieces concrete sources are built from: retry,
//!   parallel conversion and a chunking adapter.
//!
//! # Invariants
//! - A librarian never fails a whole request: unavailable identifiers come
//!   back as `None` so partial progress survives.
//! - Output order is not guaranteed; callers key results by identifier.
//!
//! # See also
//! - `cartography` for the only caller of `get_publications`.

mod batch;
mod catalog;
mod pool;
mod retry;

pub use batch::{BatchLibrarian, SourceClient};
pub use catalog::{CatalogRecord, CatalogSource, DOI_PREFIX};
pub use pool::WorkerPool;
pub use retry::RetryPolicy;

use crate::bibtex::BibEntry;
use crate::model::publication::Publication;
use crate::registry::Backend;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Default number of identifiers sent per source call.
pub const DEFAULT_CALL_SIZE: usize = 10;

/// Per-request knobs for [`Librarian::get_publications`].
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOptions {
    pub call_size: usize,
    pub retry: RetryPolicy,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            call_size: DEFAULT_CALL_SIZE,
            retry: RetryPolicy::default(),
        }
    }
}

/// Failure category reported by a raw source call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchErrorKind {
    Timeout,
    Connection,
    RateLimited,
    NotFound,
    Malformed,
    Other,
}

impl FetchErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Connection => "connection",
            Self::RateLimited => "rate_limited",
            Self::NotFound => "not_found",
            Self::Malformed => "malformed",
            Self::Other => "other",
        }
    }
}

/// Error returned by a raw source call or record conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    pub kind: FetchErrorKind,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FetchErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl Display for FetchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} fetch error: {}", self.kind.as_str(), self.message)
    }
}

impl Error for FetchError {}

pub type FetchResult<T> = Result<T, FetchError>;

/// Capability contract for a bibliographic source.
pub trait Librarian: Backend + Send + Sync {
    /// Fetches publications for `identifiers`.
    ///
    /// Returns one entry per requested identifier; `None` marks an identifier
    /// the source could not supply.
    fn get_publications(
        &self,
        identifiers: &[String],
        options: &FetchOptions,
    ) -> Vec<Option<Publication>>;

    /// Maps a seed bibliography entry to this source's identifier scheme.
    fn bibtex_entry_to_identifier(&self, entry: &BibEntry) -> Option<String>;
}
