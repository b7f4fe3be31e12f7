//! Text embedding contract.
//!
//! # Responsibility
//! - Turn abstracts into fixed-width vectors for the projection stage.
//!
//! # Invariants
//! - `embed` is deterministic and returns exactly one row per input
//!   document, in input order.
//! - Every row has `dimension()` columns.

mod bag_of_words;

pub use bag_of_words::BagOfWordsVectorizer;

use crate::projection::{Embeddings, ProjectionError};
use crate::registry::Backend;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum VectorizerError {
    Backend(String),
    Shape(ProjectionError),
}

impl Display for VectorizerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Backend(message) => write!(f, "vectorizer backend failed: {message}"),
            Self::Shape(err) => write!(f, "vectorizer produced malformed output: {err}"),
        }
    }
}

impl Error for VectorizerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Backend(_) => None,
            Self::Shape(err) => Some(err),
        }
    }
}

impl From<ProjectionError> for VectorizerError {
    fn from(value: ProjectionError) -> Self {
        Self::Shape(value)
    }
}

pub type VectorizerResult<T> = Result<T, VectorizerError>;

/// Capability contract for an embedding backend.
pub trait Vectorizer: Backend + Send + Sync {
    /// Embeds `documents`, one row each, in order.
    fn embed(&self, documents: &[&str]) -> VectorizerResult<Embeddings>;

    /// Width of every produced row.
    fn dimension(&self) -> usize;
}
