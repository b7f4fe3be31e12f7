//! Atlas aggregate: the growing publication graph and its projection.
//!
//! # Responsibility
//! - Own the publications discovered so far, keyed by identifier.
//! - Carry the projection, the permanently excluded identifiers and the
//!   expansion history between pipeline stages.
//!
//! # Invariants
//! - Every projection identifier is a key of `publications`.
//! - Publication keys equal the publication's own identifier.
//! - `bad_ids` only grows while a run is in progress.
//!
//! # See also
//! - `store` for persistence.
//! - `cartography` for the stages that produce new atlases.

mod history;

pub use history::{AtlasHistory, KernelHistory};

use crate::model::publication::Publication;
use crate::projection::Projection;
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AtlasError {
    NotFound(String),
}

impl Display for AtlasError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(identifier) => write!(f, "publication not in atlas: {identifier}"),
        }
    }
}

impl Error for AtlasError {}

pub type AtlasResult<T> = Result<T, AtlasError>;

/// Growing, persisted collection of publications plus derived state.
///
/// `projection` is `None` until the atlas has been projected once;
/// `Some(Projection::empty())` means projected with nothing embeddable.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Atlas {
    pub(crate) publications: BTreeMap<String, Publication>,
    pub(crate) projection: Option<Projection>,
    pub(crate) bad_ids: BTreeSet<String>,
    pub(crate) center: Option<String>,
    pub(crate) history: Option<AtlasHistory>,
}

impl Atlas {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an atlas keyed by identifier; later duplicates replace earlier ones.
    pub fn from_publications(publications: impl IntoIterator<Item = Publication>) -> Self {
        let publications = publications
            .into_iter()
            .map(|publication| (publication.identifier().to_string(), publication))
            .collect();
        Self {
            publications,
            ..Self::default()
        }
    }

    pub fn with_projection(mut self, projection: Option<Projection>) -> Self {
        self.projection = projection;
        self
    }

    /// Adds identifiers to the exclusion set.
    pub fn with_bad_ids<I, S>(mut self, bad_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.bad_ids.extend(bad_ids.into_iter().map(Into::into));
        self
    }

    pub fn with_center(mut self, center: Option<String>) -> Self {
        self.center = center;
        self
    }

    pub fn with_history(mut self, history: Option<AtlasHistory>) -> Self {
        self.history = history;
        self
    }

    /// Returns the publication for `identifier`.
    pub fn get(&self, identifier: &str) -> AtlasResult<&Publication> {
        self.publications
            .get(identifier)
            .ok_or_else(|| AtlasError::NotFound(identifier.to_string()))
    }

    pub fn len(&self) -> usize {
        self.publications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.publications.is_empty()
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.publications.contains_key(identifier)
    }

    /// Identifiers in ascending order.
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.publications.keys().map(String::as_str)
    }

    pub fn publications(&self) -> impl Iterator<Item = &Publication> {
        self.publications.values()
    }

    pub fn projection(&self) -> Option<&Projection> {
        self.projection.as_ref()
    }

    pub fn bad_ids(&self) -> &BTreeSet<String> {
        &self.bad_ids
    }

    pub fn is_bad(&self, identifier: &str) -> bool {
        self.bad_ids.contains(identifier)
    }

    pub fn center(&self) -> Option<&str> {
        self.center.as_deref()
    }

    pub fn history(&self) -> Option<&AtlasHistory> {
        self.history.as_ref()
    }

    /// Identifiers present in the projection but missing from `publications`.
    pub(crate) fn orphaned_projection_ids(&self) -> Vec<String> {
        self.projection
            .iter()
            .flat_map(|projection| projection.identifiers())
            .filter(|identifier| !self.publications.contains_key(identifier.as_str()))
            .cloned()
            .collect()
    }
}
