//! Cartographer: the stages that grow and embed an atlas.
//!
//! # Responsibility
//! - `filter` drops structurally incomplete publications for good.
//! - `project` embeds only what is not embedded yet and merges it in.
//! - `expand` follows citation edges, prioritized by similarity to a center.
//! - `track` and `calculate_convergence` maintain the update history.
//!
//! # Invariants
//! - Every stage consumes an atlas and returns a new one; nothing is shared
//!   while being changed.
//! - An already embedded publication is never sent to the vectorizer again.
//! - `bad_ids` never shrinks across stages.
//!
//! # See also
//! - `expansion` for the loop that sequences these stages.

mod convergence;
mod expand;

pub use convergence::DEFAULT_CONVERGENCE_KERNEL_SIZE;
pub use expand::{ExpandOptions, DEFAULT_N_PUBS_MAX};

use crate::atlas::Atlas;
use crate::bibtex::{parse_bibtex, BibtexError};
use crate::librarian::{FetchOptions, Librarian};
use crate::model::publication::{Publication, PublicationField};
use crate::observer::{ExpansionObserver, FilterReport, LogObserver, ProjectReport};
use crate::projection::{Projection, ProjectionError};
use crate::topography::{measure_topography, TopographyOptions, TopographyRow};
use crate::vectorizer::{Vectorizer, VectorizerError};
use log::{error, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex};

/// Fields every projected publication must carry.
pub const DEFAULT_REQUIRED_FIELDS: &[PublicationField] =
    &[PublicationField::Abstract, PublicationField::PublicationDate];

/// Cartography stage error.
#[derive(Debug)]
pub enum CartographyError {
    Projection(ProjectionError),
    Vectorizer(VectorizerError),
    VectorizerContract { expected: usize, actual: usize },
    Bibtex(BibtexError),
}

impl Display for CartographyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Projection(err) => write!(f, "{err}"),
            Self::Vectorizer(err) => write!(f, "{err}"),
            Self::VectorizerContract { expected, actual } => write!(
                f,
                "vectorizer returned {actual} rows for {expected} documents"
            ),
            Self::Bibtex(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CartographyError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Projection(err) => Some(err),
            Self::Vectorizer(err) => Some(err),
            Self::VectorizerContract { .. } => None,
            Self::Bibtex(err) => Some(err),
        }
    }
}

impl From<ProjectionError> for CartographyError {
    fn from(value: ProjectionError) -> Self {
        Self::Projection(value)
    }
}

impl From<VectorizerError> for CartographyError {
    fn from(value: VectorizerError) -> Self {
        Self::Vectorizer(value)
    }
}

impl From<BibtexError> for CartographyError {
    fn from(value: BibtexError) -> Self {
        Self::Bibtex(value)
    }
}

pub type CartographyResult<T> = Result<T, CartographyError>;

/// Runs pipeline stages against injected source and embedding backends.
pub struct Cartographer {
    librarian: Arc<dyn Librarian>,
    vectorizer: Arc<dyn Vectorizer>,
    observer: Arc<dyn ExpansionObserver>,
    rng: Mutex<StdRng>,
}

impl Cartographer {
    /// Creates a cartographer that reports through [`LogObserver`].
    pub fn new(librarian: Arc<dyn Librarian>, vectorizer: Arc<dyn Vectorizer>) -> Self {
        Self {
            librarian,
            vectorizer,
            observer: Arc::new(LogObserver),
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ExpansionObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Makes candidate sampling reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn librarian(&self) -> &Arc<dyn Librarian> {
        &self.librarian
    }

    pub fn vectorizer(&self) -> &Arc<dyn Vectorizer> {
        &self.vectorizer
    }

    pub(crate) fn observer(&self) -> &Arc<dyn ExpansionObserver> {
        &self.observer
    }

    /// Removes every publication missing one of `required`.
    ///
    /// Removed identifiers join `bad_ids` and lose their projection rows.
    /// Returns the input untouched when nothing is missing.
    pub fn filter(&self, atlas: Atlas, required: &[PublicationField]) -> Atlas {
        let before = atlas.len();
        let removed: Vec<String> = atlas
            .publications
            .values()
            .filter(|publication| !required.iter().all(|field| publication.has_field(*field)))
            .map(|publication| publication.identifier().to_string())
            .collect();

        if removed.is_empty() {
            return atlas;
        }

        let mut atlas = atlas;
        let removed_set: HashSet<&str> = removed.iter().map(String::as_str).collect();
        atlas
            .publications
            .retain(|identifier, _| !removed_set.contains(identifier.as_str()));
        atlas.projection = atlas
            .projection
            .map(|projection| projection.retain(|identifier| !removed_set.contains(identifier)));
        atlas.bad_ids.extend(removed.iter().cloned());

        self.observer.on_filter(&FilterReport { before, removed });
        atlas
    }

    /// Embeds every publication that has no projection row yet.
    ///
    /// Runs `filter` with [`DEFAULT_REQUIRED_FIELDS`] first. An atlas with
    /// nothing to embed and no prior projection gets an explicit empty one.
    ///
    /// # Errors
    /// - `Vectorizer` when the backend fails.
    /// - `VectorizerContract` when the backend returns the wrong row count.
    /// - `Projection` when the new rows do not fit the existing projection.
    pub fn project(&self, atlas: Atlas) -> CartographyResult<Atlas> {
        let mut atlas = self.filter(atlas, DEFAULT_REQUIRED_FIELDS);

        let embed_ids: Vec<String> = atlas
            .publications
            .keys()
            .filter(|identifier| {
                !atlas
                    .projection
                    .as_ref()
                    .is_some_and(|projection| projection.contains(identifier))
            })
            .cloned()
            .collect();
        let embedded = embed_ids.len();

        let projection = if embed_ids.is_empty() {
            atlas.projection.take().unwrap_or_else(Projection::empty)
        } else {
            let documents: Vec<&str> = embed_ids
                .iter()
                .map(|identifier| {
                    atlas
                        .publications
                        .get(identifier)
                        .and_then(Publication::abstract_text)
                        .unwrap_or_default()
                })
                .collect();
            let embeddings = self.vectorizer.embed(&documents)?;
            if embeddings.rows() != embed_ids.len() {
                return Err(CartographyError::VectorizerContract {
                    expected: embed_ids.len(),
                    actual: embeddings.rows(),
                });
            }
            let fresh = Projection::new(embed_ids, embeddings)?;
            Projection::merge(atlas.projection.as_ref(), fresh)?
        };

        let unprojected: Vec<String> = atlas
            .publications
            .keys()
            .filter(|identifier| !projection.contains(identifier))
            .cloned()
            .collect();
        debug_assert!(
            unprojected.is_empty(),
            "every filtered publication should be projected"
        );
        if !unprojected.is_empty() {
            error!(
                "event=project module=cartography status=error error_code=unprojected_publications count={}",
                unprojected.len()
            );
            for identifier in &unprojected {
                atlas.publications.remove(identifier);
            }
        }

        self.observer.on_project(&ProjectReport {
            embedded,
            projected_total: projection.len(),
            dropped_unprojected: unprojected.len(),
        });
        atlas.projection = Some(projection);
        Ok(atlas)
    }

    /// Appends the current identifier set to `history.pubs_per_update`.
    pub fn track(&self, atlas: Atlas) -> Atlas {
        let mut atlas = atlas;
        let snapshot: Vec<String> = atlas.publications.keys().cloned().collect();
        atlas
            .history
            .get_or_insert_with(Default::default)
            .pubs_per_update
            .push(snapshot);
        atlas
    }

    /// Resolves a seed bibliography into an atlas.
    ///
    /// Entries the librarian cannot map are skipped with a warning; fetched
    /// publications without abstract or date are dropped.
    pub fn bibtex_to_atlas(&self, bibtex: &str, fetch: &FetchOptions) -> CartographyResult<Atlas> {
        let entries = parse_bibtex(bibtex)?;
        let identifiers: Vec<String> = entries
            .iter()
            .filter_map(|entry| {
                let identifier = self.librarian.bibtex_entry_to_identifier(entry);
                if identifier.is_none() {
                    warn!(
                        "event=bibtex_to_atlas module=cartography status=warn entry={} reason=no_identifier",
                        entry.key
                    );
                }
                identifier
            })
            .collect();

        let publications: Vec<Publication> = if identifiers.is_empty() {
            Vec::new()
        } else {
            self.librarian
                .get_publications(&identifiers, fetch)
                .into_iter()
                .flatten()
                .filter(|publication| {
                    DEFAULT_REQUIRED_FIELDS
                        .iter()
                        .all(|field| publication.has_field(*field))
                })
                .collect()
        };

        if publications.len() < entries.len() {
            warn!(
                "event=bibtex_to_atlas module=cartography status=warn entries={} resolved={}",
                entries.len(),
                publications.len()
            );
        }
        Ok(Atlas::from_publications(publications))
    }

    /// Measures local topography of the atlas projection.
    pub fn measure_topography(
        &self,
        atlas: &Atlas,
        options: &TopographyOptions,
    ) -> CartographyResult<Vec<TopographyRow>> {
        Ok(measure_topography(atlas, options)?)
    }
}
