use super::{iterate_expand, ExpansionConfig, ExpansionError, StopReason};
use crate::atlas::Atlas;
use crate::cartography::{Cartographer, CartographyError};
use crate::librarian::FetchOptions;
use crate::store::{AtlasStore, StoreError};
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum TracerError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Store(StoreError),
    Cartography(CartographyError),
    Expansion(ExpansionError),
    AmbiguousCenter { entries: usize },
    EmptySeed,
}

impl Display for TracerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read seed `{}`: {source}", path.display())
            }
            Self::Store(err) => write!(f, "{err}"),
            Self::Cartography(err) => write!(f, "{err}"),
            Self::Expansion(err) => write!(f, "{err}"),
            Self::AmbiguousCenter { entries } => write!(
                f,
                "seed bibliography must resolve to exactly one publication, found {entries}"
            ),
            Self::EmptySeed => write!(f, "seed bibliography resolved to no usable publication"),
        }
    }
}

impl Error for TracerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Store(err) => Some(err),
            Self::Cartography(err) => Some(err),
            Self::Expansion(err) => Some(err),
            Self::AmbiguousCenter { .. } | Self::EmptySeed => None,
        }
    }
}

impl From<StoreError> for TracerError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<CartographyError> for TracerError {
    fn from(value: CartographyError) -> Self {
        Self::Cartography(value)
    }
}

impl From<ExpansionError> for TracerError {
    fn from(value: ExpansionError) -> Self {
        Self::Expansion(value)
    }
}

/// Result of one [`AtlasTracer::expand_atlas`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpansionSummary {
    pub iterations: usize,
    pub stop_reason: StopReason,
    pub atlas_size: usize,
}

/// Keeps one persisted, centered atlas and expands it on demand.
pub struct AtlasTracer<S: AtlasStore> {
    cartographer: Cartographer,
    store: S,
    atlas: Atlas,
}

impl<S: AtlasStore> AtlasTracer<S> {
    /// Resumes the stored atlas, or seeds a new one from `seed_bibtex`.
    ///
    /// The seed file is only read when the store is empty; it must resolve
    /// to exactly one publication, which becomes the atlas center.
    ///
    /// # Errors
    /// - `AmbiguousCenter` / `EmptySeed` when the seed does not resolve to
    ///   exactly one publication.
    pub fn open(
        cartographer: Cartographer,
        store: S,
        seed_bibtex: impl AsRef<Path>,
        fetch: &FetchOptions,
    ) -> Result<Self, TracerError> {
        let loaded = store.load()?;
        let atlas = if loaded.is_empty() {
            seed_atlas(&cartographer, seed_bibtex.as_ref(), fetch)?
        } else {
            info!(
                "event=tracer_open module=expansion status=ok mode=resume publications={} updates={}",
                loaded.len(),
                loaded.history().map_or(0, |history| history.updates())
            );
            loaded
        };

        store.save(&atlas)?;
        Ok(Self {
            cartographer,
            store,
            atlas,
        })
    }

    pub fn atlas(&self) -> &Atlas {
        &self.atlas
    }

    pub fn cartographer(&self) -> &Cartographer {
        &self.cartographer
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Runs [`iterate_expand`], centered on the stored center unless
    /// `config` names one.
    pub fn expand_atlas(&mut self, config: &ExpansionConfig) -> Result<ExpansionSummary, TracerError> {
        let mut config = config.clone();
        if config.expand.center.is_none() {
            config.expand.center = self.atlas.center().map(str::to_string);
        }

        let outcome =
            match iterate_expand(self.atlas.clone(), &self.cartographer, &self.store, &config) {
                Ok(outcome) => outcome,
                Err(err) => {
                    error!("event=expand_atlas module=expansion status=error error={err}");
                    // The store holds the last completed stage; keep the prior copy if it is unreadable.
                    match self.store.load() {
                        Ok(stored) => self.atlas = stored,
                        Err(load_err) => warn!(
                            "event=expand_atlas module=expansion status=warn reload=failed error={load_err}"
                        ),
                    }
                    return Err(err.into());
                }
            };

        self.atlas = outcome.atlas;
        Ok(ExpansionSummary {
            iterations: outcome.iterations,
            stop_reason: outcome.stop_reason,
            atlas_size: self.atlas.len(),
        })
    }
}

fn seed_atlas(
    cartographer: &Cartographer,
    seed_bibtex: &Path,
    fetch: &FetchOptions,
) -> Result<Atlas, TracerError> {
    let text = std::fs::read_to_string(seed_bibtex).map_err(|source| TracerError::Io {
        path: seed_bibtex.to_path_buf(),
        source,
    })?;
    let seeded = cartographer.bibtex_to_atlas(&text, fetch)?;
    let seeded = cartographer.project(seeded)?;

    let center = match seeded.len() {
        0 => return Err(TracerError::EmptySeed),
        1 => seeded.identifiers().next().map(str::to_string),
        entries => return Err(TracerError::AmbiguousCenter { entries }),
    };
    info!(
        "event=tracer_open module=expansion status=ok mode=seed center={}",
        center.as_deref().unwrap_or_default()
    );
    Ok(seeded.with_center(center))
}
