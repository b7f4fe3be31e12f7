//! Durable persistence of an atlas.
//!
//! # Responsibility
//! - Save and load the full atlas state between pipeline stages.
//! - Keep the on-disk layout stable so interrupted runs can resume.
//!
//! # Invariants
//! - Each file is written to a temporary sibling and renamed into place.
//! - A loaded atlas satisfies the atlas invariants or the load fails.
//! - Projection embeddings round-trip bit-for-bit.
//!
//! # See also
//! - `db` for the projection file schema.

mod directory;
mod projection_file;

pub use directory::{
    DirectoryAtlasStore, BAD_IDS_FILE, HISTORY_FILE, PROJECTION_FILE, PUBLICATIONS_FILE,
};
pub use projection_file::{load_projection, save_projection};

use crate::atlas::Atlas;
use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence error for atlas save/load.
#[derive(Debug)]
pub enum StoreError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    Db(DbError),
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "io error at `{}`: {source}", path.display()),
            Self::Json { path, source } => {
                write!(f, "invalid json in `{}`: {source}", path.display())
            }
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted atlas data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
            Self::Db(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Save/load contract used by the expansion loop.
pub trait AtlasStore {
    fn save(&self, atlas: &Atlas) -> StoreResult<()>;
    fn load(&self) -> StoreResult<Atlas>;
}
