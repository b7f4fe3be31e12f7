use super::projection_file::remove_if_exists;
use super::{load_projection, save_projection, AtlasStore, StoreError, StoreResult};
use crate::atlas::{Atlas, AtlasHistory};
use crate::model::publication::Publication;
use log::{error, info};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

pub const PUBLICATIONS_FILE: &str = "publications.json";
pub const PROJECTION_FILE: &str = "projection.sqlite3";
pub const BAD_IDS_FILE: &str = "bad_ids.json";
pub const HISTORY_FILE: &str = "history.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct HistoryFile {
    #[serde(default)]
    center: Option<String>,
    #[serde(default)]
    history: Option<AtlasHistory>,
}

/// Atlas persisted as a directory of JSON files plus a SQLite projection.
#[derive(Debug, Clone)]
pub struct DirectoryAtlasStore {
    dir: PathBuf,
}

impl DirectoryAtlasStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns whether a publications file has been written here.
    pub fn has_atlas(&self) -> bool {
        self.path(PUBLICATIONS_FILE).exists()
    }

    fn path(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }

    fn save_inner(&self, atlas: &Atlas) -> StoreResult<()> {
        std::fs::create_dir_all(&self.dir).map_err(|source| StoreError::Io {
            path: self.dir.clone(),
            source,
        })?;

        // Projection goes first: every stage either shrinks it or adds rows for
        // identifiers the previous publications file already holds.
        let projection_path = self.path(PROJECTION_FILE);
        match atlas.projection() {
            Some(projection) => {
                let staging = staging_path(&projection_path);
                save_projection(&staging, projection)?;
                rename(&staging, &projection_path)?;
            }
            None => remove_if_exists(&projection_path)?,
        }

        write_json_atomically(&self.path(BAD_IDS_FILE), atlas.bad_ids())?;
        let publications: Vec<&Publication> = atlas.publications().collect();
        write_json_atomically(&self.path(PUBLICATIONS_FILE), &publications)?;
        write_json_atomically(
            &self.path(HISTORY_FILE),
            &HistoryFile {
                center: atlas.center().map(str::to_string),
                history: atlas.history().cloned(),
            },
        )?;
        Ok(())
    }

    fn load_inner(&self) -> StoreResult<Atlas> {
        let Some(publications) =
            read_json_if_exists::<Vec<Publication>>(&self.path(PUBLICATIONS_FILE))?
        else {
            return Ok(Atlas::new());
        };
        let bad_ids: BTreeSet<String> =
            read_json_if_exists(&self.path(BAD_IDS_FILE))?.unwrap_or_default();
        let history: HistoryFile =
            read_json_if_exists(&self.path(HISTORY_FILE))?.unwrap_or_default();
        let projection = load_projection(&self.path(PROJECTION_FILE))?;

        let atlas = Atlas::from_publications(publications)
            .with_projection(projection)
            .with_bad_ids(bad_ids)
            .with_center(history.center)
            .with_history(history.history);

        let orphaned = atlas.orphaned_projection_ids();
        if let Some(first) = orphaned.first() {
            return Err(StoreError::InvalidData(format!(
                "{} projected identifiers have no publication (first: `{first}`)",
                orphaned.len()
            )));
        }
        Ok(atlas)
    }
}

impl AtlasStore for DirectoryAtlasStore {
    fn save(&self, atlas: &Atlas) -> StoreResult<()> {
        let started_at = Instant::now();
        match self.save_inner(atlas) {
            Ok(()) => {
                info!(
                    "event=atlas_save module=store status=ok dir={} publications={} projected={} bad_ids={} duration_ms={}",
                    self.dir.display(),
                    atlas.len(),
                    atlas.projection().map_or(0, |projection| projection.len()),
                    atlas.bad_ids().len(),
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=atlas_save module=store status=error dir={} error={}",
                    self.dir.display(),
                    err
                );
                Err(err)
            }
        }
    }

    fn load(&self) -> StoreResult<Atlas> {
        let started_at = Instant::now();
        let atlas = self.load_inner()?;
        info!(
            "event=atlas_load module=store status=ok dir={} publications={} projected={} duration_ms={}",
            self.dir.display(),
            atlas.len(),
            atlas.projection().map_or(0, |projection| projection.len()),
            started_at.elapsed().as_millis()
        );
        Ok(atlas)
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_json_atomically<T: Serialize + ?Sized>(path: &Path, value: &T) -> StoreResult<()> {
    let bytes = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    let staging = staging_path(path);
    std::fs::write(&staging, bytes).map_err(|source| StoreError::Io {
        path: staging.clone(),
        source,
    })?;
    rename(&staging, path)
}

fn read_json_if_exists<T: DeserializeOwned>(path: &Path) -> StoreResult<Option<T>> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|source| StoreError::Json {
            path: path.to_path_buf(),
            source,
        })
}

fn rename(from: &Path, to: &Path) -> StoreResult<()> {
    std::fs::rename(from, to).map_err(|source| StoreError::Io {
        path: to.to_path_buf(),
        source,
    })
}
