use super::{StoreError, StoreResult};
use crate::db::open_db;
use crate::projection::{Embeddings, Projection};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

const DIMENSION_KEY: &str = "dimension";
const F32_BYTES: usize = std::mem::size_of::<f32>();

/// Writes `projection` into a fresh SQLite file at `path`.
///
/// Any existing file at `path` is replaced.
pub fn save_projection(path: &Path, projection: &Projection) -> StoreResult<()> {
    remove_if_exists(path)?;
    let mut conn = open_db(path)?;
    write_rows(&mut conn, projection)?;
    conn.close().map_err(|(_, err)| StoreError::from(err))?;
    Ok(())
}

/// Reads a projection file; `None` when the file does not exist.
pub fn load_projection(path: &Path) -> StoreResult<Option<Projection>> {
    if !path.exists() {
        return Ok(None);
    }
    let conn = open_db(path)?;
    read_rows(&conn).map(Some)
}

fn write_rows(conn: &mut Connection, projection: &Projection) -> StoreResult<()> {
    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO projection_meta (key, value) VALUES (?1, ?2)",
        params![DIMENSION_KEY, projection.dim().to_string()],
    )?;
    {
        let mut insert = tx.prepare(
            "INSERT INTO projection_rows (position, identifier, embedding) VALUES (?1, ?2, ?3)",
        )?;
        for (position, (identifier, row)) in projection
            .identifiers()
            .iter()
            .zip(projection.embeddings().iter_rows())
            .enumerate()
        {
            let position = i64::try_from(position)
                .map_err(|_| StoreError::InvalidData("projection too large".to_string()))?;
            insert.execute(params![position, identifier, encode_row(row)])?;
        }
    }
    tx.commit()?;
    Ok(())
}

fn read_rows(conn: &Connection) -> StoreResult<Projection> {
    let dim = conn
        .query_row(
            "SELECT value FROM projection_meta WHERE key = ?1",
            params![DIMENSION_KEY],
            |row| row.get::<_, String>(0),
        )
        .optional()?
        .map(|raw| {
            raw.parse::<usize>()
                .map_err(|_| StoreError::InvalidData(format!("bad projection dimension `{raw}`")))
        })
        .transpose()?
        .unwrap_or(0);

    let mut stmt =
        conn.prepare("SELECT identifier, embedding FROM projection_rows ORDER BY position ASC")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?))
    })?;

    let mut identifiers = Vec::new();
    let mut data = Vec::new();
    for row in rows {
        let (identifier, blob) = row?;
        if blob.len() != dim * F32_BYTES {
            return Err(StoreError::InvalidData(format!(
                "embedding for `{identifier}` has {} bytes, expected {}",
                blob.len(),
                dim * F32_BYTES
            )));
        }
        data.extend(decode_row(&blob));
        identifiers.push(identifier);
    }

    let embeddings = Embeddings::from_flat(dim, data)
        .map_err(|err| StoreError::InvalidData(err.to_string()))?;
    Projection::new(identifiers, embeddings).map_err(|err| StoreError::InvalidData(err.to_string()))
}

fn encode_row(row: &[f32]) -> Vec<u8> {
    row.iter().flat_map(|value| value.to_le_bytes()).collect()
}

fn decode_row(blob: &[u8]) -> impl Iterator<Item = f32> + '_ {
    blob.chunks_exact(F32_BYTES)
        .map(|bytes| f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

pub(super) fn remove_if_exists(path: &Path) -> StoreResult<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(StoreError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}
