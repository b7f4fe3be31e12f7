//! Embedding matrix and identifier bijection.
//!
//! # Responsibility
//! - Hold dense row-major embeddings for the embedded subset of an atlas.
//! - Map identifiers to matrix rows and back.
//! - Merge new rows into an existing projection without re-embedding.
//!
//! # Invariants
//! - `identifier_to_index`, `index_to_identifier` and `embeddings` always
//!   describe the same number of rows and form a strict bijection.
//! - A projection is never edited in place; merge and retain return new values.
//!
//! # See also
//! - `cartography` for the stage that builds projections.

pub mod similarity;

use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub use similarity::{angular_distance, cosine_similarity, descending, rank_descending};

/// Projection-layer error for lookup and shape failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectionError {
    NotFound(String),
    IndexOutOfRange { index: usize, len: usize },
    DimensionMismatch { expected: usize, actual: usize },
    DuplicateIdentifier(String),
    RowCountMismatch { identifiers: usize, rows: usize },
    RaggedRows { expected: usize, actual: usize },
}

impl Display for ProjectionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(identifier) => {
                write!(f, "identifier `{identifier}` is not in the projection")
            }
            Self::IndexOutOfRange { index, len } => {
                write!(f, "projection index {index} out of range for {len} rows")
            }
            Self::DimensionMismatch { expected, actual } => write!(
                f,
                "embedding dimension mismatch: expected {expected}, got {actual}"
            ),
            Self::DuplicateIdentifier(identifier) => {
                write!(f, "identifier `{identifier}` appears twice in the projection")
            }
            Self::RowCountMismatch { identifiers, rows } => write!(
                f,
                "projection has {identifiers} identifiers but {rows} embedding rows"
            ),
            Self::RaggedRows { expected, actual } => write!(
                f,
                "embedding rows must share one width: expected {expected}, got {actual}"
            ),
        }
    }
}

impl Error for ProjectionError {}

pub type ProjectionResult<T> = Result<T, ProjectionError>;

/// Dense row-major `f32` matrix.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Embeddings {
    dim: usize,
    data: Vec<f32>,
}

impl Embeddings {
    /// Zero-row matrix with the given width.
    pub fn empty(dim: usize) -> Self {
        Self {
            dim,
            data: Vec::new(),
        }
    }

    /// Builds a matrix from flat row-major storage.
    pub fn from_flat(dim: usize, data: Vec<f32>) -> ProjectionResult<Self> {
        if dim == 0 {
            if data.is_empty() {
                return Ok(Self::empty(0));
            }
            return Err(ProjectionError::RaggedRows {
                expected: 0,
                actual: data.len(),
            });
        }
        if data.len() % dim != 0 {
            return Err(ProjectionError::RaggedRows {
                expected: dim,
                actual: data.len() % dim,
            });
        }
        Ok(Self { dim, data })
    }

    /// Builds a matrix from individual rows; all rows must share one width.
    pub fn from_rows<R>(rows: impl IntoIterator<Item = R>) -> ProjectionResult<Self>
    where
        R: AsRef<[f32]>,
    {
        let mut dim: Option<usize> = None;
        let mut data = Vec::new();
        for row in rows {
            let row = row.as_ref();
            match dim {
                None => dim = Some(row.len()),
                Some(expected) if expected != row.len() => {
                    return Err(ProjectionError::RaggedRows {
                        expected,
                        actual: row.len(),
                    })
                }
                Some(_) => {}
            }
            data.extend_from_slice(row);
        }
        let dim = dim.unwrap_or(0);
        if dim == 0 && !data.is_empty() {
            return Err(ProjectionError::RaggedRows {
                expected: 0,
                actual: data.len(),
            });
        }
        Ok(Self { dim, data })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn rows(&self) -> usize {
        if self.dim == 0 {
            0
        } else {
            self.data.len() / self.dim
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows() == 0
    }

    /// Row slice at `index`, if in range.
    pub fn row(&self, index: usize) -> Option<&[f32]> {
        if index >= self.rows() {
            return None;
        }
        let start = index * self.dim;
        Some(&self.data[start..start + self.dim])
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[f32]> {
        // chunks_exact panics on zero, so empty matrices iterate nothing.
        self.data.chunks_exact(self.dim.max(1)).take(self.rows())
    }

    pub fn as_flat(&self) -> &[f32] {
        &self.data
    }
}

/// Bijection between identifiers and embedding rows.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Projection {
    identifier_to_index: HashMap<String, usize>,
    index_to_identifier: Vec<String>,
    embeddings: Embeddings,
}

impl Projection {
    /// Builds a projection; row `i` belongs to `identifiers[i]`.
    ///
    /// # Errors
    /// - `RowCountMismatch` when the counts differ.
    /// - `DuplicateIdentifier` when an identifier repeats.
    pub fn new(identifiers: Vec<String>, embeddings: Embeddings) -> ProjectionResult<Self> {
        if identifiers.len() != embeddings.rows() {
            return Err(ProjectionError::RowCountMismatch {
                identifiers: identifiers.len(),
                rows: embeddings.rows(),
            });
        }
        let identifier_to_index = index_identifiers(&identifiers)?;
        Ok(Self {
            identifier_to_index,
            index_to_identifier: identifiers,
            embeddings,
        })
    }

    /// The zero-row projection.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.index_to_identifier.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index_to_identifier.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.embeddings.dim()
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.identifier_to_index.contains_key(identifier)
    }

    /// Identifiers in row order.
    pub fn identifiers(&self) -> &[String] {
        &self.index_to_identifier
    }

    pub fn embeddings(&self) -> &Embeddings {
        &self.embeddings
    }

    pub fn index_of(&self, identifier: &str) -> ProjectionResult<usize> {
        self.identifier_to_index
            .get(identifier)
            .copied()
            .ok_or_else(|| ProjectionError::NotFound(identifier.to_string()))
    }

    pub fn embedding_for(&self, identifier: &str) -> ProjectionResult<&[f32]> {
        let index = self.index_of(identifier)?;
        self.embeddings
            .row(index)
            .ok_or(ProjectionError::IndexOutOfRange {
                index,
                len: self.len(),
            })
    }

    /// Stacks the rows of `identifiers` in the given order.
    pub fn embeddings_for<S: AsRef<str>>(&self, identifiers: &[S]) -> ProjectionResult<Embeddings> {
        let mut data = Vec::with_capacity(identifiers.len() * self.dim());
        for identifier in identifiers {
            data.extend_from_slice(self.embedding_for(identifier.as_ref())?);
        }
        Embeddings::from_flat(self.dim(), data)
    }

    pub fn indices_to_identifiers(&self, indices: &[usize]) -> ProjectionResult<Vec<String>> {
        indices
            .iter()
            .map(|index| {
                self.index_to_identifier
                    .get(*index)
                    .cloned()
                    .ok_or(ProjectionError::IndexOutOfRange {
                        index: *index,
                        len: self.len(),
                    })
            })
            .collect()
    }

    pub fn identifiers_to_indices<S: AsRef<str>>(
        &self,
        identifiers: &[S],
    ) -> ProjectionResult<Vec<usize>> {
        identifiers
            .iter()
            .map(|identifier| self.index_of(identifier.as_ref()))
            .collect()
    }

    /// Concatenates `incoming` after `base` and rebuilds the index maps.
    ///
    /// Both operands must be disjoint. An empty operand adopts the other's
    /// dimension.
    pub fn merge(base: Option<&Projection>, incoming: Projection) -> ProjectionResult<Projection> {
        let Some(base) = base else {
            return Ok(incoming);
        };
        if base.is_empty() {
            return Ok(incoming);
        }
        if incoming.is_empty() {
            return Ok(base.clone());
        }
        if base.dim() != incoming.dim() {
            return Err(ProjectionError::DimensionMismatch {
                expected: base.dim(),
                actual: incoming.dim(),
            });
        }
        debug_assert!(
            incoming
                .index_to_identifier
                .iter()
                .all(|identifier| !base.contains(identifier)),
            "merged projections must be disjoint"
        );

        let mut identifiers = base.index_to_identifier.clone();
        identifiers.extend(incoming.index_to_identifier);
        let mut data = base.embeddings.data.clone();
        data.extend(incoming.embeddings.data);
        let embeddings = Embeddings::from_flat(base.dim(), data)?;
        Projection::new(identifiers, embeddings)
    }

    /// Keeps only rows whose identifier satisfies `keep`, preserving order.
    pub fn retain<F>(&self, mut keep: F) -> Projection
    where
        F: FnMut(&str) -> bool,
    {
        let dim = self.dim();
        let mut identifiers = Vec::with_capacity(self.len());
        let mut data = Vec::with_capacity(self.embeddings.data.len());
        for (identifier, row) in self
            .index_to_identifier
            .iter()
            .zip(self.embeddings.iter_rows())
        {
            if keep(identifier) {
                identifiers.push(identifier.clone());
                data.extend_from_slice(row);
            }
        }
        let identifier_to_index = identifiers
            .iter()
            .enumerate()
            .map(|(index, identifier)| (identifier.clone(), index))
            .collect();
        Projection {
            identifier_to_index,
            index_to_identifier: identifiers,
            embeddings: Embeddings { dim, data },
        }
    }

    /// Cosine similarity of `identifier`'s row against every row, in row order.
    pub fn similarity_to(&self, identifier: &str) -> ProjectionResult<Vec<f32>> {
        let anchor = self.embedding_for(identifier)?;
        Ok(self
            .embeddings
            .iter_rows()
            .map(|row| cosine_similarity(anchor, row))
            .collect())
    }
}

fn index_identifiers(identifiers: &[String]) -> ProjectionResult<HashMap<String, usize>> {
    let mut map = HashMap::with_capacity(identifiers.len());
    for (index, identifier) in identifiers.iter().enumerate() {
        if map.insert(identifier.clone(), index).is_some() {
            return Err(ProjectionError::DuplicateIdentifier(identifier.clone()));
        }
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::{Embeddings, Projection, ProjectionError};

    fn projection(ids: &[&str], rows: &[[f32; 2]]) -> Projection {
        Projection::new(
            ids.iter().map(|id| id.to_string()).collect(),
            Embeddings::from_rows(rows.iter()).expect("rows should be rectangular"),
        )
        .expect("projection should build")
    }

    #[test]
    fn from_rows_rejects_ragged_input() {
        let rows: Vec<Vec<f32>> = vec![vec![1.0, 2.0], vec![3.0]];
        let err = Embeddings::from_rows(rows).expect_err("ragged rows must fail");
        assert_eq!(
            err,
            ProjectionError::RaggedRows {
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn new_rejects_duplicate_identifiers() {
        let err = Projection::new(
            vec!["a".into(), "a".into()],
            Embeddings::from_rows([[1.0_f32], [2.0]]).expect("rectangular"),
        )
        .expect_err("duplicate ids must fail");
        assert_eq!(err, ProjectionError::DuplicateIdentifier("a".into()));
    }

    #[test]
    fn lookups_report_missing_and_out_of_range() {
        let p = projection(&["a", "b"], &[[1.0, 0.0], [0.0, 1.0]]);
        assert_eq!(
            p.embedding_for("z"),
            Err(ProjectionError::NotFound("z".into()))
        );
        assert_eq!(
            p.indices_to_identifiers(&[1, 5]),
            Err(ProjectionError::IndexOutOfRange { index: 5, len: 2 })
        );
        assert_eq!(p.identifiers_to_indices(&["b", "a"]), Ok(vec![1, 0]));
    }

    #[test]
    fn merge_rejects_dimension_mismatch() {
        let base = projection(&["a"], &[[1.0, 0.0]]);
        let incoming = Projection::new(
            vec!["b".into()],
            Embeddings::from_rows([[1.0_f32, 0.0, 0.0]]).expect("rectangular"),
        )
        .expect("valid projection");
        assert_eq!(
            Projection::merge(Some(&base), incoming),
            Err(ProjectionError::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        );
    }

    #[test]
    fn retain_splices_rows_and_rebuilds_maps() {
        let p = projection(&["a", "b", "c"], &[[1.0, 0.0], [0.0, 1.0], [1.0, 1.0]]);
        let kept = p.retain(|id| id != "b");
        assert_eq!(kept.identifiers(), &["a".to_string(), "c".to_string()]);
        assert_eq!(kept.embedding_for("c"), Ok(&[1.0_f32, 1.0][..]));
        assert_eq!(kept.index_of("c"), Ok(1));
    }

    #[test]
    fn similarity_to_scores_every_row() {
        let p = projection(&["a", "b"], &[[1.0, 0.0], [0.0, 1.0]]);
        let scores = p.similarity_to("a").expect("a is embedded");
        assert_eq!(scores.len(), 2);
        assert!((scores[0] - 1.0).abs() < 1e-6);
        assert!(scores[1].abs() < 1e-6);
    }
}
