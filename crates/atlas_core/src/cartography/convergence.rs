use super::Cartographer;
use crate::atlas::{Atlas, KernelHistory};
use crate::projection::{cosine_similarity, rank_descending, Projection};
use log::{info, warn};
use rayon::prelude::*;
use std::collections::HashSet;

/// Default neighbourhood size used for convergence measurement.
pub const DEFAULT_CONVERGENCE_KERNEL_SIZE: usize = 16;

impl Cartographer {
    /// Records, for each embedded publication, how much of its current
    /// `kernel_size`-nearest neighbourhood existed at every tracked update.
    ///
    /// Rows follow projection order. An atlas without projection or history
    /// is returned unchanged.
    pub fn calculate_convergence(&self, atlas: Atlas, kernel_size: usize) -> Atlas {
        let measured = match (
            atlas.projection().filter(|projection| !projection.is_empty()),
            atlas.history(),
        ) {
            (Some(projection), Some(history)) => {
                Some(kernel_history(projection, &history.pubs_per_update, kernel_size))
            }
            _ => None,
        };
        let Some(kernels) = measured else {
            warn!(
                "event=calculate_convergence module=cartography status=warn reason=no_projection_or_history"
            );
            return atlas;
        };

        info!(
            "event=calculate_convergence module=cartography status=ok publications={} updates={} kernel_size={}",
            kernels.identifiers.len(),
            kernels.counts.first().map_or(0, Vec::len),
            kernel_size
        );
        let mut atlas = atlas;
        if let Some(history) = atlas.history.as_mut() {
            history.kernel_size = Some(kernels);
        }
        atlas
    }
}

fn kernel_history(
    projection: &Projection,
    pubs_per_update: &[Vec<String>],
    kernel_size: usize,
) -> KernelHistory {
    let updates: Vec<HashSet<&str>> = pubs_per_update
        .iter()
        .map(|identifiers| identifiers.iter().map(String::as_str).collect())
        .collect();
    let counts: Vec<Vec<usize>> = (0..projection.len())
        .into_par_iter()
        .map(|index| {
            let kernel = nearest_neighbours(projection, index, kernel_size);
            updates
                .iter()
                .map(|present| {
                    kernel
                        .iter()
                        .filter(|identifier| present.contains(identifier.as_str()))
                        .count()
                })
                .collect::<Vec<usize>>()
        })
        .collect();

    KernelHistory {
        kernel_size,
        identifiers: projection.identifiers().to_vec(),
        counts,
    }
}

/// Identifiers of the `k` rows most similar to `index`, excluding itself.
pub(crate) fn nearest_neighbours(projection: &Projection, index: usize, k: usize) -> Vec<String> {
    let embeddings = projection.embeddings();
    let Some(anchor) = embeddings.row(index) else {
        return Vec::new();
    };
    let scores: Vec<f32> = embeddings
        .iter_rows()
        .map(|row| cosine_similarity(anchor, row))
        .collect();
    rank_descending(&scores)
        .into_iter()
        .filter(|candidate| *candidate != index)
        .take(k)
        .filter_map(|candidate| projection.identifiers().get(candidate).cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::nearest_neighbours;
    use crate::projection::{Embeddings, Projection};

    #[test]
    fn nearest_neighbours_exclude_self_and_rank_by_similarity() {
        let projection = Projection::new(
            vec!["a".into(), "b".into(), "c".into()],
            Embeddings::from_rows([[1.0_f32, 0.0], [0.0, 1.0], [0.9, 0.1]]).expect("rectangular"),
        )
        .expect("valid projection");

        assert_eq!(nearest_neighbours(&projection, 0, 1), vec!["c"]);
        assert_eq!(nearest_neighbours(&projection, 0, 5), vec!["c", "b"]);
    }
}
