//! Local topography of a projected atlas.
//!
//! Each publication is compared only against publications dated strictly
//! earlier, so no measurement uses information from its own future.

use crate::atlas::Atlas;
use crate::projection::{angular_distance, cosine_similarity, descending, ProjectionResult};
use chrono::NaiveDate;
use rayon::prelude::*;

/// One per-publication statistic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TopographyMetric {
    /// Angular distance (radians) to the farthest member of the kernel.
    SmoothingLength,
    /// Kernel size divided by the smoothing length.
    Density,
    /// Norm of the summed offsets to every prior publication.
    ConstantAsymmetry,
    /// Norm of the summed offsets to the kernel members.
    KernelConstantAsymmetry,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TopographyOptions {
    pub metrics: Vec<TopographyMetric>,
    pub min_prior_pubs: usize,
    pub kernel_size: usize,
    /// Restricts measurement to these identifiers; `None` measures every
    /// projected publication.
    pub identifiers: Option<Vec<String>>,
}

impl Default for TopographyOptions {
    fn default() -> Self {
        Self {
            metrics: vec![TopographyMetric::Density],
            min_prior_pubs: 2,
            kernel_size: 16,
            identifiers: None,
        }
    }
}

/// Metric values in `TopographyOptions::metrics` order; `None` when the
/// publication has too few prior publications or no date.
#[derive(Debug, Clone, PartialEq)]
pub struct TopographyRow {
    pub identifier: String,
    pub values: Option<Vec<f64>>,
}

/// Measures `options.metrics` for every selected projected publication.
///
/// # Errors
/// - `ProjectionError::NotFound` when a selected identifier is not projected.
pub fn measure_topography(
    atlas: &Atlas,
    options: &TopographyOptions,
) -> ProjectionResult<Vec<TopographyRow>> {
    let Some(projection) = atlas.projection() else {
        return Ok(Vec::new());
    };
    let indices = match &options.identifiers {
        Some(identifiers) => projection.identifiers_to_indices(identifiers.as_slice())?,
        None => (0..projection.len()).collect(),
    };
    let dates: Vec<Option<NaiveDate>> = projection
        .identifiers()
        .iter()
        .map(|identifier| {
            atlas
                .get(identifier)
                .ok()
                .and_then(|publication| publication.publication_date())
        })
        .collect();

    let rows: Vec<&[f32]> = projection.embeddings().iter_rows().collect();
    let measured: Vec<TopographyRow> = indices
        .par_iter()
        .map(|&index| {
            let identifier = projection.identifiers()[index].clone();
            let Some(date) = dates[index] else {
                return TopographyRow {
                    identifier,
                    values: None,
                };
            };
            let prior: Vec<usize> = dates
                .iter()
                .enumerate()
                .filter(|(other, other_date)| {
                    *other != index && other_date.is_some_and(|other_date| other_date < date)
                })
                .map(|(other, _)| other)
                .collect();
            if prior.len() < options.min_prior_pubs {
                return TopographyRow {
                    identifier,
                    values: None,
                };
            }

            let anchor = rows[index];
            let mut ranked: Vec<(usize, f32)> = prior
                .iter()
                .map(|&other| (other, cosine_similarity(anchor, rows[other])))
                .collect();
            ranked.sort_by(|left, right| descending(left.1, right.1));
            let kernel: Vec<usize> = ranked
                .iter()
                .take(options.kernel_size)
                .map(|(other, _)| *other)
                .collect();

            let smoothing_length = kernel
                .iter()
                .map(|&other| angular_distance(anchor, rows[other]))
                .fold(0.0_f64, f64::max);
            let values = options
                .metrics
                .iter()
                .map(|metric| match metric {
                    TopographyMetric::SmoothingLength => smoothing_length,
                    TopographyMetric::Density => kernel.len() as f64 / smoothing_length,
                    TopographyMetric::ConstantAsymmetry => asymmetry(anchor, &rows, &prior),
                    TopographyMetric::KernelConstantAsymmetry => {
                        asymmetry(anchor, &rows, &kernel)
                    }
                })
                .collect::<Vec<f64>>();
            TopographyRow {
                identifier,
                values: Some(values),
            }
        })
        .collect();
    Ok(measured)
}

fn asymmetry(anchor: &[f32], rows: &[&[f32]], others: &[usize]) -> f64 {
    let mut offset = vec![0.0_f64; anchor.len()];
    for &other in others {
        for (sum, (a, b)) in offset.iter_mut().zip(anchor.iter().zip(rows[other].iter())) {
            *sum += f64::from(*a) - f64::from(*b);
        }
    }
    offset.iter().map(|v| v * v).sum::<f64>().sqrt()
}
