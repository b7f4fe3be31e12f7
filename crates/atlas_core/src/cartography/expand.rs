use super::{Cartographer, CartographyResult};
use crate::atlas::Atlas;
use crate::librarian::FetchOptions;
use crate::model::publication::Publication;
use crate::observer::ExpandReport;
use crate::projection::rank_descending;
use rand::seq::SliceRandom;
use std::collections::{BTreeMap, HashSet};
use std::sync::PoisonError;

/// Default cap on identifiers requested per expansion.
pub const DEFAULT_N_PUBS_MAX: usize = 4000;

/// Knobs for one [`Cartographer::expand`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandOptions {
    /// Similarity anchor; `None` follows every publication's edges.
    pub center: Option<String>,
    /// Upper bound on identifiers sent to the librarian.
    pub n_pubs_max: usize,
    /// With a center: how many nearest publications besides the center
    /// contribute edges. Without one: how many publications contribute.
    pub n_sources_max: Option<usize>,
    pub fetch: FetchOptions,
}

impl Default for ExpandOptions {
    fn default() -> Self {
        Self {
            center: None,
            n_pubs_max: DEFAULT_N_PUBS_MAX,
            n_sources_max: None,
            fetch: FetchOptions::default(),
        }
    }
}

impl Cartographer {
    /// Grows the atlas by one layer of citation edges.
    ///
    /// With a center, sources are visited nearest first and candidate
    /// collection stops as soon as it exceeds `n_pubs_max`. This is a greedy
    /// cut, not an exact top-k over all sources. Oversized candidate sets are
    /// then sampled uniformly down to `n_pubs_max`.
    ///
    /// Prior publications take precedence over refetched ones; projection,
    /// `bad_ids`, center and history carry forward unchanged.
    ///
    /// # Errors
    /// - `Projection(NotFound)` when the center has no projection row.
    /// - Any `project` error when a centered expansion has to project first.
    pub fn expand(&self, atlas: Atlas, options: &ExpandOptions) -> CartographyResult<Atlas> {
        let atlas = if options.center.is_some() && atlas.projection.is_none() {
            self.project(atlas)?
        } else {
            atlas
        };

        let sources = expansion_sources(&atlas, options)?;
        let candidates = collect_candidates(&atlas, &sources, options);
        let candidate_count = candidates.len();
        let requested = self.sample(candidates, options.n_pubs_max);
        debug_assert!(requested.len() <= options.n_pubs_max);

        let fetched: Vec<Publication> = if requested.is_empty() {
            Vec::new()
        } else {
            self.librarian
                .get_publications(&requested, &options.fetch)
                .into_iter()
                .flatten()
                .collect()
        };

        let size_before = atlas.len();
        let expanded = merge_fetched(atlas, fetched);
        self.observer().on_expand(&ExpandReport {
            sources: sources.len(),
            candidates: candidate_count,
            requested: requested.len(),
            fetched: expanded.len() - size_before,
        });
        Ok(expanded)
    }

    fn sample(&self, candidates: Vec<String>, n_pubs_max: usize) -> Vec<String> {
        if candidates.len() <= n_pubs_max {
            return candidates;
        }
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        candidates
            .choose_multiple(&mut *rng, n_pubs_max)
            .cloned()
            .collect()
    }
}

/// Publications whose edges are followed, highest priority first.
fn expansion_sources(atlas: &Atlas, options: &ExpandOptions) -> CartographyResult<Vec<String>> {
    if let (Some(center), Some(projection)) = (&options.center, atlas.projection()) {
        if !projection.is_empty() {
            let scores = projection.similarity_to(center)?;
            let ranked = projection.indices_to_identifiers(&rank_descending(&scores))?;
            let mut sources = Vec::with_capacity(ranked.len());
            sources.push(center.clone());
            sources.extend(ranked.into_iter().filter(|identifier| identifier != center));
            if let Some(max) = options.n_sources_max {
                sources.truncate(max.saturating_add(1));
            }
            return Ok(sources);
        }
    }

    let mut sources: Vec<String> = atlas.identifiers().map(str::to_string).collect();
    if let Some(max) = options.n_sources_max {
        sources.truncate(max);
    }
    Ok(sources)
}

/// Unknown, not-bad edge targets of `sources`, in discovery order.
fn collect_candidates(atlas: &Atlas, sources: &[String], options: &ExpandOptions) -> Vec<String> {
    let greedy = options.center.is_some();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut candidates = Vec::new();
    for source in sources {
        let Ok(publication) = atlas.get(source) else {
            continue;
        };
        for edge in publication.edges() {
            if atlas.contains(edge) || atlas.is_bad(edge) || !seen.insert(edge) {
                continue;
            }
            candidates.push(edge.to_string());
        }
        if greedy && candidates.len() > options.n_pubs_max {
            break;
        }
    }
    candidates
}

fn merge_fetched(prior: Atlas, fetched: Vec<Publication>) -> Atlas {
    let mut publications: BTreeMap<String, Publication> = fetched
        .into_iter()
        .map(|publication| (publication.identifier().to_string(), publication))
        .collect();
    publications.extend(prior.publications);
    Atlas {
        publications,
        projection: prior.projection,
        bad_ids: prior.bad_ids,
        center: prior.center,
        history: prior.history,
    }
}
