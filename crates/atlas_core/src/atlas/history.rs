use serde::{Deserialize, Serialize};

/// Per-publication kernel stability measured against each recorded update.
///
/// `counts[i][t]` is how many of `identifiers[i]`'s nearest neighbours were
/// already in the atlas at update `t`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KernelHistory {
    pub kernel_size: usize,
    pub identifiers: Vec<String>,
    pub counts: Vec<Vec<usize>>,
}

/// Record of which publications the atlas held after each expansion.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AtlasHistory {
    pub pubs_per_update: Vec<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kernel_size: Option<KernelHistory>,
}

impl AtlasHistory {
    /// Number of recorded updates.
    pub fn updates(&self) -> usize {
        self.pubs_per_update.len()
    }

    /// Identifiers whose full kernel was already present `lookback` updates ago.
    ///
    /// `lookback = 1` refers to the latest update. Returns an empty list when
    /// convergence has not been measured, when `lookback` is zero, or when it
    /// reaches further back than the measured history.
    pub fn converged_identifiers(&self, kernel_size: usize, lookback: usize) -> Vec<String> {
        let Some(kernels) = &self.kernel_size else {
            return Vec::new();
        };
        if lookback == 0 {
            return Vec::new();
        }
        kernels
            .identifiers
            .iter()
            .zip(kernels.counts.iter())
            .filter(|(_, counts)| {
                lookback <= counts.len() && counts[counts.len() - lookback] >= kernel_size
            })
            .map(|(identifier, _)| identifier.clone())
            .collect()
    }
}
