//! Expansion loop controller.
//!
//! # Responsibility
//! - Sequence expand, project and track until the atlas is big enough or
//!   stops growing.
//! - Persist after every stage so an interrupted run loses at most one stage.
//!
//! # Invariants
//! - The failure counter resets on growth and grows by exactly one on an
//!   iteration that adds nothing.
//! - The loop always terminates: every iteration either grows the atlas or
//!   moves the failure counter towards its bound.
//! - Iteration numbers continue from the persisted history.
//!
//! # See also
//! - `cartography` for the individual stages.

mod tracer;

pub use tracer::{AtlasTracer, ExpansionSummary, TracerError};

use crate::atlas::Atlas;
use crate::cartography::{
    Cartographer, CartographyError, ExpandOptions, DEFAULT_CONVERGENCE_KERNEL_SIZE,
};
use crate::observer::IterationReport;
use crate::store::{AtlasStore, StoreError};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Default number of consecutive no-growth iterations tolerated.
pub const DEFAULT_MAX_FAILED_EXPANSIONS: usize = 2;

/// Loop-level knobs for [`iterate_expand`].
#[derive(Debug, Clone, PartialEq)]
pub struct ExpansionConfig {
    pub target_size: usize,
    pub max_failed_expansions: usize,
    pub expand: ExpandOptions,
    pub convergence_kernel_size: usize,
}

impl ExpansionConfig {
    pub fn new(target_size: usize) -> Self {
        Self {
            target_size,
            max_failed_expansions: DEFAULT_MAX_FAILED_EXPANSIONS,
            expand: ExpandOptions::default(),
            convergence_kernel_size: DEFAULT_CONVERGENCE_KERNEL_SIZE,
        }
    }
}

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    TargetReached,
    MaxFailures,
}

impl StopReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TargetReached => "target_reached",
            Self::MaxFailures => "max_failures",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpansionOutcome {
    pub atlas: Atlas,
    /// Iterations run by this call, not counting resumed history.
    pub iterations: usize,
    pub stop_reason: StopReason,
}

#[derive(Debug)]
pub enum ExpansionError {
    InvalidConfig(String),
    Cartography(CartographyError),
    Store(StoreError),
}

impl Display for ExpansionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidConfig(message) => write!(f, "invalid expansion config: {message}"),
            Self::Cartography(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ExpansionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidConfig(_) => None,
            Self::Cartography(err) => Some(err),
            Self::Store(err) => Some(err),
        }
    }
}

impl From<CartographyError> for ExpansionError {
    fn from(value: CartographyError) -> Self {
        Self::Cartography(value)
    }
}

impl From<StoreError> for ExpansionError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

pub type ExpansionResult<T> = Result<T, ExpansionError>;

/// Expands `atlas` until it holds `target_size` publications or has failed
/// to grow `max_failed_expansions` times in a row.
///
/// Each iteration runs expand, project and track, saving after each. After
/// the loop, convergence is measured and saved.
///
/// # Errors
/// - `InvalidConfig` when `max_failed_expansions` is zero.
/// - `Cartography` / `Store` when a stage or save fails; everything saved
///   before the failure stays on disk.
pub fn iterate_expand(
    atlas: Atlas,
    cartographer: &Cartographer,
    store: &dyn AtlasStore,
    config: &ExpansionConfig,
) -> ExpansionResult<ExpansionOutcome> {
    if config.max_failed_expansions == 0 {
        return Err(ExpansionError::InvalidConfig(
            "max_failed_expansions must be at least 1".to_string(),
        ));
    }

    let started_at = Instant::now();
    let mut atlas = atlas;
    let mut iteration = atlas.history().map_or(0, |history| history.updates());
    let mut iterations = 0;
    let mut failures = 0;

    let stop_reason = loop {
        if atlas.len() >= config.target_size {
            break StopReason::TargetReached;
        }
        if failures >= config.max_failed_expansions {
            break StopReason::MaxFailures;
        }

        iteration += 1;
        iterations += 1;
        let size_before = atlas.len();

        atlas = cartographer.expand(atlas, &config.expand)?;
        store.save(&atlas)?;
        atlas = cartographer.project(atlas)?;
        store.save(&atlas)?;
        atlas = cartographer.track(atlas);
        store.save(&atlas)?;

        if atlas.len() > size_before {
            failures = 0;
        } else {
            failures += 1;
        }

        cartographer.observer().on_iteration(&IterationReport {
            iteration,
            size_before,
            size_after: atlas.len(),
            failed_expansions: failures,
        });
    };

    atlas = cartographer.calculate_convergence(atlas, config.convergence_kernel_size);
    store.save(&atlas)?;

    info!(
        "event=iterate_expand module=expansion status=ok stop_reason={} iterations={} size={} duration_ms={}",
        stop_reason.as_str(),
        iterations,
        atlas.len(),
        started_at.elapsed().as_millis()
    );
    Ok(ExpansionOutcome {
        atlas,
        iterations,
        stop_reason,
    })
}
