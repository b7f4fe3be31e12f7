//! Pipeline event reporting.
//!
//! Stages hand a small report to an injected [`ExpansionObserver`] instead of
//! writing to shared state. [`LogObserver`] turns reports into log lines.

use log::{info, warn};

/// Outcome of one filter pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterReport {
    pub before: usize,
    pub removed: Vec<String>,
}

/// Outcome of one projection pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectReport {
    pub embedded: usize,
    pub projected_total: usize,
    pub dropped_unprojected: usize,
}

/// Outcome of one expansion pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandReport {
    pub sources: usize,
    pub candidates: usize,
    pub requested: usize,
    pub fetched: usize,
}

/// Outcome of one loop iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IterationReport {
    pub iteration: usize,
    pub size_before: usize,
    pub size_after: usize,
    pub failed_expansions: usize,
}

/// Receives pipeline events; every hook defaults to a no-op.
pub trait ExpansionObserver: Send + Sync {
    fn on_filter(&self, _report: &FilterReport) {}
    fn on_project(&self, _report: &ProjectReport) {}
    fn on_expand(&self, _report: &ExpandReport) {}
    fn on_iteration(&self, _report: &IterationReport) {}
}

/// Observer that writes `event=... module=...` log lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl ExpansionObserver for LogObserver {
    fn on_filter(&self, report: &FilterReport) {
        if report.removed.is_empty() {
            return;
        }
        info!(
            "event=filter module=cartography status=ok before={} removed={}",
            report.before,
            report.removed.len()
        );
    }

    fn on_project(&self, report: &ProjectReport) {
        info!(
            "event=project module=cartography status=ok embedded={} projected_total={} dropped={}",
            report.embedded, report.projected_total, report.dropped_unprojected
        );
    }

    fn on_expand(&self, report: &ExpandReport) {
        if report.fetched == 0 {
            warn!(
                "event=expand module=cartography status=warn sources={} candidates={} requested={} fetched=0",
                report.sources, report.candidates, report.requested
            );
            return;
        }
        info!(
            "event=expand module=cartography status=ok sources={} candidates={} requested={} fetched={}",
            report.sources, report.candidates, report.requested, report.fetched
        );
    }

    fn on_iteration(&self, report: &IterationReport) {
        info!(
            "event=expansion_iteration module=expansion status=ok iteration={} size_before={} size_after={} failed_expansions={}",
            report.iteration, report.size_before, report.size_after, report.failed_expansions
        );
    }
}
