//! Run metrics.
//!
//! Counts plan outcomes per run and mirrors them to the `metrics` crate
//! facade so any installed recorder (e.g. a Prometheus exporter) sees
//! them.

use metrics::{counter, describe_counter};
use serde::{Deserialize, Serialize};

/// Aggregated counts for one propagation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunSummary {
    /// Regions processed.
    pub regions: u64,
    /// Resources visited by the planner.
    pub resources_planned: u64,
    /// WRITE entries emitted.
    pub writes_planned: u64,
    /// Writes actually issued (apply mode only).
    pub writes_applied: u64,
    /// Writes that failed at the provider.
    pub writes_failed: u64,
    /// Entries skipped because the key was already present.
    pub skipped_already_tagged: u64,
    /// Entries skipped because no source name was available.
    pub skipped_no_source_name: u64,
    /// Orphan entries planned.
    pub orphans_planned: u64,
}

/// Records run progress into a [`RunSummary`] and the metrics facade.
#[derive(Debug, Default)]
pub struct RunMetrics {
    summary: RunSummary,
}

impl RunMetrics {
    pub fn new() -> Self {
        register_metrics();
        Self::default()
    }

    pub fn region_processed(&mut self) {
        self.summary.regions += 1;
        counter!("tp_regions_processed_total").increment(1);
    }

    pub fn write_planned(&mut self) {
        self.summary.resources_planned += 1;
        self.summary.writes_planned += 1;
        counter!("tp_writes_planned_total").increment(1);
    }

    pub fn write_applied(&mut self) {
        self.summary.writes_applied += 1;
        counter!("tp_writes_applied_total").increment(1);
    }

    pub fn write_failed(&mut self) {
        self.summary.writes_failed += 1;
        counter!("tp_writes_failed_total").increment(1);
    }

    pub fn skipped_already_tagged(&mut self) {
        self.summary.resources_planned += 1;
        self.summary.skipped_already_tagged += 1;
        counter!("tp_skips_total", "reason" => "already_tagged").increment(1);
    }

    pub fn skipped_no_source_name(&mut self) {
        self.summary.resources_planned += 1;
        self.summary.skipped_no_source_name += 1;
        counter!("tp_skips_total", "reason" => "no_source_name").increment(1);
    }

    pub fn orphan_planned(&mut self) {
        self.summary.orphans_planned += 1;
        counter!("tp_orphans_planned_total").increment(1);
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }
}

fn register_metrics() {
    describe_counter!("tp_regions_processed_total", "Regions processed");
    describe_counter!("tp_writes_planned_total", "Tag writes planned");
    describe_counter!("tp_writes_applied_total", "Tag writes issued");
    describe_counter!("tp_writes_failed_total", "Tag writes that failed");
    describe_counter!("tp_skips_total", "Plan entries skipped, by reason");
    describe_counter!("tp_orphans_planned_total", "Orphan fixes planned");
}
