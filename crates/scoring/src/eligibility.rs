// crates/scoring/src/eligibility.rs
use common::MetricObservation;
use itertools::Itertools;

/// What the eligibility filter removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EligibilitySummary {
    pub enabled: bool,
    pub rows_in: usize,
    pub rows_kept: usize,
    pub projects_dropped: usize,
}

/// Drop rows of projects flagged ineligible. Rows without a flag are eligible.
pub fn filter_eligible(
    observations: &[MetricObservation],
    enabled: bool,
) -> (Vec<&MetricObservation>, EligibilitySummary) {
    if !enabled {
        let summary = EligibilitySummary {
            enabled,
            rows_in: observations.len(),
            rows_kept: observations.len(),
            projects_dropped: 0,
        };
        return (observations.iter().collect(), summary);
    }

    let (kept, dropped): (Vec<&MetricObservation>, Vec<&MetricObservation>) = observations
        .iter()
        .partition(|o| o.is_eligible != Some(false));

    let projects_dropped = dropped.iter().map(|o| o.project_id.as_str()).unique().count();

    if !dropped.is_empty() {
        tracing::info!(
            rows = dropped.len(),
            projects = projects_dropped,
            "Eligibility filter removed ineligible projects"
        );
        metrics::counter!("scoring_ineligible_rows_dropped").increment(dropped.len() as u64);
    }

    let summary = EligibilitySummary {
        enabled,
        rows_in: observations.len(),
        rows_kept: kept.len(),
        projects_dropped,
    };
    (kept, summary)
}
