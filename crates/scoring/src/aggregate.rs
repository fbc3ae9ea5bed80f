// crates/scoring/src/aggregate.rs
use crate::variants::VariantTable;
use common::{AggregationMethod, ProjectKey};
use std::collections::BTreeMap;

/// Aggregated score per project; None when the project had no non-null cell
pub type ProjectScores = BTreeMap<ProjectKey, Option<f64>>;

/// (Σ xᵖ / n)^(1/p) over the given cells; None for no cells
pub fn power_mean(cells: &[f64], exponent: f64) -> Option<f64> {
    if cells.is_empty() {
        return None;
    }
    let sum: f64 = cells.iter().map(|c| c.powf(exponent)).sum();
    Some((sum / cells.len() as f64).powf(1.0 / exponent))
}

pub fn score_cells(cells: &[f64], method: AggregationMethod) -> Option<f64> {
    match method {
        AggregationMethod::PowerMean { exponent } => power_mean(cells, exponent),
        AggregationMethod::Sum => Some(cells.iter().sum()),
    }
}

/// Collapse every project's weighted variant cells into one score.
pub fn aggregate_scores(weighted: &VariantTable, method: AggregationMethod) -> ProjectScores {
    let scores: ProjectScores = weighted
        .rows()
        .map(|project| {
            let cells: Vec<f64> = weighted.cells(project).map(|(_, v)| v).collect();
            (project.clone(), score_cells(&cells, method))
        })
        .collect();

    let without_data = scores.values().filter(|s| s.is_none()).count();
    if without_data > 0 {
        tracing::debug!(projects = without_data, "Projects without any scored data");
    }
    tracing::debug!(projects = scores.len(), ?method, "Aggregated project scores");
    scores
}
