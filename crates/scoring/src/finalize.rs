// crates/scoring/src/finalize.rs
use crate::aggregate::ProjectScores;
use crate::chains::ChainWeightedTable;
use common::{MetricCell, Period, ProjectKey, ProjectScore, ScoringConfig};
use ordered_float::OrderedFloat;
use std::cmp::Reverse;
use std::collections::BTreeSet;

/// Current-period TVL per project, summed over every TVL metric. Nulls count as zero.
pub fn current_tvl(chain_weighted: &ChainWeightedTable, project: &ProjectKey) -> f64 {
    chain_weighted
        .cells(project)
        .filter(|(c, _)| c.period == Period::Current && c.is_tvl())
        .map(|(_, v)| v)
        .sum()
}

/// Projects whose current-period TVL is strictly above `maximum`
pub fn over_tvl_maximum(chain_weighted: &ChainWeightedTable, maximum: f64) -> BTreeSet<ProjectKey> {
    chain_weighted
        .rows()
        .filter(|p| current_tvl(chain_weighted, p) > maximum)
        .cloned()
        .collect()
}

/// Divide by the total; leave everything as is when the total is zero
pub fn normalize_to_unit_sum(scores: &[Option<f64>]) -> Vec<Option<f64>> {
    let total: f64 = scores.iter().flatten().sum();
    if total == 0.0 {
        return scores.to_vec();
    }
    scores.iter().map(|s| s.map(|v| v / total)).collect()
}

/// Apply the TVL ceiling, normalize scores to sum to one, and build the
/// final rows sorted by descending share.
///
/// Rows come out of the chain-weighted table in project order, so equal
/// shares keep project_id order after the stable sort.
pub fn finalize(
    chain_weighted: &ChainWeightedTable,
    scores: &ProjectScores,
    config: &ScoringConfig,
) -> Vec<ProjectScore> {
    let excluded = if config.tvl_maximum > 0.0 {
        over_tvl_maximum(chain_weighted, config.tvl_maximum)
    } else {
        BTreeSet::new()
    };
    if !excluded.is_empty() {
        tracing::info!(
            projects = excluded.len(),
            tvl_maximum = config.tvl_maximum,
            "TVL maximum filter zeroed project scores"
        );
        metrics::counter!("scoring_tvl_excluded_projects").increment(excluded.len() as u64);
    }

    let projects: Vec<&ProjectKey> = chain_weighted.rows().collect();
    let filtered: Vec<Option<f64>> = projects
        .iter()
        .map(|p| {
            if excluded.contains(*p) {
                Some(0.0)
            } else {
                scores.get(*p).copied().flatten()
            }
        })
        .collect();
    let normalized = normalize_to_unit_sum(&filtered);

    let mut results: Vec<ProjectScore> = projects
        .into_iter()
        .zip(filtered)
        .zip(normalized)
        .map(|((project, project_score), weighted)| ProjectScore {
            project: project.clone(),
            metrics: metric_cells(chain_weighted, project, config),
            project_score,
            weighted_score: weighted.unwrap_or(0.0),
            tvl_excluded: excluded.contains(project),
        })
        .collect();

    results.sort_by_key(|r| Reverse(OrderedFloat(r.weighted_score)));
    results
}

fn metric_cells(
    chain_weighted: &ChainWeightedTable,
    project: &ProjectKey,
    config: &ScoringConfig,
) -> Vec<MetricCell> {
    chain_weighted
        .columns()
        .map(|column| MetricCell {
            metric: column.metric.clone(),
            period: column.period,
            period_label: config.periods.label(column.period).to_string(),
            amount: chain_weighted.get(project, column),
        })
        .collect()
}
