// crates/scoring/src/chains.rs
use crate::pivot::PivotTable;
use crate::table::Table;
use common::{MetricColumn, ProjectKey, ScoringConfig};
use itertools::Itertools;

/// Chain-weighted amounts summed over chains, one row per project
pub type ChainWeightedTable = Table<ProjectKey, MetricColumn>;

const DEFAULT_CHAIN_WEIGHT: f64 = 1.0;

/// Multiply each chain row by its chain weight and collapse the chain dimension.
pub fn weight_and_sum_chains(pivot: &PivotTable, config: &ScoringConfig) -> ChainWeightedTable {
    let weights = config.chain_weights();

    let mut out = ChainWeightedTable::new();
    for column in pivot.columns() {
        out.add_column(column.clone());
    }

    for row in pivot.rows() {
        let weight = weights
            .get(&row.chain.to_uppercase())
            .copied()
            .unwrap_or(DEFAULT_CHAIN_WEIGHT);

        out.add_row(row.project.clone());
        for (column, value) in pivot.cells(row) {
            out.accumulate(row.project.clone(), column.clone(), value * weight);
        }
    }

    let unmapped = pivot
        .rows()
        .map(|r| r.chain.to_uppercase())
        .filter(|c| !weights.contains_key(c))
        .unique()
        .collect::<Vec<_>>();
    if !unmapped.is_empty() {
        tracing::debug!(chains = %unmapped.join(","), "Chains without a configured weight use 1.0");
    }

    tracing::debug!(projects = out.num_rows(), "Summed chain-weighted metrics");
    out
}
