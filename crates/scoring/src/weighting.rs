// crates/scoring/src/weighting.rs
use crate::variants::VariantTable;
use common::{ScoringConfig, VariantColumn};

/// metric weight x variant weight, or None when either is not configured
pub fn column_weight(config: &ScoringConfig, column: &VariantColumn) -> Option<f64> {
    let metric = config.metric_weight(&column.metric)?;
    let variant = config.variant_weight(column.variant)?;
    Some(metric * variant)
}

/// Scale each normalized variant column by its configured weight.
/// Columns without a configured weight are left unchanged.
pub fn apply_weights(normalized: &VariantTable, config: &ScoringConfig) -> VariantTable {
    let mut out = normalized.clone();
    for column in normalized.columns() {
        match column_weight(config, column) {
            Some(weight) => out.update_column(column, |v| v * weight),
            None => tracing::debug!(%column, "No weight configured, column left unweighted"),
        }
    }
    out
}
