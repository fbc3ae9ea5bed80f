// crates/scoring/src/variants.rs
use crate::chains::ChainWeightedTable;
use crate::table::Table;
use common::{MetricColumn, Period, ProjectKey, ScoringConfig, Variant, VariantColumn};

/// One row per project, one column per (metric, variant)
pub type VariantTable = Table<ProjectKey, VariantColumn>;

pub fn adoption(current: Option<f64>) -> Option<f64> {
    current
}

/// Positive change since the previous period; null when either side is missing
pub fn growth(current: Option<f64>, previous: Option<f64>) -> Option<f64> {
    Some((current? - previous?).max(0.0))
}

/// Lower of the two periods; null unless both are present
pub fn retention(current: Option<f64>, previous: Option<f64>) -> Option<f64> {
    Some(current?.min(previous?))
}

/// Derive adoption, growth and retention for every metric with a nonzero weight.
pub fn derive_variants(
    chain_weighted: &ChainWeightedTable,
    config: &ScoringConfig,
) -> VariantTable {
    let metrics = config.scored_metrics();

    let mut out = VariantTable::new();
    for metric in &metrics {
        for variant in Variant::ALL {
            out.add_column(VariantColumn::new(*metric, variant));
        }
    }

    for project in chain_weighted.rows() {
        out.add_row(project.clone());
        for metric in &metrics {
            let current = chain_weighted.get(project, &MetricColumn::new(Period::Current, *metric));
            let previous =
                chain_weighted.get(project, &MetricColumn::new(Period::Previous, *metric));

            let derived = [
                (Variant::Adoption, adoption(current)),
                (Variant::Growth, growth(current, previous)),
                (Variant::Retention, retention(current, previous)),
            ];
            for (variant, value) in derived {
                if value.is_some() {
                    out.set(project.clone(), VariantColumn::new(*metric, variant), value);
                }
            }
        }
    }

    tracing::debug!(
        projects = out.num_rows(),
        columns = out.num_columns(),
        "Computed metric variants"
    );
    out
}
