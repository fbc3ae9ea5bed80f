// crates/scoring/src/pivot.rs
use crate::table::Table;
use common::{MetricColumn, MetricObservation, Period, ProjectKey, ScoringConfig};
use std::collections::{BTreeMap, BTreeSet};

/// Pivot row: one project on one chain
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChainRow {
    pub project: ProjectKey,
    pub chain: String,
}

/// Raw amounts by (project, chain) x (period, metric)
pub type PivotTable = Table<ChainRow, MetricColumn>;

/// Restrict observations to the configured metrics and periods, pivot them,
/// then apply the TVL floor.
pub fn pivot_and_floor<'a>(
    observations: impl IntoIterator<Item = &'a MetricObservation>,
    config: &ScoringConfig,
) -> PivotTable {
    let metrics: BTreeSet<&str> = config.pivot_metrics().into_iter().collect();

    let mut table = PivotTable::new();
    for period in Period::ALL {
        for metric in &metrics {
            table.add_column(MetricColumn::new(period, *metric));
        }
    }

    let mut rows_used = 0usize;
    for obs in observations {
        if !metrics.contains(obs.metric_name.as_str()) {
            continue;
        }
        let roles = config.periods.roles_of(&obs.measurement_period);
        if roles.is_empty() {
            continue;
        }
        rows_used += 1;

        let row = ChainRow {
            project: obs.project(),
            chain: obs.chain.clone(),
        };
        for period in roles {
            match obs.amount {
                Some(amount) => table.accumulate(
                    row.clone(),
                    MetricColumn::new(period, &obs.metric_name),
                    amount,
                ),
                // null amounts register the row but never a value
                None => table.add_row(row.clone()),
            }
        }
    }

    tracing::debug!(
        rows_used,
        pivot_rows = table.num_rows(),
        columns = table.num_columns(),
        "Pivoted raw metrics by chain"
    );

    if config.tvl_minimum > 0.0 {
        apply_tvl_floor(&mut table, config.tvl_minimum);
    }

    table
}

/// Null every TVL cell of a project whose TVL total for a period, summed over
/// its chains and TVL metrics, is below `minimum`. Periods are independent.
///
/// Returns the number of (project, period) pairs floored.
pub fn apply_tvl_floor(table: &mut PivotTable, minimum: f64) -> usize {
    let tvl_columns: Vec<MetricColumn> = table.columns().filter(|c| c.is_tvl()).cloned().collect();
    if tvl_columns.is_empty() {
        return 0;
    }

    let mut floored = 0;
    for period in Period::ALL {
        let columns: Vec<&MetricColumn> =
            tvl_columns.iter().filter(|c| c.period == period).collect();

        let mut totals: BTreeMap<&ProjectKey, f64> = BTreeMap::new();
        for row in table.rows() {
            let total: f64 = columns.iter().filter_map(|c| table.get(row, c)).sum();
            *totals.entry(&row.project).or_insert(0.0) += total;
        }

        let below: BTreeSet<ProjectKey> = totals
            .into_iter()
            .filter(|(_, total)| *total < minimum)
            .map(|(project, _)| project.clone())
            .collect();
        if below.is_empty() {
            continue;
        }

        let rows: Vec<ChainRow> = table
            .rows()
            .filter(|r| below.contains(&r.project))
            .cloned()
            .collect();
        for row in rows {
            for column in &columns {
                table.set(row.clone(), (*column).clone(), None);
            }
        }

        tracing::debug!(?period, projects = below.len(), minimum, "TVL floor applied");
        floored += below.len();
    }

    floored
}
