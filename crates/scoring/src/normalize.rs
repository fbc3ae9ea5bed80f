// crates/scoring/src/normalize.rs
use crate::variants::VariantTable;

/// Percentile of an ascending-sorted slice with linear interpolation between
/// closest ranks. `pct` is in [0, 100].
pub fn percentile(sorted: &[f64], pct: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let rank = (pct / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Min-max scale to [0, 1] with optional percentile capping.
///
/// Nulls stay null and never enter the cap, min or max. When every non-null
/// value is equal they all scale to 1.0.
pub fn minmax_scale(values: &[Option<f64>], percentile_cap: f64) -> Vec<Option<f64>> {
    let mut present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        return values.to_vec();
    }

    let cap = if percentile_cap < 100.0 {
        present.sort_by(f64::total_cmp);
        percentile(&present, percentile_cap)
    } else {
        None
    };
    let clip = |v: f64| cap.map_or(v, |c| v.min(c));

    let (min, max) = present
        .iter()
        .map(|v| clip(*v))
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));

    values
        .iter()
        .map(|v| {
            v.map(|v| {
                if max == min {
                    1.0
                } else {
                    (clip(v) - min) / (max - min)
                }
            })
        })
        .collect()
}

/// Scale every variant column independently across all projects.
pub fn normalize_variants(variants: &VariantTable, percentile_cap: f64) -> VariantTable {
    let mut out = variants.clone();
    for column in variants.columns() {
        let scaled = minmax_scale(&variants.column(column), percentile_cap);
        out.replace_column(column, scaled);
    }

    tracing::debug!(
        columns = out.num_columns(),
        percentile_cap,
        "Normalized metric variants"
    );
    out
}
