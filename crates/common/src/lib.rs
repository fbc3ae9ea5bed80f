// crates/common/src/lib.rs
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod config;
pub mod error;

pub use config::{AggregationMethod, AllocationConfig, Periods, ScoringConfig};
pub use error::{Error, Result};

/// TVL metrics are recognised by name
pub fn is_tvl_metric(metric_name: &str) -> bool {
    metric_name.to_lowercase().contains("tvl")
}

/// Raw per-chain, per-period metric row, already joined with project eligibility
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricObservation {
    pub project_id: String,
    pub project_name: String,
    pub display_name: String,
    pub chain: String,
    pub metric_name: String,
    pub measurement_period: String,
    pub amount: Option<f64>,
    #[serde(default)]
    pub is_eligible: Option<bool>,
}

impl MetricObservation {
    pub fn project(&self) -> ProjectKey {
        ProjectKey {
            project_id: self.project_id.clone(),
            project_name: self.project_name.clone(),
            display_name: self.display_name.clone(),
        }
    }
}

/// Project identity. Ordering is by project_id first.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProjectKey {
    pub project_id: String,
    pub project_name: String,
    pub display_name: String,
}

impl ProjectKey {
    pub fn new(
        project_id: impl Into<String>,
        project_name: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            project_name: project_name.into(),
            display_name: display_name.into(),
        }
    }
}

impl fmt::Display for ProjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.display_name, self.project_id)
    }
}

/// Measurement window role
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Current,
    Previous,
}

impl Period {
    pub const ALL: [Period; 2] = [Period::Current, Period::Previous];
}

/// Derived view of a metric over the two periods
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Current-period level
    Adoption,
    /// Positive delta against the previous period
    Growth,
    /// Floor of the two periods
    Retention,
}

impl Variant {
    pub const ALL: [Variant; 3] = [Variant::Adoption, Variant::Growth, Variant::Retention];

    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Adoption => "adoption",
            Variant::Growth => "growth",
            Variant::Retention => "retention",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variant {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "adoption" => Ok(Variant::Adoption),
            "growth" => Ok(Variant::Growth),
            "retention" => Ok(Variant::Retention),
            other => Err(Error::InvalidConfig(format!("unknown metric variant '{}'", other))),
        }
    }
}

/// Column of the pivoted tables: one metric in one period
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MetricColumn {
    pub period: Period,
    pub metric: String,
}

impl MetricColumn {
    pub fn new(period: Period, metric: impl Into<String>) -> Self {
        Self {
            period,
            metric: metric.into(),
        }
    }

    pub fn is_tvl(&self) -> bool {
        is_tvl_metric(&self.metric)
    }
}

/// Column of the variant tables: one variant of one metric
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VariantColumn {
    pub metric: String,
    pub variant: Variant,
}

impl VariantColumn {
    pub fn new(metric: impl Into<String>, variant: Variant) -> Self {
        Self {
            metric: metric.into(),
            variant,
        }
    }
}

impl fmt::Display for VariantColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.metric, self.variant)
    }
}

/// Chain-weighted raw value kept on the final row for auditing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricCell {
    pub metric: String,
    pub period: Period,
    pub period_label: String,
    pub amount: Option<f64>,
}

/// Final scored project row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectScore {
    #[serde(flatten)]
    pub project: ProjectKey,
    pub metrics: Vec<MetricCell>,
    /// Aggregated score before normalisation. None when the project had no data.
    pub project_score: Option<f64>,
    /// Share of the total; sums to 1.0 across rows unless every score is zero
    pub weighted_score: f64,
    /// Score forced to zero by the TVL ceiling
    pub tvl_excluded: bool,
}

/// Project eligible for funding, with its renormalised share
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundingCandidate {
    #[serde(flatten)]
    pub project: ProjectKey,
    pub score: f64,
}

/// Allocator output row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardAllocation {
    #[serde(flatten)]
    pub project: ProjectKey,
    pub score: f64,
    pub reward_amount: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tvl_tagging() {
        assert!(is_tvl_metric("average_tvl_monthly"));
        assert!(is_tvl_metric("TVL"));
        assert!(!is_tvl_metric("gas_fees_monthly"));
        assert!(MetricColumn::new(Period::Current, "Average_TVL").is_tvl());
    }

    #[test]
    fn test_variant_parse() {
        assert_eq!("growth".parse::<Variant>().unwrap(), Variant::Growth);
        assert!("Growth".parse::<Variant>().is_err());
        assert_eq!(Variant::Retention.to_string(), "retention");
    }

    #[test]
    fn test_project_key_orders_by_id() {
        let a = ProjectKey::new("0xa", "zeta", "Zeta");
        let b = ProjectKey::new("0xb", "alpha", "Alpha");
        assert!(a < b);
    }

    #[test]
    fn test_observation_eligibility_defaults_to_absent() {
        let row: MetricObservation = serde_json::from_str(
            r#"{"project_id":"p1","project_name":"one","display_name":"One",
                "chain":"BASE","metric_name":"gas_fees","measurement_period":"Jun 2025",
                "amount":null}"#,
        )
        .unwrap();
        assert_eq!(row.is_eligible, None);
        assert_eq!(row.amount, None);
        assert_eq!(row.project().project_id, "p1");
    }
}
