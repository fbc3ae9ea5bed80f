// crates/common/src/config.rs
use crate::{is_tvl_metric, Error, Period, Result, Variant};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_PERCENTILE_CAP: f64 = 100.0;
pub const DEFAULT_AGGREGATION_METHOD: &str = "power_mean";
pub const DEFAULT_POWER_MEAN_EXPONENT: f64 = 2.0;

fn default_percentile_cap() -> f64 {
    DEFAULT_PERCENTILE_CAP
}

fn default_aggregation_method() -> String {
    DEFAULT_AGGREGATION_METHOD.to_string()
}

fn default_power_mean_exponent() -> f64 {
    DEFAULT_POWER_MEAN_EXPONENT
}

/// Period labels for the two measurement windows
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Periods {
    #[serde(default)]
    pub current: String,
    #[serde(default)]
    pub previous: String,
}

impl Periods {
    pub fn new(current: impl Into<String>, previous: impl Into<String>) -> Self {
        Self {
            current: current.into(),
            previous: previous.into(),
        }
    }

    pub fn label(&self, period: Period) -> &str {
        match period {
            Period::Current => &self.current,
            Period::Previous => &self.previous,
        }
    }

    /// Roles a raw period label plays. Both when current and previous share a label.
    pub fn roles_of(&self, label: &str) -> Vec<Period> {
        Period::ALL
            .into_iter()
            .filter(|p| self.label(*p) == label)
            .collect()
    }
}

/// How weighted variant cells collapse into one project score
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AggregationMethod {
    PowerMean { exponent: f64 },
    Sum,
}

/// Scoring simulation parameters. Immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default)]
    pub periods: Periods,
    /// Chain code -> weight. Codes match case-insensitively; unmapped chains weigh 1.0.
    #[serde(default)]
    pub chains: BTreeMap<String, f64>,
    /// Metric name -> weight. Zero drops the metric from scoring.
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
    /// Variant name (adoption, growth, retention) -> weight.
    #[serde(default)]
    pub metric_variants: BTreeMap<String, f64>,
    #[serde(default)]
    pub tvl_minimum: f64,
    #[serde(default)]
    pub tvl_maximum: f64,
    #[serde(default)]
    pub eligibility_filter: bool,
    #[serde(default = "default_percentile_cap")]
    pub percentile_cap: f64,
    #[serde(default = "default_aggregation_method")]
    pub aggregation_method: String,
    #[serde(default = "default_power_mean_exponent")]
    pub power_mean_exponent: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            periods: Periods::default(),
            chains: BTreeMap::new(),
            metrics: BTreeMap::new(),
            metric_variants: BTreeMap::new(),
            tvl_minimum: 0.0,
            tvl_maximum: 0.0,
            eligibility_filter: false,
            percentile_cap: DEFAULT_PERCENTILE_CAP,
            aggregation_method: default_aggregation_method(),
            power_mean_exponent: DEFAULT_POWER_MEAN_EXPONENT,
        }
    }
}

impl ScoringConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: ScoringConfig = toml::from_str(s)?;
        Ok(config)
    }

    /// Reject configurations the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.periods.current.trim().is_empty() {
            return Err(Error::InvalidConfig("periods.current is required".to_string()));
        }
        if self.periods.previous.trim().is_empty() {
            return Err(Error::InvalidConfig("periods.previous is required".to_string()));
        }
        if self.metrics.is_empty() {
            return Err(Error::InvalidConfig("metrics section is empty".to_string()));
        }
        if self.metric_variants.is_empty() {
            return Err(Error::InvalidConfig("metric_variants section is empty".to_string()));
        }

        for name in self.metric_variants.keys() {
            if name.parse::<Variant>().is_err() {
                return Err(Error::InvalidConfig(format!("unknown metric variant '{}'", name)));
            }
        }

        let weights = self
            .metrics
            .iter()
            .map(|(k, w)| ("metric", k, w))
            .chain(self.metric_variants.iter().map(|(k, w)| ("variant", k, w)))
            .chain(self.chains.iter().map(|(k, w)| ("chain", k, w)));
        for (kind, name, weight) in weights {
            if !weight.is_finite() || *weight < 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "{} weight for '{}' must be a non-negative number, got {}",
                    kind, name, weight
                )));
            }
        }

        let mut chain_codes: BTreeMap<String, &str> = BTreeMap::new();
        for code in self.chains.keys() {
            if let Some(first) = chain_codes.insert(code.to_uppercase(), code) {
                return Err(Error::InvalidConfig(format!(
                    "chain weights '{}' and '{}' name the same chain",
                    first, code
                )));
            }
        }

        if !(self.percentile_cap > 0.0 && self.percentile_cap <= 100.0) {
            return Err(Error::InvalidConfig(format!(
                "percentile_cap must be in (0, 100], got {}",
                self.percentile_cap
            )));
        }
        let thresholds = [("tvl_minimum", self.tvl_minimum), ("tvl_maximum", self.tvl_maximum)];
        for (name, value) in thresholds {
            if !(value.is_finite() && value >= 0.0) {
                return Err(Error::InvalidConfig(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }

        self.aggregation()?;
        Ok(())
    }

    pub fn aggregation(&self) -> Result<AggregationMethod> {
        match self.aggregation_method.as_str() {
            "power_mean" => {
                if !(self.power_mean_exponent.is_finite() && self.power_mean_exponent > 0.0) {
                    return Err(Error::InvalidConfig(format!(
                        "power_mean_exponent must be > 0, got {}",
                        self.power_mean_exponent
                    )));
                }
                Ok(AggregationMethod::PowerMean {
                    exponent: self.power_mean_exponent,
                })
            }
            "sum" => Ok(AggregationMethod::Sum),
            other => Err(Error::UnknownAggregationMethod(other.to_string())),
        }
    }

    /// Metrics with a nonzero weight, i.e. the ones that get variants
    pub fn scored_metrics(&self) -> Vec<&str> {
        self.metrics
            .iter()
            .filter(|(_, w)| **w > 0.0)
            .map(|(m, _)| m.as_str())
            .collect()
    }

    pub fn tvl_metrics(&self) -> Vec<&str> {
        self.metrics
            .keys()
            .map(String::as_str)
            .filter(|m| is_tvl_metric(m))
            .collect()
    }

    /// Scored metrics plus every TVL metric, so TVL thresholds still apply to
    /// a TVL metric whose weight is zero.
    pub fn pivot_metrics(&self) -> Vec<&str> {
        self.metrics
            .iter()
            .filter(|(m, w)| **w > 0.0 || is_tvl_metric(m))
            .map(|(m, _)| m.as_str())
            .collect()
    }

    pub fn metric_weight(&self, metric: &str) -> Option<f64> {
        self.metrics.get(metric).copied()
    }

    pub fn variant_weight(&self, variant: Variant) -> Option<f64> {
        self.metric_variants.get(variant.as_str()).copied()
    }

    /// Chain weights keyed by upper-cased chain code
    pub fn chain_weights(&self) -> BTreeMap<String, f64> {
        self.chains
            .iter()
            .map(|(code, w)| (code.to_uppercase(), *w))
            .collect()
    }
}

/// Budget constraints handed to the reward allocator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationConfig {
    pub budget: f64,
    pub min_amount_per_project: f64,
    pub max_share_per_project: f64,
}

impl AllocationConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.budget.is_finite() && self.budget > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "allocation.budget must be > 0, got {}",
                self.budget
            )));
        }
        if !(self.min_amount_per_project >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "allocation.min_amount_per_project must be >= 0, got {}",
                self.min_amount_per_project
            )));
        }
        if !(self.max_share_per_project > 0.0 && self.max_share_per_project <= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "allocation.max_share_per_project must be in (0, 1], got {}",
                self.max_share_per_project
            )));
        }
        Ok(())
    }
}
