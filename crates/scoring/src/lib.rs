// crates/scoring/src/lib.rs
use common::*;
use std::fmt;

pub mod aggregate;
pub mod chains;
pub mod eligibility;
pub mod finalize;
pub mod handoff;
pub mod normalize;
pub mod pivot;
pub mod table;
pub mod variants;
pub mod weighting;

pub use aggregate::ProjectScores;
pub use chains::ChainWeightedTable;
pub use eligibility::EligibilitySummary;
pub use handoff::{allocate_rewards, funding_candidates, RewardAllocator};
pub use pivot::{ChainRow, PivotTable};
pub use table::Table;
pub use variants::VariantTable;

/// Pipeline stages in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Eligibility,
    Pivot,
    ChainAggregation,
    Variants,
    Normalize,
    Weight,
    Aggregate,
    Finalize,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Eligibility => "eligibility",
            Stage::Pivot => "pivot",
            Stage::ChainAggregation => "chain aggregation",
            Stage::Variants => "variants",
            Stage::Normalize => "normalize",
            Stage::Weight => "weight",
            Stage::Aggregate => "aggregate",
            Stage::Finalize => "finalize",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn missing(intermediate: &'static str, stage: Stage) -> Error {
    Error::MissingStage {
        intermediate,
        stage: stage.name(),
    }
}

/// Outputs of one pipeline run. Stages after the last one requested are absent.
#[derive(Debug, Clone, Default)]
pub struct Analysis {
    eligibility: Option<EligibilitySummary>,
    pivoted: Option<PivotTable>,
    chain_weighted: Option<ChainWeightedTable>,
    variants: Option<VariantTable>,
    normalized: Option<VariantTable>,
    weighted: Option<VariantTable>,
    scores: Option<ProjectScores>,
    final_results: Option<Vec<ProjectScore>>,
}

impl Analysis {
    pub fn eligibility(&self) -> Result<&EligibilitySummary> {
        self.eligibility
            .as_ref()
            .ok_or_else(|| missing("eligibility summary", Stage::Eligibility))
    }

    pub fn pivoted(&self) -> Result<&PivotTable> {
        self.pivoted
            .as_ref()
            .ok_or_else(|| missing("pivoted raw metrics by chain", Stage::Pivot))
    }

    pub fn chain_weighted(&self) -> Result<&ChainWeightedTable> {
        self.chain_weighted
            .as_ref()
            .ok_or_else(|| missing("chain-weighted metrics", Stage::ChainAggregation))
    }

    pub fn variants(&self) -> Result<&VariantTable> {
        self.variants
            .as_ref()
            .ok_or_else(|| missing("metric variants", Stage::Variants))
    }

    pub fn normalized(&self) -> Result<&VariantTable> {
        self.normalized
            .as_ref()
            .ok_or_else(|| missing("normalized metric variants", Stage::Normalize))
    }

    pub fn weighted(&self) -> Result<&VariantTable> {
        self.weighted
            .as_ref()
            .ok_or_else(|| missing("weighted metric variants", Stage::Weight))
    }

    pub fn scores(&self) -> Result<&ProjectScores> {
        self.scores
            .as_ref()
            .ok_or_else(|| missing("aggregated project scores", Stage::Aggregate))
    }

    pub fn final_results(&self) -> Result<&[ProjectScore]> {
        self.final_results
            .as_deref()
            .ok_or_else(|| missing("final results", Stage::Finalize))
    }

    pub fn into_final_results(self) -> Result<Vec<ProjectScore>> {
        self.final_results
            .ok_or_else(|| missing("final results", Stage::Finalize))
    }

    /// Last stage whose output is present
    pub fn completed(&self) -> Option<Stage> {
        [
            (Stage::Finalize, self.final_results.is_some()),
            (Stage::Aggregate, self.scores.is_some()),
            (Stage::Weight, self.weighted.is_some()),
            (Stage::Normalize, self.normalized.is_some()),
            (Stage::Variants, self.variants.is_some()),
            (Stage::ChainAggregation, self.chain_weighted.is_some()),
            (Stage::Pivot, self.pivoted.is_some()),
            (Stage::Eligibility, self.eligibility.is_some()),
        ]
        .into_iter()
        .find(|(_, done)| *done)
        .map(|(stage, _)| stage)
    }
}

/// Metric scoring pipeline bound to one validated configuration
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: ScoringConfig,
    method: AggregationMethod,
}

impl Pipeline {
    /// Validate the configuration up front; no data is touched on failure
    pub fn new(config: ScoringConfig) -> Result<Self> {
        config.validate()?;
        let method = config.aggregation()?;
        Ok(Self { config, method })
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Run every stage and return the final rows
    pub fn run(&self, observations: &[MetricObservation]) -> Result<Vec<ProjectScore>> {
        self.run_until(observations, Stage::Finalize)?.into_final_results()
    }

    /// Run every stage and keep all intermediate tables
    pub fn analyze(&self, observations: &[MetricObservation]) -> Result<Analysis> {
        self.run_until(observations, Stage::Finalize)
    }

    /// Run stages up to and including `last`
    pub fn run_until(&self, observations: &[MetricObservation], last: Stage) -> Result<Analysis> {
        let start = std::time::Instant::now();
        let config = &self.config;
        let mut analysis = Analysis::default();

        tracing::info!(
            rows = observations.len(),
            current = %config.periods.current,
            previous = %config.periods.previous,
            "Running scoring pipeline"
        );

        let (eligible, summary) =
            eligibility::filter_eligible(observations, config.eligibility_filter);
        analysis.eligibility = Some(summary);
        if eligible.is_empty() {
            tracing::warn!("No observations left after eligibility filter");
        }
        if last == Stage::Eligibility {
            return Ok(analysis);
        }

        analysis.pivoted = Some(pivot::pivot_and_floor(eligible, config));
        if last == Stage::Pivot {
            return Ok(analysis);
        }

        analysis.chain_weighted = Some(chains::weight_and_sum_chains(analysis.pivoted()?, config));
        if last == Stage::ChainAggregation {
            return Ok(analysis);
        }

        analysis.variants = Some(variants::derive_variants(analysis.chain_weighted()?, config));
        if last == Stage::Variants {
            return Ok(analysis);
        }

        analysis.normalized = Some(normalize::normalize_variants(
            analysis.variants()?,
            config.percentile_cap,
        ));
        if last == Stage::Normalize {
            return Ok(analysis);
        }

        analysis.weighted = Some(weighting::apply_weights(analysis.normalized()?, config));
        if last == Stage::Weight {
            return Ok(analysis);
        }

        analysis.scores = Some(aggregate::aggregate_scores(analysis.weighted()?, self.method));
        if last == Stage::Aggregate {
            return Ok(analysis);
        }

        let results = finalize::finalize(analysis.chain_weighted()?, analysis.scores()?, config);

        let elapsed = start.elapsed();
        tracing::info!(
            projects = results.len(),
            scored = results.iter().filter(|r| r.weighted_score > 0.0).count(),
            ?elapsed,
            "Scoring pipeline finished"
        );
        metrics::histogram!("scoring_pipeline_duration_ms").record(elapsed.as_secs_f64() * 1000.0);

        analysis.final_results = Some(results);
        Ok(analysis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn obs(
        project: &str,
        chain: &str,
        metric: &str,
        period: &str,
        amount: f64,
    ) -> MetricObservation {
        MetricObservation {
            project_id: project.to_string(),
            project_name: project.to_string(),
            display_name: project.to_uppercase(),
            chain: chain.to_string(),
            metric_name: metric.to_string(),
            measurement_period: period.to_string(),
            amount: Some(amount),
            is_eligible: None,
        }
    }

    fn base_config() -> ScoringConfig {
        let mut config = ScoringConfig {
            periods: Periods::new("Jun 2025", "May 2025"),
            ..Default::default()
        };
        config.chains.insert("BASE".to_string(), 1.0);
        config.metrics.insert("gas_fees".to_string(), 1.0);
        config.metric_variants.insert("adoption".to_string(), 1.0);
        config
    }

    fn score_of<'a>(results: &'a [ProjectScore], id: &str) -> &'a ProjectScore {
        results.iter().find(|r| r.project.project_id == id).unwrap()
    }

    #[test]
    fn test_scenario_a_two_projects_one_metric() {
        let pipeline = Pipeline::new(base_config()).unwrap();
        let rows = vec![
            obs("p1", "BASE", "gas_fees", "Jun 2025", 10.0),
            obs("p2", "BASE", "gas_fees", "Jun 2025", 0.0),
        ];
        let analysis = pipeline.analyze(&rows).unwrap();

        let adoption = VariantColumn::new("gas_fees", Variant::Adoption);
        let normalized = analysis.normalized().unwrap();
        assert_eq!(normalized.get(&ProjectKey::new("p1", "p1", "P1"), &adoption), Some(1.0));
        assert_eq!(normalized.get(&ProjectKey::new("p2", "p2", "P2"), &adoption), Some(0.0));

        let results = analysis.final_results().unwrap();
        assert_eq!(results[0].project.project_id, "p1");
        assert!((score_of(results, "p1").weighted_score - 1.0).abs() < EPS);
        assert_eq!(score_of(results, "p2").weighted_score, 0.0);
    }

    #[test]
    fn test_scenario_b_tvl_floor_nulls_cell() {
        let mut config = base_config();
        config.metrics.insert("average_tvl".to_string(), 1.0);
        config.tvl_minimum = 100.0;
        let pipeline = Pipeline::new(config).unwrap();

        let rows = vec![
            obs("p1", "BASE", "average_tvl", "Jun 2025", 50.0),
            obs("p1", "BASE", "gas_fees", "Jun 2025", 5.0),
            obs("p2", "BASE", "average_tvl", "Jun 2025", 500.0),
            obs("p2", "BASE", "gas_fees", "Jun 2025", 1.0),
        ];
        let analysis = pipeline.run_until(&rows, Stage::Aggregate).unwrap();

        let row = ChainRow {
            project: ProjectKey::new("p1", "p1", "P1"),
            chain: "BASE".to_string(),
        };
        let pivoted = analysis.pivoted().unwrap();
        assert_eq!(pivoted.get(&row, &MetricColumn::new(Period::Current, "average_tvl")), None);
        assert_eq!(pivoted.get(&row, &MetricColumn::new(Period::Current, "gas_fees")), Some(5.0));

        let variants = analysis.variants().unwrap();
        let tvl_adoption = VariantColumn::new("average_tvl", Variant::Adoption);
        assert_eq!(variants.get(&row.project, &tvl_adoption), None);
        // p2 is alone in the TVL column, so it scales to 1.0
        let normalized = analysis.normalized().unwrap();
        assert_eq!(normalized.get(&ProjectKey::new("p2", "p2", "P2"), &tvl_adoption), Some(1.0));
    }

    #[test]
    fn test_scenario_c_percentile_cap() {
        let mut config = base_config();
        config.percentile_cap = 90.0;
        let pipeline = Pipeline::new(config).unwrap();

        let rows: Vec<MetricObservation> = [1.0, 2.0, 3.0, 4.0, 100.0]
            .into_iter()
            .enumerate()
            .map(|(i, v)| obs(&format!("p{}", i), "BASE", "gas_fees", "Jun 2025", v))
            .collect();
        let analysis = pipeline.run_until(&rows, Stage::Normalize).unwrap();
        let normalized = analysis.normalized().unwrap();
        let adoption = VariantColumn::new("gas_fees", Variant::Adoption);

        let p3 = normalized.get(&ProjectKey::new("p3", "p3", "P3"), &adoption).unwrap();
        let p4 = normalized.get(&ProjectKey::new("p4", "p4", "P4"), &adoption).unwrap();
        assert!((p4 - 1.0).abs() < EPS);
        assert!((p3 - 3.0 / 60.6).abs() < EPS);
        // uncapped the same value would be 3/99
        assert!(p3 > 3.0 / 99.0);
    }

    #[test]
    fn test_scenario_d_tvl_maximum_keeps_row() {
        let mut config = base_config();
        config.metrics.insert("average_tvl".to_string(), 1.0);
        config.tvl_maximum = 1000.0;
        let pipeline = Pipeline::new(config).unwrap();

        let rows = vec![
            obs("whale", "BASE", "average_tvl", "Jun 2025", 1500.0),
            obs("whale", "BASE", "gas_fees", "Jun 2025", 100.0),
            obs("p1", "BASE", "average_tvl", "Jun 2025", 500.0),
            obs("p1", "BASE", "gas_fees", "Jun 2025", 50.0),
            obs("p2", "BASE", "average_tvl", "Jun 2025", 100.0),
            obs("p2", "BASE", "gas_fees", "Jun 2025", 10.0),
        ];
        let results = pipeline.run(&rows).unwrap();

        assert_eq!(results.len(), 3);
        let whale = score_of(&results, "whale");
        assert!(whale.tvl_excluded);
        assert_eq!(whale.weighted_score, 0.0);
        assert_eq!(results.last().unwrap().project.project_id, "whale");

        let total: f64 = results.iter().map(|r| r.weighted_score).sum();
        assert!((total - 1.0).abs() < EPS);
    }

    #[test]
    fn test_scenario_e_power_mean_skips_nulls() {
        let mut weighted = VariantTable::new();
        let p1 = ProjectKey::new("p1", "p1", "p1");
        weighted.set(p1.clone(), VariantColumn::new("a", Variant::Adoption), Some(0.5));
        weighted.add_column(VariantColumn::new("a", Variant::Growth));
        weighted.set(p1.clone(), VariantColumn::new("a", Variant::Retention), Some(0.5));

        let scores =
            aggregate::aggregate_scores(&weighted, AggregationMethod::PowerMean { exponent: 2.0 });
        assert!((scores[&p1].unwrap() - 0.5).abs() < EPS);
    }

    #[test]
    fn test_growth_never_negative_and_normalized_in_range() {
        let mut config = base_config();
        config.metric_variants.insert("growth".to_string(), 0.5);
        config.metric_variants.insert("retention".to_string(), 0.5);
        config.chains.insert("OP".to_string(), 2.0);
        let pipeline = Pipeline::new(config).unwrap();

        let rows = vec![
            obs("p1", "BASE", "gas_fees", "Jun 2025", 10.0),
            obs("p1", "BASE", "gas_fees", "May 2025", 30.0),
            obs("p2", "OP", "gas_fees", "Jun 2025", 10.0),
            obs("p2", "OP", "gas_fees", "May 2025", 5.0),
            obs("p3", "BASE", "gas_fees", "Jun 2025", 1.0),
        ];
        let analysis = pipeline.analyze(&rows).unwrap();

        let variants = analysis.variants().unwrap();
        let growth = VariantColumn::new("gas_fees", Variant::Growth);
        for v in variants.column(&growth).into_iter().flatten() {
            assert!(v >= 0.0);
        }
        // p3 has no previous period: growth and retention are null, not zero
        let p3 = ProjectKey::new("p3", "p3", "P3");
        assert_eq!(variants.get(&p3, &growth), None);

        let normalized = analysis.normalized().unwrap();
        for column in normalized.columns() {
            let raw = variants.column(column);
            let scaled = normalized.column(column);
            for (r, s) in raw.iter().zip(&scaled) {
                assert_eq!(r.is_none(), s.is_none());
            }
            for v in scaled.into_iter().flatten() {
                assert!((0.0..=1.0).contains(&v));
            }
        }
    }

    #[test]
    fn test_eligibility_filter_excludes_projects() {
        let mut config = base_config();
        config.eligibility_filter = true;
        let pipeline = Pipeline::new(config).unwrap();

        let mut rows = vec![
            obs("p1", "BASE", "gas_fees", "Jun 2025", 10.0),
            obs("p2", "BASE", "gas_fees", "Jun 2025", 20.0),
        ];
        rows[1].is_eligible = Some(false);

        let analysis = pipeline.analyze(&rows).unwrap();
        assert_eq!(analysis.eligibility().unwrap().projects_dropped, 1);
        let results = analysis.final_results().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].project.project_id, "p1");
    }

    #[test]
    fn test_idempotent() {
        let mut config = base_config();
        config.metric_variants.insert("growth".to_string(), 0.3);
        let pipeline = Pipeline::new(config).unwrap();
        let rows = vec![
            obs("p1", "BASE", "gas_fees", "Jun 2025", 12.5),
            obs("p1", "BASE", "gas_fees", "May 2025", 2.5),
            obs("p2", "BASE", "gas_fees", "Jun 2025", 7.0),
            obs("p3", "BASE", "gas_fees", "May 2025", 9.0),
        ];
        let first = pipeline.run(&rows).unwrap();
        let second = pipeline.run(&rows).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_input_is_not_an_error() {
        let pipeline = Pipeline::new(base_config()).unwrap();
        let results = pipeline.run(&[]).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_partial_run_reports_missing_stage() {
        let pipeline = Pipeline::new(base_config()).unwrap();
        let rows = vec![obs("p1", "BASE", "gas_fees", "Jun 2025", 1.0)];
        let analysis = pipeline.run_until(&rows, Stage::Variants).unwrap();

        assert_eq!(analysis.completed(), Some(Stage::Variants));
        assert!(analysis.variants().is_ok());
        match analysis.final_results() {
            Err(Error::MissingStage { intermediate, stage }) => {
                assert_eq!(intermediate, "final results");
                assert_eq!(stage, "finalize");
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert!(matches!(analysis.normalized(), Err(Error::MissingStage { .. })));
    }

    #[test]
    fn test_invalid_method_fails_before_run() {
        let mut config = base_config();
        config.aggregation_method = "median".to_string();
        match Pipeline::new(config) {
            Err(Error::UnknownAggregationMethod(m)) => assert_eq!(m, "median"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_sum_method() {
        let mut config = base_config();
        config.aggregation_method = "sum".to_string();
        config.metrics.insert("txs".to_string(), 0.5);
        let pipeline = Pipeline::new(config).unwrap();
        let rows = vec![
            obs("p1", "BASE", "gas_fees", "Jun 2025", 10.0),
            obs("p1", "BASE", "txs", "Jun 2025", 0.0),
            obs("p2", "BASE", "gas_fees", "Jun 2025", 0.0),
            obs("p2", "BASE", "txs", "Jun 2025", 10.0),
        ];
        let analysis = pipeline.analyze(&rows).unwrap();
        let scores = analysis.scores().unwrap();
        assert_eq!(scores[&ProjectKey::new("p1", "p1", "P1")], Some(1.0));
        assert_eq!(scores[&ProjectKey::new("p2", "p2", "P2")], Some(0.5));
    }
}
