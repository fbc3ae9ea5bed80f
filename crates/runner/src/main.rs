// crates/runner/src/main.rs
mod input;
mod settings;

use anyhow::Context;
use common::Error;
use scoring::{funding_candidates, Pipeline};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .with_target(false)
        .init();

    tracing::info!("Onchain builders scorer starting...");

    let prometheus_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(settings::DEFAULT_CONFIG_PATH));

    let settings = settings::load_settings(&config_path)
        .with_context(|| format!("Failed to load settings from {}", config_path.display()))?;
    let pipeline = Pipeline::new(settings.simulation.clone()).inspect_err(|e| {
        if e.is_config() {
            tracing::error!(error = %e, "Scoring configuration rejected before loading data");
        }
    })?;

    let observations = input::load_observations(&settings.data)?;
    let results = pipeline.run(&observations)?;

    let results_path = settings::output_path(&settings.data, &config_path, "results");
    input::write_json(&results_path, &results)?;
    tracing::info!(path = %results_path.display(), projects = results.len(), "Wrote results");

    for (rank, row) in results.iter().take(10).enumerate() {
        tracing::info!(rank = rank + 1, project = %row.project, share = row.weighted_score);
    }

    match funding_candidates(&results) {
        Ok(candidates) => {
            let path = settings::output_path(&settings.data, &config_path, "candidates");
            input::write_json(&path, &candidates)?;
            tracing::info!(
                path = %path.display(),
                candidates = candidates.len(),
                "Wrote funding candidates"
            );
            if let Some(allocation) = &settings.allocation {
                tracing::info!(
                    budget = allocation.budget,
                    min_amount = allocation.min_amount_per_project,
                    max_share = allocation.max_share_per_project,
                    "Allocation constraints for the reward allocator"
                );
            }
        }
        Err(Error::NoFundedProjects) => {
            tracing::warn!("No project received a positive score; skipping funding candidates");
        }
        Err(e) => return Err(e.into()),
    }

    tracing::debug!(metrics = %prometheus_handle.render(), "Run metrics");
    Ok(())
}
