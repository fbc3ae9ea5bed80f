// crates/runner/src/input.rs
use crate::settings::DataSnapshot;
use chrono::NaiveDate;
use common::{Error, MetricObservation, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Metric row as exported by the warehouse query
#[derive(Debug, Clone, Deserialize)]
pub struct RawMetricRow {
    pub project_id: String,
    pub project_name: String,
    pub display_name: String,
    pub chain: String,
    pub metric_name: String,
    #[serde(default)]
    pub measurement_period: Option<String>,
    #[serde(default)]
    pub sample_date: Option<NaiveDate>,
    pub amount: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectRow {
    pub project_id: String,
    #[serde(default)]
    pub is_eligible: Option<bool>,
}

/// Monthly period label, e.g. `Jun 2025`
pub fn period_label(date: NaiveDate) -> String {
    date.format("%b %Y").to_string()
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => {
            Error::MissingInput(format!("data file {}", path.display()))
        }
        _ => Error::Io(e),
    })?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Left-join eligibility onto the metric rows and fill missing period labels
pub fn join_projects(
    rows: Vec<RawMetricRow>,
    projects: &[ProjectRow],
) -> Result<Vec<MetricObservation>> {
    let eligibility: HashMap<&str, Option<bool>> = projects
        .iter()
        .map(|p| (p.project_id.as_str(), p.is_eligible))
        .collect();

    rows.into_iter()
        .map(|row| {
            let measurement_period = match (row.measurement_period, row.sample_date) {
                (Some(period), _) => period,
                (None, Some(date)) => period_label(date),
                (None, None) => {
                    return Err(Error::MissingInput(format!(
                        "measurement_period or sample_date for project {} ({})",
                        row.project_id, row.metric_name
                    )))
                }
            };
            let is_eligible = eligibility.get(row.project_id.as_str()).copied().flatten();
            Ok(MetricObservation {
                project_id: row.project_id,
                project_name: row.project_name,
                display_name: row.display_name,
                chain: row.chain,
                metric_name: row.metric_name,
                measurement_period,
                amount: row.amount,
                is_eligible,
            })
        })
        .collect()
}

/// Load the metrics snapshot and, when configured, the project list
pub fn load_observations(snapshot: &DataSnapshot) -> Result<Vec<MetricObservation>> {
    let metrics_path = snapshot.path(&snapshot.metrics_file);
    let rows: Vec<RawMetricRow> = read_json(&metrics_path)?;
    tracing::info!(rows = rows.len(), path = %metrics_path.display(), "Loaded metric rows");

    let projects: Vec<ProjectRow> = match &snapshot.projects_file {
        Some(file) => {
            let path = snapshot.path(file);
            let projects: Vec<ProjectRow> = read_json(&path)?;
            tracing::info!(projects = projects.len(), path = %path.display(), "Loaded projects");
            projects
        }
        None => Vec::new(),
    };

    join_projects(rows, &projects)
}

/// Write pretty JSON, creating the parent directory if needed
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(std::io::BufWriter::new(file), value)?;
    Ok(())
}
