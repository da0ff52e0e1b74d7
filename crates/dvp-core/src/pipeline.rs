// Unders pipeline: load -> resolve -> aggregate -> filter.
//
// A `Pipeline` holds only configuration. Each run takes its dataset as an
// argument and returns a fresh `UndersMatrix`; team filtering is a pure view
// over that matrix.

use crate::config::Config;
use crate::dvp::{self, DvpError, DvpRow, UndersFilter};
use crate::positions::{self, Resolution};
use crate::records::{self, LoadError, PlayerMatchRecord, Statistic};
use crate::severity::Severity;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::info;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Dvp(#[from] DvpError),
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Row counts from position resolution, kept for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ResolutionSummary {
    pub input_rows: usize,
    pub resolved_rows: usize,
    pub unresolved: usize,
    pub unmapped: usize,
}

impl ResolutionSummary {
    fn from_resolution(input_rows: usize, resolution: &Resolution) -> Self {
        ResolutionSummary {
            input_rows,
            resolved_rows: resolution.rows.len(),
            unresolved: resolution.unresolved,
            unmapped: resolution.unmapped,
        }
    }
}

/// Qualifying unders rows for one statistic, ascending by delta.
#[derive(Debug, Clone, PartialEq)]
pub struct StatTable {
    pub statistic: Statistic,
    pub filter: UndersFilter,
    pub rows: Vec<DvpRow>,
}

/// Display-ready row handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MatrixRow {
    pub team: String,
    pub position: String,
    pub statistic: String,
    /// Delta rounded to two decimal places.
    pub avg_delta: f64,
    pub sample_percent: u32,
    pub severity: Option<Severity>,
}

impl MatrixRow {
    fn from_dvp(row: &DvpRow) -> Self {
        MatrixRow {
            team: row.opponent.clone(),
            position: row.role.display_str().to_string(),
            statistic: row.statistic.display_str().to_string(),
            avg_delta: round2(row.delta),
            sample_percent: row.sample_pct,
            severity: Severity::classify(row.statistic, row.delta),
        }
    }

    /// Sample percentage as shown in the table, e.g. "15%".
    pub fn sample_percent_label(&self) -> String {
        format!("{}%", self.sample_percent)
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Canonical form of a team name: trimmed and upper-cased, as loaded.
fn canonical_team(team: &str) -> String {
    team.trim().to_uppercase()
}

/// Result of one pipeline run across every configured statistic.
#[derive(Debug, Clone, PartialEq)]
pub struct UndersMatrix {
    /// One table per configured statistic, in config order.
    pub tables: Vec<StatTable>,
    pub summary: ResolutionSummary,
    teams: Vec<String>,
}

impl UndersMatrix {
    /// Opponents present in the resolved data, sorted.
    pub fn teams(&self) -> &[String] {
        &self.teams
    }

    pub fn table(&self, statistic: Statistic) -> Option<&StatTable> {
        self.tables.iter().find(|t| t.statistic == statistic)
    }

    /// Rows to display, optionally restricted to one team by exact match on
    /// the canonical team name. A blank team means no filter.
    pub fn view(&self, team: Option<&str>) -> Vec<MatrixRow> {
        let wanted = team.map(canonical_team).filter(|t| !t.is_empty());
        self.tables
            .iter()
            .flat_map(|t| t.rows.iter())
            .filter(|r| wanted.as_deref().map_or(true, |w| r.opponent == w))
            .map(MatrixRow::from_dvp)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Pipeline {
    config: Config,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        Pipeline { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Load the configured data file, resolved against `base_dir`, and run.
    pub fn run_configured(&self, base_dir: &Path) -> Result<UndersMatrix, PipelineError> {
        self.run_from_path(&base_dir.join(&self.config.data.path))
    }

    /// Load records from `path` (skipping the configured metadata lines) and run.
    pub fn run_from_path(&self, path: &Path) -> Result<UndersMatrix, PipelineError> {
        let records = records::load_records(path, self.config.data.skip_rows)?;
        self.run(&records)
    }

    /// Resolve positions, then aggregate and filter every configured statistic.
    pub fn run(&self, records: &[PlayerMatchRecord]) -> Result<UndersMatrix, PipelineError> {
        let resolution = positions::resolve(records, self.config.resolver.fill);
        let summary = ResolutionSummary::from_resolution(records.len(), &resolution);

        let dvp_config = &self.config.dvp;
        let mut tables = Vec::with_capacity(dvp_config.stats.len());
        for settings in &dvp_config.stats {
            let filter = dvp_config.filter_for(settings);
            let all = dvp::compute(&resolution.rows, settings.stat, dvp_config.baseline)?;
            let groups = all.len();
            let rows = dvp::filter_unders(all, &filter);
            info!(
                "{}: {} of {} groups qualify (delta <= {}, sample >= {}%)",
                settings.stat,
                rows.len(),
                groups,
                filter.threshold,
                filter.min_sample_pct
            );
            tables.push(StatTable {
                statistic: settings.stat,
                filter,
                rows,
            });
        }

        let teams: BTreeSet<&str> = resolution
            .rows
            .iter()
            .map(|r| r.record.opponent.as_str())
            .collect();

        Ok(UndersMatrix {
            tables,
            summary,
            teams: teams.into_iter().map(String::from).collect(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
