// Severity tiers for unders rows, used to highlight the deepest no-go zones.

use crate::records::Statistic;
use serde::Serialize;
use std::fmt;

/// How far below baseline an opponent holds a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Extreme,
    Strong,
    Moderate,
    Mild,
}

/// Band ceilings (inclusive), checked most severe first.
const DISPOSAL_BANDS: [(f64, Severity); 4] = [
    (-4.0, Severity::Extreme),
    (-1.5, Severity::Strong),
    (-1.0, Severity::Moderate),
    (-0.5, Severity::Mild),
];

const DEFAULT_BANDS: [(f64, Severity); 4] = [
    (-1.5, Severity::Extreme),
    (-1.0, Severity::Strong),
    (-0.75, Severity::Moderate),
    (-0.5, Severity::Mild),
];

impl Severity {
    /// Classify a delta. Returns `None` when the delta is above every band.
    pub fn classify(statistic: Statistic, delta: f64) -> Option<Self> {
        let bands = match statistic {
            Statistic::Disposals => &DISPOSAL_BANDS,
            _ => &DEFAULT_BANDS,
        };
        bands
            .iter()
            .find(|(ceiling, _)| delta <= *ceiling)
            .map(|(_, severity)| *severity)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Severity::Extreme => "EXTREME",
            Severity::Strong => "STRONG",
            Severity::Moderate => "MODERATE",
            Severity::Mild => "MILD",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}
