// Player match records and CSV loading.
//
// Reads the player stats export: a fixed number of metadata lines, then a
// header row naming at least player, opponent, namedPosition and the four
// counting stats. Any other columns are ignored.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use tracing::{debug, info};

/// Named-position value used for players who started on the interchange bench.
pub const PLACEHOLDER_POSITION: &str = "INT";

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// One player's line for one match, as loaded from the input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerMatchRecord {
    pub player: String,
    /// Opponent team, trimmed and upper-cased.
    pub opponent: String,
    /// Raw named position, upper-cased. May be the placeholder or empty.
    pub named_position: String,
    pub kicks: u32,
    pub handballs: u32,
    pub marks: u32,
    pub tackles: u32,
}

impl PlayerMatchRecord {
    /// Kicks plus handballs, widened so two column maxima cannot overflow.
    pub fn disposals(&self) -> u64 {
        u64::from(self.kicks) + u64::from(self.handballs)
    }

    /// Whether the named position carries no usable information and must be
    /// resolved from the player's other matches.
    pub fn has_placeholder_position(&self) -> bool {
        self.named_position.is_empty() || self.named_position == PLACEHOLDER_POSITION
    }
}

/// A numeric record column the DvP aggregator can be run over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Statistic {
    Disposals,
    Marks,
    Tackles,
    Kicks,
    Handballs,
}

impl Statistic {
    /// Extract this statistic's value from a record.
    pub fn value(&self, record: &PlayerMatchRecord) -> f64 {
        let v = match self {
            Statistic::Disposals => record.disposals(),
            Statistic::Marks => u64::from(record.marks),
            Statistic::Tackles => u64::from(record.tackles),
            Statistic::Kicks => u64::from(record.kicks),
            Statistic::Handballs => u64::from(record.handballs),
        };
        v as f64
    }

    /// Lowercase key used in config files.
    pub fn key(&self) -> &'static str {
        match self {
            Statistic::Disposals => "disposals",
            Statistic::Marks => "marks",
            Statistic::Tackles => "tackles",
            Statistic::Kicks => "kicks",
            Statistic::Handballs => "handballs",
        }
    }

    /// Return the display string for this statistic.
    pub fn display_str(&self) -> &'static str {
        match self {
            Statistic::Disposals => "Disposals",
            Statistic::Marks => "Marks",
            Statistic::Tackles => "Tackles",
            Statistic::Kicks => "Kicks",
            Statistic::Handballs => "Handballs",
        }
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_str())
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("input ended before the header row (expected {skip_rows} metadata line(s) first)")]
    MissingHeader { skip_rows: usize },

    #[error("missing required column(s): {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("malformed row at line {line}: {source}")]
    MalformedRow { line: u64, source: csv::Error },

    #[error("failed to read input: {0}")]
    Read(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("schema error in {path}: {source}")]
    Schema { path: String, source: SchemaError },
}

// ---------------------------------------------------------------------------
// Raw CSV serde struct (private)
// ---------------------------------------------------------------------------

/// Column names (with accepted aliases) every input file must carry.
const REQUIRED_COLUMNS: &[(&str, &[&str])] = &[
    ("player", &[]),
    ("opponent", &["opponentTeam"]),
    ("namedPosition", &[]),
    ("kicks", &[]),
    ("handballs", &[]),
    ("marks", &[]),
    ("tackles", &[]),
];

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct RawPlayerRow {
    player: String,
    #[serde(alias = "opponentTeam")]
    opponent: String,
    namedPosition: String,
    kicks: u32,
    handballs: u32,
    marks: u32,
    tackles: u32,
}

impl From<RawPlayerRow> for PlayerMatchRecord {
    fn from(raw: RawPlayerRow) -> Self {
        PlayerMatchRecord {
            player: raw.player,
            opponent: raw.opponent.to_uppercase(),
            named_position: raw.namedPosition.to_uppercase(),
            kicks: raw.kicks,
            handballs: raw.handballs,
            marks: raw.marks,
            tackles: raw.tackles,
        }
    }
}

// ---------------------------------------------------------------------------
// Loaders
// ---------------------------------------------------------------------------

fn check_required_columns(headers: &csv::StringRecord) -> Result<(), SchemaError> {
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|(name, aliases)| {
            !headers
                .iter()
                .any(|h| h == *name || aliases.contains(&h))
        })
        .map(|(name, _)| name.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(SchemaError::MissingColumns(missing))
    }
}

/// Parse records from any reader, skipping `skip_rows` metadata lines before
/// the header. Fails on the first malformed row; nothing partial is returned.
pub fn load_records_from_reader<R: Read>(
    rdr: R,
    skip_rows: usize,
) -> Result<Vec<PlayerMatchRecord>, SchemaError> {
    let mut buf = BufReader::new(rdr);
    let mut line = String::new();
    for _ in 0..skip_rows {
        line.clear();
        if buf.read_line(&mut line)? == 0 {
            return Err(SchemaError::MissingHeader { skip_rows });
        }
    }

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(buf);

    let headers = reader.headers()?.clone();
    if headers.iter().all(str::is_empty) {
        return Err(SchemaError::MissingHeader { skip_rows });
    }
    check_required_columns(&headers)?;

    let mut records = Vec::new();
    for result in reader.deserialize::<RawPlayerRow>() {
        let raw = result.map_err(|e| {
            // csv counts lines from the header; add the skipped metadata back.
            let line = e
                .position()
                .map(|p| p.line() + skip_rows as u64)
                .unwrap_or_default();
            SchemaError::MalformedRow { line, source: e }
        })?;
        records.push(PlayerMatchRecord::from(raw));
    }

    debug!("parsed {} player match rows", records.len());
    Ok(records)
}

/// Load player match records from a file on disk.
pub fn load_records(path: &Path, skip_rows: usize) -> Result<Vec<PlayerMatchRecord>, LoadError> {
    let file = std::fs::File::open(path).map_err(|e| LoadError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let records = load_records_from_reader(file, skip_rows).map_err(|e| LoadError::Schema {
        path: path.display().to_string(),
        source: e,
    })?;
    info!("Loaded {} rows from {}", records.len(), path.display());
    Ok(records)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
