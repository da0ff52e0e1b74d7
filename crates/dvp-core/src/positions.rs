// Position resolution: interchange fill and named-position to role mapping.

use crate::records::PlayerMatchRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info};

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// Coarse positional group a named position rolls up into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    KeyForward,
    GeneralForward,
    Ruck,
    InsideMid,
    Wing,
    GeneralDefender,
    KeyDefender,
}

impl Role {
    pub const ALL: [Role; 7] = [
        Role::KeyForward,
        Role::GeneralForward,
        Role::Ruck,
        Role::InsideMid,
        Role::Wing,
        Role::GeneralDefender,
        Role::KeyDefender,
    ];

    /// Map a named position (already upper-cased) to its role.
    ///
    /// Returns `None` for the interchange placeholder and for any label
    /// outside the lookup table.
    pub fn from_named_position(pos: &str) -> Option<Self> {
        match pos {
            "FF" | "CHF" => Some(Role::KeyForward),
            "HFFR" | "HFFL" | "FPL" | "FPR" => Some(Role::GeneralForward),
            "RK" => Some(Role::Ruck),
            "C" | "RR" | "R" => Some(Role::InsideMid),
            "WL" | "WR" => Some(Role::Wing),
            "HBFL" | "HBFR" | "BPL" | "BPR" => Some(Role::GeneralDefender),
            "CHB" | "FB" => Some(Role::KeyDefender),
            _ => None,
        }
    }

    /// Named positions that roll up into this role.
    pub fn named_positions(&self) -> &'static [&'static str] {
        match self {
            Role::KeyForward => &["FF", "CHF"],
            Role::GeneralForward => &["HFFR", "HFFL", "FPL", "FPR"],
            Role::Ruck => &["RK"],
            Role::InsideMid => &["C", "RR", "R"],
            Role::Wing => &["WL", "WR"],
            Role::GeneralDefender => &["HBFL", "HBFR", "BPL", "BPR"],
            Role::KeyDefender => &["CHB", "FB"],
        }
    }

    /// Short label shown in the unders table.
    pub fn display_str(&self) -> &'static str {
        match self {
            Role::KeyForward => "KeyF",
            Role::GeneralForward => "GenF",
            Role::Ruck => "Ruck",
            Role::InsideMid => "InsM",
            Role::Wing => "Wing",
            Role::GeneralDefender => "GenD",
            Role::KeyDefender => "KeyD",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_str())
    }
}

// ---------------------------------------------------------------------------
// Fill policy
// ---------------------------------------------------------------------------

/// How placeholder positions are filled from a player's other matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillPolicy {
    /// Only earlier matches may supply a position.
    #[default]
    Forward,
    /// Forward fill first; rows still unresolved take the player's next
    /// known position.
    ForwardThenBackward,
}

// ---------------------------------------------------------------------------
// Resolved output
// ---------------------------------------------------------------------------

/// A record with its resolved named position and role attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRecord {
    pub record: PlayerMatchRecord,
    pub resolved_position: String,
    pub role: Role,
}

/// Output of [`resolve`]: the surviving rows plus drop counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub rows: Vec<ResolvedRecord>,
    /// Rows with a placeholder position and nothing to fill it from.
    pub unresolved: usize,
    /// Rows whose (resolved) position is not in the role lookup table.
    pub unmapped: usize,
}

impl Resolution {
    pub fn dropped(&self) -> usize {
        self.unresolved + self.unmapped
    }
}

/// Fill placeholder positions per player, then attach roles.
///
/// Rows keep their input order, which is taken as each player's
/// chronological order. Unresolved and unmapped rows are excluded and
/// counted, never treated as errors.
pub fn resolve(records: &[PlayerMatchRecord], policy: FillPolicy) -> Resolution {
    let resolved = fill_positions(records, policy);

    let mut resolution = Resolution::default();
    for (record, position) in records.iter().zip(resolved) {
        let Some(position) = position else {
            resolution.unresolved += 1;
            continue;
        };
        match Role::from_named_position(&position) {
            Some(role) => resolution.rows.push(ResolvedRecord {
                record: record.clone(),
                resolved_position: position,
                role,
            }),
            None => {
                debug!(
                    "dropping {} vs {}: no role for position '{}'",
                    record.player, record.opponent, position
                );
                resolution.unmapped += 1;
            }
        }
    }

    info!(
        "Resolved {} of {} rows ({} unresolved, {} unmapped)",
        resolution.rows.len(),
        records.len(),
        resolution.unresolved,
        resolution.unmapped
    );
    resolution
}

/// Resolved named position for every input row, index-aligned with `records`.
fn fill_positions(records: &[PlayerMatchRecord], policy: FillPolicy) -> Vec<Option<String>> {
    let mut last_known: HashMap<&str, &str> = HashMap::new();
    let mut filled: Vec<Option<String>> = records
        .iter()
        .map(|r| {
            if r.has_placeholder_position() {
                last_known.get(r.player.as_str()).map(|p| p.to_string())
            } else {
                last_known.insert(r.player.as_str(), r.named_position.as_str());
                Some(r.named_position.clone())
            }
        })
        .collect();

    if policy == FillPolicy::ForwardThenBackward {
        // Walk backwards so each gap sees the nearest later position.
        let mut next_known: HashMap<&str, &str> = HashMap::new();
        for (r, slot) in records.iter().zip(filled.iter_mut()).rev() {
            if !r.has_placeholder_position() {
                next_known.insert(r.player.as_str(), r.named_position.as_str());
            } else if slot.is_none() {
                *slot = next_known.get(r.player.as_str()).map(|p| p.to_string());
            }
        }
    }

    filled
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
