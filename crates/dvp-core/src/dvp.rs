// Defense-vs-position aggregation.
//
// For one statistic, averages what each opponent concedes to each role and
// compares it with that role's league baseline. A negative delta means the
// opponent holds the role below its usual output.

use crate::positions::{ResolvedRecord, Role};
use crate::records::Statistic;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::debug;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Baseline a group is compared against.
///
/// Both names select the same role-level league mean (every row of the role,
/// all opponents pooled); the baseline is never opponent-specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaselineMode {
    #[default]
    GlobalMean,
    PerRoleMean,
}

/// Aggregate for one (opponent, role) pair and one statistic.
#[derive(Debug, Clone, PartialEq)]
pub struct DvpRow {
    pub opponent: String,
    pub role: Role,
    pub statistic: Statistic,
    /// Rows of this role recorded against the opponent.
    pub count: usize,
    pub mean: f64,
    pub baseline: f64,
    /// `mean - baseline`.
    pub delta: f64,
    /// `count` as a share of all the opponent's rows, in whole percent
    /// (halves round to even).
    pub sample_pct: u32,
}

/// Qualification bounds for an "unders" row. Both bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UndersFilter {
    /// Largest delta that still qualifies (e.g. -1.5).
    pub threshold: f64,
    /// Smallest sample percentage that qualifies (e.g. 5).
    pub min_sample_pct: u32,
}

impl UndersFilter {
    pub fn accepts(&self, row: &DvpRow) -> bool {
        row.delta <= self.threshold && row.sample_pct >= self.min_sample_pct
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DvpError {
    #[error("insufficient data to compute {statistic} DvP: no resolved rows")]
    InsufficientData { statistic: Statistic },
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone, Copy)]
struct Accumulator {
    sum: f64,
    count: usize,
}

impl Accumulator {
    fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

/// Per-role mean over every row of the role, all opponents pooled. Roles with
/// no rows have no entry.
fn role_baselines(rows: &[ResolvedRecord], statistic: Statistic) -> BTreeMap<Role, f64> {
    let mut pooled: BTreeMap<Role, Accumulator> = BTreeMap::new();
    for r in rows {
        pooled.entry(r.role).or_default().add(statistic.value(&r.record));
    }
    pooled
        .into_iter()
        .filter_map(|(role, acc)| acc.mean().map(|m| (role, m)))
        .collect()
}

/// Compute DvP rows for every (opponent, role) pair present in `rows`.
///
/// Only observed pairs are produced, so no row is ever built from an empty
/// group. Output is ordered by opponent, then role.
pub fn compute(
    rows: &[ResolvedRecord],
    statistic: Statistic,
    mode: BaselineMode,
) -> Result<Vec<DvpRow>, DvpError> {
    if rows.is_empty() {
        return Err(DvpError::InsufficientData { statistic });
    }

    let mut groups: BTreeMap<(&str, Role), Accumulator> = BTreeMap::new();
    let mut opponent_totals: BTreeMap<&str, usize> = BTreeMap::new();
    for r in rows {
        let opponent = r.record.opponent.as_str();
        groups
            .entry((opponent, r.role))
            .or_default()
            .add(statistic.value(&r.record));
        *opponent_totals.entry(opponent).or_default() += 1;
    }

    let baselines = match mode {
        BaselineMode::GlobalMean | BaselineMode::PerRoleMean => role_baselines(rows, statistic),
    };

    let mut out = Vec::with_capacity(groups.len());
    for ((opponent, role), acc) in &groups {
        let (Some(mean), Some(&baseline), Some(&total)) = (
            acc.mean(),
            baselines.get(role),
            opponent_totals.get(opponent),
        ) else {
            continue;
        };
        let share = acc.count as f64 / total as f64 * 100.0;
        out.push(DvpRow {
            opponent: opponent.to_string(),
            role: *role,
            statistic,
            count: acc.count,
            mean,
            baseline,
            delta: mean - baseline,
            sample_pct: share.round_ties_even() as u32,
        });
    }

    debug!(
        "{}: {} opponent/role groups across {} opponents",
        statistic,
        out.len(),
        opponent_totals.len()
    );
    Ok(out)
}

/// Ordering for unders tables: most negative delta first, then opponent and
/// role so equal deltas always come out in the same order.
pub fn by_delta(a: &DvpRow, b: &DvpRow) -> Ordering {
    a.delta
        .total_cmp(&b.delta)
        .then_with(|| a.opponent.cmp(&b.opponent))
        .then_with(|| a.role.cmp(&b.role))
}

/// Keep the rows the filter accepts, sorted ascending by delta.
pub fn filter_unders(rows: Vec<DvpRow>, filter: &UndersFilter) -> Vec<DvpRow> {
    let mut kept: Vec<DvpRow> = rows.into_iter().filter(|r| filter.accepts(r)).collect();
    kept.sort_by(by_delta);
    kept
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::PlayerMatchRecord;

    /// Build a resolved row whose disposals equal `disposals` (all kicks).
    fn resolved(opponent: &str, role: Role, disposals: u32) -> ResolvedRecord {
        let position = role.named_positions()[0].to_string();
        ResolvedRecord {
            record: PlayerMatchRecord {
                player: format!("{opponent}-{position}-{disposals}"),
                opponent: opponent.into(),
                named_position: position.clone(),
                kicks: disposals,
                handballs: 0,
                marks: disposals / 4,
                tackles: 2,
            },
            resolved_position: position,
            role,
        }
    }

    /// RICH: 20 rows, 3 key forwards averaging 8 disposals.
    /// CARL: 3 key forwards averaging 12, so the league key-forward mean is 10.
    fn rich_scenario() -> Vec<ResolvedRecord> {
        let mut rows = Vec::new();
        for _ in 0..3 {
            rows.push(resolved("RICH", Role::KeyForward, 8));
        }
        for _ in 0..17 {
            rows.push(resolved("RICH", Role::InsideMid, 25));
        }
        for _ in 0..3 {
            rows.push(resolved("CARL", Role::KeyForward, 12));
        }
        rows
    }

    fn find<'a>(rows: &'a [DvpRow], opponent: &str, role: Role) -> &'a DvpRow {
        rows.iter()
            .find(|r| r.opponent == opponent && r.role == role)
            .unwrap_or_else(|| panic!("no row for {opponent}/{role}"))
    }

    #[test]
    fn rich_key_forward_scenario() {
        let rows = compute(&rich_scenario(), Statistic::Disposals, BaselineMode::GlobalMean).unwrap();
        let kf = find(&rows, "RICH", Role::KeyForward);
        assert_eq!(kf.count, 3);
        assert!((kf.mean - 8.0).abs() < 1e-9);
        assert!((kf.baseline - 10.0).abs() < 1e-9);
        assert!((kf.delta + 2.0).abs() < 1e-9);
        assert_eq!(kf.sample_pct, 15);

        let filter = UndersFilter {
            threshold: -1.5,
            min_sample_pct: 10,
        };
        let unders = filter_unders(rows, &filter);
        assert_eq!(unders.len(), 1);
        assert_eq!(unders[0].opponent, "RICH");
        assert_eq!(unders[0].role, Role::KeyForward);
    }

    #[test]
    fn sample_pct_uses_opponent_total() {
        let rows = compute(&rich_scenario(), Statistic::Disposals, BaselineMode::GlobalMean).unwrap();
        assert_eq!(find(&rows, "RICH", Role::InsideMid).sample_pct, 85);
        assert_eq!(find(&rows, "CARL", Role::KeyForward).sample_pct, 100);
    }

    #[test]
    fn sample_pct_rounds_half_to_even() {
        // 1 of 8 rows = 12.5% -> 12; 3 of 8 = 37.5% -> 38; 1 of 3 = 33.3% -> 33.
        let mut rows = vec![resolved("A", Role::Ruck, 10)];
        for _ in 0..3 {
            rows.push(resolved("A", Role::KeyDefender, 10));
        }
        for _ in 0..4 {
            rows.push(resolved("A", Role::Wing, 10));
        }
        rows.push(resolved("B", Role::Ruck, 10));
        rows.push(resolved("B", Role::Wing, 10));
        rows.push(resolved("B", Role::Wing, 10));

        let out = compute(&rows, Statistic::Disposals, BaselineMode::GlobalMean).unwrap();
        assert_eq!(find(&out, "A", Role::Ruck).sample_pct, 12);
        assert_eq!(find(&out, "A", Role::KeyDefender).sample_pct, 38);
        assert_eq!(find(&out, "B", Role::Ruck).sample_pct, 33);
    }

    #[test]
    fn half_percent_share_misses_the_next_whole_percent() {
        let mut rows = vec![resolved("A", Role::Ruck, 2)];
        for _ in 0..7 {
            rows.push(resolved("A", Role::Wing, 10));
        }
        rows.push(resolved("B", Role::Ruck, 20));

        let out = compute(&rows, Statistic::Disposals, BaselineMode::GlobalMean).unwrap();
        let filter = UndersFilter {
            threshold: -1.0,
            min_sample_pct: 13,
        };
        assert!(!filter.accepts(find(&out, "A", Role::Ruck)));
        assert!(filter_unders(out, &filter).is_empty());
    }

    #[test]
    fn baseline_modes_agree_on_unbalanced_samples() {
        let mut rows = Vec::new();
        for _ in 0..4 {
            rows.push(resolved("A", Role::KeyForward, 10));
        }
        rows.push(resolved("B", Role::KeyForward, 20));

        let global = compute(&rows, Statistic::Disposals, BaselineMode::GlobalMean).unwrap();
        let per_role = compute(&rows, Statistic::Disposals, BaselineMode::PerRoleMean).unwrap();
        assert!((global[0].baseline - 12.0).abs() < 1e-9);
        assert_eq!(global, per_role);
        assert!((find(&per_role, "A", Role::KeyForward).delta + 2.0).abs() < 1e-9);
    }

    #[test]
    fn baseline_is_role_level_not_opponent_level() {
        let rows = compute(&rich_scenario(), Statistic::Disposals, BaselineMode::GlobalMean).unwrap();
        let rich = find(&rows, "RICH", Role::KeyForward);
        let carl = find(&rows, "CARL", Role::KeyForward);
        assert_eq!(rich.baseline, carl.baseline);
    }

    #[test]
    fn empty_groups_never_appear() {
        let rows = compute(&rich_scenario(), Statistic::Marks, BaselineMode::GlobalMean).unwrap();
        // CARL never faced an inside mid, so there is no CARL/InsM row.
        assert!(!rows
            .iter()
            .any(|r| r.opponent == "CARL" && r.role == Role::InsideMid));
        assert_eq!(rows.len(), 3);
        assert!(rows
            .iter()
            .all(|r| r.mean.is_finite() && r.baseline.is_finite() && r.delta.is_finite()));
    }

    #[test]
    fn empty_input_is_insufficient_data() {
        let err = compute(&[], Statistic::Tackles, BaselineMode::GlobalMean).unwrap_err();
        assert_eq!(
            err,
            DvpError::InsufficientData {
                statistic: Statistic::Tackles
            }
        );
    }

    #[test]
    fn filter_bounds_are_inclusive() {
        let row = DvpRow {
            opponent: "A".into(),
            role: Role::Wing,
            statistic: Statistic::Marks,
            count: 2,
            mean: 3.0,
            baseline: 4.0,
            delta: -1.0,
            sample_pct: 40,
        };
        let filter = UndersFilter {
            threshold: -1.0,
            min_sample_pct: 40,
        };
        assert!(filter.accepts(&row));
        assert!(!filter.accepts(&DvpRow {
            delta: -0.99,
            ..row.clone()
        }));
        assert!(!filter.accepts(&DvpRow {
            sample_pct: 39,
            ..row
        }));
    }

    #[test]
    fn unders_sorted_and_within_bounds() {
        let mut rows = Vec::new();
        for (opp, kf, mid) in [("A", 4, 20), ("B", 6, 22), ("C", 14, 30), ("D", 5, 18)] {
            rows.push(resolved(opp, Role::KeyForward, kf));
            rows.push(resolved(opp, Role::InsideMid, mid));
        }
        let filter = UndersFilter {
            threshold: -0.5,
            min_sample_pct: 10,
        };
        let out = compute(&rows, Statistic::Disposals, BaselineMode::GlobalMean).unwrap();
        let unders = filter_unders(out, &filter);

        assert!(!unders.is_empty());
        for r in &unders {
            assert!(r.delta <= filter.threshold);
            assert!(r.sample_pct >= filter.min_sample_pct);
        }
        for pair in unders.windows(2) {
            assert!(pair[0].delta <= pair[1].delta);
        }
    }

    #[test]
    fn equal_deltas_ordered_by_opponent_then_role() {
        let rows = vec![
            resolved("B", Role::Wing, 5),
            resolved("A", Role::Wing, 5),
            resolved("C", Role::Wing, 20),
            resolved("A", Role::Ruck, 5),
            resolved("C", Role::Ruck, 20),
        ];
        let filter = UndersFilter {
            threshold: 0.0,
            min_sample_pct: 0,
        };
        let out = compute(&rows, Statistic::Disposals, BaselineMode::GlobalMean).unwrap();
        let unders = filter_unders(out, &filter);
        let keys: Vec<(&str, Role)> = unders.iter().map(|r| (r.opponent.as_str(), r.role)).collect();
        assert_eq!(
            keys,
            vec![("A", Role::Ruck), ("A", Role::Wing), ("B", Role::Wing)]
        );
    }
}
