// Text and JSON rendering of unders matrix rows.

use dvp_core::pipeline::MatrixRow;
use std::fmt::Write;

const HEADERS: [&str; 6] = ["Team", "Position", "Stat", "Avg DvP", "Sample %", "Tier"];

fn cells(row: &MatrixRow) -> [String; 6] {
    [
        row.team.clone(),
        row.position.clone(),
        row.statistic.clone(),
        format!("{:.2}", row.avg_delta),
        row.sample_percent_label(),
        row.severity.map(|s| s.label().to_string()).unwrap_or_default(),
    ]
}

/// Render rows as a fixed-width text table. Text columns are left-aligned,
/// numeric columns right-aligned.
pub fn table(rows: &[MatrixRow]) -> String {
    if rows.is_empty() {
        return "No unders rows match.\n".to_string();
    }

    let body: Vec<[String; 6]> = rows.iter().map(cells).collect();
    let mut widths = HEADERS.map(str::len);
    for cells in &body {
        for (w, cell) in widths.iter_mut().zip(cells) {
            *w = (*w).max(cell.len());
        }
    }

    let mut out = String::new();
    push_line(&mut out, &HEADERS.map(String::from), &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let _ = writeln!(out, "{}", rule.join("  "));
    for cells in &body {
        push_line(&mut out, cells, &widths);
    }
    out
}

fn push_line(out: &mut String, cells: &[String; 6], widths: &[usize; 6]) {
    let line: Vec<String> = cells
        .iter()
        .zip(widths)
        .enumerate()
        .map(|(i, (cell, &w))| {
            if i == 3 || i == 4 {
                format!("{cell:>w$}")
            } else {
                format!("{cell:<w$}")
            }
        })
        .collect();
    let _ = writeln!(out, "{}", line.join("  ").trim_end());
}

/// Render rows as a pretty-printed JSON array.
pub fn json(rows: &[MatrixRow]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(rows)
}

/// One team per line.
pub fn teams(teams: &[String]) -> String {
    teams.iter().map(|t| format!("{t}\n")).collect()
}
