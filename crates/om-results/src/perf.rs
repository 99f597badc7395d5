//! Performance figures scraped from the engine's simulate() record.

use crate::types::PerformanceStats;

const SIMULATION_MARKER: &str = "timeSimulation = ";
const TOTAL_MARKER: &str = "timeTotal = ";

/// Scan stdout for `timeSimulation = <s>` and `timeTotal = <s>`.
///
/// Returns `None` when neither marker is present; missing figures are never
/// an error.
pub fn parse_performance(stdout: &str) -> Option<PerformanceStats> {
    let mut stats = PerformanceStats::default();
    for line in stdout.lines() {
        if stats.simulation_time_s.is_none() {
            stats.simulation_time_s = value_after(line, SIMULATION_MARKER);
        }
        if stats.total_time_s.is_none() {
            stats.total_time_s = value_after(line, TOTAL_MARKER);
        }
    }
    (stats.simulation_time_s.is_some() || stats.total_time_s.is_some()).then_some(stats)
}

fn value_after(line: &str, marker: &str) -> Option<f64> {
    let start = line.find(marker)? + marker.len();
    let rest = &line[start..];
    let end = rest
        .find(|c: char| c == ',' || c.is_whitespace())
        .unwrap_or(rest.len());
    rest[..end].parse().ok()
}
