//! Locating and parsing the engine's CSV artifact.

use std::fs;

use om_engine::ProcessOutcome;
use om_workspace::Workspace;
use tracing::{debug, info};

use crate::perf::parse_performance;
use crate::types::{PerformanceStats, ResultArtifact};
use crate::{ResultsError, ResultsResult};

#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Found {
        artifact: ResultArtifact,
        performance: Option<PerformanceStats>,
    },
    /// No artifact was written; the run failed and its output needs
    /// classifying.
    NotFound,
}

/// Look for `<model>_res.csv` in the workspace and parse it.
///
/// A present but unreadable artifact is `ResultsError::FileProcessing`, kept
/// apart from engine failures since the engine itself reported success.
pub fn extract(outcome: &ProcessOutcome, workspace: &Workspace) -> ResultsResult<Extraction> {
    let path = workspace.artifact_path();
    if !path.is_file() {
        debug!(run = %workspace.id, path = %path.display(), "no artifact written");
        return Ok(Extraction::NotFound);
    }

    let text = fs::read_to_string(&path).map_err(|e| ResultsError::FileProcessing {
        path: path.clone(),
        reason: e.to_string(),
    })?;
    let artifact = parse_artifact(&text).map_err(|reason| ResultsError::FileProcessing {
        path: path.clone(),
        reason,
    })?;
    let performance = parse_performance(&outcome.stdout);

    info!(
        run = %workspace.id,
        samples = artifact.sample_count(),
        variables = artifact.variables().len(),
        "artifact parsed"
    );
    Ok(Extraction::Found {
        artifact,
        performance,
    })
}

/// Parse CSV text with a header row whose first column is `time`.
///
/// Header names may be double-quoted (commas inside quotes are kept, as in
/// `"x[1,2]"`); a single trailing empty field on every line is tolerated;
/// blank lines are skipped.
pub fn parse_artifact(text: &str) -> Result<ResultArtifact, String> {
    let mut lines = text
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty());

    let (_, header_line) = lines.next().ok_or("result file is empty")?;
    let header = split_fields(header_line)?;
    match header.first().map(String::as_str) {
        Some("time") => {}
        Some(other) => return Err(format!("first column must be 'time', found '{}'", other)),
        None => return Err("header row is empty".to_string()),
    }
    if let Some(pos) = header.iter().position(String::is_empty) {
        return Err(format!("header column {} has no name", pos + 1));
    }

    let width = header.len();
    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); width];

    for (index, line) in lines {
        let line_no = index + 1;
        let fields = split_fields(line)?;
        if fields.len() != width {
            return Err(format!(
                "line {} has {} fields, header has {}",
                line_no,
                fields.len(),
                width
            ));
        }
        for (col, (field, name)) in fields.iter().zip(&header).enumerate() {
            let value: f64 = field.parse().map_err(|_| {
                format!(
                    "line {} column '{}': invalid number '{}'",
                    line_no, name, field
                )
            })?;
            columns[col].push(value);
        }
    }

    let mut columns = header.into_iter().zip(columns);
    let (_, time) = columns.next().ok_or("header row is empty")?;
    if time.is_empty() {
        return Err("result file has no data rows".to_string());
    }
    if let Some(i) = time.windows(2).position(|w| w[1] < w[0]) {
        return Err(format!(
            "time column is not ascending at sample {} ({} after {})",
            i + 1,
            time[i + 1],
            time[i]
        ));
    }

    ResultArtifact::new(time, columns.collect())
}

/// Split one CSV line, honouring double quotes and dropping a trailing
/// empty field.
fn split_fields(line: &str) -> Result<Vec<String>, String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current).trim().to_string()),
            _ => current.push(c),
        }
    }
    if in_quotes {
        return Err(format!("unterminated quote in line '{}'", line));
    }
    fields.push(current.trim().to_string());

    if fields.len() > 1 && fields.last().is_some_and(String::is_empty) {
        fields.pop();
    }
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_engine_style_csv() {
        let csv = "\"time\",\"x\",\"der(x)\",\n0,1,-1,\n0.5,0.6065,-0.6065,\n1,0.3679,-0.3679,\n";
        let artifact = parse_artifact(csv).unwrap();
        assert_eq!(artifact.variables(), ["x".to_string(), "der(x)".to_string()]);
        assert_eq!(artifact.time(), [0.0, 0.5, 1.0]);
        assert_eq!(artifact.series("der(x)").unwrap()[2], -0.3679);
    }

    #[test]
    fn quoted_names_may_contain_commas() {
        let csv = "time,\"m[1,2]\",\"say \"\"hi\"\"\"\n0,1,2\n";
        let artifact = parse_artifact(csv).unwrap();
        assert_eq!(
            artifact.variables(),
            ["m[1,2]".to_string(), "say \"hi\"".to_string()]
        );
    }

    #[test]
    fn blank_lines_and_crlf_are_ignored() {
        let csv = "time,y\r\n\r\n0,1\r\n1,2\r\n\r\n";
        let artifact = parse_artifact(csv).unwrap();
        assert_eq!(artifact.sample_count(), 2);
        assert_eq!(artifact.series("y").unwrap(), [1.0, 2.0]);
    }

    #[test]
    fn event_duplicates_keep_time_non_decreasing() {
        let csv = "time,y\n0,0\n1,1\n1,2\n2,2\n";
        assert_eq!(parse_artifact(csv).unwrap().sample_count(), 4);
    }

    #[test]
    fn rejects_malformed_files() {
        let cases = [
            ("", "empty"),
            ("t,x\n0,1\n", "'time'"),
            ("time,x\n", "no data rows"),
            ("time,x\n0,1\n1\n", "fields"),
            ("time,x\n0,abc\n", "invalid number 'abc'"),
            ("time,x,x\n0,1,2\n", "duplicate"),
            ("time,,x\n0,1,2\n", "no name"),
            ("time,x\n1,0\n0,0\n", "ascending"),
            ("time,\"x\n0,1\n", "unterminated"),
        ];
        for (csv, needle) in cases {
            let err = parse_artifact(csv).unwrap_err();
            assert!(err.contains(needle), "{:?}: got '{}'", csv, err);
        }
    }
}
