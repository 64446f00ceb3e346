//! Pose log reader (`pose.csv`).
//!
//! One record per line, seven comma-separated fields:
//!
//! ```text
//! id,timestamp,weight,gweight,x,y,theta
//! ```
//!
//! `id` is an integer matching the scan file name (`<id>.pcd`), the rest are
//! floating point. The format is strict: the first malformed line aborts the
//! whole read. Blank lines are ignored and fields past the seventh are not read.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::types::Pose2D;

/// Number of fields every record must carry.
pub const POSE_LOG_FIELDS: usize = 7;

/// Errors while reading the pose log.
#[derive(Error, Debug)]
pub enum PoseLogError {
    #[error("Failed to open pose log {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read pose log at line {line}: {source}")]
    Read {
        line: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("Line {line}: missing field '{field}'")]
    MissingField { line: usize, field: &'static str },

    #[error("Line {line}: invalid {field} '{value}'")]
    Parse {
        line: usize,
        field: &'static str,
        value: String,
    },
}

/// One parsed line of the pose log.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseRecord {
    /// Scan id, unique within a log.
    pub id: i64,
    /// Recording time in seconds.
    pub timestamp: f64,
    /// Particle weight.
    pub weight: f64,
    /// Accumulated weight of the particle's trajectory.
    pub gweight: f64,
    pub pose: Pose2D,
}

const FIELD_NAMES: [&str; POSE_LOG_FIELDS] =
    ["id", "timestamp", "weight", "gweight", "x", "y", "theta"];

/// Parse a single record. `line` is 1-based and only used for error reporting.
pub fn parse_pose_line(text: &str, line: usize) -> Result<PoseRecord, PoseLogError> {
    let mut fields = text.split(',');
    let mut next = |index: usize| {
        let field = FIELD_NAMES[index];
        fields
            .next()
            .map(str::trim)
            .ok_or(PoseLogError::MissingField { line, field })
            .map(|value| (field, value))
    };

    let (field, value) = next(0)?;
    let id = value.parse::<i64>().map_err(|_| PoseLogError::Parse {
        line,
        field,
        value: value.to_string(),
    })?;

    let mut values = [0.0f64; POSE_LOG_FIELDS - 1];
    for (i, slot) in values.iter_mut().enumerate() {
        let (field, value) = next(i + 1)?;
        *slot = value.parse::<f64>().map_err(|_| PoseLogError::Parse {
            line,
            field,
            value: value.to_string(),
        })?;
    }
    let [timestamp, weight, gweight, x, y, theta] = values;

    Ok(PoseRecord {
        id,
        timestamp,
        weight,
        gweight,
        pose: Pose2D::new(x as f32, y as f32, theta as f32),
    })
}

/// Read every record of a pose log, in file order.
pub fn read_pose_log(path: &Path) -> Result<Vec<PoseRecord>, PoseLogError> {
    let file = File::open(path).map_err(|source| PoseLogError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let mut records = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line_no = index + 1;
        let text = line.map_err(|source| PoseLogError::Read {
            line: line_no,
            source,
        })?;
        if text.trim().is_empty() {
            continue;
        }

        let record = parse_pose_line(&text, line_no)?;
        log::debug!(
            "pose {}: t={:.3} w={} gw={} [{:.3}, {:.3}, {:.3}]",
            record.id,
            record.timestamp,
            record.weight,
            record.gweight,
            record.pose.x,
            record.pose.y,
            record.pose.theta
        );
        records.push(record);
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_valid_line() {
        let rec = parse_pose_line("12,1520000000.25,0.5,3.25,1.5,-2.0,0.75", 1).unwrap();
        assert_eq!(rec.id, 12);
        assert_relative_eq!(rec.timestamp, 1520000000.25);
        assert_relative_eq!(rec.weight, 0.5);
        assert_relative_eq!(rec.gweight, 3.25);
        assert_relative_eq!(rec.pose.x, 1.5);
        assert_relative_eq!(rec.pose.y, -2.0);
        assert_relative_eq!(rec.pose.theta, 0.75);
    }

    #[test]
    fn test_parse_tolerates_spaces_and_extra_fields() {
        let rec = parse_pose_line(" 3, 0.0, 1, 1, 0, 0, 0, ignored", 1).unwrap();
        assert_eq!(rec.id, 3);
    }

    #[test]
    fn test_parse_missing_field() {
        let err = parse_pose_line("3,0.0,1,1,0,0", 7).unwrap_err();
        assert!(matches!(
            err,
            PoseLogError::MissingField {
                line: 7,
                field: "theta"
            }
        ));
    }

    #[test]
    fn test_parse_bad_id() {
        let err = parse_pose_line("3.5,0,1,1,0,0,0", 2).unwrap_err();
        match err {
            PoseLogError::Parse { line, field, value } => {
                assert_eq!(line, 2);
                assert_eq!(field, "id");
                assert_eq!(value, "3.5");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_read_log_aborts_on_malformed_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pose.csv");
        fs::write(&path, "0,0,1,1,0,0,0\n1,0,1,1,x,0,0\n2,0,1,1,0,0,0\n").unwrap();

        let err = read_pose_log(&path).unwrap_err();
        assert!(matches!(err, PoseLogError::Parse { line: 2, field: "x", .. }));
    }

    #[test]
    fn test_read_log_skips_blank_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pose.csv");
        fs::write(&path, "0,0,1,1,0,0,0\n\n5,1,1,1,2,3,0\n").unwrap();

        let records = read_pose_log(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].id, 5);
    }

    #[test]
    fn test_read_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = read_pose_log(&dir.path().join("pose.csv")).unwrap_err();
        assert!(matches!(err, PoseLogError::Open { .. }));
    }
}
