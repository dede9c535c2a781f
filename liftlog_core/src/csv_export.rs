//! CSV export of logged sets for spreadsheets.
//!
//! One row per set. Exercises appear in storage order and each exercise's
//! sets are written oldest first.

use crate::{Exercise, Result};
use csv::WriterBuilder;
use std::path::Path;

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct CsvRow<'a> {
    exercise_id: String,
    exercise_name: &'a str,
    log_id: String,
    logged_at: String,
    weight: f64,
    reps: u32,
    volume: f64,
    session_id: Option<String>,
}

/// Write every set of every exercise to `path`, replacing the file
///
/// Returns the number of rows written (header excluded).
pub fn export_logs_csv(path: &Path, exercises: &[Exercise], delimiter: u8) -> Result<usize> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = WriterBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .from_path(path)?;

    let mut count = 0;
    for exercise in exercises {
        for log in exercise.logs_chronological() {
            writer.serialize(CsvRow {
                exercise_id: exercise.id.to_string(),
                exercise_name: &exercise.name,
                log_id: log.id.to_string(),
                logged_at: log.logged_at.to_rfc3339(),
                weight: log.weight,
                reps: log.reps,
                volume: log.volume(),
                session_id: log.session_id.map(|id| id.to_string()),
            })?;
            count += 1;
        }
    }

    writer.flush()?;
    tracing::info!("Exported {} sets to {:?}", count, path);
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WorkoutLog;
    use uuid::Uuid;

    #[test]
    fn test_export_writes_header_and_rows() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("logs.csv");

        let session = Uuid::new_v4();
        let mut squat = Exercise::new("Squat");
        squat.logs.push(WorkoutLog::new(100.0, 5, Some(session)));
        squat.logs.push(WorkoutLog::new(102.5, 5, None));
        let empty = Exercise::new("Unused");

        let count = export_logs_csv(&path, &[squat, empty], b',').unwrap();
        assert_eq!(count, 2);

        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next().unwrap(),
            "exercise_id,exercise_name,log_id,logged_at,weight,reps,volume,session_id"
        );
        let first = lines.next().unwrap();
        assert!(first.contains(",Squat,"));
        assert!(first.contains(",100.0,5,500.0,"));
        assert!(first.ends_with(&session.to_string()));
        assert!(lines.next().unwrap().ends_with(','));
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_export_respects_delimiter() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("logs.tsv");

        let mut row = Exercise::new("Row");
        row.logs.push(WorkoutLog::new(60.0, 10, None));

        export_logs_csv(&path, &[row], b'\t').unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("exercise_id\texercise_name\t"));
    }
}
