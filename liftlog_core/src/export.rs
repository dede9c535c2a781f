//! Backup bundle export and import.
//!
//! A bundle is a single JSON document:
//!
//! ```json
//! { "exercises": "<base64>", "sessions": "<base64>", "plans": "<base64>", "version": "1.0" }
//! ```
//!
//! Each base64 field holds the same JSON array written to the collection's
//! persistence slot. Unlike a store load, importing is all-or-nothing: a
//! bundle whose records repeat an id is rejected as a whole.

use crate::{Error, Exercise, Result, Snapshot, TrainingPlan, TrainingSession};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use uuid::Uuid;

/// Bundle format version written by [`export_bundle`]
pub const BUNDLE_VERSION: &str = "1.0";

/// Serialized backup of all three collections
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExportBundle {
    pub exercises: String,
    pub sessions: String,
    pub plans: String,
    pub version: String,
}

impl ExportBundle {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Decode every collection, failing on the first bad field
    pub fn decode(&self) -> Result<Snapshot> {
        if self.version != BUNDLE_VERSION {
            return Err(Error::Bundle(format!(
                "unsupported bundle version '{}' (expected {})",
                self.version, BUNDLE_VERSION
            )));
        }

        let snapshot = Snapshot {
            exercises: decode_field("exercises", &self.exercises)?,
            sessions: decode_field("sessions", &self.sessions)?,
            plans: decode_field("plans", &self.plans)?,
        };
        check_unique_ids(&snapshot)?;
        Ok(snapshot)
    }
}

fn check_unique_ids(snapshot: &Snapshot) -> Result<()> {
    ensure_unique("exercises", snapshot.exercises.iter().map(|e| e.id))?;
    ensure_unique("sessions", snapshot.sessions.iter().map(|s| s.id))?;
    ensure_unique("plans", snapshot.plans.iter().map(|p| p.id))?;
    for exercise in &snapshot.exercises {
        let field = format!("logs of exercise {}", exercise.id);
        ensure_unique(&field, exercise.logs.iter().map(|l| l.id))?;
    }
    Ok(())
}

fn ensure_unique(name: &str, ids: impl Iterator<Item = Uuid>) -> Result<()> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(Error::Bundle(format!("{} contain duplicate id {}", name, id)));
        }
    }
    Ok(())
}

fn encode_field<T: Serialize>(records: &[T]) -> Result<String> {
    let bytes = serde_json::to_vec(records)?;
    Ok(STANDARD.encode(bytes))
}

fn decode_field<T: DeserializeOwned>(name: &str, encoded: &str) -> Result<Vec<T>> {
    let bytes = STANDARD
        .decode(encoded)
        .map_err(|e| Error::Bundle(format!("field '{}' is not valid base64: {}", name, e)))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| Error::Bundle(format!("field '{}' is not a valid collection: {}", name, e)))
}

/// Build a bundle from the current collections
pub fn export_bundle(
    exercises: &[Exercise],
    sessions: &[TrainingSession],
    plans: &[TrainingPlan],
) -> Result<ExportBundle> {
    Ok(ExportBundle {
        exercises: encode_field(exercises)?,
        sessions: encode_field(sessions)?,
        plans: encode_field(plans)?,
        version: BUNDLE_VERSION.to_string(),
    })
}

/// Parse and decode a bundle document
pub fn import_bundle(json: &str) -> Result<Snapshot> {
    let snapshot = ExportBundle::from_json(json)?.decode()?;
    tracing::info!(
        "Imported bundle: {} exercises, {} sessions, {} plans",
        snapshot.exercises.len(),
        snapshot.sessions.len(),
        snapshot.plans.len()
    );
    Ok(snapshot)
}

/// Write a bundle document to `path`
pub fn write_bundle(path: &Path, bundle: &ExportBundle) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bundle.to_json()?)?;
    tracing::info!("Wrote export bundle to {:?}", path);
    Ok(())
}

/// Read and decode a bundle document from `path`
pub fn read_bundle(path: &Path) -> Result<Snapshot> {
    let json = std::fs::read_to_string(path)?;
    import_bundle(&json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WorkoutLog;

    fn sample() -> Snapshot {
        let mut bench = Exercise::new("Bench");
        let session = TrainingSession::new("Push", vec![bench.id], "");
        bench.logs.push(WorkoutLog::new(80.0, 5, Some(session.id)));
        let plan = TrainingPlan::new("Push plan", vec![bench.id], "warm up first");
        Snapshot {
            exercises: vec![bench],
            sessions: vec![session],
            plans: vec![plan],
        }
    }

    #[test]
    fn test_bundle_shape() {
        let s = sample();
        let bundle = export_bundle(&s.exercises, &s.sessions, &s.plans).unwrap();
        let value: serde_json::Value = serde_json::from_str(&bundle.to_json().unwrap()).unwrap();

        assert_eq!(value["version"], "1.0");
        let decoded = STANDARD
            .decode(value["exercises"].as_str().unwrap())
            .unwrap();
        let exercises: serde_json::Value = serde_json::from_slice(&decoded).unwrap();
        assert_eq!(exercises[0]["name"], "Bench");
    }

    #[test]
    fn test_export_then_import() {
        let s = sample();
        let json = export_bundle(&s.exercises, &s.sessions, &s.plans)
            .unwrap()
            .to_json()
            .unwrap();

        let restored = import_bundle(&json).unwrap();
        assert_eq!(restored.exercises[0].id, s.exercises[0].id);
        assert_eq!(restored.exercises[0].logs[0].weight, 80.0);
        assert_eq!(restored.sessions[0].id, s.sessions[0].id);
        assert_eq!(restored.plans[0].notes, "warm up first");
    }

    #[test]
    fn test_rejects_unknown_version() {
        let s = sample();
        let mut bundle = export_bundle(&s.exercises, &s.sessions, &s.plans).unwrap();
        bundle.version = "2.0".into();

        let err = import_bundle(&bundle.to_json().unwrap()).unwrap_err();
        assert!(matches!(err, Error::Bundle(_)));
    }

    #[test]
    fn test_rejects_bad_field() {
        let s = sample();
        let mut bundle = export_bundle(&s.exercises, &s.sessions, &s.plans).unwrap();
        bundle.sessions = "!!not base64!!".into();
        assert!(matches!(bundle.decode(), Err(Error::Bundle(_))));

        bundle.sessions = STANDARD.encode(b"{\"not\": \"an array\"}");
        assert!(matches!(bundle.decode(), Err(Error::Bundle(_))));
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let s = sample();
        let exercise = s.exercises[0].clone();

        let bundle = export_bundle(&[exercise.clone(), exercise.clone()], &s.sessions, &s.plans)
            .unwrap();
        let err = bundle.decode().unwrap_err();
        assert!(matches!(err, Error::Bundle(_)));
        assert!(err.to_string().contains(&exercise.id.to_string()));

        let session = s.sessions[0].clone();
        let bundle = export_bundle(&s.exercises, &[session.clone(), session], &s.plans).unwrap();
        assert!(matches!(bundle.decode(), Err(Error::Bundle(_))));

        let plan = s.plans[0].clone();
        let bundle = export_bundle(&s.exercises, &s.sessions, &[plan.clone(), plan]).unwrap();
        assert!(matches!(bundle.decode(), Err(Error::Bundle(_))));
    }

    #[test]
    fn test_rejects_duplicate_log_ids() {
        let mut s = sample();
        let log = s.exercises[0].logs[0].clone();
        s.exercises[0].logs.push(log);

        let json = export_bundle(&s.exercises, &s.sessions, &s.plans)
            .unwrap()
            .to_json()
            .unwrap();
        assert!(matches!(import_bundle(&json), Err(Error::Bundle(_))));
    }

    #[test]
    fn test_write_and_read_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("backup").join("liftlog.json");
        let s = sample();

        let bundle = export_bundle(&s.exercises, &s.sessions, &s.plans).unwrap();
        write_bundle(&path, &bundle).unwrap();

        let restored = read_bundle(&path).unwrap();
        assert_eq!(restored.exercises.len(), 1);
    }
}
