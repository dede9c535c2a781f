//! Core domain types for the strength-training tracker.
//!
//! This module defines the entities owned by the [`Store`](crate::store::Store):
//! - Exercises and the sets logged against them
//! - Training sessions grouping exercises
//! - Training plans used as session templates
//!
//! Cross-entity references (log → session, session/plan → exercise) are plain
//! identifiers. Their targets are not required to exist.

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use uuid::Uuid;

// ============================================================================
// Exercise and Log Types
// ============================================================================

/// A single logged set
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkoutLog {
    pub id: Uuid,
    pub logged_at: DateTime<Utc>,
    pub weight: f64,
    pub reps: u32,
    /// Session this set was performed in, if any
    pub session_id: Option<Uuid>,
}

impl WorkoutLog {
    pub(crate) fn new(weight: f64, reps: u32, session_id: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            logged_at: Utc::now(),
            weight,
            reps,
            session_id,
        }
    }

    /// Weight × reps for this set
    pub fn volume(&self) -> f64 {
        self.weight * f64::from(self.reps)
    }

    /// Intensity score, currently defined identically to volume
    pub fn intensity_score(&self) -> f64 {
        self.volume()
    }
}

/// An exercise and every set logged against it
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Exercise {
    pub id: Uuid,
    pub name: String,
    /// Sets in insertion order
    #[serde(default)]
    pub logs: Vec<WorkoutLog>,
}

impl Exercise {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            logs: Vec::new(),
        }
    }

    /// The most recently added set (last in storage order, not by date)
    pub fn last_log(&self) -> Option<&WorkoutLog> {
        self.logs.last()
    }

    /// Sets sorted ascending by timestamp
    ///
    /// Sets sharing a timestamp keep their insertion order.
    pub fn logs_chronological(&self) -> Vec<&WorkoutLog> {
        let mut logs: Vec<&WorkoutLog> = self.logs.iter().collect();
        logs.sort_by(|a, b| a.logged_at.cmp(&b.logged_at));
        logs
    }

    pub fn log(&self, log_id: Uuid) -> Option<&WorkoutLog> {
        self.logs.iter().find(|l| l.id == log_id)
    }
}

// ============================================================================
// Session and Plan Types
// ============================================================================

/// A single grouped workout occurrence
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrainingSession {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub exercise_ids: Vec<Uuid>,
    #[serde(default)]
    pub notes: String,
}

impl TrainingSession {
    pub(crate) fn new(
        name: impl Into<String>,
        exercise_ids: Vec<Uuid>,
        notes: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            created_at: Utc::now(),
            exercise_ids,
            notes: notes.into(),
        }
    }
}

/// A reusable template of exercises, used to seed new sessions
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrainingPlan {
    pub id: Uuid,
    pub name: String,
    pub exercise_ids: Vec<Uuid>,
    #[serde(default)]
    pub notes: String,
}

impl TrainingPlan {
    pub(crate) fn new(
        name: impl Into<String>,
        exercise_ids: Vec<Uuid>,
        notes: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            exercise_ids,
            notes: notes.into(),
        }
    }
}

// Entities are identified by id: two values with the same id are the same
// entity even if one has been renamed since.
macro_rules! identity_by_id {
    ($($ty:ty),*) => {
        $(
            impl PartialEq for $ty {
                fn eq(&self, other: &Self) -> bool {
                    self.id == other.id
                }
            }

            impl Eq for $ty {}

            impl Hash for $ty {
                fn hash<H: Hasher>(&self, state: &mut H) {
                    self.id.hash(state);
                }
            }
        )*
    };
}

identity_by_id!(WorkoutLog, Exercise, TrainingSession, TrainingPlan);

// ============================================================================
// Snapshot Type
// ============================================================================

/// All three collections, as persisted or exported
#[derive(Clone, Debug, Default)]
pub struct Snapshot {
    pub exercises: Vec<Exercise>,
    pub sessions: Vec<TrainingSession>,
    pub plans: Vec<TrainingPlan>,
}

// ============================================================================
// Boundary Validation
// ============================================================================

/// Validate a set before it is handed to the store
///
/// The store trusts its numeric inputs; front-ends call this first.
pub fn validate_set(weight: f64, reps: u32) -> Result<()> {
    if !weight.is_finite() || weight <= 0.0 {
        return Err(Error::InvalidInput(format!(
            "weight must be a positive number, got {}",
            weight
        )));
    }
    if reps == 0 {
        return Err(Error::InvalidInput("reps must be at least 1".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn log_at(weight: f64, reps: u32, minutes_ago: i64) -> WorkoutLog {
        WorkoutLog {
            id: Uuid::new_v4(),
            logged_at: Utc::now() - Duration::minutes(minutes_ago),
            weight,
            reps,
            session_id: None,
        }
    }

    #[test]
    fn test_volume_and_intensity() {
        let log = log_at(100.0, 5, 0);
        assert_eq!(log.volume(), 500.0);
        assert_eq!(log.intensity_score(), log.volume());
    }

    #[test]
    fn test_equality_is_by_id() {
        let exercise = Exercise::new("Squat");
        let mut renamed = exercise.clone();
        renamed.name = "Back Squat".into();
        assert_eq!(exercise, renamed);

        let other = Exercise::new("Squat");
        assert_ne!(exercise, other);
    }

    #[test]
    fn test_last_log_is_storage_order() {
        let mut exercise = Exercise::new("Bench");
        exercise.logs.push(log_at(100.0, 5, 0));
        exercise.logs.push(log_at(80.0, 8, 60)); // older, but added last

        assert_eq!(exercise.last_log().unwrap().weight, 80.0);
        let chrono_order: Vec<f64> = exercise
            .logs_chronological()
            .iter()
            .map(|l| l.weight)
            .collect();
        assert_eq!(chrono_order, vec![80.0, 100.0]);
    }

    #[test]
    fn test_validate_set() {
        assert!(validate_set(100.0, 5).is_ok());
        assert!(matches!(validate_set(0.0, 5), Err(Error::InvalidInput(_))));
        assert!(matches!(validate_set(-5.0, 5), Err(Error::InvalidInput(_))));
        assert!(matches!(validate_set(f64::NAN, 5), Err(Error::InvalidInput(_))));
        assert!(matches!(validate_set(100.0, 0), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_serialized_fields_are_named() {
        let mut exercise = Exercise::new("Deadlift");
        exercise.logs.push(log_at(140.0, 3, 0));
        let json = serde_json::to_value(&exercise).unwrap();

        assert_eq!(json["name"], "Deadlift");
        assert_eq!(json["logs"][0]["reps"], 3);
        assert!(json["logs"][0]["session_id"].is_null());
    }
}
