//! Reference integrity report.
//!
//! Sessions and plans list exercise ids, and logs may point at a session id.
//! None of these references are enforced, and deleting an exercise leaves its
//! id behind in sessions and plans. This module only reports such references;
//! it never rewrites data.

use crate::{Exercise, TrainingPlan, TrainingSession};
use std::collections::HashSet;
use std::fmt;
use uuid::Uuid;

/// A weak reference whose target does not exist
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DanglingReference {
    /// Session lists an exercise that is gone
    SessionExercise { session_id: Uuid, exercise_id: Uuid },
    /// Plan lists an exercise that is gone
    PlanExercise { plan_id: Uuid, exercise_id: Uuid },
    /// Log is tagged with a session that does not exist
    LogSession {
        exercise_id: Uuid,
        log_id: Uuid,
        session_id: Uuid,
    },
}

impl fmt::Display for DanglingReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DanglingReference::SessionExercise {
                session_id,
                exercise_id,
            } => write!(
                f,
                "session {} references missing exercise {}",
                session_id, exercise_id
            ),
            DanglingReference::PlanExercise {
                plan_id,
                exercise_id,
            } => write!(
                f,
                "plan {} references missing exercise {}",
                plan_id, exercise_id
            ),
            DanglingReference::LogSession {
                exercise_id,
                log_id,
                session_id,
            } => write!(
                f,
                "log {} on exercise {} references missing session {}",
                log_id, exercise_id, session_id
            ),
        }
    }
}

/// Collect every dangling reference across the three collections
///
/// Results are ordered: session references, then plan references, then log
/// references, each in storage order.
pub fn check_integrity(
    exercises: &[Exercise],
    sessions: &[TrainingSession],
    plans: &[TrainingPlan],
) -> Vec<DanglingReference> {
    let exercise_ids: HashSet<Uuid> = exercises.iter().map(|e| e.id).collect();
    let session_ids: HashSet<Uuid> = sessions.iter().map(|s| s.id).collect();
    let mut dangling = Vec::new();

    for session in sessions {
        for exercise_id in &session.exercise_ids {
            if !exercise_ids.contains(exercise_id) {
                dangling.push(DanglingReference::SessionExercise {
                    session_id: session.id,
                    exercise_id: *exercise_id,
                });
            }
        }
    }

    for plan in plans {
        for exercise_id in &plan.exercise_ids {
            if !exercise_ids.contains(exercise_id) {
                dangling.push(DanglingReference::PlanExercise {
                    plan_id: plan.id,
                    exercise_id: *exercise_id,
                });
            }
        }
    }

    for exercise in exercises {
        for log in &exercise.logs {
            if let Some(session_id) = log.session_id {
                if !session_ids.contains(&session_id) {
                    dangling.push(DanglingReference::LogSession {
                        exercise_id: exercise.id,
                        log_id: log.id,
                        session_id,
                    });
                }
            }
        }
    }

    if !dangling.is_empty() {
        tracing::debug!("Integrity check found {} dangling references", dangling.len());
    }
    dangling
}
