//! Derived training metrics.
//!
//! Everything here is a pure function of the current entity state. Nothing is
//! cached; callers recompute after each mutation.
//!
//! - Estimated one-rep-max: Epley extrapolation from the most recently added set
//! - Progressive overload: percentage change in volume, first set → last set by date
//! - Average intensity: mean volume per set
//! - Session volume: total volume of every set tagged with a session

use crate::{Exercise, TrainingSession, WorkoutLog};
use serde::Serialize;
use std::fmt;

/// Volume of a single set (weight × reps)
pub fn volume(log: &WorkoutLog) -> f64 {
    log.volume()
}

/// Estimate the one-rep-max from the most recently added set
///
/// A single-rep set is returned as-is; anything else uses
/// `weight × (1 + reps / 30)`. Inputs are not validated.
pub fn estimated_one_rep_max(exercise: &Exercise) -> Option<f64> {
    let last = exercise.last_log()?;
    if last.reps == 1 {
        Some(last.weight)
    } else {
        Some(last.weight * (1.0 + f64::from(last.reps) / 30.0))
    }
}

/// Percentage change in volume between the chronologically first and last set
///
/// Returns `None` with fewer than two sets, or when the first set has no
/// volume to compare against.
pub fn progressive_overload_score(exercise: &Exercise) -> Option<f64> {
    if exercise.logs.len() < 2 {
        return None;
    }

    let logs = exercise.logs_chronological();
    let first = logs.first()?.volume();
    let last = logs.last()?.volume();

    if first == 0.0 {
        tracing::debug!(
            "Exercise {} has a zero-volume first set, overload score undefined",
            exercise.id
        );
        return None;
    }

    Some((last - first) / first * 100.0)
}

/// Mean intensity score across all sets
pub fn average_intensity(exercise: &Exercise) -> Option<f64> {
    if exercise.logs.is_empty() {
        return None;
    }

    let total: f64 = exercise.logs.iter().map(WorkoutLog::intensity_score).sum();
    Some(total / exercise.logs.len() as f64)
}

/// Total volume of every set, across all exercises, tagged with this session
///
/// No index is kept; every log of every exercise is scanned.
pub fn session_total_volume(session: &TrainingSession, exercises: &[Exercise]) -> f64 {
    exercises
        .iter()
        .flat_map(|e| e.logs.iter())
        .filter(|l| l.session_id == Some(session.id))
        .map(WorkoutLog::volume)
        .sum()
}

// ============================================================================
// Overload Classification
// ============================================================================

/// Magnitude band of an overload score
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverloadTier {
    Plateau,
    Slight,
    Notable,
    Strong,
}

/// Sign of an overload score
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverloadDirection {
    Gain,
    Loss,
}

/// Informational tiering of a progressive-overload score
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct OverloadTrend {
    pub tier: OverloadTier,
    pub direction: OverloadDirection,
}

impl fmt::Display for OverloadTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // A plateau has no meaningful direction
        let tier = match self.tier {
            OverloadTier::Plateau => return write!(f, "plateau"),
            OverloadTier::Slight => "slight",
            OverloadTier::Notable => "notable",
            OverloadTier::Strong => "strong",
        };
        let direction = match self.direction {
            OverloadDirection::Gain => "gain",
            OverloadDirection::Loss => "loss",
        };
        write!(f, "{} {}", tier, direction)
    }
}

/// Classify an overload score into a tier and direction
///
/// Bands on |score|: < 5 plateau, < 15 slight, < 30 notable, otherwise strong.
pub fn classify_overload(score: f64) -> OverloadTrend {
    let magnitude = score.abs();
    let tier = if magnitude < 5.0 {
        OverloadTier::Plateau
    } else if magnitude < 15.0 {
        OverloadTier::Slight
    } else if magnitude < 30.0 {
        OverloadTier::Notable
    } else {
        OverloadTier::Strong
    };

    let direction = if score >= 0.0 {
        OverloadDirection::Gain
    } else {
        OverloadDirection::Loss
    };

    OverloadTrend { tier, direction }
}

// ============================================================================
// Exercise Summary
// ============================================================================

/// Every derived metric for one exercise, computed together for display
#[derive(Clone, Debug, Serialize)]
pub struct ExerciseSummary {
    pub log_count: usize,
    pub total_volume: f64,
    pub estimated_one_rep_max: Option<f64>,
    pub overload_score: Option<f64>,
    pub overload_trend: Option<OverloadTrend>,
    pub average_intensity: Option<f64>,
}

impl ExerciseSummary {
    pub fn compute(exercise: &Exercise) -> Self {
        let overload_score = progressive_overload_score(exercise);
        Self {
            log_count: exercise.logs.len(),
            total_volume: exercise.logs.iter().map(WorkoutLog::volume).sum(),
            estimated_one_rep_max: estimated_one_rep_max(exercise),
            overload_score,
            overload_trend: overload_score.map(classify_overload),
            average_intensity: average_intensity(exercise),
        }
    }
}
