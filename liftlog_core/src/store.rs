//! Relational store owning exercises, sessions and plans.
//!
//! The store is the only way to mutate the collections. Every applied
//! mutation:
//! 1. Updates the in-memory collections
//! 2. Writes the full snapshot through the [`Persistence`] adapter
//! 3. Bumps the revision counter and notifies subscribers
//!
//! Updates and deletes aimed at an unknown id change nothing and report
//! `false`. Persistence failures never abort a mutation: they are logged and
//! kept for [`Store::last_persist_error`].

use crate::integrity::{check_integrity, DanglingReference};
use crate::metrics::{self, ExerciseSummary};
use crate::persistence::{LoadReport, Persistence};
use crate::{Exercise, Result, Snapshot, TrainingPlan, TrainingSession, WorkoutLog};
use std::sync::mpsc::{channel, Receiver, Sender};
use uuid::Uuid;

/// What an applied mutation changed
#[derive(Clone, Debug, PartialEq)]
pub enum Change {
    ExerciseAdded(Uuid),
    ExerciseUpdated(Uuid),
    ExerciseDeleted(Uuid),
    LogAdded { exercise_id: Uuid, log_id: Uuid },
    LogUpdated { exercise_id: Uuid, log_id: Uuid },
    LogDeleted { exercise_id: Uuid, log_id: Uuid },
    SessionAdded(Uuid),
    SessionUpdated(Uuid),
    /// Session removed along with this many logs that referenced it
    SessionDeleted { session_id: Uuid, purged_logs: usize },
    PlanAdded(Uuid),
    PlanUpdated(Uuid),
    PlanDeleted(Uuid),
    /// All collections replaced
    Restored,
}

/// Notification sent to subscribers after each applied mutation
#[derive(Clone, Debug, PartialEq)]
pub struct StoreEvent {
    pub revision: u64,
    pub change: Change,
}

/// In-memory collections backed by a snapshot adapter
pub struct Store<P: Persistence> {
    exercises: Vec<Exercise>,
    sessions: Vec<TrainingSession>,
    plans: Vec<TrainingPlan>,
    persistence: P,
    load_report: LoadReport,
    revision: u64,
    subscribers: Vec<Sender<StoreEvent>>,
    last_persist_error: Option<String>,
}

impl<P: Persistence> Store<P> {
    /// Load the initial state through `persistence`
    ///
    /// Corrupt slots start empty; see [`Store::load_report`].
    pub fn open(persistence: P) -> Self {
        let loaded = persistence.load();
        let Snapshot {
            exercises,
            sessions,
            plans,
        } = loaded.snapshot;

        if loaded.report.has_corruption() {
            tracing::warn!("Opened store with corrupt slots: {:?}", loaded.report);
        }
        tracing::info!(
            "Opened store: {} exercises, {} sessions, {} plans",
            exercises.len(),
            sessions.len(),
            plans.len()
        );

        Self {
            exercises,
            sessions,
            plans,
            persistence,
            load_report: loaded.report,
            revision: 0,
            subscribers: Vec::new(),
            last_persist_error: None,
        }
    }

    // ------------------------------------------------------------------------
    // Read access
    // ------------------------------------------------------------------------

    pub fn exercises(&self) -> &[Exercise] {
        &self.exercises
    }

    pub fn sessions(&self) -> &[TrainingSession] {
        &self.sessions
    }

    pub fn plans(&self) -> &[TrainingPlan] {
        &self.plans
    }

    pub fn exercise(&self, id: Uuid) -> Option<&Exercise> {
        self.exercises.iter().find(|e| e.id == id)
    }

    pub fn session(&self, id: Uuid) -> Option<&TrainingSession> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn plan(&self, id: Uuid) -> Option<&TrainingPlan> {
        self.plans.iter().find(|p| p.id == id)
    }

    /// Every log tagged with `session_id`, paired with its exercise
    pub fn logs_for_session(&self, session_id: Uuid) -> Vec<(&Exercise, &WorkoutLog)> {
        self.exercises
            .iter()
            .flat_map(|e| e.logs.iter().map(move |l| (e, l)))
            .filter(|(_, l)| l.session_id == Some(session_id))
            .collect()
    }

    /// How each slot fared when the store was opened
    pub fn load_report(&self) -> &LoadReport {
        &self.load_report
    }

    /// Number of mutations applied since the store was opened
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Error from the most recent failed snapshot write, cleared on success
    pub fn last_persist_error(&self) -> Option<&str> {
        self.last_persist_error.as_deref()
    }

    pub fn persistence(&self) -> &P {
        &self.persistence
    }

    // ------------------------------------------------------------------------
    // Derived metrics
    // ------------------------------------------------------------------------

    /// Total volume logged against a session; `None` if the session is unknown
    pub fn session_total_volume(&self, session_id: Uuid) -> Option<f64> {
        let session = self.session(session_id)?;
        Some(metrics::session_total_volume(session, &self.exercises))
    }

    pub fn exercise_summary(&self, exercise_id: Uuid) -> Option<ExerciseSummary> {
        self.exercise(exercise_id).map(ExerciseSummary::compute)
    }

    /// Weak references whose targets no longer exist
    pub fn check_integrity(&self) -> Vec<DanglingReference> {
        check_integrity(&self.exercises, &self.sessions, &self.plans)
    }

    // ------------------------------------------------------------------------
    // Change notification
    // ------------------------------------------------------------------------

    /// Receive a [`StoreEvent`] for every mutation applied from now on
    ///
    /// Dropping the receiver unsubscribes.
    pub fn subscribe(&mut self) -> Receiver<StoreEvent> {
        let (tx, rx) = channel();
        self.subscribers.push(tx);
        rx
    }

    // ------------------------------------------------------------------------
    // Exercises
    // ------------------------------------------------------------------------

    pub fn add_exercise(&mut self, name: impl Into<String>) -> Uuid {
        let exercise = Exercise::new(name);
        let id = exercise.id;
        tracing::debug!("Adding exercise {} ({})", exercise.name, id);
        self.exercises.push(exercise);
        self.commit(Change::ExerciseAdded(id));
        id
    }

    pub fn update_exercise(&mut self, id: Uuid, name: impl Into<String>) -> bool {
        let Some(exercise) = self.exercises.iter_mut().find(|e| e.id == id) else {
            tracing::debug!("update_exercise: no exercise {}", id);
            return false;
        };
        exercise.name = name.into();
        self.commit(Change::ExerciseUpdated(id));
        true
    }

    /// Remove an exercise and its logs
    ///
    /// Sessions and plans listing the exercise keep the id.
    pub fn delete_exercise(&mut self, id: Uuid) -> bool {
        let before = self.exercises.len();
        self.exercises.retain(|e| e.id != id);
        if self.exercises.len() == before {
            tracing::debug!("delete_exercise: no exercise {}", id);
            return false;
        }
        self.commit(Change::ExerciseDeleted(id));
        true
    }

    // ------------------------------------------------------------------------
    // Logs
    // ------------------------------------------------------------------------

    /// Append a set to an exercise, stamped with the current time
    ///
    /// `session_id` is not checked against the session collection.
    pub fn add_log(
        &mut self,
        exercise_id: Uuid,
        weight: f64,
        reps: u32,
        session_id: Option<Uuid>,
    ) -> Option<Uuid> {
        let Some(exercise) = self.exercises.iter_mut().find(|e| e.id == exercise_id) else {
            tracing::debug!("add_log: no exercise {}", exercise_id);
            return None;
        };
        let log = WorkoutLog::new(weight, reps, session_id);
        let log_id = log.id;
        exercise.logs.push(log);
        self.commit(Change::LogAdded {
            exercise_id,
            log_id,
        });
        Some(log_id)
    }

    /// Replace weight and reps; id, timestamp and session stay as they were
    pub fn update_log(&mut self, exercise_id: Uuid, log_id: Uuid, weight: f64, reps: u32) -> bool {
        let Some(log) = self
            .exercises
            .iter_mut()
            .find(|e| e.id == exercise_id)
            .and_then(|e| e.logs.iter_mut().find(|l| l.id == log_id))
        else {
            tracing::debug!("update_log: no log {} on exercise {}", log_id, exercise_id);
            return false;
        };
        log.weight = weight;
        log.reps = reps;
        self.commit(Change::LogUpdated {
            exercise_id,
            log_id,
        });
        true
    }

    pub fn delete_log(&mut self, exercise_id: Uuid, log_id: Uuid) -> bool {
        let Some(exercise) = self.exercises.iter_mut().find(|e| e.id == exercise_id) else {
            tracing::debug!("delete_log: no exercise {}", exercise_id);
            return false;
        };
        let before = exercise.logs.len();
        exercise.logs.retain(|l| l.id != log_id);
        if exercise.logs.len() == before {
            tracing::debug!("delete_log: no log {} on exercise {}", log_id, exercise_id);
            return false;
        }
        self.commit(Change::LogDeleted {
            exercise_id,
            log_id,
        });
        true
    }

    // ------------------------------------------------------------------------
    // Sessions
    // ------------------------------------------------------------------------

    pub fn add_session(
        &mut self,
        name: impl Into<String>,
        exercise_ids: Vec<Uuid>,
        notes: impl Into<String>,
    ) -> Uuid {
        let session = TrainingSession::new(name, exercise_ids, notes);
        let id = session.id;
        tracing::debug!("Adding session {} ({})", session.name, id);
        self.sessions.push(session);
        self.commit(Change::SessionAdded(id));
        id
    }

    pub fn update_session(
        &mut self,
        id: Uuid,
        name: impl Into<String>,
        exercise_ids: Vec<Uuid>,
        notes: impl Into<String>,
    ) -> bool {
        let Some(session) = self.sessions.iter_mut().find(|s| s.id == id) else {
            tracing::debug!("update_session: no session {}", id);
            return false;
        };
        session.name = name.into();
        session.exercise_ids = exercise_ids;
        session.notes = notes.into();
        self.commit(Change::SessionUpdated(id));
        true
    }

    /// Remove a session and every log, on any exercise, that references it
    pub fn delete_session(&mut self, id: Uuid) -> bool {
        let Some(index) = self.sessions.iter().position(|s| s.id == id) else {
            tracing::debug!("delete_session: no session {}", id);
            return false;
        };

        let mut purged_logs = 0;
        for exercise in &mut self.exercises {
            let before = exercise.logs.len();
            exercise.logs.retain(|l| l.session_id != Some(id));
            purged_logs += before - exercise.logs.len();
        }
        self.sessions.remove(index);

        tracing::debug!("Deleted session {} and {} of its logs", id, purged_logs);
        self.commit(Change::SessionDeleted {
            session_id: id,
            purged_logs,
        });
        true
    }

    /// Create a session seeded with a plan's exercises and notes
    pub fn start_session_from_plan(
        &mut self,
        plan_id: Uuid,
        name: impl Into<String>,
    ) -> Option<Uuid> {
        let Some(plan) = self.plan(plan_id) else {
            tracing::debug!("start_session_from_plan: no plan {}", plan_id);
            return None;
        };
        let exercise_ids = plan.exercise_ids.clone();
        let notes = plan.notes.clone();
        Some(self.add_session(name, exercise_ids, notes))
    }

    // ------------------------------------------------------------------------
    // Plans
    // ------------------------------------------------------------------------

    pub fn add_plan(
        &mut self,
        name: impl Into<String>,
        exercise_ids: Vec<Uuid>,
        notes: impl Into<String>,
    ) -> Uuid {
        let plan = TrainingPlan::new(name, exercise_ids, notes);
        let id = plan.id;
        tracing::debug!("Adding plan {} ({})", plan.name, id);
        self.plans.push(plan);
        self.commit(Change::PlanAdded(id));
        id
    }

    pub fn update_plan(
        &mut self,
        id: Uuid,
        name: impl Into<String>,
        exercise_ids: Vec<Uuid>,
        notes: impl Into<String>,
    ) -> bool {
        let Some(plan) = self.plans.iter_mut().find(|p| p.id == id) else {
            tracing::debug!("update_plan: no plan {}", id);
            return false;
        };
        plan.name = name.into();
        plan.exercise_ids = exercise_ids;
        plan.notes = notes.into();
        self.commit(Change::PlanUpdated(id));
        true
    }

    /// Remove a plan; plans own no logs, so nothing cascades
    pub fn delete_plan(&mut self, id: Uuid) -> bool {
        let before = self.plans.len();
        self.plans.retain(|p| p.id != id);
        if self.plans.len() == before {
            tracing::debug!("delete_plan: no plan {}", id);
            return false;
        }
        self.commit(Change::PlanDeleted(id));
        true
    }

    // ------------------------------------------------------------------------
    // Whole-state operations
    // ------------------------------------------------------------------------

    /// Replace every collection, e.g. from an imported bundle
    pub fn restore(&mut self, snapshot: Snapshot) {
        self.exercises = snapshot.exercises;
        self.sessions = snapshot.sessions;
        self.plans = snapshot.plans;
        tracing::info!(
            "Restored {} exercises, {} sessions, {} plans",
            self.exercises.len(),
            self.sessions.len(),
            self.plans.len()
        );
        self.commit(Change::Restored);
    }

    /// Write the current state, reporting failure to the caller
    pub fn flush(&mut self) -> Result<()> {
        self.persistence
            .save(&self.exercises, &self.sessions, &self.plans)?;
        self.last_persist_error = None;
        Ok(())
    }

    fn commit(&mut self, change: Change) {
        if let Err(e) = self.flush() {
            tracing::warn!("Failed to persist snapshot after {:?}: {}", change, e);
            self.last_persist_error = Some(e.to_string());
        }

        self.revision += 1;
        let event = StoreEvent {
            revision: self.revision,
            change,
        };
        // Dropped receivers fail to send and are pruned
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}
