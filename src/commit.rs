//! Turns the draft into a saved workout.
//!
//! A commit walks `Idle -> Validating -> CreatingWorkout -> SavingSets -> Done`.
//! Any failure drops back to `Idle` and leaves the draft as it was. The draft
//! is read once before the workout is created and once more before the sets
//! are sent; it is not locked in between.
//!
//! Saving is not atomic. A workout whose sets fail to save stays on the
//! server, and a retry submits the workout and every set again.

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::backend::WorkoutBackend;
use crate::draft::DraftStore;
use crate::error::{CommitError, ValidationError};
use crate::identity::IdentityProvider;
use crate::models::{renumber, CommittedWorkout, Draft, NewWorkout, WorkoutSet};

/// Where the workout id may sit in a create response, in lookup order.
const WORKOUT_ID_POINTERS: [&str; 5] = ["/id", "/workoutId", "/workout_id", "/data/id", "/body/id"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommitPhase {
    Idle,
    Validating,
    CreatingWorkout,
    SavingSets { saved: usize, total: usize },
    Done,
}

impl CommitPhase {
    pub fn is_running(&self) -> bool {
        !matches!(self, CommitPhase::Idle | CommitPhase::Done)
    }
}

pub fn validate(draft: &Draft) -> Result<(), ValidationError> {
    if draft.name.trim().is_empty() {
        return Err(ValidationError::MissingName);
    }
    if draft.exercises.is_empty() {
        return Err(ValidationError::NoExercises);
    }
    if !draft.has_completed_set() {
        return Err(ValidationError::NoCompletedSets);
    }
    Ok(())
}

/// Finds the new workout's id in a create response.
///
/// A string body is parsed as JSON first. Ids may be numbers or numeric
/// strings; zero and negative values are skipped.
pub fn extract_workout_id(body: &Value) -> Option<i64> {
    let parsed;
    let body = match body {
        Value::String(text) => {
            parsed = serde_json::from_str::<Value>(text).ok()?;
            &parsed
        }
        other => other,
    };

    WORKOUT_ID_POINTERS
        .iter()
        .find_map(|pointer| body.pointer(pointer).and_then(id_value))
}

fn id_value(value: &Value) -> Option<i64> {
    let id = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    id.filter(|id| *id > 0)
}

/// Sets that will be sent for `workout_id`: blank rows dropped, each bucket
/// renumbered from 1, in exercise order.
pub fn retained_sets(draft: &Draft, workout_id: i64) -> Vec<WorkoutSet> {
    let mut retained = Vec::new();
    for id in draft.exercises.iter().filter_map(|e| e.id) {
        let Some(bucket) = draft.sets.get(&id) else {
            continue;
        };
        let mut kept: Vec<WorkoutSet> = bucket.iter().filter(|s| !s.is_blank()).cloned().collect();
        renumber(&mut kept);
        for set in &mut kept {
            set.workout_id = workout_id;
        }
        retained.extend(kept);
    }
    retained
}

pub struct CommitPipeline {
    store: Arc<DraftStore>,
    backend: Arc<dyn WorkoutBackend>,
    identity: Arc<dyn IdentityProvider>,
    phase: watch::Sender<CommitPhase>,
}

impl CommitPipeline {
    pub fn new(
        store: Arc<DraftStore>,
        backend: Arc<dyn WorkoutBackend>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        let (phase, _) = watch::channel(CommitPhase::Idle);
        Self {
            store,
            backend,
            identity,
            phase,
        }
    }

    pub fn phase(&self) -> CommitPhase {
        *self.phase.borrow()
    }

    pub fn subscribe_phase(&self) -> watch::Receiver<CommitPhase> {
        self.phase.subscribe()
    }

    /// Saves the draft. On success the draft and its persisted copy are
    /// cleared; on any error both are left untouched.
    pub async fn commit(&self) -> Result<CommittedWorkout, CommitError> {
        let started = self.phase.send_if_modified(|phase| {
            if phase.is_running() {
                return false;
            }
            *phase = CommitPhase::Validating;
            true
        });
        if !started {
            return Err(CommitError::InProgress);
        }

        let result = self.run().await;
        match &result {
            Ok(workout) => {
                info!(workout_id = workout.id, "workout saved");
                self.phase.send_replace(CommitPhase::Done);
            }
            Err(e) => {
                warn!(error = %e, "failed to save workout");
                self.phase.send_replace(CommitPhase::Idle);
            }
        }
        result
    }

    /// Throws the draft away without contacting the server.
    pub fn cancel(&self) {
        self.store.reset();
        info!("draft workout discarded");
    }

    async fn run(&self) -> Result<CommittedWorkout, CommitError> {
        let draft = self.store.snapshot();
        validate(&draft)?;
        let user_id = self
            .identity
            .current_user_id()
            .filter(|id| *id > 0)
            .ok_or(CommitError::Unauthenticated)?;

        self.phase.send_replace(CommitPhase::CreatingWorkout);
        let workout = NewWorkout::completed(user_id, draft.name.clone(), Utc::now(), draft.total_weight());
        let body = self
            .backend
            .create_workout(&workout)
            .await
            .map_err(CommitError::Network)?;
        let workout_id = extract_workout_id(&body).ok_or_else(|| CommitError::ResponseShape {
            body: body.to_string(),
        })?;
        info!(workout_id, "workout created, saving sets");

        let sets = retained_sets(&self.store.snapshot(), workout_id);
        let total = sets.len();
        self.phase.send_replace(CommitPhase::SavingSets { saved: 0, total });

        let saves = sets.iter().map(|set| async move {
            let result = self.backend.save_set(set).await;
            match &result {
                Ok(()) => {
                    self.phase.send_modify(|phase| {
                        if let CommitPhase::SavingSets { saved, .. } = phase {
                            *saved += 1;
                        }
                    });
                }
                Err(e) => warn!(
                    workout_id,
                    exercise_id = set.exercise_id,
                    set_id = set.set_id,
                    error = %e,
                    "failed to save set"
                ),
            }
            result
        });
        let results = join_all(saves).await;

        let saved = results.iter().filter(|r| r.is_ok()).count();
        if let Some(source) = results.into_iter().find_map(Result::err) {
            return Err(CommitError::PartialSave {
                workout_id,
                saved,
                total,
                source,
            });
        }

        self.store.reset();
        Ok(workout.into_committed(workout_id))
    }
}
