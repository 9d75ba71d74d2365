//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{Barrier, Notify};

use workout_tracker::models::NewWorkout;
use workout_tracker::{
    BackendError, CommitPipeline, DraftStore, Exercise, MemoryStore, PersistenceMirror,
    StaticIdentity, WorkoutBackend, WorkoutSet,
};

/// In-process stand-in for the REST backend that records every request.
#[derive(Default)]
pub struct FakeBackend {
    create_body: Option<Value>,
    failing_sets: Vec<(i64, u32)>,
    gate: Option<Arc<Notify>>,
    set_barrier: Option<Arc<Barrier>>,
    workouts: Mutex<Vec<NewWorkout>>,
    sets: Mutex<Vec<WorkoutSet>>,
    exercises: Mutex<Vec<Exercise>>,
    next_exercise_id: AtomicI64,
}

impl FakeBackend {
    /// Workout creation succeeds with `body`.
    pub fn responding(body: Value) -> Self {
        Self {
            create_body: Some(body),
            next_exercise_id: AtomicI64::new(100),
            ..Self::default()
        }
    }

    /// Workout creation fails with a 503.
    pub fn unavailable() -> Self {
        Self {
            next_exercise_id: AtomicI64::new(100),
            ..Self::default()
        }
    }

    pub fn failing_set(mut self, exercise_id: i64, set_id: u32) -> Self {
        self.failing_sets.push((exercise_id, set_id));
        self
    }

    /// Workout creation waits until `gate` is notified.
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Every set save waits at `barrier` before it is recorded.
    pub fn joined_sets(mut self, barrier: Arc<Barrier>) -> Self {
        self.set_barrier = Some(barrier);
        self
    }

    pub fn with_exercises(self, exercises: Vec<Exercise>) -> Self {
        *self.exercises.lock().unwrap() = exercises;
        self
    }

    pub fn workouts(&self) -> Vec<NewWorkout> {
        self.workouts.lock().unwrap().clone()
    }

    pub fn saved_sets(&self) -> Vec<WorkoutSet> {
        self.sets.lock().unwrap().clone()
    }
}

#[async_trait]
impl WorkoutBackend for FakeBackend {
    async fn create_workout(&self, workout: &NewWorkout) -> Result<Value, BackendError> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.workouts.lock().unwrap().push(workout.clone());
        self.create_body.clone().ok_or(BackendError::Status {
            status: 503,
            message: "service unavailable".to_string(),
        })
    }

    async fn save_set(&self, set: &WorkoutSet) -> Result<(), BackendError> {
        if let Some(barrier) = &self.set_barrier {
            barrier.wait().await;
        }
        if self.failing_sets.contains(&(set.exercise_id, set.set_id)) {
            return Err(BackendError::Status {
                status: 500,
                message: format!("set {} rejected", set.set_id),
            });
        }
        self.sets.lock().unwrap().push(set.clone());
        Ok(())
    }

    async fn list_exercises(&self) -> Result<Vec<Exercise>, BackendError> {
        Ok(self.exercises.lock().unwrap().clone())
    }

    async fn create_exercise(&self, exercise: &Exercise) -> Result<Exercise, BackendError> {
        let id = self.next_exercise_id.fetch_add(1, Ordering::SeqCst);
        let created = exercise.clone().with_id(id);
        self.exercises.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn delete_exercise(&self, exercise_id: i64) -> Result<(), BackendError> {
        let mut exercises = self.exercises.lock().unwrap();
        let before = exercises.len();
        exercises.retain(|e| e.id != Some(exercise_id));
        if exercises.len() == before {
            return Err(BackendError::Status {
                status: 404,
                message: "not found".to_string(),
            });
        }
        Ok(())
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub draft: Arc<DraftStore>,
    pub backend: Arc<FakeBackend>,
    pub pipeline: Arc<CommitPipeline>,
}

pub fn harness(backend: FakeBackend, user_id: Option<i64>) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let draft = Arc::new(DraftStore::new(PersistenceMirror::new(store.clone())));
    let backend = Arc::new(backend);
    let pipeline = Arc::new(CommitPipeline::new(
        draft.clone(),
        backend.clone(),
        Arc::new(StaticIdentity::new(user_id)),
    ));
    Harness {
        store,
        draft,
        backend,
        pipeline,
    }
}

pub fn squat() -> Exercise {
    Exercise::new("Squat", "Legs").with_id(5)
}

pub fn bench() -> Exercise {
    Exercise::new("Bench Press", "Chest").with_id(8)
}

pub fn set_ids(draft: &DraftStore, exercise_id: i64) -> Vec<u32> {
    draft
        .sets()
        .get(&exercise_id)
        .map(|bucket| bucket.iter().map(|s| s.set_id).collect())
        .unwrap_or_default()
}
