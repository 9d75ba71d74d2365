//! The in-progress workout and everything that may change it.
//!
//! [`DraftStore`] is the only writer of the draft. Each mutation runs to
//! completion under one lock and then, in order, publishes the changed fields
//! on their watch channels and writes the draft to the persistence mirror.
//! Mutations that change nothing publish and persist nothing.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::debug;

use crate::error::DraftError;
use crate::mirror::PersistenceMirror;
use crate::models::{renumber, Draft, Exercise, SetBuckets, SetField, WorkoutSet};

pub struct DraftStore {
    state: Mutex<Draft>,
    name_tx: watch::Sender<String>,
    exercises_tx: watch::Sender<Vec<Exercise>>,
    sets_tx: watch::Sender<SetBuckets>,
    mirror: PersistenceMirror,
}

impl DraftStore {
    /// Starts from an empty draft.
    pub fn new(mirror: PersistenceMirror) -> Self {
        Self::with_draft(Draft::default(), mirror)
    }

    /// Starts from whatever the mirror holds, or an empty draft.
    pub fn restore(mirror: PersistenceMirror) -> Self {
        let draft = mirror.load();
        debug!(
            exercises = draft.exercises.len(),
            sets = draft.set_count(),
            "restored draft workout"
        );
        Self::with_draft(draft, mirror)
    }

    fn with_draft(draft: Draft, mirror: PersistenceMirror) -> Self {
        let (name_tx, _) = watch::channel(draft.name.clone());
        let (exercises_tx, _) = watch::channel(draft.exercises.clone());
        let (sets_tx, _) = watch::channel(draft.sets.clone());
        Self {
            state: Mutex::new(draft),
            name_tx,
            exercises_tx,
            sets_tx,
            mirror,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Draft> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> Draft {
        self.lock().clone()
    }

    pub fn name(&self) -> String {
        self.lock().name.clone()
    }

    pub fn exercises(&self) -> Vec<Exercise> {
        self.lock().exercises.clone()
    }

    pub fn sets(&self) -> SetBuckets {
        self.lock().sets.clone()
    }

    /// Streams the draft name, starting with its current value.
    ///
    /// Every mutation writes to this channel, so a `borrow()` guard on the
    /// receiver must be dropped before calling any mutating method on the
    /// same thread. The same holds for the other `subscribe_*` streams.
    pub fn subscribe_name(&self) -> watch::Receiver<String> {
        self.name_tx.subscribe()
    }

    /// Streams the exercise list. See [`DraftStore::subscribe_name`].
    pub fn subscribe_exercises(&self) -> watch::Receiver<Vec<Exercise>> {
        self.exercises_tx.subscribe()
    }

    /// Streams the set buckets. See [`DraftStore::subscribe_name`].
    pub fn subscribe_sets(&self) -> watch::Receiver<SetBuckets> {
        self.sets_tx.subscribe()
    }

    pub fn set_name(&self, name: impl Into<String>) {
        let name = name.into();
        self.mutate(|draft| {
            if draft.name == name {
                return false;
            }
            draft.name = name;
            true
        });
    }

    /// Appends a saved exercise with one empty set. Adding an exercise that is
    /// already in the draft leaves it and its sets alone.
    pub fn add_exercise(&self, exercise: Exercise) -> Result<(), DraftError> {
        let Some(id) = exercise.id else {
            return Err(DraftError::UnsavedExercise(exercise.name));
        };
        self.mutate(|draft| {
            if draft.contains_exercise(id) {
                return false;
            }
            draft.exercises.push(exercise);
            draft.sets.insert(id, vec![WorkoutSet::empty(id, 1)]);
            true
        });
        Ok(())
    }

    pub fn remove_exercise(&self, exercise_id: i64) {
        self.mutate(|draft| {
            let before = draft.exercises.len();
            draft.exercises.retain(|e| e.id != Some(exercise_id));
            let removed_bucket = draft.sets.remove(&exercise_id).is_some();
            removed_bucket || draft.exercises.len() != before
        });
    }

    pub fn add_set(&self, exercise_id: i64) {
        self.mutate(|draft| {
            if !draft.contains_exercise(exercise_id) {
                return false;
            }
            let bucket = draft.sets.entry(exercise_id).or_default();
            let next_id = bucket.iter().map(|s| s.set_id).max().unwrap_or(0) + 1;
            bucket.push(WorkoutSet::empty(exercise_id, next_id));
            true
        });
    }

    pub fn update_set(&self, exercise_id: i64, set_id: u32, field: SetField) {
        self.mutate(|draft| {
            let Some(set) = draft
                .sets
                .get_mut(&exercise_id)
                .and_then(|bucket| bucket.iter_mut().find(|s| s.set_id == set_id))
            else {
                return false;
            };
            let before = set.clone();
            field.apply(set);
            *set != before
        });
    }

    /// Removes a set and renumbers the rest of the bucket from 1.
    pub fn remove_set(&self, exercise_id: i64, set_id: u32) {
        self.mutate(|draft| {
            let Some(bucket) = draft.sets.get_mut(&exercise_id) else {
                return false;
            };
            let Some(index) = bucket.iter().position(|s| s.set_id == set_id) else {
                return false;
            };
            bucket.remove(index);
            renumber(bucket);
            true
        });
    }

    /// Empties the draft and drops its persisted copy.
    pub fn reset(&self) {
        let mut draft = self.lock();
        *draft = Draft::default();
        self.publish(&*draft);
        self.mirror.clear();
    }

    fn mutate<F>(&self, f: F)
    where
        F: FnOnce(&mut Draft) -> bool,
    {
        let mut draft = self.lock();
        if !f(&mut *draft) {
            return;
        }
        self.publish(&*draft);
        self.mirror.save(&*draft);
    }

    fn publish(&self, draft: &Draft) {
        self.name_tx.send_if_modified(|current| replace_if_changed(current, &draft.name));
        self.exercises_tx
            .send_if_modified(|current| replace_if_changed(current, &draft.exercises));
        self.sets_tx.send_if_modified(|current| replace_if_changed(current, &draft.sets));
    }
}

fn replace_if_changed<T: Clone + PartialEq>(current: &mut T, next: &T) -> bool {
    if *current == *next {
        return false;
    }
    *current = next.clone();
    true
}
