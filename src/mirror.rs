//! Best-effort durable copy of the draft workout.
//!
//! The draft is spread over three keys so each field can be read back on its
//! own. Set buckets are written as an ordered list of `{exerciseId, sets}`
//! records. Nothing here ever returns an error to the caller: a failed write
//! is logged and a failed read yields an empty draft.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::StorageError;
use crate::models::{renumber, Draft, Exercise, SetBuckets, WorkoutSet};
use crate::storage::KeyValueStore;

pub const EXERCISES_KEY: &str = "draft_workout.exercises";
pub const SETS_KEY: &str = "draft_workout.sets";
pub const NAME_KEY: &str = "draft_workout.name";

const KEYS: [&str; 3] = [EXERCISES_KEY, SETS_KEY, NAME_KEY];

#[derive(Debug, Error)]
enum MirrorError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("malformed {key}: {source}")]
    Malformed {
        key: &'static str,
        source: serde_json::Error,
    },

    #[error("failed to encode draft: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredBucket {
    exercise_id: i64,
    sets: Vec<WorkoutSet>,
}

/// Buckets in exercise order, then any bucket whose exercise is missing.
fn encode_buckets(draft: &Draft) -> Vec<StoredBucket> {
    let mut seen = HashSet::new();
    let mut records = Vec::with_capacity(draft.sets.len());
    for id in draft.exercises.iter().filter_map(|e| e.id) {
        if let Some(sets) = draft.sets.get(&id) {
            if seen.insert(id) {
                records.push(StoredBucket { exercise_id: id, sets: sets.clone() });
            }
        }
    }
    for (id, sets) in &draft.sets {
        if seen.insert(*id) {
            records.push(StoredBucket { exercise_id: *id, sets: sets.clone() });
        }
    }
    records
}

fn decode_buckets(records: Vec<StoredBucket>) -> SetBuckets {
    records
        .into_iter()
        .map(|record| (record.exercise_id, record.sets))
        .collect()
}

/// Brings a decoded draft back in line with the store's invariants.
fn reconcile(draft: &mut Draft) {
    let mut seen = HashSet::new();
    draft
        .exercises
        .retain(|e| matches!(e.id, Some(id) if seen.insert(id)));

    let before = draft.sets.len();
    draft.sets.retain(|id, _| seen.contains(id));
    if draft.sets.len() != before {
        debug!(dropped = before - draft.sets.len(), "dropped orphaned set buckets");
    }

    for id in &seen {
        let bucket = draft
            .sets
            .entry(*id)
            .or_insert_with(|| vec![WorkoutSet::empty(*id, 1)]);
        for set in bucket.iter_mut() {
            set.exercise_id = *id;
        }
        renumber(bucket);
    }
}

fn read_key<T>(store: &dyn KeyValueStore, key: &'static str) -> Result<Option<T>, MirrorError>
where
    T: for<'de> Deserialize<'de>,
{
    match store.get(key)? {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| MirrorError::Malformed { key, source }),
        None => Ok(None),
    }
}

#[derive(Clone)]
pub struct PersistenceMirror {
    store: Arc<dyn KeyValueStore>,
}

impl PersistenceMirror {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn save(&self, draft: &Draft) {
        if let Err(e) = self.try_save(draft) {
            warn!(error = %e, "failed to persist draft workout");
        }
    }

    pub fn load(&self) -> Draft {
        match self.try_load() {
            Ok(draft) => draft,
            Err(e) => {
                warn!(error = %e, "discarding unreadable draft workout");
                Draft::default()
            }
        }
    }

    pub fn clear(&self) {
        for key in KEYS {
            if let Err(e) = self.store.remove(key) {
                warn!(key, error = %e, "failed to clear persisted draft");
            }
        }
    }

    fn try_save(&self, draft: &Draft) -> Result<(), MirrorError> {
        let exercises = serde_json::to_string(&draft.exercises)?;
        let sets = serde_json::to_string(&encode_buckets(draft))?;
        let name = serde_json::to_string(&draft.name)?;

        self.store.set(EXERCISES_KEY, &exercises)?;
        self.store.set(SETS_KEY, &sets)?;
        self.store.set(NAME_KEY, &name)?;
        Ok(())
    }

    fn try_load(&self) -> Result<Draft, MirrorError> {
        let store = self.store.as_ref();
        let exercises: Option<Vec<Exercise>> = read_key(store, EXERCISES_KEY)?;
        let buckets: Option<Vec<StoredBucket>> = read_key(store, SETS_KEY)?;
        let name: Option<String> = read_key(store, NAME_KEY)?;

        let mut draft = Draft {
            name: name.unwrap_or_default(),
            exercises: exercises.unwrap_or_default(),
            sets: decode_buckets(buckets.unwrap_or_default()),
        };
        reconcile(&mut draft);
        Ok(draft)
    }
}
