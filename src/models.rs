//models.rs
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status stamped on every workout created from a draft.
pub const STATUS_COMPLETED: &str = "completed";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
}

impl Exercise {
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            category: category.into(),
            description: String::new(),
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// One logged set. `workout_id` stays 0 until the draft is committed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkoutSet {
    pub exercise_id: i64,
    #[serde(default)]
    pub workout_id: i64,
    pub set_id: u32,
    pub reps: u32,
    pub weight: f64,
}

impl WorkoutSet {
    pub fn empty(exercise_id: i64, set_id: u32) -> Self {
        Self {
            exercise_id,
            workout_id: 0,
            set_id,
            reps: 0,
            weight: 0.0,
        }
    }

    /// Nothing was entered for this row.
    pub fn is_blank(&self) -> bool {
        self.reps == 0 && self.weight == 0.0
    }

    /// Both reps and weight were entered.
    pub fn is_completed(&self) -> bool {
        self.reps > 0 && self.weight > 0.0
    }

    pub fn volume(&self) -> f64 {
        self.weight * f64::from(self.reps)
    }
}

/// A single editable field of a set, carrying its new value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SetField {
    Weight(f64),
    Reps(u32),
}

impl SetField {
    pub(crate) fn apply(self, set: &mut WorkoutSet) {
        match self {
            SetField::Weight(weight) => {
                // JSON has no encoding for NaN or infinity
                set.weight = if weight.is_finite() && weight > 0.0 { weight } else { 0.0 };
            }
            SetField::Reps(reps) => set.reps = reps,
        }
    }
}

/// Sets grouped by exercise id.
pub type SetBuckets = BTreeMap<i64, Vec<WorkoutSet>>;

/// An in-progress workout that has not been saved yet.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Draft {
    pub name: String,
    pub exercises: Vec<Exercise>,
    pub sets: SetBuckets,
}

impl Draft {
    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.exercises.is_empty() && self.sets.is_empty()
    }

    pub fn contains_exercise(&self, exercise_id: i64) -> bool {
        self.exercises.iter().any(|e| e.id == Some(exercise_id))
    }

    /// Sum of `weight * reps` over every set, blank rows included.
    pub fn total_weight(&self) -> f64 {
        self.sets.values().flatten().map(WorkoutSet::volume).sum()
    }

    pub fn has_completed_set(&self) -> bool {
        self.sets.values().flatten().any(WorkoutSet::is_completed)
    }

    pub fn set_count(&self) -> usize {
        self.sets.values().map(Vec::len).sum()
    }
}

/// Renumbers a bucket to `1..N` in its current order.
pub(crate) fn renumber(sets: &mut [WorkoutSet]) {
    for (index, set) in sets.iter_mut().enumerate() {
        set.set_id = index as u32 + 1;
    }
}

/// Body of the workout-create request.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NewWorkout {
    pub user_id: i64,
    pub name: String,
    pub date: DateTime<Utc>,
    pub total_weight: f64,
    pub status: String,
}

impl NewWorkout {
    pub fn completed(user_id: i64, name: impl Into<String>, date: DateTime<Utc>, total_weight: f64) -> Self {
        Self {
            user_id,
            name: name.into(),
            date,
            total_weight,
            status: STATUS_COMPLETED.to_string(),
        }
    }

    pub fn into_committed(self, id: i64) -> CommittedWorkout {
        CommittedWorkout {
            id,
            user_id: self.user_id,
            name: self.name,
            date: self.date,
            total_weight: self.total_weight,
            status: self.status,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommittedWorkout {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub date: DateTime<Utc>,
    pub total_weight: f64,
    pub status: String,
}
