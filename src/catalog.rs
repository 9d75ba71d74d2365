use tracing::info;

use crate::backend::WorkoutBackend;
use crate::error::BackendError;
use crate::models::Exercise;

/// Local copy of the exercises known to the backend.
#[derive(Debug, Default, Clone)]
pub struct ExerciseCatalog {
    exercises: Vec<Exercise>,
}

impl ExerciseCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exercises(&self) -> &[Exercise] {
        &self.exercises
    }

    pub fn get(&self, exercise_id: i64) -> Option<&Exercise> {
        self.exercises.iter().find(|e| e.id == Some(exercise_id))
    }

    pub async fn refresh(&mut self, backend: &dyn WorkoutBackend) -> Result<(), BackendError> {
        let mut exercises = backend.list_exercises().await?;
        exercises.retain(|e| e.id.is_some());
        exercises.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        info!(count = exercises.len(), "loaded exercise catalog");
        self.exercises = exercises;
        Ok(())
    }

    /// Saves a new exercise and caches the stored copy.
    pub async fn create(
        &mut self,
        backend: &dyn WorkoutBackend,
        exercise: Exercise,
    ) -> Result<Exercise, BackendError> {
        let created = backend.create_exercise(&exercise).await?;
        if created.id.is_none() {
            return Err(BackendError::InvalidResponse(format!(
                "exercise '{}' was returned without an id",
                created.name
            )));
        }
        let position = self
            .exercises
            .partition_point(|e| e.name.to_lowercase() <= created.name.to_lowercase());
        self.exercises.insert(position, created.clone());
        Ok(created)
    }

    pub async fn delete(&mut self, backend: &dyn WorkoutBackend, exercise_id: i64) -> Result<(), BackendError> {
        backend.delete_exercise(exercise_id).await?;
        self.exercises.retain(|e| e.id != Some(exercise_id));
        Ok(())
    }

    /// Case-insensitive match on name or category. A blank query matches all.
    pub fn search(&self, query: &str) -> Vec<&Exercise> {
        let query = query.trim().to_lowercase();
        self.exercises
            .iter()
            .filter(|e| {
                query.is_empty()
                    || e.name.to_lowercase().contains(&query)
                    || e.category.to_lowercase().contains(&query)
            })
            .collect()
    }

    pub fn categories(&self) -> Vec<&str> {
        let mut categories: Vec<&str> = self
            .exercises
            .iter()
            .map(|e| e.category.as_str())
            .filter(|c| !c.is_empty())
            .collect();
        categories.sort_unstable();
        categories.dedup();
        categories
    }
}
