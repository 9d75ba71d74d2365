//! Error types for the workout tracker client.

use thiserror::Error;

/// Invalid or missing configuration.
#[derive(Debug, Error)]
#[error("configuration error: {0}")]
pub struct ConfigError(pub String);

/// Errors raised by a key-value store.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),

    /// The write would exceed the store's capacity
    #[error("storage quota exceeded")]
    QuotaExceeded,

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Errors talking to the REST backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Transport-level failure (connect, timeout, body read)
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("server error: {status} - {message}")]
    Status { status: u16, message: String },

    /// Response body could not be decoded into the expected shape
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Rejected draft mutations.
#[derive(Debug, Error, PartialEq)]
pub enum DraftError {
    #[error("exercise '{0}' has not been saved yet")]
    UnsavedExercise(String),
}

/// Reasons a draft cannot be committed. Checked before any request is sent.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("workout name is required")]
    MissingName,

    #[error("add at least one exercise")]
    NoExercises,

    #[error("log at least one set with both reps and weight")]
    NoCompletedSets,
}

/// Failures of a commit attempt. The draft is left untouched in every case.
#[derive(Debug, Error)]
pub enum CommitError {
    #[error("invalid workout: {0}")]
    Validation(#[from] ValidationError),

    #[error("no signed-in user")]
    Unauthenticated,

    #[error("a save is already in progress")]
    InProgress,

    /// Workout creation failed; nothing was stored server-side
    #[error("failed to save workout: {0}")]
    Network(#[source] BackendError),

    /// The workout was created but its id could not be found in the response
    #[error("workout saved but the response carried no id: {body}")]
    ResponseShape { body: String },

    /// The workout exists but not every set reached the server
    #[error("saved {saved} of {total} sets for workout {workout_id}: {source}")]
    PartialSave {
        workout_id: i64,
        saved: usize,
        total: usize,
        #[source]
        source: BackendError,
    },
}
