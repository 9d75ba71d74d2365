//! Workout tracker client.
//!
//! Exercises and sets are logged into a draft workout that survives restarts
//! and is saved to the REST backend in one commit.
//!
//! ```no_run
//! use std::sync::Arc;
//! use workout_tracker::{
//!     ClientConfig, CommitPipeline, DraftStore, FileStore, HttpBackend, PersistenceMirror,
//!     StaticIdentity,
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::from_env()?;
//! let mirror = PersistenceMirror::new(Arc::new(FileStore::new(&config.storage_dir)));
//! let draft = Arc::new(DraftStore::restore(mirror));
//! let pipeline = CommitPipeline::new(
//!     draft.clone(),
//!     Arc::new(HttpBackend::new(&config)?),
//!     Arc::new(StaticIdentity::new(config.user_id)),
//! );
//!
//! draft.set_name("Leg Day");
//! let workout = pipeline.commit().await?;
//! println!("saved workout {}", workout.id);
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod catalog;
pub mod commit;
pub mod config;
pub mod draft;
pub mod error;
pub mod identity;
pub mod mirror;
pub mod models;
pub mod storage;

pub use backend::{HttpBackend, WorkoutBackend};
pub use catalog::ExerciseCatalog;
pub use commit::{CommitPhase, CommitPipeline};
pub use config::ClientConfig;
pub use draft::DraftStore;
pub use error::{BackendError, CommitError, ConfigError, DraftError, StorageError, ValidationError};
pub use identity::{IdentityProvider, StaticIdentity};
pub use mirror::PersistenceMirror;
pub use models::{CommittedWorkout, Draft, Exercise, SetBuckets, SetField, WorkoutSet};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
