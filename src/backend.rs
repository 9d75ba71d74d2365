//! REST backend the client saves workouts and exercises to.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::BackendError;
use crate::models::{Exercise, NewWorkout, WorkoutSet};

/// Paths relative to the configured base URL.
pub mod endpoints {
    pub const WORKOUTS: &str = "/workouts";
    pub const SET_TRACKING: &str = "/set-tracking";
    pub const EXERCISES: &str = "/exercises";
}

#[async_trait]
pub trait WorkoutBackend: Send + Sync {
    /// Creates a workout and returns the raw response body. The body may be a
    /// JSON object or a JSON-encoded string.
    async fn create_workout(&self, workout: &NewWorkout) -> Result<Value, BackendError>;

    async fn save_set(&self, set: &WorkoutSet) -> Result<(), BackendError>;

    async fn list_exercises(&self) -> Result<Vec<Exercise>, BackendError>;

    async fn create_exercise(&self, exercise: &Exercise) -> Result<Exercise, BackendError>;

    async fn delete_exercise(&self, exercise_id: i64) -> Result<(), BackendError>;
}

pub struct HttpBackend {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpBackend {
    pub fn new(config: &ClientConfig) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_base_url.clone(),
            token: config.api_token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Value, BackendError> {
        let response = self.authorize(request).send().await?;
        read_body(response).await
    }
}

/// Decodes a response body, keeping non-JSON text as a JSON string.
async fn read_body(response: Response) -> Result<Value, BackendError> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        return Err(BackendError::Status {
            status: status.as_u16(),
            message: text,
        });
    }
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
}

fn decode<T: DeserializeOwned>(body: Value) -> Result<T, BackendError> {
    let body = match body {
        Value::String(text) => serde_json::from_str(&text)
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))?,
        other => other,
    };
    serde_json::from_value(body).map_err(|e| BackendError::InvalidResponse(e.to_string()))
}

#[async_trait]
impl WorkoutBackend for HttpBackend {
    async fn create_workout(&self, workout: &NewWorkout) -> Result<Value, BackendError> {
        debug!(name = %workout.name, total_weight = workout.total_weight, "creating workout");
        let request = self.client.post(self.url(endpoints::WORKOUTS)).json(workout);
        self.send(request).await
    }

    async fn save_set(&self, set: &WorkoutSet) -> Result<(), BackendError> {
        let request = self.client.post(self.url(endpoints::SET_TRACKING)).json(set);
        self.send(request).await.map(|_| ())
    }

    async fn list_exercises(&self) -> Result<Vec<Exercise>, BackendError> {
        let request = self.client.get(self.url(endpoints::EXERCISES));
        decode(self.send(request).await?)
    }

    async fn create_exercise(&self, exercise: &Exercise) -> Result<Exercise, BackendError> {
        let request = self.client.post(self.url(endpoints::EXERCISES)).json(exercise);
        decode(self.send(request).await?)
    }

    async fn delete_exercise(&self, exercise_id: i64) -> Result<(), BackendError> {
        let path = format!("{}/{}", endpoints::EXERCISES, exercise_id);
        let request = self.client.delete(self.url(&path));
        self.send(request).await.map(|_| ())
    }
}
