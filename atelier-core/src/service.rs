//! Generation-service boundary.
//!
//! The image-generation backend is an external collaborator; its wire
//! protocol and authentication are not this crate's business. The router
//! only needs the operations below, with tagged results instead of raw
//! success/message/id tuples. Every variant of [`ServiceError`] renders a
//! human-readable message that the router relays to the user verbatim.

use crate::message::ImageData;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Opaque handle of a task submitted to the generation service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// An accepted submission: the task handle plus the service's own
/// status text, intended for direct relay to the user.
#[derive(Debug, Clone)]
pub struct Submission {
    pub task_id: TaskId,
    pub note: String,
}

/// Status of a previously submitted task.
#[derive(Debug, Clone)]
pub struct TaskStatus {
    pub note: String,
    /// Present once the task has produced a result image.
    pub image_url: Option<String>,
}

/// Queue occupancy report.
#[derive(Debug, Clone)]
pub struct QueueReport {
    pub note: String,
}

/// Errors from the generation service. The `Display` text is what the
/// user sees.
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    /// The service understood the request and refused it.
    #[error("{0}")]
    Rejected(String),

    /// No task with the given id.
    #[error("No task found for id {0}")]
    UnknownTask(String),

    /// The service could not be reached at all.
    #[error("Generation service unavailable: {0}")]
    Unavailable(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Operations the router needs from the generation backend.
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Generate from a prompt, optionally steered by reference images.
    async fn submit_imagine(
        &self,
        prompt: &str,
        images: &[ImageData],
    ) -> ServiceResult<Submission>;

    /// Upscale or vary a finished task.
    async fn submit_upscale(&self, task: &TaskId) -> ServiceResult<Submission>;

    /// Merge two or more images into one.
    async fn submit_blend(
        &self,
        images: &[ImageData],
        aspect: Option<&str>,
    ) -> ServiceResult<Submission>;

    /// Produce a text description of an image.
    async fn submit_describe(&self, image: &ImageData) -> ServiceResult<Submission>;

    /// Query status/result of a task.
    async fn fetch_status(&self, task: &TaskId) -> ServiceResult<TaskStatus>;

    /// Re-run a finished task.
    async fn reroll(&self, task: &TaskId) -> ServiceResult<Submission>;

    /// Report current queue occupancy.
    async fn queue_status(&self) -> ServiceResult<QueueReport>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_error_messages_are_user_facing() {
        let rejected = ServiceError::Rejected("banned prompt word".into());
        assert_eq!(rejected.to_string(), "banned prompt word");

        let unknown = ServiceError::UnknownTask("t-42".into());
        assert_eq!(unknown.to_string(), "No task found for id t-42");
    }

    #[test]
    fn test_task_id_roundtrip() {
        let id = TaskId::from("1234567890");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"1234567890\"");
        let back: TaskId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
