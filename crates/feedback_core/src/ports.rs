//! crates/feedback_core/src/ports.rs
//!
//! Defines the service contracts (traits) the survey workflow depends on.
//! These traits form the boundary of the hexagonal architecture, so the core
//! never touches HTTP, files or browser storage directly.

use crate::domain::{
    Draft, EvaluationGroup, GroupNotice, NewCompetency, NewQuestion, RemoteSurveyCreationPayload,
    RemoteTemplate, SubmissionCheckpoint, SurveyUser,
};
use async_trait::async_trait;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Request to {path} failed with status {status}")]
    Http { status: u16, path: String },
    #[error("Storage error: {0}")]
    Storage(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Storage Ports (synchronous)
//=========================================================================================

/// Durable string-keyed storage with no transactions and no expiry.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> PortResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> PortResult<()>;
    fn remove(&self, key: &str) -> PortResult<()>;
}

/// Typed persistence for the single survey draft.
pub trait DraftStore: Send + Sync {
    /// Returns `Ok(None)` when nothing usable is stored.
    fn load(&self) -> PortResult<Option<Draft>>;
    fn save(&self, draft: &Draft) -> PortResult<()>;
    fn clear(&self) -> PortResult<()>;
}

/// Resolves participant emails to backend user ids.
///
/// Freshly created users take precedence over the company user list.
pub trait ParticipantDirectory: Send + Sync {
    fn resolve_user_id(&self, email: &str) -> Option<String>;
}

/// Project data written by the upstream project and participant setup steps.
pub trait ProjectStore: Send + Sync {
    fn project_id(&self) -> Option<String>;
    fn evaluation_groups(&self) -> Vec<EvaluationGroup>;
}

/// Persisted submission progress.
pub trait CheckpointStore: Send + Sync {
    fn load(&self) -> Option<SubmissionCheckpoint>;
    fn save(&self, checkpoint: &SubmissionCheckpoint) -> PortResult<()>;
    fn clear(&self) -> PortResult<()>;
}

//=========================================================================================
// Remote Service Ports (asynchronous)
//=========================================================================================

/// The survey REST backend.
#[async_trait]
pub trait SurveyBackend: Send + Sync {
    async fn fetch_template(&self, template_id: &str) -> PortResult<RemoteTemplate>;

    /// Creates a competency and returns its server-issued id.
    async fn create_competency(&self, competency: &NewCompetency) -> PortResult<String>;

    /// Creates a question and returns its server-issued id.
    async fn create_question(&self, question: &NewQuestion) -> PortResult<String>;

    /// Creates the survey. The raw body is returned so the id extraction
    /// stays in one place (`response::parse_survey_creation_response`).
    async fn create_survey(
        &self,
        payload: &RemoteSurveyCreationPayload,
    ) -> PortResult<serde_json::Value>;

    async fn create_survey_users(&self, survey_id: &str, users: &[SurveyUser]) -> PortResult<()>;
}

#[async_trait]
pub trait NotificationService: Send + Sync {
    /// Sends the survey invitation to one evaluation group.
    async fn send_group(&self, notice: &GroupNotice) -> PortResult<()>;
}
