//! crates/feedback_core/src/error.rs
//!
//! The error taxonomy for the authoring and submission workflow.

use crate::ports::PortError;

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// Required operator input is missing or inconsistent. Nothing was sent.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Upstream state (e.g. the project id) is absent from storage. Nothing was sent.
    #[error("Missing dependency: {0}")]
    MissingDependency(String),

    /// A remote call failed with a non-2xx status, a timeout or a network error.
    #[error("Remote call failed: {0}")]
    Remote(#[from] PortError),

    /// A 2xx response lacked a field this workflow needs.
    #[error("Unexpected response shape: {0}")]
    ResponseShape(String),

    #[error("A survey submission is already in progress")]
    Busy,
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;
