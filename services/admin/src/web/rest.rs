//! services/admin/src/web/rest.rs
//!
//! The master definition for the OpenAPI specification, the payloads shared
//! by several handlers, and the mapping from workflow errors to responses.

use crate::adapters::http::LOGIN_PATH;
use crate::web::{auth, context, draft, preview, submit};
use axum::http::StatusCode;
use feedback_core::{Draft, PortError, WorkflowError};
use serde::Serialize;
use utoipa::{OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        draft::get_draft_handler,
        draft::clear_draft_handler,
        draft::update_fields_handler,
        draft::add_question_handler,
        draft::edit_question_handler,
        draft::replace_options_handler,
        draft::delete_question_handler,
        draft::commit_block_handler,
        draft::edit_block_handler,
        draft::delete_block_handler,
        draft::load_template_handler,
        preview::preview_handler,
        submit::submit_handler,
        context::set_project_handler,
        context::set_groups_handler,
        context::set_users_handler,
        auth::store_token_handler,
        auth::logout_handler,
    ),
    components(
        schemas(
            DraftView,
            draft::FieldsUpdate,
            draft::NewQuestionRequest,
            draft::QuestionTextRequest,
            draft::OptionsRequest,
            draft::QuestionAdded,
            draft::BlockCommitted,
            preview::PreviewPage,
            submit::SubmitResponse,
            context::ProjectRequest,
            context::UsersRequest,
            auth::TokenRequest,
        )
    ),
    tags(
        (name = "360 Feedback Admin API", description = "Survey authoring, preview and submission for 360° feedback projects.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Shared Payloads
//=========================================================================================

/// The current draft as the front-end renders it.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DraftView {
    #[schema(value_type = Object)]
    pub draft: Draft,
    /// True while a submission is running; edits are refused until it ends.
    pub submitting: bool,
}

//=========================================================================================
// Error Mapping
//=========================================================================================

pub type HandlerError = (StatusCode, String);

/// Maps a workflow failure to the status the front-end keys its messages on.
pub fn workflow_error(e: WorkflowError) -> HandlerError {
    match e {
        WorkflowError::Validation(message) => (StatusCode::BAD_REQUEST, message),
        WorkflowError::MissingDependency(message) => (StatusCode::PRECONDITION_FAILED, message),
        WorkflowError::Remote(PortError::Unauthorized) => unauthorized(),
        WorkflowError::Busy => (StatusCode::CONFLICT, e.to_string()),
        WorkflowError::Remote(_) | WorkflowError::ResponseShape(_) => {
            (StatusCode::BAD_GATEWAY, e.to_string())
        }
    }
}

/// Maps a local storage failure. These never come from the remote backend.
pub fn port_error(e: PortError) -> HandlerError {
    match e {
        PortError::Unauthorized => unauthorized(),
        other => (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
    }
}

pub fn unauthorized() -> HandlerError {
    (
        StatusCode::UNAUTHORIZED,
        format!("Your session has expired. Please log in again at {}", LOGIN_PATH),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_error_kind() {
        let status = |e| workflow_error(e).0;
        assert_eq!(status(WorkflowError::Validation("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(
            status(WorkflowError::MissingDependency("x".into())),
            StatusCode::PRECONDITION_FAILED
        );
        assert_eq!(
            status(WorkflowError::Remote(PortError::Unauthorized)),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status(WorkflowError::Remote(PortError::Http {
                status: 500,
                path: "/questions".into()
            })),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(status(WorkflowError::ResponseShape("x".into())), StatusCode::BAD_GATEWAY);
        assert_eq!(status(WorkflowError::Busy), StatusCode::CONFLICT);
    }

    #[test]
    fn unauthorized_points_at_the_login_page() {
        let (_, message) = workflow_error(WorkflowError::Remote(PortError::Unauthorized));
        assert!(message.contains(LOGIN_PATH));
    }
}
