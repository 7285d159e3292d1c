//! services/admin/src/web/submit.rs
//!
//! Submits the draft to the backend and notifies the evaluation groups.

use crate::web::rest::{workflow_error, HandlerError};
use crate::web::state::AppState;
use axum::{extract::State, response::Json};
use feedback_core::{SubmissionReport, SubmissionWarning};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    #[schema(value_type = Object)]
    pub report: SubmissionReport,
    /// True when no participant or notification was skipped.
    pub complete: bool,
    #[schema(value_type = Vec<Object>)]
    pub warnings: Vec<SubmissionWarning>,
    /// Human-readable forms of `warnings`, in the same order.
    pub messages: Vec<String>,
}

/// Creates the competencies, questions and survey, links the participants and
/// emails every evaluation group. The draft is cleared only on success.
#[utoipa::path(
    post,
    path = "/submit",
    responses(
        (status = 200, description = "Survey submitted; check `warnings` for skipped steps", body = SubmitResponse),
        (status = 400, description = "The draft is not ready to submit"),
        (status = 401, description = "Not logged in or the session expired"),
        (status = 409, description = "A submission is already running"),
        (status = 412, description = "No project has been set up"),
        (status = 502, description = "The backend rejected a request or answered unexpectedly")
    )
)]
pub async fn submit_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SubmitResponse>, HandlerError> {
    // Busy from the snapshot until the clear; edits check the flag under the
    // composer lock.
    let (submission, draft) = {
        let composer = state.composer.lock().await;
        let submission = state.coordinator.begin().map_err(workflow_error)?;
        (submission, composer.snapshot())
    };

    let result = submission.run(&draft).await.map_err(|e| {
        error!(survey = %draft.survey_name, error = %e, "Survey submission failed");
        workflow_error(e)
    })?;

    state.composer.lock().await.clear();
    drop(submission);

    if result.is_complete() {
        info!(survey_id = %result.value.survey_id, "Survey submitted");
    } else {
        warn!(
            survey_id = %result.value.survey_id,
            warnings = result.warnings.len(),
            "Survey submitted with warnings"
        );
    }
    let messages = result.warnings.iter().map(ToString::to_string).collect();
    Ok(Json(SubmitResponse {
        complete: result.is_complete(),
        report: result.value,
        warnings: result.warnings,
        messages,
    }))
}
