//! services/admin/src/web/draft.rs
//!
//! Handlers for authoring the survey draft.

use crate::web::rest::{workflow_error, DraftView, HandlerError};
use crate::web::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use feedback_core::{DraftSurveyComposer, QuestionType};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::MutexGuard;
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

//=========================================================================================
// Request/Response Types
//=========================================================================================

/// Scratch fields to overwrite. Absent fields are left as they are.
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FieldsUpdate {
    pub survey_name: Option<String>,
    pub competency: Option<String>,
    pub description: Option<String>,
    pub input: Option<String>,
    #[schema(value_type = Option<String>, example = "rating-scale")]
    pub question_type: Option<QuestionType>,
}

/// Adds the given text, or the draft's `input` field when `text` is absent.
#[derive(Deserialize, ToSchema)]
pub struct NewQuestionRequest {
    pub text: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct QuestionTextRequest {
    pub text: String,
}

#[derive(Deserialize, ToSchema)]
pub struct OptionsRequest {
    pub options: Vec<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestionAdded {
    pub question_id: Uuid,
    #[serde(flatten)]
    pub view: DraftView,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BlockCommitted {
    pub index: usize,
    #[serde(flatten)]
    pub view: DraftView,
}

//=========================================================================================
// Helpers
//=========================================================================================

fn view(state: &AppState, composer: &DraftSurveyComposer) -> DraftView {
    DraftView {
        draft: composer.snapshot(),
        submitting: state.coordinator.is_busy(),
    }
}

/// Locks the composer for a mutation, refusing while a submission runs.
///
/// The busy check happens under the lock: submit marks itself busy while
/// holding the same lock, so no edit can land after its snapshot.
async fn editable(state: &AppState) -> Result<MutexGuard<'_, DraftSurveyComposer>, HandlerError> {
    let composer = state.composer.lock().await;
    if state.coordinator.is_busy() {
        return Err((
            StatusCode::CONFLICT,
            "The survey is being submitted; edits are disabled until it finishes".to_string(),
        ));
    }
    Ok(composer)
}

//=========================================================================================
// Handlers
//=========================================================================================

/// Returns the current draft.
#[utoipa::path(
    get,
    path = "/draft",
    responses((status = 200, description = "The current draft", body = DraftView))
)]
pub async fn get_draft_handler(State(state): State<Arc<AppState>>) -> Json<DraftView> {
    let composer = state.composer.lock().await;
    Json(view(&state, &composer))
}

/// Clears every field and removes the stored draft and any saved
/// submission progress ("Clear All").
#[utoipa::path(
    delete,
    path = "/draft",
    responses(
        (status = 200, description = "Draft cleared", body = DraftView),
        (status = 409, description = "A submission is running")
    )
)]
pub async fn clear_draft_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DraftView>, HandlerError> {
    let mut composer = editable(&state).await?;
    composer.clear();
    state.coordinator.discard_checkpoint();
    info!("Survey draft cleared");
    Ok(Json(view(&state, &composer)))
}

#[utoipa::path(
    put,
    path = "/draft/fields",
    request_body = FieldsUpdate,
    responses(
        (status = 200, description = "Fields updated", body = DraftView),
        (status = 409, description = "A submission is running")
    )
)]
pub async fn update_fields_handler(
    State(state): State<Arc<AppState>>,
    Json(update): Json<FieldsUpdate>,
) -> Result<Json<DraftView>, HandlerError> {
    let mut composer = editable(&state).await?;
    if let Some(name) = update.survey_name {
        composer.set_survey_name(&name);
    }
    if let Some(competency) = update.competency {
        composer.set_competency(&competency);
    }
    if let Some(description) = update.description {
        composer.set_description(&description);
    }
    if let Some(input) = update.input {
        composer.set_input(&input);
    }
    if let Some(question_type) = update.question_type {
        composer.set_question_type(question_type);
    }
    Ok(Json(view(&state, &composer)))
}

/// Adds a question of the current type to the block being edited.
#[utoipa::path(
    post,
    path = "/draft/questions",
    request_body = NewQuestionRequest,
    responses(
        (status = 201, description = "Question added or retyped", body = QuestionAdded),
        (status = 400, description = "Question text is empty"),
        (status = 409, description = "A submission is running")
    )
)]
pub async fn add_question_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewQuestionRequest>,
) -> Result<(StatusCode, Json<QuestionAdded>), HandlerError> {
    let mut composer = editable(&state).await?;
    let text = req.text.unwrap_or_else(|| composer.draft().input.clone());
    let question_id = composer.add_or_update_question(&text).ok_or((
        StatusCode::BAD_REQUEST,
        "Please enter the question text".to_string(),
    ))?;
    Ok((
        StatusCode::CREATED,
        Json(QuestionAdded {
            question_id,
            view: view(&state, &composer),
        }),
    ))
}

#[utoipa::path(
    put,
    path = "/draft/questions/{id}",
    request_body = QuestionTextRequest,
    params(("id" = Uuid, Path, description = "The local question id")),
    responses(
        (status = 200, description = "Question text updated", body = DraftView),
        (status = 400, description = "Empty text or unknown question"),
        (status = 409, description = "A submission is running")
    )
)]
pub async fn edit_question_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<QuestionTextRequest>,
) -> Result<Json<DraftView>, HandlerError> {
    let mut composer = editable(&state).await?;
    composer
        .edit_question_text(id, &req.text)
        .map_err(workflow_error)?;
    Ok(Json(view(&state, &composer)))
}

/// Replaces a question's whole option list.
#[utoipa::path(
    put,
    path = "/draft/questions/{id}/options",
    request_body = OptionsRequest,
    params(("id" = Uuid, Path, description = "The local question id")),
    responses(
        (status = 200, description = "Options replaced", body = DraftView),
        (status = 400, description = "Unknown question"),
        (status = 409, description = "A submission is running")
    )
)]
pub async fn replace_options_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<OptionsRequest>,
) -> Result<Json<DraftView>, HandlerError> {
    let mut composer = editable(&state).await?;
    composer
        .replace_question_options(id, req.options)
        .map_err(workflow_error)?;
    Ok(Json(view(&state, &composer)))
}

#[utoipa::path(
    delete,
    path = "/draft/questions/{id}",
    params(("id" = Uuid, Path, description = "The local question id")),
    responses(
        (status = 200, description = "Question removed", body = DraftView),
        (status = 404, description = "Unknown question"),
        (status = 409, description = "A submission is running")
    )
)]
pub async fn delete_question_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<DraftView>, HandlerError> {
    let mut composer = editable(&state).await?;
    if !composer.delete_question(id) {
        return Err((StatusCode::NOT_FOUND, format!("No question with id {}", id)));
    }
    Ok(Json(view(&state, &composer)))
}

/// Validates the block being edited and stores it in the draft.
#[utoipa::path(
    post,
    path = "/draft/blocks",
    responses(
        (status = 200, description = "Block committed", body = BlockCommitted),
        (status = 400, description = "The block is incomplete or its competency name is taken"),
        (status = 409, description = "A submission is running")
    )
)]
pub async fn commit_block_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<BlockCommitted>, HandlerError> {
    let mut composer = editable(&state).await?;
    let index = composer.commit_competency_block().map_err(|e| {
        warn!(error = %e, "Competency block rejected");
        workflow_error(e)
    })?;
    Ok(Json(BlockCommitted {
        index,
        view: view(&state, &composer),
    }))
}

/// Loads a committed block back into the editing fields.
#[utoipa::path(
    post,
    path = "/draft/blocks/{index}/edit",
    params(("index" = usize, Path, description = "Position of the block in the draft")),
    responses(
        (status = 200, description = "Block loaded for editing", body = DraftView),
        (status = 400, description = "No block at that index"),
        (status = 409, description = "A submission is running")
    )
)]
pub async fn edit_block_handler(
    State(state): State<Arc<AppState>>,
    Path(index): Path<usize>,
) -> Result<Json<DraftView>, HandlerError> {
    let mut composer = editable(&state).await?;
    composer.edit_existing_block(index).map_err(workflow_error)?;
    Ok(Json(view(&state, &composer)))
}

#[utoipa::path(
    delete,
    path = "/draft/blocks/{index}",
    params(("index" = usize, Path, description = "Position of the block in the draft")),
    responses(
        (status = 200, description = "Block removed", body = DraftView),
        (status = 400, description = "No block at that index"),
        (status = 409, description = "A submission is running")
    )
)]
pub async fn delete_block_handler(
    State(state): State<Arc<AppState>>,
    Path(index): Path<usize>,
) -> Result<Json<DraftView>, HandlerError> {
    let mut composer = editable(&state).await?;
    let removed = composer.delete_block(index).map_err(workflow_error)?;
    info!(competency = %removed.competency, "Competency block removed");
    Ok(Json(view(&state, &composer)))
}

/// Replaces the draft with the content of a remote template.
#[utoipa::path(
    post,
    path = "/draft/template/{id}",
    params(("id" = String, Path, description = "The backend template id")),
    responses(
        (status = 200, description = "Draft replaced by the template", body = DraftView),
        (status = 401, description = "Not logged in"),
        (status = 409, description = "A submission is running"),
        (status = 502, description = "The template could not be fetched")
    )
)]
pub async fn load_template_handler(
    State(state): State<Arc<AppState>>,
    Path(template_id): Path<String>,
) -> Result<Json<DraftView>, HandlerError> {
    let mut composer = editable(&state).await?;
    composer
        .hydrate_from_template(state.backend.as_ref(), &template_id)
        .await
        .map_err(workflow_error)?;
    Ok(Json(view(&state, &composer)))
}
