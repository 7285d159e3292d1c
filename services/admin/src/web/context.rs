//! services/admin/src/web/context.rs
//!
//! Receives the project and participant data produced by the earlier setup
//! steps, so submission can resolve the project id and user ids.

use crate::web::rest::{port_error, HandlerError};
use crate::web::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use feedback_core::storage::{DirectoryEntry, ProjectRecord};
use feedback_core::EvaluationGroup;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct ProjectRequest {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Either list may be omitted to leave it unchanged.
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UsersRequest {
    #[schema(value_type = Option<Vec<Object>>)]
    pub created_users: Option<Vec<DirectoryEntry>>,
    #[schema(value_type = Option<Vec<Object>>)]
    pub company_users: Option<Vec<DirectoryEntry>>,
}

#[utoipa::path(
    put,
    path = "/context/project",
    request_body = ProjectRequest,
    responses(
        (status = 204, description = "Project stored"),
        (status = 400, description = "Project id is empty")
    )
)]
pub async fn set_project_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ProjectRequest>,
) -> Result<StatusCode, HandlerError> {
    let id = req.id.trim();
    if id.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Project id is required".to_string()));
    }
    state
        .projects
        .set_project(&ProjectRecord {
            id: id.to_string(),
            name: req.name,
        })
        .map_err(port_error)?;
    info!(project_id = id, "Project stored");
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    put,
    path = "/context/groups",
    request_body(content = Vec<Object>, description = "Evaluation groups: one appraisee plus their appraisers."),
    responses((status = 204, description = "Evaluation groups stored"))
)]
pub async fn set_groups_handler(
    State(state): State<Arc<AppState>>,
    Json(groups): Json<Vec<EvaluationGroup>>,
) -> Result<StatusCode, HandlerError> {
    state
        .projects
        .set_evaluation_groups(&groups)
        .map_err(port_error)?;
    info!(groups = groups.len(), "Evaluation groups stored");
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    put,
    path = "/context/users",
    request_body = UsersRequest,
    responses((status = 204, description = "User directory stored"))
)]
pub async fn set_users_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UsersRequest>,
) -> Result<StatusCode, HandlerError> {
    if let Some(users) = &req.created_users {
        state.directory.set_created_users(users).map_err(port_error)?;
    }
    if let Some(users) = &req.company_users {
        state.directory.set_company_users(users).map_err(port_error)?;
    }
    info!(
        created = req.created_users.as_ref().map_or(0, Vec::len),
        company = req.company_users.as_ref().map_or(0, Vec::len),
        "User directory stored"
    );
    Ok(StatusCode::NO_CONTENT)
}
