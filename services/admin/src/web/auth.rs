//! services/admin/src/web/auth.rs
//!
//! Stores and clears the bearer token used for backend calls. Logging in
//! itself happens against the backend; this service only keeps the result.

use crate::web::rest::{port_error, HandlerError};
use crate::web::state::AppState;
use axum::{extract::State, http::StatusCode, Json};
use feedback_core::storage::{clear_credentials, AUTH_TOKEN_KEY, AUTH_USER_KEY};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;

//=========================================================================================
// Request Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct TokenRequest {
    pub token: String,
    /// The logged-in user's profile as returned by the backend.
    #[schema(value_type = Option<Object>)]
    pub user: Option<Value>,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/token - Keep the backend token for subsequent calls
#[utoipa::path(
    post,
    path = "/auth/token",
    request_body = TokenRequest,
    responses(
        (status = 204, description = "Token stored"),
        (status = 400, description = "Token is empty"),
        (status = 500, description = "The token could not be stored")
    )
)]
pub async fn store_token_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TokenRequest>,
) -> Result<StatusCode, HandlerError> {
    let token = req.token.trim();
    if token.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Token is required".to_string()));
    }
    state.store.set(AUTH_TOKEN_KEY, token).map_err(port_error)?;
    if let Some(user) = req.user {
        state
            .store
            .set(AUTH_USER_KEY, &user.to_string())
            .map_err(port_error)?;
    }
    info!("Backend token stored");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /auth/logout - Forget the stored token and user
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 204, description = "Logout successful"))
)]
pub async fn logout_handler(State(state): State<Arc<AppState>>) -> StatusCode {
    clear_credentials(state.store.as_ref());
    info!("Credentials cleared");
    StatusCode::NO_CONTENT
}
