//! services/admin/src/web/middleware.rs
//!
//! Authentication middleware for routes that call the backend.

use crate::web::rest::{unauthorized, HandlerError};
use crate::web::state::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use feedback_core::storage::AUTH_TOKEN_KEY;
use std::sync::Arc;
use tracing::{error, warn};

/// Rejects the request with 401 and the login hint when no backend token is stored.
pub async fn require_token(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, HandlerError> {
    let token = state.store.get(AUTH_TOKEN_KEY).map_err(|e| {
        error!("Failed to read the stored token: {:?}", e);
        unauthorized()
    })?;

    if !token.is_some_and(|t| !t.trim().is_empty()) {
        warn!(path = %req.uri().path(), "Rejected request without a stored token");
        return Err(unauthorized());
    }
    Ok(next.run(req).await)
}
