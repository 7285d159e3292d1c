pub mod auth;
pub mod context;
pub mod draft;
pub mod middleware;
pub mod preview;
pub mod rest;
pub mod state;
pub mod submit;

pub use middleware::require_token;
pub use rest::ApiDoc;
pub use state::AppState;

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Builds the full application router, Swagger UI included. CORS is layered
/// on by the binary since it depends on the deployment origin.
pub fn router(app_state: Arc<AppState>) -> Router {
    // Routes that only touch local state
    let local_routes = Router::new()
        .route(
            "/draft",
            get(draft::get_draft_handler).delete(draft::clear_draft_handler),
        )
        .route("/draft/fields", put(draft::update_fields_handler))
        .route("/draft/questions", post(draft::add_question_handler))
        .route(
            "/draft/questions/{id}",
            put(draft::edit_question_handler).delete(draft::delete_question_handler),
        )
        .route(
            "/draft/questions/{id}/options",
            put(draft::replace_options_handler),
        )
        .route("/draft/blocks", post(draft::commit_block_handler))
        .route("/draft/blocks/{index}/edit", post(draft::edit_block_handler))
        .route("/draft/blocks/{index}", delete(draft::delete_block_handler))
        .route("/preview", get(preview::preview_handler))
        .route("/context/project", put(context::set_project_handler))
        .route("/context/groups", put(context::set_groups_handler))
        .route("/context/users", put(context::set_users_handler))
        .route("/auth/token", post(auth::store_token_handler))
        .route("/auth/logout", post(auth::logout_handler));

    // Routes that call the backend (token required)
    let backend_routes = Router::new()
        .route("/draft/template/{id}", post(draft::load_template_handler))
        .route("/submit", post(submit::submit_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_token,
        ));

    let api_router = Router::new()
        .merge(local_routes)
        .merge(backend_routes)
        .with_state(app_state);

    Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
