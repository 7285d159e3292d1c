//! services/admin/src/web/preview.rs
//!
//! One-block-per-page preview of the draft before it is submitted.

use crate::web::state::AppState;
use axum::{
    extract::{Query, State},
    response::Json,
};
use feedback_core::CompetencyBlock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PreviewQuery {
    /// Zero-based page; out-of-range values are clamped to the last page.
    #[serde(default)]
    pub page: usize,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PreviewPage {
    pub survey_name: String,
    pub page: usize,
    pub page_count: usize,
    pub has_next: bool,
    pub has_previous: bool,
    /// `None` when the draft has no committed blocks.
    #[schema(value_type = Option<Object>)]
    pub block: Option<CompetencyBlock>,
}

#[utoipa::path(
    get,
    path = "/preview",
    params(PreviewQuery),
    responses((status = 200, description = "One page of the survey preview", body = PreviewPage))
)]
pub async fn preview_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PreviewQuery>,
) -> Json<PreviewPage> {
    let (survey_name, mut navigator) = {
        let composer = state.composer.lock().await;
        (composer.draft().survey_name.clone(), composer.preview())
    };
    navigator.go_to(query.page);

    let (page, page_count) = navigator.position().unwrap_or((0, 0));
    Json(PreviewPage {
        survey_name,
        page,
        page_count,
        has_next: navigator.has_next(),
        has_previous: navigator.has_previous(),
        block: navigator.current_block().cloned(),
    })
}
