//! services/admin/src/adapters/backend.rs
//!
//! This module contains the adapter for the survey REST backend.
//! It implements the `SurveyBackend` port from the `core` crate.

use crate::adapters::http::AuthorizedClient;
use async_trait::async_trait;
use feedback_core::domain::{
    NewCompetency, NewQuestion, RemoteSurveyCreationPayload, RemoteTemplate, SurveyUser,
};
use feedback_core::ports::{KeyValueStore, PortError, PortResult, SurveyBackend};
use reqwest::Method;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

const COMPETENCIES_PATH: &str = "/competencies";
const QUESTIONS_PATH: &str = "/questions";
const SURVEYS_PATH: &str = "/surveys";
const SURVEY_USERS_PATH: &str = "/survey-users";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `SurveyBackend` over HTTP with `reqwest`.
#[derive(Clone)]
pub struct HttpSurveyBackend {
    http: AuthorizedClient,
    base_url: String,
}

impl HttpSurveyBackend {
    /// Creates a new `HttpSurveyBackend`. Every request is bounded by `timeout`.
    pub fn new(
        base_url: &str,
        timeout: Duration,
        store: Arc<dyn KeyValueStore>,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: AuthorizedClient::new(timeout, store)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str) -> PortResult<Value> {
        let request = self.http.request(Method::GET, &self.url(path));
        self.http.execute(request, path).await
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> PortResult<Value> {
        let request = self.http.request(Method::POST, &self.url(path)).json(body);
        self.http.execute(request, path).await
    }
}

/// Reads a created record's id from `id`/`_id`, either at the top level or
/// under `data`.
fn extract_id(body: &Value, path: &str) -> PortResult<String> {
    let id = [Some(body), body.get("data")]
        .into_iter()
        .flatten()
        .find_map(|record| record.get("id").or_else(|| record.get("_id")));
    match id {
        Some(Value::String(id)) if !id.is_empty() => Ok(id.clone()),
        Some(Value::Number(id)) => Ok(id.to_string()),
        _ => Err(PortError::Unexpected(format!(
            "Response from {} did not include an id",
            path
        ))),
    }
}

//=========================================================================================
// `SurveyBackend` Trait Implementation
//=========================================================================================

#[async_trait]
impl SurveyBackend for HttpSurveyBackend {
    async fn fetch_template(&self, template_id: &str) -> PortResult<RemoteTemplate> {
        let path = format!("/templates/{}", template_id);
        let body = self.get(&path).await?;
        let body = match body.get("template") {
            Some(inner) => inner.clone(),
            None => body,
        };
        serde_json::from_value(body)
            .map_err(|e| PortError::Unexpected(format!("Malformed template {}: {}", template_id, e)))
    }

    async fn create_competency(&self, competency: &NewCompetency) -> PortResult<String> {
        let body = self.post(COMPETENCIES_PATH, competency).await?;
        extract_id(&body, COMPETENCIES_PATH)
    }

    async fn create_question(&self, question: &NewQuestion) -> PortResult<String> {
        let body = self.post(QUESTIONS_PATH, question).await?;
        extract_id(&body, QUESTIONS_PATH)
    }

    async fn create_survey(&self, payload: &RemoteSurveyCreationPayload) -> PortResult<Value> {
        self.post(SURVEYS_PATH, payload).await
    }

    async fn create_survey_users(&self, survey_id: &str, users: &[SurveyUser]) -> PortResult<()> {
        let body = json!({ "surveyId": survey_id, "users": users });
        self.post(SURVEY_USERS_PATH, &body).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_found_at_the_top_level_or_under_data() {
        assert_eq!(extract_id(&json!({ "_id": "c1" }), "/x").unwrap(), "c1");
        assert_eq!(extract_id(&json!({ "data": { "id": 12 } }), "/x").unwrap(), "12");
        assert!(matches!(
            extract_id(&json!({ "ok": true }), "/x"),
            Err(PortError::Unexpected(_))
        ));
    }
}
