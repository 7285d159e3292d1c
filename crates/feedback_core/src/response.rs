//! crates/feedback_core/src/response.rs
//!
//! Parsing of backend response bodies whose shape the workflow depends on.

use crate::error::{WorkflowError, WorkflowResult};
use serde_json::Value;

/// Extracts the new survey's id from a survey-creation response.
///
/// The backend nests the created record under `survey`; the id is read from
/// `survey.id`, or `survey._id` for document-store style records. Anything
/// else is a `ResponseShape` error even though the survey now exists.
pub fn parse_survey_creation_response(body: &Value) -> WorkflowResult<String> {
    let survey = body
        .get("survey")
        .filter(|survey| survey.is_object())
        .ok_or_else(|| WorkflowError::ResponseShape("response has no `survey` object".to_string()))?;

    let id = survey
        .get("id")
        .or_else(|| survey.get("_id"))
        .ok_or_else(|| WorkflowError::ResponseShape("`survey` has no id field".to_string()))?;

    match id {
        Value::String(id) if !id.trim().is_empty() => Ok(id.trim().to_string()),
        Value::Number(id) => Ok(id.to_string()),
        other => Err(WorkflowError::ResponseShape(format!(
            "survey id has unusable value {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_nested_id() {
        let id = parse_survey_creation_response(&json!({ "survey": { "id": "s-42" } })).unwrap();
        assert_eq!(id, "s-42");

        let id = parse_survey_creation_response(&json!({ "survey": { "_id": 7 } })).unwrap();
        assert_eq!(id, "7");
    }

    #[test]
    fn top_level_id_is_not_accepted() {
        let err = parse_survey_creation_response(&json!({ "id": "s-42" })).unwrap_err();
        assert!(matches!(err, WorkflowError::ResponseShape(_)));
    }

    #[test]
    fn blank_or_null_ids_are_rejected() {
        for body in [
            json!({ "survey": { "id": "" } }),
            json!({ "survey": { "id": null } }),
            json!({ "survey": "s-42" }),
        ] {
            assert!(matches!(
                parse_survey_creation_response(&body),
                Err(WorkflowError::ResponseShape(_))
            ));
        }
    }
}
