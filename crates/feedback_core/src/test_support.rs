//! In-memory fakes for the remote ports, shared by the unit tests.

use crate::domain::{
    GroupNotice, NewCompetency, NewQuestion, RemoteSurveyCreationPayload, RemoteTemplate,
    SurveyUser,
};
use crate::ports::{NotificationService, PortError, PortResult, SurveyBackend};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    FetchTemplate(String),
    CreateCompetency(NewCompetency),
    CreateQuestion(NewQuestion),
    CreateSurvey(RemoteSurveyCreationPayload),
    CreateSurveyUsers(String, Vec<SurveyUser>),
}

#[derive(Default)]
pub struct FakeBackend {
    calls: Mutex<Vec<Call>>,
    template: Mutex<Option<RemoteTemplate>>,
    fail_competency: Mutex<Option<String>>,
    fail_question: Mutex<Option<String>>,
    survey_response: Mutex<Option<Value>>,
    fail_survey_users: Mutex<bool>,
}

impl FakeBackend {
    pub fn set_template(&self, template: RemoteTemplate) {
        *self.template.lock().unwrap() = Some(template);
    }

    /// Competency creation fails for this name.
    pub fn fail_competency(&self, name: Option<&str>) {
        *self.fail_competency.lock().unwrap() = name.map(str::to_string);
    }

    /// Question creation fails for this text.
    pub fn fail_question(&self, text: Option<&str>) {
        *self.fail_question.lock().unwrap() = text.map(str::to_string);
    }

    pub fn set_survey_response(&self, response: Value) {
        *self.survey_response.lock().unwrap() = Some(response);
    }

    pub fn fail_survey_users(&self) {
        *self.fail_survey_users.lock().unwrap() = true;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn competency_calls(&self) -> usize {
        self.count(|c| matches!(c, Call::CreateCompetency(_)))
    }

    pub fn question_calls(&self) -> usize {
        self.count(|c| matches!(c, Call::CreateQuestion(_)))
    }

    pub fn survey_payloads(&self) -> Vec<RemoteSurveyCreationPayload> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::CreateSurvey(payload) => Some(payload),
                _ => None,
            })
            .collect()
    }

    fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| predicate(c)).count()
    }

    fn record(&self, call: Call) -> usize {
        let mut calls = self.calls.lock().unwrap();
        calls.push(call);
        calls.len()
    }
}

#[async_trait]
impl SurveyBackend for FakeBackend {
    async fn fetch_template(&self, template_id: &str) -> PortResult<RemoteTemplate> {
        self.record(Call::FetchTemplate(template_id.to_string()));
        self.template
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| PortError::NotFound(format!("template {template_id}")))
    }

    async fn create_competency(&self, competency: &NewCompetency) -> PortResult<String> {
        let n = self.record(Call::CreateCompetency(competency.clone()));
        if self.fail_competency.lock().unwrap().as_deref() == Some(competency.name.as_str()) {
            return Err(PortError::Http {
                status: 500,
                path: "/competencies".to_string(),
            });
        }
        Ok(format!("c{n}"))
    }

    async fn create_question(&self, question: &NewQuestion) -> PortResult<String> {
        let n = self.record(Call::CreateQuestion(question.clone()));
        if self.fail_question.lock().unwrap().as_deref() == Some(question.text.as_str()) {
            return Err(PortError::Http {
                status: 500,
                path: "/questions".to_string(),
            });
        }
        Ok(format!("q{n}"))
    }

    async fn create_survey(&self, payload: &RemoteSurveyCreationPayload) -> PortResult<Value> {
        self.record(Call::CreateSurvey(payload.clone()));
        Ok(self
            .survey_response
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| json!({ "message": "created", "survey": { "id": "s1" } })))
    }

    async fn create_survey_users(&self, survey_id: &str, users: &[SurveyUser]) -> PortResult<()> {
        self.record(Call::CreateSurveyUsers(survey_id.to_string(), users.to_vec()));
        if *self.fail_survey_users.lock().unwrap() {
            return Err(PortError::Unexpected("association service down".to_string()));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeNotifier {
    sent: Mutex<Vec<GroupNotice>>,
    fail_participant: Mutex<Option<String>>,
}

impl FakeNotifier {
    /// Sends for the group whose appraisee has this name fail.
    pub fn fail_for(&self, participant: &str) {
        *self.fail_participant.lock().unwrap() = Some(participant.to_string());
    }

    pub fn sent(&self) -> Vec<GroupNotice> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationService for FakeNotifier {
    async fn send_group(&self, notice: &GroupNotice) -> PortResult<()> {
        if self.fail_participant.lock().unwrap().as_deref() == Some(notice.participant.as_str()) {
            return Err(PortError::Unexpected("smtp refused".to_string()));
        }
        self.sent.lock().unwrap().push(notice.clone());
        Ok(())
    }
}
