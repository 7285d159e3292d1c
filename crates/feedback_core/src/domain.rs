//! crates/feedback_core/src/domain.rs
//!
//! Defines the core data structures for survey authoring and submission.
//! The draft types double as the persisted draft document, so their serde
//! shape is the on-disk contract shared with the browser front-end.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// The canonical 5-point agreement scale applied to rating-scale questions.
pub const AGREEMENT_SCALE: [&str; 5] = [
    "Strongly Disagree",
    "Disagree",
    "Neutral",
    "Agree",
    "Strongly Agree",
];

//=========================================================================================
// Draft Authoring Types
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionType {
    #[default]
    MultipleChoice,
    RatingScale,
    OpenEnded,
    YesNo,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MultipleChoice => "multiple-choice",
            Self::RatingScale => "rating-scale",
            Self::OpenEnded => "open-ended",
            Self::YesNo => "yes-no",
        }
    }

    /// Every type except open-ended needs at least one option label.
    pub fn requires_options(&self) -> bool {
        !matches!(self, Self::OpenEnded)
    }

    /// Option labels a freshly added question of this type starts with.
    pub fn default_options(&self) -> Vec<String> {
        match self {
            Self::RatingScale => AGREEMENT_SCALE.iter().map(|s| s.to_string()).collect(),
            Self::YesNo => vec!["Yes".to_string(), "No".to_string()],
            Self::MultipleChoice | Self::OpenEnded => Vec::new(),
        }
    }
}

fn default_required() -> bool {
    true
}

/// A single question inside a competency block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: Uuid,
    pub text: String,
    #[serde(rename = "type", default)]
    pub question_type: QuestionType,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default = "default_required")]
    pub required: bool,
}

impl Question {
    /// Creates a required question with a fresh id and the type's default options.
    pub fn new(text: impl Into<String>, question_type: QuestionType) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            question_type,
            options: question_type.default_options(),
            required: true,
        }
    }

    pub fn has_valid_options(&self) -> bool {
        !self.question_type.requires_options() || !self.options.is_empty()
    }
}

/// One named evaluation dimension plus its questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetencyBlock {
    #[serde(default)]
    pub survey_name: String,
    pub competency: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub questions: Vec<Question>,
}

/// The survey being authored, including the in-progress editing fields.
///
/// `blocks` is the authoritative content; everything else is scratch state
/// for the block currently being typed or edited.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    #[serde(default)]
    pub survey_name: String,
    #[serde(default)]
    pub competency: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub question_type: QuestionType,
    #[serde(default, rename = "templatePreviews")]
    pub blocks: Vec<CompetencyBlock>,
    #[serde(default, rename = "editPreviewIndex")]
    pub edit_index: Option<usize>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Draft {
    /// Resets the in-progress block fields and the edit cursor.
    pub fn clear_scratch(&mut self) {
        self.competency.clear();
        self.description.clear();
        self.questions.clear();
        self.input.clear();
        self.edit_index = None;
    }

    /// Returns the first competency name used by more than one block.
    pub fn duplicate_competency(&self) -> Option<&str> {
        self.blocks.iter().enumerate().find_map(|(i, block)| {
            self.blocks[..i]
                .iter()
                .any(|earlier| same_competency(&earlier.competency, &block.competency))
                .then_some(block.competency.as_str())
        })
    }

    pub fn question_count(&self) -> usize {
        self.blocks.iter().map(|b| b.questions.len()).sum()
    }
}

/// Competency names are compared trimmed and case-insensitively.
pub fn same_competency(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

//=========================================================================================
// Remote Template Types
//=========================================================================================

/// A survey template as served by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteTemplate {
    #[serde(alias = "title", alias = "surveyName", default)]
    pub name: String,
    #[serde(default)]
    pub questions: Vec<TemplateQuestion>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateQuestion {
    #[serde(alias = "competencyName", default)]
    pub competency: String,
    #[serde(alias = "question", alias = "questionText")]
    pub text: String,
    #[serde(rename = "type", alias = "questionType", default)]
    pub kind: String,
    #[serde(default)]
    pub description: String,
}

//=========================================================================================
// Participant Types (written by the upstream project setup steps)
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: String,
}

impl Participant {
    /// The email address, if present and non-blank.
    pub fn email(&self) -> Option<&str> {
        self.email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty())
    }

    /// The name to show in logs and warnings, falling back to the email.
    pub fn label(&self) -> &str {
        if self.name.trim().is_empty() {
            self.email().unwrap_or("<unnamed participant>")
        } else {
            self.name.trim()
        }
    }
}

/// One appraisee plus the appraisers evaluating them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationGroup {
    pub id: String,
    #[serde(default)]
    pub appraisee: Option<Participant>,
    #[serde(default)]
    pub appraisers: Vec<Participant>,
}

impl EvaluationGroup {
    pub fn is_complete(&self) -> bool {
        self.appraisee.is_some() && !self.appraisers.is_empty()
    }

    /// Yields every member with a flag telling whether they are an appraiser.
    /// The appraisee, when present, comes first.
    pub fn members(&self) -> impl Iterator<Item = (&Participant, bool)> {
        self.appraisee
            .iter()
            .map(|p| (p, false))
            .chain(self.appraisers.iter().map(|p| (p, true)))
    }
}

//=========================================================================================
// Remote Request Types
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCompetency {
    pub name: String,
    pub description: String,
    pub project_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewQuestion {
    pub text: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub options: Vec<String>,
    pub required: bool,
    pub competency_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyHeader {
    pub survey_name: String,
    pub project_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRef {
    pub question_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyUser {
    pub user_id: String,
    pub appraiser: bool,
    pub role: String,
}

/// The body of the survey-creation request, built fresh at submission time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteSurveyCreationPayload {
    pub survey: SurveyHeader,
    pub questions: Vec<QuestionRef>,
    pub users: Vec<SurveyUser>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    pub name: String,
    pub email: String,
}

/// One notification dispatch covering a single evaluation group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupNotice {
    pub recipients: Vec<Recipient>,
    pub subject: String,
    pub participant: String,
    pub link: String,
    pub survey_id: String,
}

//=========================================================================================
// Submission Progress Types
//=========================================================================================

/// A question that now exists on the server, cached for recovery and debugging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedQuestion {
    pub question_id: String,
    pub competency_name: String,
    pub competency_id: String,
    pub question_text: String,
    pub local_id: Uuid,
}

/// The furthest point a submission has reached. Ordered by pipeline position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubmissionStage {
    #[default]
    NotStarted,
    CompetenciesCreated,
    QuestionsCreated,
    SurveySubmitted,
    AssociationsCreated,
    NotificationsSent,
}

/// Persisted progress of a submission, so a retry resumes instead of
/// re-creating records the server already holds.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionCheckpoint {
    pub survey_name: String,
    #[serde(default)]
    pub stage: SubmissionStage,
    #[serde(default)]
    pub competency_ids: BTreeMap<String, String>,
    #[serde(default)]
    pub created_questions: Vec<CreatedQuestion>,
    #[serde(default)]
    pub survey_id: Option<String>,
}

impl SubmissionCheckpoint {
    pub fn new(survey_name: impl Into<String>) -> Self {
        Self {
            survey_name: survey_name.into(),
            ..Default::default()
        }
    }

    /// Moves the stage forward; never moves it back.
    pub fn advance(&mut self, stage: SubmissionStage) {
        if stage > self.stage {
            self.stage = stage;
        }
    }

    pub fn has_question(&self, local_id: Uuid) -> bool {
        self.created_questions.iter().any(|q| q.local_id == local_id)
    }

    pub fn remote_question_id(&self, local_id: Uuid) -> Option<&str> {
        self.created_questions
            .iter()
            .find(|q| q.local_id == local_id)
            .map(|q| q.question_id.as_str())
    }

    /// Drops progress that no longer matches `draft`: competencies whose block
    /// is gone, and questions that were removed, moved to another block or
    /// reworded. If anything was dropped, the survey must be created again.
    ///
    /// Returns true if the checkpoint changed.
    pub fn reconcile(&mut self, draft: &Draft) -> bool {
        let competencies_before = self.competency_ids.len();
        self.competency_ids
            .retain(|name, _| draft.blocks.iter().any(|b| b.competency == *name));

        let questions_before = self.created_questions.len();
        self.created_questions.retain(|created| {
            draft.blocks.iter().any(|block| {
                block.competency == created.competency_name
                    && block
                        .questions
                        .iter()
                        .any(|q| q.id == created.local_id && q.text == created.question_text)
            })
        });

        let changed = self.competency_ids.len() != competencies_before
            || self.created_questions.len() != questions_before;
        if changed {
            self.survey_id = None;
            self.stage = SubmissionStage::NotStarted;
        }
        changed
    }
}

/// A non-fatal omission recorded while a submission carried on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SubmissionWarning {
    IncompleteGroup { group_id: String },
    UnresolvedParticipant { group_id: String, participant: String },
    MissingEmail { group_id: String, participant: String },
    AssociationFailed { reason: String },
    NotificationFailed { group_id: String, reason: String },
}

impl fmt::Display for SubmissionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IncompleteGroup { group_id } => {
                write!(f, "group {group_id} has no appraisee or no appraisers and was skipped")
            }
            Self::UnresolvedParticipant { group_id, participant } => {
                write!(f, "no user id for {participant} in group {group_id}")
            }
            Self::MissingEmail { group_id, participant } => {
                write!(f, "no email for {participant} in group {group_id}")
            }
            Self::AssociationFailed { reason } => {
                write!(f, "survey users could not be linked: {reason}")
            }
            Self::NotificationFailed { group_id, reason } => {
                write!(f, "notification for group {group_id} failed: {reason}")
            }
        }
    }
}

/// A successful value plus the warnings collected on the way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartialResult<T> {
    pub value: T,
    pub warnings: Vec<SubmissionWarning>,
}

impl<T> PartialResult<T> {
    pub fn new(value: T, warnings: Vec<SubmissionWarning>) -> Self {
        Self { value, warnings }
    }

    /// True when nothing was dropped or degraded.
    pub fn is_complete(&self) -> bool {
        self.warnings.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReport {
    pub survey_id: String,
    pub competencies_created: usize,
    pub questions_created: usize,
    pub users_submitted: usize,
    pub groups_notified: usize,
    pub groups_failed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_document_uses_front_end_field_names() {
        let mut draft = Draft::default();
        draft.survey_name = "Q1 Review".to_string();
        draft.blocks.push(CompetencyBlock {
            survey_name: "Q1 Review".to_string(),
            competency: "Communication".to_string(),
            description: String::new(),
            questions: vec![Question::new("Listens well?", QuestionType::YesNo)],
        });
        draft.edit_index = Some(0);

        let json = serde_json::to_value(&draft).unwrap();
        assert_eq!(json["surveyName"], "Q1 Review");
        assert_eq!(json["templatePreviews"][0]["competency"], "Communication");
        assert_eq!(json["templatePreviews"][0]["questions"][0]["type"], "yes-no");
        assert_eq!(json["editPreviewIndex"], 0);
    }

    #[test]
    fn partial_draft_document_fills_defaults() {
        let draft: Draft = serde_json::from_str(r#"{"surveyName":"Only a name"}"#).unwrap();
        assert_eq!(draft.survey_name, "Only a name");
        assert!(draft.blocks.is_empty());
        assert_eq!(draft.question_type, QuestionType::MultipleChoice);
    }

    #[test]
    fn duplicate_competency_ignores_case_and_padding() {
        let block = |name: &str| CompetencyBlock {
            survey_name: String::new(),
            competency: name.to_string(),
            description: String::new(),
            questions: Vec::new(),
        };
        let mut draft = Draft::default();
        draft.blocks = vec![block("Leadership"), block("Teamwork"), block(" leadership ")];
        assert_eq!(draft.duplicate_competency(), Some(" leadership "));

        draft.blocks.pop();
        assert_eq!(draft.duplicate_competency(), None);
    }

    #[test]
    fn group_members_list_appraisee_first() {
        let person = |name: &str| Participant {
            name: name.to_string(),
            email: Some(format!("{name}@x.com")),
            role: String::new(),
        };
        let group = EvaluationGroup {
            id: "g1".to_string(),
            appraisee: Some(person("alice")),
            appraisers: vec![person("bob"), person("carol")],
        };
        let members: Vec<(&str, bool)> = group.members().map(|(p, a)| (p.name.as_str(), a)).collect();
        assert_eq!(members, vec![("alice", false), ("bob", true), ("carol", true)]);
        assert!(group.is_complete());
    }

    #[test]
    fn checkpoint_stage_never_moves_back() {
        let mut checkpoint = SubmissionCheckpoint::new("Survey");
        checkpoint.advance(SubmissionStage::QuestionsCreated);
        checkpoint.advance(SubmissionStage::CompetenciesCreated);
        assert_eq!(checkpoint.stage, SubmissionStage::QuestionsCreated);
    }
}
