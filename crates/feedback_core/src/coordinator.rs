//! crates/feedback_core/src/coordinator.rs
//!
//! Turns a finished draft into backend records and notifies participants.
//!
//! Competency, question and survey creation are hard-abort stages: the first
//! failure ends the submission and nothing already created is deleted.
//! Participant resolution, survey-user linking and notification degrade
//! gracefully and are reported as warnings. Progress is checkpointed after
//! every remote write so a retry picks up where the last attempt stopped.

use crate::domain::{
    CompetencyBlock, CreatedQuestion, Draft, EvaluationGroup, GroupNotice, NewCompetency,
    NewQuestion, PartialResult, QuestionRef, Recipient, RemoteSurveyCreationPayload,
    SubmissionCheckpoint, SubmissionReport, SubmissionStage, SubmissionWarning, SurveyHeader,
    SurveyUser,
};
use crate::error::{WorkflowError, WorkflowResult};
use crate::ports::{
    CheckpointStore, KeyValueStore, NotificationService, ParticipantDirectory, ProjectStore,
    SurveyBackend,
};
use crate::response::parse_survey_creation_response;
use crate::storage::{purge_survey_keys, CREATED_QUESTIONS_KEY};
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

//=========================================================================================
// Wiring
//=========================================================================================

/// Everything the coordinator talks to.
#[derive(Clone)]
pub struct SubmissionPorts {
    pub backend: Arc<dyn SurveyBackend>,
    pub notifier: Arc<dyn NotificationService>,
    pub directory: Arc<dyn ParticipantDirectory>,
    pub projects: Arc<dyn ProjectStore>,
    pub checkpoints: Arc<dyn CheckpointStore>,
    pub store: Arc<dyn KeyValueStore>,
}

pub struct SurveyPersistenceCoordinator {
    ports: SubmissionPorts,
    base_link: String,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag when a submission ends, however it ends.
struct InFlightGuard<'a>(&'a AtomicBool);

/// A submission that holds the in-flight mark but has not started yet.
pub struct Submission<'a> {
    coordinator: &'a SurveyPersistenceCoordinator,
    _guard: InFlightGuard<'a>,
}

impl Submission<'_> {
    /// Runs the pipeline. The in-flight mark stays until this value is dropped.
    pub async fn run(&self, draft: &Draft) -> WorkflowResult<PartialResult<SubmissionReport>> {
        self.coordinator.run_pipeline(draft).await
    }
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SurveyPersistenceCoordinator {
    pub fn new(ports: SubmissionPorts, base_link: impl Into<String>) -> Self {
        Self {
            ports,
            base_link: base_link.into(),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    //=====================================================================================
    // Submission Pipeline
    //=====================================================================================

    /// Runs the full submission for `draft`.
    ///
    /// Returns `WorkflowError::Busy` if another submission is still running.
    pub async fn submit(&self, draft: &Draft) -> WorkflowResult<PartialResult<SubmissionReport>> {
        self.begin()?.run(draft).await
    }

    /// Marks a submission as running before the draft is chosen. The mark is
    /// cleared when the returned `Submission` is dropped.
    pub fn begin(&self) -> WorkflowResult<Submission<'_>> {
        let guard = InFlightGuard::acquire(&self.in_flight).ok_or(WorkflowError::Busy)?;
        Ok(Submission {
            coordinator: self,
            _guard: guard,
        })
    }

    /// Forgets any saved submission progress, e.g. when the draft is cleared.
    pub fn discard_checkpoint(&self) {
        if let Err(e) = self.ports.checkpoints.clear() {
            warn!(error = %e, "Failed to remove the submission checkpoint");
        }
    }

    async fn run_pipeline(&self, draft: &Draft) -> WorkflowResult<PartialResult<SubmissionReport>> {
        validate_for_submission(draft)?;
        let project_id = self.ports.projects.project_id().ok_or_else(|| {
            WorkflowError::MissingDependency(
                "No project found. Create a project before submitting the survey.".to_string(),
            )
        })?;

        info!(
            survey = %draft.survey_name,
            competencies = draft.blocks.len(),
            questions = draft.question_count(),
            "Submitting survey"
        );
        let mut checkpoint = self.resume_checkpoint(draft);
        let mut warnings = Vec::new();

        // --- 1. Competencies ---
        self.create_competencies(draft, &project_id, &mut checkpoint)
            .await?;

        // --- 2. Questions ---
        let questions = self.create_questions(draft, &mut checkpoint).await;
        match &questions {
            Ok(()) => self.cache_created_questions(&checkpoint.created_questions),
            Err(_) => self.cache_created_questions(&[]),
        }
        questions?;

        // --- 3. Users ---
        let groups = self.ports.projects.evaluation_groups();
        let users = dedup_users(self.resolve_users(&groups, &mut warnings));

        // --- 4. Survey ---
        let payload = RemoteSurveyCreationPayload {
            survey: SurveyHeader {
                survey_name: draft.survey_name.trim().to_string(),
                project_id,
            },
            questions: draft
                .blocks
                .iter()
                .flat_map(|b| &b.questions)
                .filter_map(|q| checkpoint.remote_question_id(q.id))
                .map(|question_id| QuestionRef {
                    question_id: question_id.to_string(),
                })
                .collect(),
            users,
        };
        let survey_id = self.create_survey(&payload, &mut checkpoint).await?;

        // --- 5. Survey users ---
        if checkpoint.stage < SubmissionStage::AssociationsCreated {
            match self
                .ports
                .backend
                .create_survey_users(&survey_id, &payload.users)
                .await
            {
                Ok(()) => {
                    checkpoint.advance(SubmissionStage::AssociationsCreated);
                    self.save_checkpoint(&checkpoint);
                }
                Err(e) => {
                    warn!(survey_id = %survey_id, error = %e, "Survey users could not be linked; continuing");
                    warnings.push(SubmissionWarning::AssociationFailed {
                        reason: e.to_string(),
                    });
                }
            }
        }

        // --- 6. Notifications ---
        let (groups_notified, groups_failed) = self
            .notify_groups(&groups, &draft.survey_name, &survey_id, &mut warnings)
            .await;
        checkpoint.advance(SubmissionStage::NotificationsSent);

        // --- 7. Cleanup ---
        purge_survey_keys(self.ports.store.as_ref());

        let report = SubmissionReport {
            survey_id,
            competencies_created: checkpoint.competency_ids.len(),
            questions_created: checkpoint.created_questions.len(),
            users_submitted: payload.users.len(),
            groups_notified,
            groups_failed,
        };
        info!(
            survey_id = %report.survey_id,
            users = report.users_submitted,
            groups_notified,
            groups_failed,
            warnings = warnings.len(),
            "Survey submitted"
        );
        Ok(PartialResult::new(report, warnings))
    }

    async fn create_competencies(
        &self,
        draft: &Draft,
        project_id: &str,
        checkpoint: &mut SubmissionCheckpoint,
    ) -> WorkflowResult<()> {
        for block in &draft.blocks {
            if checkpoint.competency_ids.contains_key(&block.competency) {
                debug!(competency = %block.competency, "Competency already created; skipping");
                continue;
            }
            let request = NewCompetency {
                name: block.competency.clone(),
                description: competency_description(block),
                project_id: project_id.to_string(),
            };
            let id = self
                .ports
                .backend
                .create_competency(&request)
                .await
                .map_err(|e| {
                    error!(competency = %block.competency, error = %e, "Competency creation failed; aborting submission");
                    e
                })?;
            debug!(competency = %block.competency, id = %id, "Competency created");
            checkpoint.competency_ids.insert(block.competency.clone(), id);
            self.save_checkpoint(checkpoint);
        }
        checkpoint.advance(SubmissionStage::CompetenciesCreated);
        self.save_checkpoint(checkpoint);
        Ok(())
    }

    async fn create_questions(
        &self,
        draft: &Draft,
        checkpoint: &mut SubmissionCheckpoint,
    ) -> WorkflowResult<()> {
        for block in &draft.blocks {
            let Some(competency_id) = checkpoint.competency_ids.get(&block.competency).cloned() else {
                continue;
            };
            for question in &block.questions {
                if checkpoint.has_question(question.id) {
                    continue;
                }
                let request = NewQuestion {
                    text: question.text.clone(),
                    question_type: question.question_type,
                    options: question.options.clone(),
                    required: question.required,
                    competency_id: competency_id.clone(),
                };
                let question_id = self
                    .ports
                    .backend
                    .create_question(&request)
                    .await
                    .map_err(|e| {
                        error!(question = %question.text, error = %e, "Question creation failed; aborting submission");
                        e
                    })?;
                checkpoint.created_questions.push(CreatedQuestion {
                    question_id,
                    competency_name: block.competency.clone(),
                    competency_id: competency_id.clone(),
                    question_text: question.text.clone(),
                    local_id: question.id,
                });
                self.save_checkpoint(checkpoint);
            }
        }
        checkpoint.advance(SubmissionStage::QuestionsCreated);
        self.save_checkpoint(checkpoint);
        Ok(())
    }

    async fn create_survey(
        &self,
        payload: &RemoteSurveyCreationPayload,
        checkpoint: &mut SubmissionCheckpoint,
    ) -> WorkflowResult<String> {
        if let Some(id) = checkpoint.survey_id.clone() {
            info!(survey_id = %id, "Survey already created by an earlier attempt");
            return Ok(id);
        }
        let body = self.ports.backend.create_survey(payload).await.map_err(|e| {
            error!(error = %e, "Survey creation failed; aborting submission");
            e
        })?;
        let id = parse_survey_creation_response(&body).map_err(|e| {
            error!(error = %e, "Survey was created but its id could not be read");
            e
        })?;
        checkpoint.survey_id = Some(id.clone());
        checkpoint.advance(SubmissionStage::SurveySubmitted);
        self.save_checkpoint(checkpoint);
        Ok(id)
    }

    /// Looks up user ids for every member of every complete group.
    fn resolve_users(
        &self,
        groups: &[EvaluationGroup],
        warnings: &mut Vec<SubmissionWarning>,
    ) -> Vec<SurveyUser> {
        let mut users = Vec::new();
        for group in groups {
            if !group.is_complete() {
                warn!(group_id = %group.id, "Skipping incomplete evaluation group");
                warnings.push(SubmissionWarning::IncompleteGroup {
                    group_id: group.id.clone(),
                });
                continue;
            }
            for (participant, appraiser) in group.members() {
                let user_id = participant
                    .email()
                    .and_then(|email| self.ports.directory.resolve_user_id(email));
                match user_id {
                    Some(user_id) => users.push(SurveyUser {
                        user_id,
                        appraiser,
                        role: role_for(&participant.role, appraiser),
                    }),
                    None => {
                        warn!(group_id = %group.id, participant = %participant.label(), "No user id for participant; leaving them out");
                        warnings.push(SubmissionWarning::UnresolvedParticipant {
                            group_id: group.id.clone(),
                            participant: participant.label().to_string(),
                        });
                    }
                }
            }
        }
        users
    }

    /// Sends one notice per complete group, all concurrently. Returns
    /// `(groups notified, groups failed)`.
    async fn notify_groups(
        &self,
        groups: &[EvaluationGroup],
        survey_name: &str,
        survey_id: &str,
        warnings: &mut Vec<SubmissionWarning>,
    ) -> (usize, usize) {
        let mut notices = Vec::new();
        for group in groups.iter().filter(|g| g.is_complete()) {
            let mut recipients = Vec::new();
            for (participant, _) in group.members() {
                match participant.email() {
                    Some(email) => recipients.push(Recipient {
                        name: participant.name.trim().to_string(),
                        email: email.to_string(),
                    }),
                    None => warnings.push(SubmissionWarning::MissingEmail {
                        group_id: group.id.clone(),
                        participant: participant.label().to_string(),
                    }),
                }
            }
            if recipients.is_empty() {
                continue;
            }
            let appraisee = group
                .appraisee
                .as_ref()
                .map(|p| p.label().to_string())
                .unwrap_or_default();
            notices.push((
                group.id.clone(),
                GroupNotice {
                    recipients,
                    subject: format!("{}: 360° feedback for {}", survey_name.trim(), appraisee),
                    participant: appraisee,
                    link: self.base_link.clone(),
                    survey_id: survey_id.to_string(),
                },
            ));
        }

        let results = join_all(
            notices
                .iter()
                .map(|(_, notice)| self.ports.notifier.send_group(notice)),
        )
        .await;

        let mut failed = 0;
        for ((group_id, _), result) in notices.iter().zip(results) {
            if let Err(e) = result {
                failed += 1;
                warn!(group_id = %group_id, error = %e, "Notification failed for group");
                warnings.push(SubmissionWarning::NotificationFailed {
                    group_id: group_id.clone(),
                    reason: e.to_string(),
                });
            }
        }
        (notices.len() - failed, failed)
    }

    //=====================================================================================
    // Checkpoint and Cache Helpers
    //=====================================================================================

    /// Loads saved progress for this survey, keeping only the records that
    /// still match the draft being submitted.
    fn resume_checkpoint(&self, draft: &Draft) -> SubmissionCheckpoint {
        let survey_name = draft.survey_name.as_str();
        match self.ports.checkpoints.load() {
            Some(mut checkpoint) if checkpoint.survey_name == survey_name => {
                if checkpoint.reconcile(draft) {
                    info!("Draft changed since the last attempt; dropped stale progress");
                    self.save_checkpoint(&checkpoint);
                }
                info!(
                    stage = ?checkpoint.stage,
                    competencies = checkpoint.competency_ids.len(),
                    questions = checkpoint.created_questions.len(),
                    "Resuming an interrupted submission"
                );
                checkpoint
            }
            Some(stale) => {
                info!(previous = %stale.survey_name, "Discarding checkpoint of another survey");
                SubmissionCheckpoint::new(survey_name)
            }
            None => SubmissionCheckpoint::new(survey_name),
        }
    }

    fn save_checkpoint(&self, checkpoint: &SubmissionCheckpoint) {
        if let Err(e) = self.ports.checkpoints.save(checkpoint) {
            warn!(error = %e, "Failed to save submission checkpoint");
        }
    }

    fn cache_created_questions(&self, questions: &[CreatedQuestion]) {
        let result = serde_json::to_string(questions)
            .map_err(|e| e.to_string())
            .and_then(|raw| {
                self.ports
                    .store
                    .set(CREATED_QUESTIONS_KEY, &raw)
                    .map_err(|e| e.to_string())
            });
        if let Err(e) = result {
            warn!(error = %e, "Failed to cache created questions");
        }
    }
}

//=========================================================================================
// Pure Helpers
//=========================================================================================

/// Checks everything that can be checked without a remote call.
pub fn validate_for_submission(draft: &Draft) -> WorkflowResult<()> {
    if draft.survey_name.trim().is_empty() {
        return Err(WorkflowError::Validation(
            "Please enter a survey name".to_string(),
        ));
    }
    if draft.blocks.is_empty() {
        return Err(WorkflowError::Validation(
            "Please add at least one competency".to_string(),
        ));
    }
    if let Some(block) = draft.blocks.iter().find(|b| b.questions.is_empty()) {
        return Err(WorkflowError::Validation(format!(
            "Competency \"{}\" has no questions",
            block.competency
        )));
    }
    if let Some(question) = draft
        .blocks
        .iter()
        .flat_map(|b| &b.questions)
        .find(|q| !q.has_valid_options())
    {
        return Err(WorkflowError::Validation(format!(
            "Question \"{}\" needs at least one option",
            question.text
        )));
    }
    if let Some(name) = draft.duplicate_competency() {
        return Err(WorkflowError::Validation(format!(
            "Competency \"{}\" appears more than once",
            name.trim()
        )));
    }
    Ok(())
}

/// Removes repeated user ids; the first entry for an id wins.
pub fn dedup_users(users: Vec<SurveyUser>) -> Vec<SurveyUser> {
    let mut seen = HashSet::new();
    users
        .into_iter()
        .filter(|user| seen.insert(user.user_id.clone()))
        .collect()
}

/// The backend rejects empty descriptions.
fn competency_description(block: &CompetencyBlock) -> String {
    match block.description.trim() {
        "" => format!("Evaluates {} competency", block.competency.trim()),
        description => description.to_string(),
    }
}

fn role_for(role: &str, appraiser: bool) -> String {
    match role.trim() {
        "" if appraiser => "appraiser".to_string(),
        "" => "appraisee".to_string(),
        role => role.to_string(),
    }
}
