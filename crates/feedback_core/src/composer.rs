//! crates/feedback_core/src/composer.rs
//!
//! The authoring state for one survey draft. Every mutation is written back
//! through the `DraftStore` once the initial load has completed.

use crate::domain::{same_competency, CompetencyBlock, Draft, Question, QuestionType};
use crate::error::{WorkflowError, WorkflowResult};
use crate::navigator::SurveyPreviewNavigator;
use crate::ports::{DraftStore, SurveyBackend};
use crate::template::blocks_from_template;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub struct DraftSurveyComposer {
    store: Arc<dyn DraftStore>,
    draft: Draft,
    loaded: bool,
}

impl DraftSurveyComposer {
    /// Creates a composer with an empty, not-yet-loaded draft.
    pub fn new(store: Arc<dyn DraftStore>) -> Self {
        Self {
            store,
            draft: Draft::default(),
            loaded: false,
        }
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    //=====================================================================================
    // Loading
    //=====================================================================================

    /// Restores the persisted draft. Missing or unreadable data yields an
    /// empty draft rather than an error.
    pub fn load_draft(&mut self) {
        self.draft = match self.store.load() {
            Ok(Some(draft)) => {
                info!(
                    survey = %draft.survey_name,
                    blocks = draft.blocks.len(),
                    "Restored survey draft"
                );
                draft
            }
            Ok(None) => Draft::default(),
            Err(e) => {
                warn!(error = %e, "Could not read the stored draft; starting empty");
                Draft::default()
            }
        };
        if self.draft.edit_index.is_some_and(|i| i >= self.draft.blocks.len()) {
            self.draft.edit_index = None;
        }
        self.loaded = true;
    }

    /// Replaces the draft with the blocks of a remote template.
    ///
    /// A fetch failure leaves the current draft untouched so the caller can
    /// offer a retry.
    pub async fn hydrate_from_template(
        &mut self,
        backend: &dyn SurveyBackend,
        template_id: &str,
    ) -> WorkflowResult<()> {
        let template = backend.fetch_template(template_id).await.map_err(|e| {
            warn!(template_id, error = %e, "Template fetch failed");
            WorkflowError::from(e)
        })?;

        let blocks = blocks_from_template(&template);
        info!(
            template_id,
            blocks = blocks.len(),
            "Hydrating draft from template"
        );
        self.draft = Draft {
            survey_name: template.name.trim().to_string(),
            blocks,
            ..Draft::default()
        };
        self.loaded = true;
        self.persist();
        Ok(())
    }

    //=====================================================================================
    // Scratch Field Setters
    //=====================================================================================

    /// Renames the survey, keeping the per-block copies in step.
    pub fn set_survey_name(&mut self, name: &str) {
        self.draft.survey_name = name.to_string();
        for block in &mut self.draft.blocks {
            block.survey_name = name.to_string();
        }
        self.persist();
    }

    pub fn set_competency(&mut self, competency: &str) {
        self.draft.competency = competency.to_string();
        self.persist();
    }

    pub fn set_description(&mut self, description: &str) {
        self.draft.description = description.to_string();
        self.persist();
    }

    pub fn set_input(&mut self, input: &str) {
        self.draft.input = input.to_string();
        self.persist();
    }

    pub fn set_question_type(&mut self, question_type: QuestionType) {
        self.draft.question_type = question_type;
        self.persist();
    }

    //=====================================================================================
    // Question Operations (in-progress block)
    //=====================================================================================

    /// Adds a question of the current type, or retypes an existing question
    /// with the same text. Blank text is ignored and returns `None`.
    pub fn add_or_update_question(&mut self, text: &str) -> Option<Uuid> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let question_type = self.draft.question_type;

        let id = match self
            .draft
            .questions
            .iter_mut()
            .find(|q| q.text.eq_ignore_ascii_case(text))
        {
            Some(existing) => {
                if existing.question_type != question_type {
                    existing.question_type = question_type;
                    existing.options = question_type.default_options();
                }
                existing.id
            }
            None => {
                let question = Question::new(text, question_type);
                let id = question.id;
                self.draft.questions.push(question);
                id
            }
        };

        self.draft.input.clear();
        self.persist();
        Some(id)
    }

    /// Removes a question. Returns false if the id is unknown.
    pub fn delete_question(&mut self, id: Uuid) -> bool {
        let before = self.draft.questions.len();
        self.draft.questions.retain(|q| q.id != id);
        let removed = self.draft.questions.len() != before;
        if removed {
            self.persist();
        }
        removed
    }

    /// Replaces the whole option list. Labels are trimmed and blanks dropped.
    pub fn replace_question_options(&mut self, id: Uuid, options: Vec<String>) -> WorkflowResult<()> {
        let question = self.question_mut(id)?;
        question.options = options
            .into_iter()
            .map(|option| option.trim().to_string())
            .filter(|option| !option.is_empty())
            .collect();
        self.persist();
        Ok(())
    }

    pub fn edit_question_text(&mut self, id: Uuid, text: &str) -> WorkflowResult<()> {
        let text = text.trim();
        if text.is_empty() {
            return Err(WorkflowError::Validation(
                "Question text cannot be empty".to_string(),
            ));
        }
        self.question_mut(id)?.text = text.to_string();
        self.persist();
        Ok(())
    }

    fn question_mut(&mut self, id: Uuid) -> WorkflowResult<&mut Question> {
        self.draft
            .questions
            .iter_mut()
            .find(|q| q.id == id)
            .ok_or_else(|| WorkflowError::Validation(format!("No question with id {id}")))
    }

    //=====================================================================================
    // Block Operations
    //=====================================================================================

    /// Validates the in-progress block and upserts it into the draft.
    /// Returns the index the block now occupies. On error nothing changes.
    pub fn commit_competency_block(&mut self) -> WorkflowResult<usize> {
        let competency = self.draft.competency.trim().to_string();
        if competency.is_empty() {
            return Err(WorkflowError::Validation(
                "Please enter a competency name".to_string(),
            ));
        }
        if self.draft.questions.is_empty() {
            return Err(WorkflowError::Validation(
                "Please add at least one question".to_string(),
            ));
        }
        if let Some(question) = self.draft.questions.iter().find(|q| !q.has_valid_options()) {
            return Err(WorkflowError::Validation(format!(
                "Question \"{}\" needs at least one option",
                question.text
            )));
        }
        let edit_index = self.draft.edit_index;
        let taken = self
            .draft
            .blocks
            .iter()
            .enumerate()
            .any(|(i, block)| Some(i) != edit_index && same_competency(&block.competency, &competency));
        if taken {
            return Err(WorkflowError::Validation(format!(
                "A competency named \"{competency}\" already exists in this survey"
            )));
        }

        let block = CompetencyBlock {
            survey_name: self.draft.survey_name.clone(),
            competency,
            description: self.draft.description.trim().to_string(),
            questions: std::mem::take(&mut self.draft.questions),
        };
        let index = match edit_index {
            Some(i) if i < self.draft.blocks.len() => {
                self.draft.blocks[i] = block;
                i
            }
            _ => {
                self.draft.blocks.push(block);
                self.draft.blocks.len() - 1
            }
        };

        self.draft.clear_scratch();
        self.persist();
        Ok(index)
    }

    /// Loads block `index` into the scratch fields for editing.
    pub fn edit_existing_block(&mut self, index: usize) -> WorkflowResult<()> {
        let block = self
            .draft
            .blocks
            .get(index)
            .cloned()
            .ok_or_else(|| WorkflowError::Validation(format!("No competency block at index {index}")))?;

        self.draft.competency = block.competency;
        self.draft.description = block.description;
        self.draft.questions = block.questions;
        self.draft.input.clear();
        self.draft.edit_index = Some(index);
        self.persist();
        Ok(())
    }

    pub fn delete_block(&mut self, index: usize) -> WorkflowResult<CompetencyBlock> {
        if index >= self.draft.blocks.len() {
            return Err(WorkflowError::Validation(format!(
                "No competency block at index {index}"
            )));
        }
        let removed = self.draft.blocks.remove(index);
        match self.draft.edit_index {
            Some(i) if i == index => self.draft.clear_scratch(),
            Some(i) if i > index => self.draft.edit_index = Some(i - 1),
            _ => {}
        }
        self.persist();
        Ok(removed)
    }

    //=====================================================================================
    // Persistence
    //=====================================================================================

    /// Writes the draft through the store. Does nothing before the first
    /// load, so an unloaded composer never overwrites a stored draft.
    pub fn persist(&mut self) {
        if !self.loaded {
            debug!("Draft not loaded yet; skipping persist");
            return;
        }
        self.draft.timestamp = Some(Utc::now());
        if let Err(e) = self.store.save(&self.draft) {
            warn!(error = %e, "Failed to persist survey draft");
        }
    }

    /// Resets every field and removes the persisted draft.
    pub fn clear(&mut self) {
        self.draft = Draft::default();
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to remove the stored draft");
        }
    }

    /// An immutable copy for submission.
    pub fn snapshot(&self) -> Draft {
        self.draft.clone()
    }

    pub fn preview(&self) -> SurveyPreviewNavigator {
        SurveyPreviewNavigator::new(self.draft.blocks.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RemoteTemplate, TemplateQuestion};
    use crate::memory::InMemoryKeyValueStore;
    use crate::ports::{KeyValueStore, PortError};
    use crate::storage::{KvDraftStore, DRAFT_KEY};
    use crate::test_support::FakeBackend;

    fn composer_with_store() -> (DraftSurveyComposer, Arc<InMemoryKeyValueStore>) {
        let kv = Arc::new(InMemoryKeyValueStore::new());
        let mut composer = DraftSurveyComposer::new(Arc::new(KvDraftStore::new(kv.clone())));
        composer.load_draft();
        (composer, kv)
    }

    fn commit_block(composer: &mut DraftSurveyComposer, name: &str, questions: &[&str]) {
        composer.set_competency(name);
        composer.set_question_type(QuestionType::YesNo);
        for text in questions {
            composer.add_or_update_question(text);
        }
        composer.commit_competency_block().unwrap();
    }

    #[test]
    fn persisted_draft_round_trips() {
        let (mut composer, kv) = composer_with_store();
        composer.set_survey_name("Q1 Review");
        commit_block(&mut composer, "Communication", &["Listens well?", "Speaks clearly?"]);
        commit_block(&mut composer, "Teamwork", &["Helps others?"]);

        let mut restored = DraftSurveyComposer::new(Arc::new(KvDraftStore::new(kv)));
        restored.load_draft();

        assert_eq!(restored.draft().survey_name, "Q1 Review");
        assert_eq!(restored.draft().blocks, composer.draft().blocks);
    }

    #[test]
    fn unparseable_draft_loads_empty() {
        let kv = Arc::new(InMemoryKeyValueStore::new());
        kv.set(DRAFT_KEY, "not json at all").unwrap();
        let mut composer = DraftSurveyComposer::new(Arc::new(KvDraftStore::new(kv)));

        composer.load_draft();

        assert!(composer.is_loaded());
        assert_eq!(composer.draft(), &Draft::default());
    }

    #[test]
    fn nothing_is_persisted_before_load() {
        let kv = Arc::new(InMemoryKeyValueStore::new());
        let mut composer = DraftSurveyComposer::new(Arc::new(KvDraftStore::new(kv.clone())));

        composer.set_survey_name("Too early");

        assert!(!kv.contains(DRAFT_KEY));
    }

    #[test]
    fn store_write_failures_do_not_interrupt_editing() {
        let (mut composer, kv) = composer_with_store();
        kv.reject_writes(true);

        composer.set_survey_name("Still editable");

        assert_eq!(composer.draft().survey_name, "Still editable");
        assert!(!kv.contains(DRAFT_KEY));
    }

    #[test]
    fn blank_question_text_is_ignored() {
        let (mut composer, _) = composer_with_store();
        assert_eq!(composer.add_or_update_question("   "), None);
        assert!(composer.draft().questions.is_empty());
    }

    #[test]
    fn repeated_question_text_retypes_instead_of_duplicating() {
        let (mut composer, _) = composer_with_store();
        let first = composer.add_or_update_question("Gives feedback?").unwrap();
        composer.set_question_type(QuestionType::RatingScale);
        let second = composer.add_or_update_question("gives feedback?").unwrap();

        assert_eq!(first, second);
        assert_eq!(composer.draft().questions.len(), 1);
        assert_eq!(composer.draft().questions[0].question_type, QuestionType::RatingScale);
        assert_eq!(composer.draft().questions[0].options.len(), 5);
    }

    #[test]
    fn question_edits_replace_whole_values() {
        let (mut composer, _) = composer_with_store();
        let id = composer.add_or_update_question("Pick one").unwrap();

        composer
            .replace_question_options(id, vec![" Agree ".into(), "".into(), "Disagree".into()])
            .unwrap();
        composer.edit_question_text(id, "  Pick exactly one ").unwrap();

        let question = &composer.draft().questions[0];
        assert_eq!(question.options, vec!["Agree", "Disagree"]);
        assert_eq!(question.text, "Pick exactly one");
        assert!(matches!(
            composer.edit_question_text(id, " "),
            Err(WorkflowError::Validation(_))
        ));
        assert!(composer.delete_question(id));
        assert!(!composer.delete_question(id));
    }

    #[test]
    fn commit_after_edit_without_changes_is_a_pure_update() {
        let (mut composer, _) = composer_with_store();
        commit_block(&mut composer, "Communication", &["Listens well?"]);
        commit_block(&mut composer, "Teamwork", &["Helps others?"]);
        let before = composer.draft().blocks.clone();

        composer.edit_existing_block(0).unwrap();
        let index = composer.commit_competency_block().unwrap();

        assert_eq!(index, 0);
        assert_eq!(composer.draft().blocks, before);
        assert_eq!(composer.draft().edit_index, None);
    }

    #[test]
    fn invalid_commits_leave_blocks_untouched() {
        let (mut composer, _) = composer_with_store();
        commit_block(&mut composer, "Communication", &["Listens well?"]);
        let before = composer.draft().blocks.clone();

        composer.set_competency("Focus");
        assert!(matches!(
            composer.commit_competency_block(),
            Err(WorkflowError::Validation(_))
        ));

        composer.set_competency("  ");
        composer.add_or_update_question("Stays on task?");
        assert!(matches!(
            composer.commit_competency_block(),
            Err(WorkflowError::Validation(_))
        ));

        assert_eq!(composer.draft().blocks, before);
        assert_eq!(composer.draft().questions.len(), 1);
    }

    #[test]
    fn duplicate_competency_names_are_rejected() {
        let (mut composer, _) = composer_with_store();
        commit_block(&mut composer, "Communication", &["Listens well?"]);

        composer.set_competency("communication ");
        composer.add_or_update_question("Writes clearly?");
        let err = composer.commit_competency_block().unwrap_err();

        assert!(matches!(err, WorkflowError::Validation(msg) if msg.contains("already exists")));
        assert_eq!(composer.draft().blocks.len(), 1);
    }

    #[test]
    fn choice_questions_need_options_before_commit() {
        let (mut composer, _) = composer_with_store();
        composer.set_competency("Judgement");
        composer.set_question_type(QuestionType::MultipleChoice);
        let id = composer.add_or_update_question("Which fits best?").unwrap();

        assert!(composer.commit_competency_block().is_err());

        composer
            .replace_question_options(id, vec!["Agree".into(), "Disagree".into()])
            .unwrap();
        assert_eq!(composer.commit_competency_block().unwrap(), 0);
    }

    #[test]
    fn deleting_the_block_under_edit_clears_the_cursor() {
        let (mut composer, _) = composer_with_store();
        commit_block(&mut composer, "Communication", &["Listens well?"]);
        commit_block(&mut composer, "Teamwork", &["Helps others?"]);

        composer.edit_existing_block(1).unwrap();
        composer.delete_block(1).unwrap();

        assert_eq!(composer.draft().edit_index, None);
        assert!(composer.draft().competency.is_empty());
        assert!(composer.draft().questions.is_empty());
        assert_eq!(composer.draft().blocks.len(), 1);
    }

    #[test]
    fn deleting_an_earlier_block_shifts_the_cursor() {
        let (mut composer, _) = composer_with_store();
        commit_block(&mut composer, "Communication", &["Listens well?"]);
        commit_block(&mut composer, "Teamwork", &["Helps others?"]);

        composer.edit_existing_block(1).unwrap();
        composer.delete_block(0).unwrap();

        assert_eq!(composer.draft().edit_index, Some(0));
        assert_eq!(composer.draft().competency, "Teamwork");
        assert!(composer.delete_block(5).is_err());
        assert!(composer.edit_existing_block(5).is_err());
    }

    #[test]
    fn clear_resets_and_removes_the_stored_draft() {
        let (mut composer, kv) = composer_with_store();
        commit_block(&mut composer, "Communication", &["Listens well?"]);
        assert!(kv.contains(DRAFT_KEY));

        composer.clear();

        assert_eq!(composer.draft(), &Draft::default());
        assert!(!kv.contains(DRAFT_KEY));
    }

    #[tokio::test]
    async fn template_hydration_groups_by_competency() {
        let (mut composer, kv) = composer_with_store();
        let backend = FakeBackend::default();
        backend.set_template(RemoteTemplate {
            name: "Leadership 360".to_string(),
            questions: vec![
                TemplateQuestion {
                    competency: "Communication".to_string(),
                    text: "Listens well?".to_string(),
                    kind: "likert".to_string(),
                    description: String::new(),
                },
                TemplateQuestion {
                    competency: "Communication".to_string(),
                    text: "Explains decisions?".to_string(),
                    kind: "likert".to_string(),
                    description: String::new(),
                },
            ],
        });

        composer.hydrate_from_template(&backend, "tpl-1").await.unwrap();

        assert_eq!(composer.draft().survey_name, "Leadership 360");
        assert_eq!(composer.draft().blocks.len(), 1);
        assert_eq!(composer.draft().blocks[0].questions.len(), 2);
        assert!(kv.contains(DRAFT_KEY));
    }

    #[tokio::test]
    async fn template_fetch_failure_keeps_the_draft() {
        let (mut composer, _) = composer_with_store();
        composer.set_survey_name("Mine");
        let backend = FakeBackend::default();

        let err = composer
            .hydrate_from_template(&backend, "missing")
            .await
            .unwrap_err();

        assert!(matches!(err, WorkflowError::Remote(PortError::NotFound(_))));
        assert_eq!(composer.draft().survey_name, "Mine");
    }

    #[test]
    fn preview_is_a_detached_snapshot() {
        let (mut composer, _) = composer_with_store();
        commit_block(&mut composer, "Communication", &["Listens well?"]);
        let preview = composer.preview();

        composer.delete_block(0).unwrap();

        assert_eq!(preview.len(), 1);
        assert_eq!(preview.current_block().unwrap().competency, "Communication");
    }
}
