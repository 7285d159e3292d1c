//! crates/feedback_core/src/storage.rs
//!
//! Typed stores layered over a `KeyValueStore`. Each store owns its keys and
//! JSON shapes; everything else in the crate goes through these types rather
//! than probing raw keys.

use crate::domain::{Draft, EvaluationGroup, SubmissionCheckpoint};
use crate::ports::{
    CheckpointStore, DraftStore, KeyValueStore, ParticipantDirectory, PortError, PortResult,
    ProjectStore,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

//=========================================================================================
// Storage Keys
//=========================================================================================

pub const DRAFT_KEY: &str = "surveyScratchDraft";
pub const CREATED_QUESTIONS_KEY: &str = "createdQuestions";
pub const CHECKPOINT_KEY: &str = "surveySubmissionCheckpoint";
pub const PROJECT_KEY: &str = "projectData";
pub const EVALUATION_GROUPS_KEY: &str = "evaluationGroups";
pub const CREATED_USERS_KEY: &str = "createdUsers";
pub const COMPANY_USERS_KEY: &str = "companyUsers";
pub const AUTH_TOKEN_KEY: &str = "token";
pub const AUTH_USER_KEY: &str = "user";

/// Keys removed after a successful submission. Auth keys, the project and
/// the company user list are kept.
pub const SURVEY_DRAFT_KEYS: [&str; 5] = [
    DRAFT_KEY,
    CREATED_QUESTIONS_KEY,
    CHECKPOINT_KEY,
    EVALUATION_GROUPS_KEY,
    CREATED_USERS_KEY,
];

pub const CREDENTIAL_KEYS: [&str; 2] = [AUTH_TOKEN_KEY, AUTH_USER_KEY];

/// Removes every survey-draft key, logging and skipping failures.
pub fn purge_survey_keys(store: &dyn KeyValueStore) {
    remove_all(store, &SURVEY_DRAFT_KEYS);
}

/// Removes the stored bearer token and user profile.
pub fn clear_credentials(store: &dyn KeyValueStore) {
    remove_all(store, &CREDENTIAL_KEYS);
}

fn remove_all(store: &dyn KeyValueStore, keys: &[&str]) {
    for key in keys {
        if let Err(e) = store.remove(key) {
            warn!(key, error = %e, "Failed to remove stored key");
        }
    }
}

/// Reads and parses a JSON value. Missing, unreadable and malformed entries
/// all come back as `None`; the latter two are logged.
fn read_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            warn!(key, error = %e, "Failed to read stored key");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(key, error = %e, "Ignoring malformed stored JSON");
            None
        }
    }
}

fn write_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> PortResult<()> {
    let raw = serde_json::to_string(value).map_err(|e| PortError::Storage(e.to_string()))?;
    store.set(key, &raw)
}

//=========================================================================================
// Draft Store
//=========================================================================================

#[derive(Clone)]
pub struct KvDraftStore {
    store: Arc<dyn KeyValueStore>,
}

impl KvDraftStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }
}

impl DraftStore for KvDraftStore {
    fn load(&self) -> PortResult<Option<Draft>> {
        Ok(read_json(self.store.as_ref(), DRAFT_KEY))
    }

    fn save(&self, draft: &Draft) -> PortResult<()> {
        write_json(self.store.as_ref(), DRAFT_KEY, draft)
    }

    fn clear(&self) -> PortResult<()> {
        self.store.remove(DRAFT_KEY)
    }
}

//=========================================================================================
// Participant Directory
//=========================================================================================

/// One row of a stored user list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub email: String,
    #[serde(alias = "_id", alias = "userId")]
    pub id: String,
}

#[derive(Clone)]
pub struct KvParticipantDirectory {
    store: Arc<dyn KeyValueStore>,
}

impl KvParticipantDirectory {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn set_created_users(&self, users: &[DirectoryEntry]) -> PortResult<()> {
        write_json(self.store.as_ref(), CREATED_USERS_KEY, users)
    }

    pub fn set_company_users(&self, users: &[DirectoryEntry]) -> PortResult<()> {
        write_json(self.store.as_ref(), COMPANY_USERS_KEY, users)
    }

    fn lookup(&self, key: &str, email: &str) -> Option<String> {
        let users: Vec<DirectoryEntry> = read_json(self.store.as_ref(), key)?;
        users
            .into_iter()
            .find(|user| user.email.trim().eq_ignore_ascii_case(email))
            .map(|user| user.id)
    }
}

impl ParticipantDirectory for KvParticipantDirectory {
    fn resolve_user_id(&self, email: &str) -> Option<String> {
        let email = email.trim();
        if email.is_empty() {
            return None;
        }
        self.lookup(CREATED_USERS_KEY, email)
            .or_else(|| self.lookup(COMPANY_USERS_KEY, email))
    }
}

//=========================================================================================
// Project Store
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRecord {
    #[serde(alias = "_id", alias = "projectId")]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Clone)]
pub struct KvProjectStore {
    store: Arc<dyn KeyValueStore>,
}

impl KvProjectStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn set_project(&self, project: &ProjectRecord) -> PortResult<()> {
        write_json(self.store.as_ref(), PROJECT_KEY, project)
    }

    pub fn set_evaluation_groups(&self, groups: &[EvaluationGroup]) -> PortResult<()> {
        write_json(self.store.as_ref(), EVALUATION_GROUPS_KEY, groups)
    }
}

impl ProjectStore for KvProjectStore {
    fn project_id(&self) -> Option<String> {
        read_json::<ProjectRecord>(self.store.as_ref(), PROJECT_KEY)
            .map(|project| project.id)
            .filter(|id| !id.trim().is_empty())
    }

    fn evaluation_groups(&self) -> Vec<EvaluationGroup> {
        read_json(self.store.as_ref(), EVALUATION_GROUPS_KEY).unwrap_or_default()
    }
}

//=========================================================================================
// Checkpoint Store
//=========================================================================================

#[derive(Clone)]
pub struct KvCheckpointStore {
    store: Arc<dyn KeyValueStore>,
}

impl KvCheckpointStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }
}

impl CheckpointStore for KvCheckpointStore {
    fn load(&self) -> Option<SubmissionCheckpoint> {
        read_json(self.store.as_ref(), CHECKPOINT_KEY)
    }

    fn save(&self, checkpoint: &SubmissionCheckpoint) -> PortResult<()> {
        write_json(self.store.as_ref(), CHECKPOINT_KEY, checkpoint)
    }

    fn clear(&self) -> PortResult<()> {
        self.store.remove(CHECKPOINT_KEY)
    }
}
