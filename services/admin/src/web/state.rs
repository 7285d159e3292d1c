//! services/admin/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use feedback_core::ports::{KeyValueStore, NotificationService, SurveyBackend};
use feedback_core::storage::{
    KvCheckpointStore, KvDraftStore, KvParticipantDirectory, KvProjectStore,
};
use feedback_core::{DraftSurveyComposer, SubmissionPorts, SurveyPersistenceCoordinator};
use std::sync::Arc;
use tokio::sync::Mutex;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
///
/// There is a single draft per service instance, so the composer sits behind
/// one async mutex.
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn KeyValueStore>,
    pub backend: Arc<dyn SurveyBackend>,
    pub composer: Mutex<DraftSurveyComposer>,
    pub coordinator: Arc<SurveyPersistenceCoordinator>,
    pub projects: Arc<KvProjectStore>,
    pub directory: Arc<KvParticipantDirectory>,
}

impl AppState {
    /// Wires the storage-backed ports around `store` and restores the draft.
    pub fn new(
        config: Arc<Config>,
        store: Arc<dyn KeyValueStore>,
        backend: Arc<dyn SurveyBackend>,
        notifier: Arc<dyn NotificationService>,
    ) -> Self {
        let projects = Arc::new(KvProjectStore::new(store.clone()));
        let directory = Arc::new(KvParticipantDirectory::new(store.clone()));

        let mut composer = DraftSurveyComposer::new(Arc::new(KvDraftStore::new(store.clone())));
        composer.load_draft();

        let ports = SubmissionPorts {
            backend: backend.clone(),
            notifier,
            directory: directory.clone(),
            projects: projects.clone(),
            checkpoints: Arc::new(KvCheckpointStore::new(store.clone())),
            store: store.clone(),
        };
        let coordinator = Arc::new(SurveyPersistenceCoordinator::new(
            ports,
            config.survey_base_link.clone(),
        ));

        Self {
            config,
            store,
            backend,
            composer: Mutex::new(composer),
            coordinator,
            projects,
            directory,
        }
    }
}
