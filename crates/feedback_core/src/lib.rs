pub mod composer;
pub mod coordinator;
pub mod domain;
pub mod error;
pub mod memory;
pub mod navigator;
pub mod ports;
pub mod response;
pub mod storage;
pub mod template;

#[cfg(test)]
mod test_support;

pub use composer::DraftSurveyComposer;
pub use coordinator::{SubmissionPorts, SurveyPersistenceCoordinator};
pub use domain::{
    CompetencyBlock, Draft, EvaluationGroup, Participant, PartialResult, Question, QuestionType,
    SubmissionReport, SubmissionWarning,
};
pub use error::{WorkflowError, WorkflowResult};
pub use navigator::SurveyPreviewNavigator;
pub use ports::{
    CheckpointStore, DraftStore, KeyValueStore, NotificationService, ParticipantDirectory,
    PortError, PortResult, ProjectStore, SurveyBackend,
};
