pub mod backend;
pub mod http;
pub mod notifier;
pub mod store;

pub use backend::HttpSurveyBackend;
pub use http::AuthorizedClient;
pub use notifier::HttpNotifier;
pub use store::JsonFileStore;
