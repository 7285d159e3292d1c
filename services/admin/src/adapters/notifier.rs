//! services/admin/src/adapters/notifier.rs
//!
//! Posts survey invitations to the group email endpoint.

use crate::adapters::http::AuthorizedClient;
use async_trait::async_trait;
use feedback_core::domain::GroupNotice;
use feedback_core::ports::{KeyValueStore, NotificationService, PortResult};
use reqwest::Method;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct HttpNotifier {
    http: AuthorizedClient,
    url: String,
}

impl HttpNotifier {
    pub fn new(
        url: &str,
        timeout: Duration,
        store: Arc<dyn KeyValueStore>,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: AuthorizedClient::new(timeout, store)?,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl NotificationService for HttpNotifier {
    async fn send_group(&self, notice: &GroupNotice) -> PortResult<()> {
        let request = self.http.request(Method::POST, &self.url).json(notice);
        if let Err(e) = self.http.execute(request, &self.url).await {
            warn!(participant = %notice.participant, error = %e, "Group notification failed");
            return Err(e);
        }
        debug!(
            recipients = notice.recipients.len(),
            participant = %notice.participant,
            "Group notification sent"
        );
        Ok(())
    }
}
