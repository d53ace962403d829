//! Webhook notifier
//!
//! POSTs each newly processed page as a JSON document `{url, title, text}`.
//! The coordinator runs deliveries on detached tasks, so a slow or failing
//! endpoint never holds up a worker.

use crate::config::NotifyConfig;
use crate::output::traits::{OutputError, OutputResult, PageDocument, PageNotifier};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

pub struct WebhookNotifier {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl WebhookNotifier {
    pub fn new(client: Client, endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            timeout,
        }
    }

    pub fn from_config(client: Client, config: &NotifyConfig) -> Self {
        Self::new(client, config.webhook_url.clone(), config.timeout())
    }
}

#[async_trait]
impl PageNotifier for WebhookNotifier {
    async fn notify(&self, page: &PageDocument) -> OutputResult<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .json(page)
            .send()
            .await
            .map_err(|e| OutputError::Delivery(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(OutputError::Delivery(format!(
                "{} answered HTTP {}",
                self.endpoint,
                status.as_u16()
            )));
        }

        tracing::trace!("Delivered {} to {}", page.url, self.endpoint);
        Ok(())
    }
}
