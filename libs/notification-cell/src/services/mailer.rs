use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, error, info};

use shared_config::AppConfig;

use crate::models::{MailError, OutboundEmail};

/// Seam for outbound email. Delivery failure must never fail the operation
/// that triggered the message; callers log and move on.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutboundEmail) -> Result<(), MailError>;
}

/// Mail client for an HTTP delivery API (`POST {base}/emails` with a bearer
/// key and a JSON `{from, to, subject, html}` body).
pub struct HttpMailer {
    client: Client,
    base_url: String,
    api_key: String,
    from: String,
    timeout: Duration,
}

impl HttpMailer {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.mail_api_url.clone(),
            api_key: config.mail_api_key.clone(),
            from: config.mail_from.clone(),
            timeout: Duration::from_millis(config.store_timeout_ms),
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<(), MailError> {
        if self.base_url.is_empty() || self.api_key.is_empty() {
            return Err(MailError::NotConfigured);
        }

        let url = format!("{}/emails", self.base_url);
        debug!("Sending email to {} via {}", email.to, url);

        let request_body = json!({
            "from": self.from,
            "to": email.to,
            "subject": email.subject,
            "html": email.html_body,
        });

        let send = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request_body)
            .send();

        let response = tokio::time::timeout(self.timeout, send)
            .await
            .map_err(|_| MailError::Timeout)?
            .map_err(MailError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Mail API error ({}): {}", status, body);
            return Err(MailError::Api {
                status: status.as_u16(),
                body,
            });
        }

        info!("Email sent to {}", email.to);
        Ok(())
    }
}
