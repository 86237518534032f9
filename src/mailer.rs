use anyhow::Context;
use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

/// Outbound transactional mail. Implemented against the mail provider's
/// HTTP API; tests substitute a fake.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str) -> anyhow::Result<()>;
}

pub struct MailApi {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    sender: String,
}

impl MailApi {
    pub fn new(api_url: &str, api_key: &str, sender: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: api_url.to_string(),
            api_key: api_key.to_string(),
            sender: sender.to_string(),
        }
    }
}

#[async_trait]
impl Mailer for MailApi {
    async fn send(&self, to: &str, subject: &str, html: &str) -> anyhow::Result<()> {
        self.http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "from": { "email": self.sender },
                "to": [{ "email": to }],
                "subject": subject,
                "html": html,
            }))
            .send()
            .await
            .context("mail api request")?
            .error_for_status()
            .context("mail api status")?;
        debug!(%to, %subject, "mail sent");
        Ok(())
    }
}
