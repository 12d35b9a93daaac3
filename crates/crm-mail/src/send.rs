//! Outbound email via the SendGrid v3 mail-send API.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use crm_core::models::Attachment;
use crm_core::{AppError, Config};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::markdown::render_html;

const DEFAULT_SUBJECT: &str = "User not recognized";

/// Provider response: HTTP status and raw body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailAddress {
    pub email: String,
}

impl EmailAddress {
    fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Personalization {
    pub to: Vec<EmailAddress>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Content {
    #[serde(rename = "type")]
    pub content_type: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MailAttachment {
    /// Base64 of the attachment bytes
    pub content: String,
    #[serde(rename = "type")]
    pub content_type: String,
    pub filename: String,
    pub disposition: String,
    pub content_id: String,
}

impl From<&Attachment> for MailAttachment {
    fn from(attachment: &Attachment) -> Self {
        Self {
            content: STANDARD.encode(&attachment.binary_content),
            content_type: attachment.content_type.clone(),
            filename: attachment.original_filename.clone(),
            disposition: "attachment".to_string(),
            content_id: attachment.original_filename.clone(),
        }
    }
}

/// A single mail-send request body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MailMessage {
    pub personalizations: Vec<Personalization>,
    pub from: EmailAddress,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<EmailAddress>,
    pub subject: String,
    pub content: Vec<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<MailAttachment>,
}

/// Delivers a fully built message to the provider.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, message: &MailMessage) -> Result<TransportResponse, AppError>;
}

/// SendGrid HTTP transport
#[derive(Clone)]
pub struct SendGridTransport {
    http_client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl std::fmt::Debug for SendGridTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SendGridTransport")
            .field("api_url", &self.api_url)
            .finish()
    }
}

impl SendGridTransport {
    pub fn new(
        api_key: impl Into<String>,
        api_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                AppError::Internal(format!("Failed to create HTTP client for SendGrid: {}", e))
            })?;

        Ok(Self {
            http_client,
            api_url: api_url.into(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl MailTransport for SendGridTransport {
    async fn send(&self, message: &MailMessage) -> Result<TransportResponse, AppError> {
        let response = self
            .http_client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(message)
            .send()
            .await
            .map_err(|e| AppError::Transport(format!("Failed to reach SendGrid: {}", e)))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::Transport(format!("Failed to read SendGrid response: {}", e)))?;

        Ok(TransportResponse { status, body })
    }
}

/// Arguments of one outbound email
#[derive(Debug, Clone, Default)]
pub struct OutgoingEmail {
    pub to: Vec<String>,
    pub from: Option<String>,
    pub subject: Option<String>,
    /// Markdown
    pub body: Option<String>,
    pub attachments: Vec<Attachment>,
    pub reply_to: Option<String>,
}

/// Renders and dispatches outbound email
#[derive(Clone)]
pub struct Mailer {
    transport: Arc<dyn MailTransport>,
    support_email: String,
}

impl Mailer {
    pub fn new(transport: Arc<dyn MailTransport>, support_email: impl Into<String>) -> Self {
        Self {
            transport,
            support_email: support_email.into(),
        }
    }

    /// Mailer backed by SendGrid, configured from the environment config.
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let transport = SendGridTransport::new(
            config.sendgrid_api_key.clone(),
            config.sendgrid_api_url.clone(),
            Duration::from_secs(config.email_timeout_seconds),
        )?;
        tracing::info!(api_url = %config.sendgrid_api_url, "Mail transport initialized (SendGrid)");
        Ok(Self::new(Arc::new(transport), config.support_email.clone()))
    }

    /// Build the provider message: recipients de-duplicated in first-seen
    /// order, defaults applied, body rendered from Markdown.
    pub fn build_message(&self, email: OutgoingEmail) -> Result<MailMessage, AppError> {
        let recipients = dedup_recipients(&email.to);
        if recipients.is_empty() {
            return Err(AppError::InvalidInput(
                "At least one recipient is required".to_string(),
            ));
        }

        let subject = email
            .subject
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SUBJECT.to_string());
        let body = email
            .body
            .filter(|b| !b.trim().is_empty())
            .unwrap_or_else(|| format!("Please email support at {}", self.support_email));
        let reply_to = email.reply_to.filter(|r| !r.trim().is_empty());
        // A reply-to address also becomes the sender.
        let from = reply_to
            .clone()
            .or(email.from.filter(|f| !f.trim().is_empty()))
            .unwrap_or_else(|| self.support_email.clone());

        Ok(MailMessage {
            personalizations: vec![Personalization {
                to: recipients.into_iter().map(EmailAddress::new).collect(),
            }],
            from: EmailAddress::new(from),
            reply_to: reply_to.map(EmailAddress::new),
            subject,
            content: vec![Content {
                content_type: "text/html".to_string(),
                value: render_html(&body),
            }],
            attachments: email.attachments.iter().map(MailAttachment::from).collect(),
        })
    }

    /// Send one message to all recipients. Returns the provider's status and body.
    #[tracing::instrument(skip(self, email), fields(recipients = email.to.len(), attachments = email.attachments.len()))]
    pub async fn send_email(&self, email: OutgoingEmail) -> Result<(u16, String), AppError> {
        let message = self.build_message(email)?;

        let response = match self.transport.send(&message).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(error = %e, "Email dispatch failed");
                return Err(e);
            }
        };

        if !response.is_success() {
            tracing::error!(
                status = response.status,
                body = %response.body,
                "Mail provider rejected message"
            );
            return Err(AppError::Transport(format!(
                "Mail provider returned {}: {}",
                response.status, response.body
            )));
        }

        tracing::info!(status = response.status, "Email sent");
        Ok((response.status, response.body))
    }
}

fn dedup_recipients(to: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    to.iter()
        .map(|r| r.trim())
        .filter(|r| !r.is_empty())
        .filter(|r| seen.insert(r.to_string()))
        .map(str::to_string)
        .collect()
}
