//! Candidate notifications. Delivery is best-effort: callers log failures and
//! never surface them to the submitting user.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

const MAIL_API_URL: &str = "https://api.resend.com/emails";
/// Upper bound on a single delivery attempt, including connect.
pub const SEND_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("mail transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("mail provider rejected message (status {status}): {message}")]
    Rejected { status: u16, message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotificationError>;
}

#[derive(Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

/// Transactional mail over the provider's HTTP API.
pub struct HttpMailer {
    client: Client,
    api_key: String,
    from: String,
}

impl HttpMailer {
    pub fn new(api_key: String, from: String) -> Result<Self, NotificationError> {
        Ok(Self {
            client: Client::builder().timeout(SEND_TIMEOUT).build()?,
            api_key,
            from,
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotificationError> {
        let response = self
            .client
            .post(MAIL_API_URL)
            .bearer_auth(&self.api_key)
            .json(&SendEmailRequest {
                from: &self.from,
                to: [&message.to],
                subject: &message.subject,
                html: &message.html,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotificationError::Rejected {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }
        Ok(())
    }
}

/// Used when no mail provider is configured: logs and drops the message.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotificationError> {
        info!(
            "Mail provider not configured; skipping '{}' to {}",
            message.subject, message.to
        );
        Ok(())
    }
}

/// Confirmation sent after a successful application submission.
pub fn application_confirmation(
    to: &str,
    candidate_name: &str,
    job_title: &str,
    tracking_url: &str,
) -> EmailMessage {
    let name = escape_html(candidate_name);
    let title = escape_html(job_title);
    let url = escape_html(tracking_url);
    EmailMessage {
        to: to.to_string(),
        subject: format!("Application received: {job_title}"),
        html: format!(
            "<p>Hi {name},</p>\
             <p>Thank you for applying for <strong>{title}</strong>. \
             We have received your application and our team will review it shortly.</p>\
             <p>You can check the status of your application at any time: \
             <a href=\"{url}\">{url}</a></p>"
        ),
    }
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
