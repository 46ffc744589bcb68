use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

use crate::config::MailConfig;

const SEND_ENDPOINT: &str = "https://api.sendgrid.com/v3/mail/send";

/// Connect timeout in seconds.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Total timeout in seconds.
const TOTAL_TIMEOUT_SECS: u64 = 30;

/// One verification email, ready to deliver.
#[derive(Debug, Clone)]
pub struct VerificationEmail {
    pub to: String,
    pub username: String,
    pub verify_url: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: &VerificationEmail) -> anyhow::Result<()>;
}

/// Transactional-email client talking to the SendGrid v3 API.
pub struct SendGridClient {
    http: Client,
    api_key: String,
    sender: String,
}

impl SendGridClient {
    pub fn new(cfg: &MailConfig) -> anyhow::Result<Self> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(TOTAL_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            http,
            api_key: cfg.api_key.clone(),
            sender: cfg.sender.clone(),
        })
    }
}

#[async_trait]
impl Mailer for SendGridClient {
    async fn send(&self, mail: &VerificationEmail) -> anyhow::Result<()> {
        let body = json!({
            "personalizations": [{ "to": [{ "email": mail.to }] }],
            "from": { "email": self.sender },
            "subject": format!("Thank you for registering {}", mail.username),
            "content": [
                {
                    "type": "text/plain",
                    "value": format!(
                        "Thank you for registering {}.\n\
                         Please copy and paste the address below to verify your account.\n\
                         {}",
                        mail.username, mail.verify_url
                    ),
                },
                {
                    "type": "text/html",
                    "value": format!(
                        "<h1>Thank you for registering {}.</h1>\
                         <p>Please click the link below to verify your account.</p>\
                         <a href=\"{}\">Verify your account</a>",
                        mail.username, mail.verify_url
                    ),
                },
            ],
        });

        let response = self
            .http
            .post(SEND_ENDPOINT)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("mail provider returned {}", response.status());
        }
        Ok(())
    }
}
