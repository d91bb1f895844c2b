use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use super::{MailError, OutgoingMail};
use crate::config::MailConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const MESSAGE_STREAM: &str = "outbound";

/// Transactional email delivery.
#[async_trait]
pub trait MailGateway: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError>;
}

#[derive(Clone)]
pub struct PostmarkClient {
    api_base: String,
    token: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct EmailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html_body: &'a str,
    text_body: &'a str,
    message_stream: &'a str,
}

impl PostmarkClient {
    pub fn new(config: &MailConfig) -> Result<Self, MailError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            client,
        })
    }

    fn email_url(&self) -> String {
        format!("{}/email", self.api_base)
    }
}

impl std::fmt::Debug for PostmarkClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostmarkClient")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

fn request_body(mail: &OutgoingMail) -> EmailRequest<'_> {
    EmailRequest {
        from: &mail.from,
        to: &mail.to,
        subject: mail.subject,
        html_body: mail.html_body,
        text_body: mail.text_body,
        message_stream: MESSAGE_STREAM,
    }
}

#[async_trait]
impl MailGateway for PostmarkClient {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        let response = self
            .client
            .post(self.email_url())
            .header("X-Postmark-Server-Token", &self.token)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&request_body(mail))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        Err(MailError::Status {
            status: status.as_u16(),
            body: response.text().await.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_uses_postmark_field_names() {
        let mail = OutgoingMail::confirmation(
            "HausWirtschaft <info@hauswirtschaft.at>",
            "erika@example.org",
        );
        let json = serde_json::to_value(request_body(&mail)).expect("serializes");

        assert_eq!(json["From"], "HausWirtschaft <info@hauswirtschaft.at>");
        assert_eq!(json["To"], "erika@example.org");
        assert_eq!(json["Subject"], mail.subject);
        assert_eq!(json["MessageStream"], "outbound");
        assert!(json["HtmlBody"].as_str().expect("html").contains("<html"));
        assert!(json["TextBody"].as_str().expect("text").starts_with("Hallo!"));
    }

    #[test]
    fn targets_the_email_endpoint() {
        let client = PostmarkClient::new(&MailConfig {
            api_base: "https://api.postmarkapp.com/".to_string(),
            token: "server-token".to_string(),
            from: "info@hauswirtschaft.at".to_string(),
        })
        .expect("client");
        assert_eq!(client.email_url(), "https://api.postmarkapp.com/email");
        assert!(!format!("{client:?}").contains("server-token"));
    }
}
