use async_trait::async_trait;
use serde::Serialize;

use crate::error::EmailError;
use crate::validators::is_valid_email;

/// Delivers password reset links to account owners
#[async_trait]
pub trait ResetNotifier: Send + Sync {
    async fn send_password_reset(&self, recipient: &str, reset_link: &str) -> Result<(), EmailError>;
}

#[derive(Clone)]
pub struct EmailClient {
    http_client: reqwest::Client,
    base_url: String,
    sender: SenderEmail,
}

/// A validated sender address
#[derive(Clone, Debug)]
pub struct SenderEmail(String);

impl SenderEmail {
    pub fn parse(s: String) -> Result<Self, EmailError> {
        let email = is_valid_email(&s).map_err(|e| EmailError::InvalidSender(e.to_string()))?;
        Ok(Self(email))
    }

    pub fn inner(&self) -> &str {
        &self.0
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html_body: &'a str,
    text_body: &'a str,
}

impl EmailClient {
    pub fn new(base_url: String, sender: SenderEmail, timeout: std::time::Duration) -> Result<Self, EmailError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EmailError::SendFailed(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url,
            sender,
        })
    }

    pub async fn send_email(
        &self,
        recipient: &str,
        subject: &str,
        html_content: &str,
        text_content: &str,
    ) -> Result<(), EmailError> {
        let url = format!("{}/email", self.base_url.trim_end_matches('/'));
        let request = SendEmailRequest {
            from: self.sender.inner(),
            to: recipient,
            subject,
            html_body: html_content,
            text_body: text_content,
        };

        self.http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| EmailError::SendFailed(e.to_string()))?
            .error_for_status()
            .map_err(|e| EmailError::ServiceError(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl ResetNotifier for EmailClient {
    async fn send_password_reset(&self, recipient: &str, reset_link: &str) -> Result<(), EmailError> {
        let html = format!(
            "Click here to reset your password: <a href=\"{}\">Reset Password</a>",
            reset_link
        );
        let text = format!("Visit {} to reset your password.", reset_link);

        self.send_email(recipient, "Password Recovery", &html, &text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sender_email_parse_valid_email() {
        let sender = SenderEmail::parse("noreply@example.com".to_string());
        assert_eq!(sender.unwrap().inner(), "noreply@example.com");
    }

    #[test]
    fn test_sender_email_parse_invalid_email() {
        let sender = SenderEmail::parse("invalid-email".to_string());
        assert!(matches!(sender, Err(EmailError::InvalidSender(_))));
    }

    #[test]
    fn test_request_body_shape() {
        let request = SendEmailRequest {
            from: "noreply@example.com",
            to: "user@example.com",
            subject: "Password Recovery",
            html_body: "<p>hi</p>",
            text_body: "hi",
        };
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["From"], "noreply@example.com");
        assert_eq!(json["To"], "user@example.com");
        assert_eq!(json["HtmlBody"], "<p>hi</p>");
        assert_eq!(json["TextBody"], "hi");
    }

    #[tokio::test]
    async fn test_send_fails_when_service_is_unreachable() {
        let client = EmailClient::new(
            "http://127.0.0.1:1".to_string(),
            SenderEmail::parse("noreply@example.com".to_string()).unwrap(),
            std::time::Duration::from_millis(200),
        )
        .unwrap();

        let result = client
            .send_password_reset("user@example.com", "http://localhost/reset-password?token=x")
            .await;

        assert!(matches!(result, Err(EmailError::SendFailed(_))));
    }
}
