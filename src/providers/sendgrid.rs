//! SendGrid email provider.
//!
//! # Example
//!
//! ```rust,ignore
//! use messaging_gateway::{EmailMessage, MessagingProvider, SendGridConfig, SendGridProvider};
//!
//! let provider = SendGridProvider::new(SendGridConfig::new("SG.abc123"))?;
//!
//! let message = EmailMessage::new(
//!     "user@example.com",
//!     "Order update",
//!     "<p>Your order shipped.</p>",
//!     "noreply@example.com",
//! );
//! let result = provider.send(&message).await;
//! assert!(result.succeeded());
//! ```

use crate::errors::ConfigError;
use crate::providers::traits::MessagingProvider;
use crate::providers::util::{default_http_client, request_failure};
use crate::types::{DeliveryResult, DeliveryStatus, EmailMessage};
use reqwest_middleware::ClientWithMiddleware;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use std::time::Duration;
use url::Url;

#[cfg(feature = "tracing")]
use opentelemetry::trace::Status;
#[cfg(feature = "tracing")]
use tracing::{Span, error, info};
#[cfg(feature = "tracing")]
use tracing_opentelemetry::OpenTelemetrySpanExt;

/// Default SendGrid API URL.
pub const DEFAULT_API_URL: &str = "https://api.sendgrid.com";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for [`SendGridProvider`].
#[derive(Clone)]
pub struct SendGridConfig {
    /// SendGrid API key.
    pub api_key: SecretString,
    /// Request timeout.
    pub timeout: Duration,
    /// Override for the API base URL. Mostly useful for tests.
    pub endpoint: Option<Url>,
}

impl SendGridConfig {
    /// Create a config with the default timeout.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::from(api_key.into()),
            timeout: DEFAULT_TIMEOUT,
            endpoint: None,
        }
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the API base URL.
    pub fn with_endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = Some(endpoint);
        self
    }
}

impl std::fmt::Debug for SendGridConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SendGridConfig")
            .field("api_key", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Sends emails through the SendGrid v3 mail API.
///
/// SendGrid acknowledges accepted mail with a 202 and no message body, so
/// successful results carry no external id and `fetch_status` reports
/// unknown.
#[derive(Clone)]
pub struct SendGridProvider {
    http_client: ClientWithMiddleware,
    api_key: SecretString,
    url: Url,
}

impl std::fmt::Debug for SendGridProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SendGridProvider")
            .field("api_key", &"[REDACTED]")
            .field("url", &self.url)
            .finish()
    }
}

impl SendGridProvider {
    /// Create a provider from `config`.
    pub fn new(config: SendGridConfig) -> Result<Self, ConfigError> {
        Self::with_client(config, None)
    }

    /// Create a provider that reuses a caller-supplied HTTP client.
    pub fn with_http_client(
        config: SendGridConfig,
        http_client: ClientWithMiddleware,
    ) -> Result<Self, ConfigError> {
        Self::with_client(config, Some(http_client))
    }

    fn with_client(
        config: SendGridConfig,
        http_client: Option<ClientWithMiddleware>,
    ) -> Result<Self, ConfigError> {
        if config.api_key.expose_secret().is_empty() {
            return Err(ConfigError::MissingField("api_key"));
        }

        let endpoint = config
            .endpoint
            .unwrap_or_else(|| Url::parse(DEFAULT_API_URL).expect("Invalid default URL"));
        let url = endpoint.join("/v3/mail/send")?;

        let http_client = match http_client {
            Some(client) => client,
            None => default_http_client(config.timeout)?,
        };

        Ok(Self {
            http_client,
            api_key: config.api_key,
            url,
        })
    }
}

impl MessagingProvider for SendGridProvider {
    type Message = EmailMessage;

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "SendGridProvider::send",
            skip_all,
            fields(to = %message.to)
        )
    )]
    async fn send(&self, message: &EmailMessage) -> DeliveryResult {
        let mut from = serde_json::Map::new();
        from.insert("email".to_string(), json!(message.from_email));
        if let Some(name) = &message.from_name {
            from.insert("name".to_string(), json!(name));
        }

        let payload = json!({
            "personalizations": [{"to": [{"email": message.to}]}],
            "from": from,
            "subject": message.subject,
            "content": [{"type": "text/html", "value": message.html_content}],
        });

        let response = match self
            .http_client
            .post(self.url.clone())
            .bearer_auth(self.api_key.expose_secret())
            .json(&payload)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => return request_failure(err),
        };

        let status = response.status();
        if status.is_success() {
            #[cfg(feature = "tracing")]
            {
                info!(to = %message.to, "Email sent via SendGrid");
                Span::current().set_status(Status::Ok);
            }
            return DeliveryResult::ok(DeliveryStatus::Sent);
        }

        let _body = response.text().await.unwrap_or_default();

        #[cfg(feature = "tracing")]
        error!(status = status.as_u16(), body = %_body, "SendGrid send failed");

        DeliveryResult::fail_with_code(
            format!("SendGrid returned status {}", status.as_u16()),
            status.as_u16().to_string(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> SendGridProvider {
        let config =
            SendGridConfig::new("SG.test_key").with_endpoint(Url::parse(&server.uri()).unwrap());
        SendGridProvider::new(config).unwrap()
    }

    fn message() -> EmailMessage {
        EmailMessage::new(
            "user@example.com",
            "Order update",
            "<p>Your order shipped.</p>",
            "noreply@example.com",
        )
    }

    #[test]
    fn test_missing_api_key() {
        let err = SendGridProvider::new(SendGridConfig::new("")).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField("api_key")));
    }

    #[tokio::test]
    async fn test_send_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v3/mail/send"))
            .and(header("Authorization", "Bearer SG.test_key"))
            .and(body_partial_json(json!({
                "personalizations": [{"to": [{"email": "user@example.com"}]}],
                "from": {"email": "noreply@example.com"},
                "subject": "Order update",
                "content": [{"type": "text/html", "value": "<p>Your order shipped.</p>"}]
            })))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&mock_server)
            .await;

        let provider = provider(&mock_server);
        let result = provider.send(&message()).await;

        assert!(result.succeeded());
        assert_eq!(result.status(), DeliveryStatus::Sent);
        assert_eq!(result.external_id(), None);
    }

    #[tokio::test]
    async fn test_from_name_included_when_set() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v3/mail/send"))
            .respond_with(ResponseTemplate::new(202))
            .mount(&mock_server)
            .await;

        let provider = provider(&mock_server);
        provider.send(&message().with_from_name("Acme Orders")).await;

        let requests = mock_server.received_requests().await.unwrap();
        let payload: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(payload["from"]["name"], "Acme Orders");
    }

    #[tokio::test]
    async fn test_from_name_omitted_when_unset() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v3/mail/send"))
            .respond_with(ResponseTemplate::new(202))
            .mount(&mock_server)
            .await;

        let provider = provider(&mock_server);
        provider.send(&message()).await;

        let requests = mock_server.received_requests().await.unwrap();
        let payload: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert!(payload["from"].get("name").is_none());
    }

    #[tokio::test]
    async fn test_error_status_reported() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v3/mail/send"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "errors": [{"message": "The provided authorization grant is invalid"}]
            })))
            .mount(&mock_server)
            .await;

        let provider = provider(&mock_server);
        let result = provider.send(&message()).await;

        assert!(!result.succeeded());
        assert_eq!(result.error_code(), Some("401"));
        assert_eq!(
            result.error_message(),
            Some("SendGrid returned status 401")
        );
    }

    #[tokio::test]
    async fn test_network_error() {
        let mock_server = MockServer::start().await;
        let provider = provider(&mock_server);
        drop(mock_server);

        let result = provider.send(&message()).await;
        assert!(!result.succeeded());
        assert_eq!(result.status(), DeliveryStatus::Failed);
    }

    #[tokio::test]
    async fn test_fetch_status_is_unknown() {
        let mock_server = MockServer::start().await;
        let provider = provider(&mock_server);
        assert!(provider.fetch_status("anything").await.is_none());
    }
}
