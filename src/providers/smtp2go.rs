//! SMTP2GO email provider.
//!
//! # Example
//!
//! ```rust,ignore
//! use messaging_gateway::{EmailMessage, MessagingProvider, Smtp2GoConfig, Smtp2GoProvider};
//!
//! let provider = Smtp2GoProvider::new(Smtp2GoConfig::new("api-ABC123"))?;
//!
//! let message = EmailMessage::new(
//!     "user@example.com",
//!     "Order update",
//!     "<p>Your order shipped.</p>",
//!     "noreply@example.com",
//! )
//! .with_from_name("Acme Orders");
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

/// Default SMTP2GO API URL.
pub const DEFAULT_API_URL: &str = "https://api.smtp2go.com";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for [`Smtp2GoProvider`].
#[derive(Clone)]
pub struct Smtp2GoConfig {
    /// SMTP2GO API key.
    pub api_key: SecretString,
    /// Request timeout.
    pub timeout: Duration,
    /// Override for the API base URL. Mostly useful for tests.
    pub endpoint: Option<Url>,
}

impl Smtp2GoConfig {
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

impl std::fmt::Debug for Smtp2GoConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Smtp2GoConfig")
            .field("api_key", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Sends emails through the SMTP2GO REST API.
///
/// Like SendGrid, acceptance is signalled by the HTTP status alone;
/// successful results carry no external id and `fetch_status` reports
/// unknown.
#[derive(Clone)]
pub struct Smtp2GoProvider {
    http_client: ClientWithMiddleware,
    api_key: SecretString,
    url: Url,
}

impl std::fmt::Debug for Smtp2GoProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Smtp2GoProvider")
            .field("api_key", &"[REDACTED]")
            .field("url", &self.url)
            .finish()
    }
}

impl Smtp2GoProvider {
    /// Create a provider from `config`.
    pub fn new(config: Smtp2GoConfig) -> Result<Self, ConfigError> {
        Self::with_client(config, None)
    }

    /// Create a provider that reuses a caller-supplied HTTP client.
    pub fn with_http_client(
        config: Smtp2GoConfig,
        http_client: ClientWithMiddleware,
    ) -> Result<Self, ConfigError> {
        Self::with_client(config, Some(http_client))
    }

    fn with_client(
        config: Smtp2GoConfig,
        http_client: Option<ClientWithMiddleware>,
    ) -> Result<Self, ConfigError> {
        if config.api_key.expose_secret().is_empty() {
            return Err(ConfigError::MissingField("api_key"));
        }

        let endpoint = config
            .endpoint
            .unwrap_or_else(|| Url::parse(DEFAULT_API_URL).expect("Invalid default URL"));
        let url = endpoint.join("/v3/email/send")?;

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

impl MessagingProvider for Smtp2GoProvider {
    type Message = EmailMessage;

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "Smtp2GoProvider::send",
            skip_all,
            fields(to = %message.to)
        )
    )]
    async fn send(&self, message: &EmailMessage) -> DeliveryResult {
        let sender = match &message.from_name {
            Some(name) => format!("{name} <{}>", message.from_email),
            None => message.from_email.clone(),
        };

        let payload = json!({
            "sender": sender,
            "to": [message.to],
            "subject": message.subject,
            "html_body": message.html_content,
        });

        let response = match self
            .http_client
            .post(self.url.clone())
            .header("X-Smtp2go-Api-Key", self.api_key.expose_secret())
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
                info!(to = %message.to, "Email sent via SMTP2GO");
                Span::current().set_status(Status::Ok);
            }
            return DeliveryResult::ok(DeliveryStatus::Sent);
        }

        let _body = response.text().await.unwrap_or_default();

        #[cfg(feature = "tracing")]
        error!(status = status.as_u16(), body = %_body, "SMTP2GO send failed");

        DeliveryResult::fail_with_code(
            format!("SMTP2GO returned status {}", status.as_u16()),
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

    fn provider(server: &MockServer) -> Smtp2GoProvider {
        let config =
            Smtp2GoConfig::new("api-test-key").with_endpoint(Url::parse(&server.uri()).unwrap());
        Smtp2GoProvider::new(config).unwrap()
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
        let err = Smtp2GoProvider::new(Smtp2GoConfig::new("")).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField("api_key")));
    }

    #[tokio::test]
    async fn test_send_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v3/email/send"))
            .and(header("X-Smtp2go-Api-Key", "api-test-key"))
            .and(body_partial_json(json!({
                "sender": "noreply@example.com",
                "to": ["user@example.com"],
                "subject": "Order update",
                "html_body": "<p>Your order shipped.</p>"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"succeeded": 1, "failed": 0}
            })))
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
    async fn test_sender_includes_display_name() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v3/email/send"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&mock_server)
            .await;

        let provider = provider(&mock_server);
        provider.send(&message().with_from_name("Acme Orders")).await;

        let requests = mock_server.received_requests().await.unwrap();
        let payload: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(payload["sender"], "Acme Orders <noreply@example.com>");
    }

    #[tokio::test]
    async fn test_error_status_reported() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v3/email/send"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "data": {"error": "API key is invalid"}
            })))
            .mount(&mock_server)
            .await;

        let provider = provider(&mock_server);
        let result = provider.send(&message()).await;

        assert!(!result.succeeded());
        assert_eq!(result.error_code(), Some("403"));
        assert_eq!(result.error_message(), Some("SMTP2GO returned status 403"));
    }

    #[tokio::test]
    async fn test_network_error() {
        let mock_server = MockServer::start().await;
        let provider = provider(&mock_server);
        drop(mock_server);

        let result = provider.send(&message()).await;
        assert!(!result.succeeded());
    }

    #[tokio::test]
    async fn test_fetch_status_is_unknown() {
        let mock_server = MockServer::start().await;
        let provider = provider(&mock_server);
        assert!(provider.fetch_status("anything").await.is_none());
    }
}
