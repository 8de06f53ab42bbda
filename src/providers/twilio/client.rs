//! Twilio Messaging API client.
//!
//! Shared by the WhatsApp and SMS providers; both channels go through the
//! same `Messages` resource and differ only in the parameters they pass.

use super::status::map_message_status;
use crate::errors::ConfigError;
use crate::providers::util::{default_http_client, request_failure};
use crate::types::{DeliveryResult, DeliveryStatus};
use reqwest::StatusCode;
use reqwest_middleware::ClientWithMiddleware;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

#[cfg(feature = "tracing")]
use opentelemetry::trace::Status;
#[cfg(feature = "tracing")]
use tracing::{Span, warn};
#[cfg(feature = "tracing")]
use tracing_opentelemetry::OpenTelemetrySpanExt;

/// Default Twilio API URL.
pub const DEFAULT_API_URL: &str = "https://api.twilio.com";

/// Parameters for one `Messages` create call.
///
/// `body` is owned because providers truncate before sending.
pub(crate) struct CreateMessage<'a> {
    pub to: &'a str,
    pub from: &'a str,
    pub body: Option<String>,
    pub media_urls: &'a [String],
    pub content_sid: Option<&'a str>,
    pub content_variables: Option<String>,
    pub status_callback: Option<&'a str>,
}

impl CreateMessage<'_> {
    fn form_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("To", self.to.to_string()), ("From", self.from.to_string())];

        if let Some(body) = &self.body {
            params.push(("Body", body.clone()));
        }
        for url in self.media_urls {
            params.push(("MediaUrl", url.clone()));
        }
        if let Some(content_sid) = self.content_sid {
            params.push(("ContentSid", content_sid.to_string()));
        }
        if let Some(content_variables) = &self.content_variables {
            params.push(("ContentVariables", content_variables.clone()));
        }
        if let Some(status_callback) = self.status_callback {
            params.push(("StatusCallback", status_callback.to_string()));
        }

        params
    }
}

/// One message resource as Twilio returns it.
#[derive(Debug, Deserialize)]
pub(crate) struct MessageResource {
    pub sid: Option<String>,
    pub status: Option<String>,
    pub error_code: Option<i64>,
    pub error_message: Option<String>,
}

impl MessageResource {
    pub(crate) fn into_delivery_result(self) -> DeliveryResult {
        let mapped = map_message_status(self.status.as_deref()).map_err(str::to_owned);
        let error_code = self.error_code.map(|code| code.to_string());

        match mapped {
            Ok(status) => DeliveryResult::from_report(status, self.sid, error_code, self.error_message),
            Err(raw) => {
                #[cfg(feature = "tracing")]
                warn!(status = %raw, "unknown Twilio message status");

                DeliveryResult::from_report(
                    DeliveryStatus::Failed,
                    self.sid,
                    error_code,
                    Some(format!("unknown Twilio message status: {raw}")),
                )
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorPayload {
    code: Option<i64>,
    message: Option<String>,
}

fn api_error_result(status: StatusCode, body: &str) -> DeliveryResult {
    match serde_json::from_str::<ApiErrorPayload>(body) {
        Ok(payload) => {
            let message = payload
                .message
                .unwrap_or_else(|| format!("HTTP {status}"));
            match payload.code {
                Some(code) => DeliveryResult::fail_with_code(
                    format!("Twilio API error: {message}"),
                    code.to_string(),
                ),
                None => DeliveryResult::fail(format!("Twilio API error: {message}")),
            }
        }
        Err(_) => DeliveryResult::fail(format!("Twilio API error (HTTP {status}): {body}")),
    }
}

/// HTTP client for the Twilio Messaging API.
#[derive(Clone)]
pub(crate) struct TwilioClient {
    http_client: ClientWithMiddleware,
    account_sid: String,
    auth_token: SecretString,
    endpoint: Url,
}

impl std::fmt::Debug for TwilioClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwilioClient")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"[REDACTED]")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl TwilioClient {
    pub(crate) fn new(
        account_sid: String,
        auth_token: SecretString,
        endpoint: Option<Url>,
        timeout: Duration,
        http_client: Option<ClientWithMiddleware>,
    ) -> Result<Self, ConfigError> {
        let endpoint = endpoint
            .unwrap_or_else(|| Url::parse(DEFAULT_API_URL).expect("Invalid default URL"));

        let http_client = match http_client {
            Some(client) => client,
            None => default_http_client(timeout)?,
        };

        Ok(Self {
            http_client,
            account_sid,
            auth_token,
            endpoint,
        })
    }

    /// Create a message and map the immediate API response to a delivery
    /// result. Never fails with an error.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "TwilioClient::create_message",
            skip_all,
            fields(to = %message.to, message_sid = tracing::field::Empty)
        )
    )]
    pub(crate) async fn create_message(&self, message: CreateMessage<'_>) -> DeliveryResult {
        let url = match self.endpoint.join(&format!(
            "/2010-04-01/Accounts/{}/Messages.json",
            self.account_sid
        )) {
            Ok(url) => url,
            Err(err) => return DeliveryResult::fail(format!("invalid Twilio request URL: {err}")),
        };

        let response = match self
            .http_client
            .post(url)
            .basic_auth(&self.account_sid, Some(self.auth_token.expose_secret()))
            .form(&message.form_params())
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => return request_failure(err),
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(err) => {
                return DeliveryResult::fail(format!("failed to read Twilio response: {err}"));
            }
        };

        if !status.is_success() {
            return api_error_result(status, &body);
        }

        match serde_json::from_str::<MessageResource>(&body) {
            Ok(resource) => {
                let result = resource.into_delivery_result();

                #[cfg(feature = "tracing")]
                if result.succeeded() {
                    if let Some(sid) = result.external_id() {
                        Span::current().record("message_sid", sid);
                    }
                    Span::current().set_status(Status::Ok);
                }

                result
            }
            Err(err) => DeliveryResult::fail(format!("failed to parse Twilio response: {err}")),
        }
    }

    /// Fetch the current state of a message.
    ///
    /// An API-level rejection (unknown SID, auth problem) still yields
    /// `Some` failed result; transport and parse problems yield `None`
    /// because the status is simply unknown.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "TwilioClient::fetch_message",
            skip_all,
            fields(message_sid = %message_sid)
        )
    )]
    pub(crate) async fn fetch_message(&self, message_sid: &str) -> Option<DeliveryResult> {
        let url = self
            .endpoint
            .join(&format!(
                "/2010-04-01/Accounts/{}/Messages/{}.json",
                self.account_sid, message_sid
            ))
            .ok()?;

        let response = match self
            .http_client
            .get(url)
            .basic_auth(&self.account_sid, Some(self.auth_token.expose_secret()))
            .send()
            .await
        {
            Ok(response) => response,
            Err(_err) => {
                #[cfg(feature = "tracing")]
                warn!(error = %_err, "failed to fetch Twilio message status");
                return None;
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(_err) => {
                #[cfg(feature = "tracing")]
                warn!(error = %_err, "failed to read Twilio status response");
                return None;
            }
        };

        if !status.is_success() {
            return Some(api_error_result(status, &body));
        }

        match serde_json::from_str::<MessageResource>(&body) {
            Ok(resource) => {
                #[cfg(feature = "tracing")]
                Span::current().set_status(Status::Ok);

                Some(resource.into_delivery_result())
            }
            Err(_err) => {
                #[cfg(feature = "tracing")]
                warn!(error = %_err, "unparseable Twilio status response");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer, timeout: Duration) -> TwilioClient {
        TwilioClient::new(
            "AC123".to_string(),
            SecretString::from("token".to_string()),
            Some(Url::parse(&server.uri()).unwrap()),
            timeout,
            None,
        )
        .unwrap()
    }

    fn text_message<'a>(to: &'a str, body: &str) -> CreateMessage<'a> {
        CreateMessage {
            to,
            from: "whatsapp:+14155238886",
            body: Some(body.to_string()),
            media_urls: &[],
            content_sid: None,
            content_variables: None,
            status_callback: None,
        }
    }

    #[tokio::test]
    async fn test_create_message_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/2010-04-01/Accounts/AC123/Messages.json"))
            .and(body_string_contains("To=whatsapp%3A%2B5551998644323"))
            .and(body_string_contains("Body=Hello"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "sid": "SM123",
                "status": "queued",
                "error_code": null,
                "error_message": null
            })))
            .mount(&mock_server)
            .await;

        let client = client(&mock_server, Duration::from_secs(5));
        let result = client
            .create_message(text_message("whatsapp:+5551998644323", "Hello"))
            .await;

        assert!(result.succeeded());
        assert_eq!(result.status(), DeliveryStatus::Queued);
        assert_eq!(result.external_id(), Some("SM123"));
    }

    #[tokio::test]
    async fn test_create_message_api_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "code": 21211,
                "message": "Invalid 'To' Phone Number: whatsapp:+123",
                "more_info": "https://www.twilio.com/docs/errors/21211",
                "status": 400
            })))
            .mount(&mock_server)
            .await;

        let client = client(&mock_server, Duration::from_secs(5));
        let result = client
            .create_message(text_message("whatsapp:+123", "Hello"))
            .await;

        assert!(!result.succeeded());
        assert_eq!(result.error_code(), Some("21211"));
        assert!(
            result
                .error_message()
                .unwrap()
                .contains("Invalid 'To' Phone Number")
        );
    }

    #[tokio::test]
    async fn test_create_message_unknown_status_fails_closed() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "sid": "SM999",
                "status": "partially_delivered"
            })))
            .mount(&mock_server)
            .await;

        let client = client(&mock_server, Duration::from_secs(5));
        let result = client
            .create_message(text_message("whatsapp:+5551998644323", "Hello"))
            .await;

        assert!(!result.succeeded());
        assert_eq!(result.status(), DeliveryStatus::Failed);
        assert_eq!(result.external_id(), Some("SM999"));
        assert!(result.error_message().unwrap().contains("partially_delivered"));
    }

    #[tokio::test]
    async fn test_create_message_timeout_has_timeout_code() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(serde_json::json!({"sid": "SM1", "status": "queued"}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&mock_server)
            .await;

        let client = client(&mock_server, Duration::from_millis(50));
        let result = client
            .create_message(text_message("whatsapp:+5551998644323", "Hello"))
            .await;

        assert!(!result.succeeded());
        assert_eq!(result.error_code(), Some("timeout"));
    }

    #[tokio::test]
    async fn test_fetch_message_maps_status() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/2010-04-01/Accounts/AC123/Messages/SM123.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "sid": "SM123",
                "status": "delivered",
                "error_code": null,
                "error_message": null
            })))
            .mount(&mock_server)
            .await;

        let client = client(&mock_server, Duration::from_secs(5));
        let result = client.fetch_message("SM123").await.expect("status known");

        assert_eq!(result.status(), DeliveryStatus::Delivered);
        assert_eq!(result.external_id(), Some("SM123"));
    }

    #[tokio::test]
    async fn test_fetch_message_api_error_is_failed_result() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "code": 20404,
                "message": "The requested resource was not found",
                "status": 404
            })))
            .mount(&mock_server)
            .await;

        let client = client(&mock_server, Duration::from_secs(5));
        let result = client.fetch_message("SM404").await.expect("api answered");

        assert!(!result.succeeded());
        assert_eq!(result.error_code(), Some("20404"));
    }

    #[tokio::test]
    async fn test_fetch_message_transport_error_is_unknown() {
        // An exclusive (non-pooled) server: dropping it closes the port, so
        // the fetch below hits a dead address instead of a pooled 404.
        let mock_server = MockServer::builder().start().await;
        let uri = mock_server.uri();
        drop(mock_server);

        let client = TwilioClient::new(
            "AC123".to_string(),
            SecretString::from("token".to_string()),
            Some(Url::parse(&uri).unwrap()),
            Duration::from_secs(1),
            None,
        )
        .unwrap();

        assert!(client.fetch_message("SM123").await.is_none());
    }
}
