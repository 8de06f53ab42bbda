use super::types::TelegramConfig;
use crate::errors::ConfigError;
use crate::providers::traits::MessagingProvider;
use crate::providers::util::{default_http_client, request_failure};
use crate::types::{DeliveryResult, DeliveryStatus, TelegramMedia, TelegramMessage, TelegramText};
use reqwest_middleware::ClientWithMiddleware;
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::{Value, json};
use url::Url;

#[cfg(feature = "tracing")]
use opentelemetry::trace::Status;
#[cfg(feature = "tracing")]
use tracing::{Span, error, info};
#[cfg(feature = "tracing")]
use tracing_opentelemetry::OpenTelemetrySpanExt;

/// Default Bot API URL.
pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

#[derive(Debug, Deserialize)]
struct BotApiResponse {
    #[serde(default)]
    ok: bool,
    result: Option<BotApiResult>,
    error_code: Option<i64>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BotApiResult {
    message_id: Option<i64>,
}

/// Sends messages through the Telegram Bot API.
///
/// The Bot API is synchronous: a successful call means Telegram accepted
/// and delivered the message, so there is no status pipeline to poll and
/// `fetch_status` reports unknown.
#[derive(Clone)]
pub struct TelegramBotProvider {
    http_client: ClientWithMiddleware,
    // Includes the bot token, so it never appears in Debug output.
    base_url: String,
}

impl std::fmt::Debug for TelegramBotProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramBotProvider")
            .field("base_url", &"[REDACTED]")
            .finish()
    }
}

impl TelegramBotProvider {
    /// Create a provider from `config`.
    pub fn new(config: TelegramConfig) -> Result<Self, ConfigError> {
        Self::with_client(config, None)
    }

    /// Create a provider that reuses a caller-supplied HTTP client.
    pub fn with_http_client(
        config: TelegramConfig,
        http_client: ClientWithMiddleware,
    ) -> Result<Self, ConfigError> {
        Self::with_client(config, Some(http_client))
    }

    fn with_client(
        config: TelegramConfig,
        http_client: Option<ClientWithMiddleware>,
    ) -> Result<Self, ConfigError> {
        if config.bot_token.expose_secret().is_empty() {
            return Err(ConfigError::MissingField("bot_token"));
        }

        let endpoint = config
            .endpoint
            .unwrap_or_else(|| Url::parse(DEFAULT_API_URL).expect("Invalid default URL"));
        let base_url = format!(
            "{}/bot{}",
            endpoint.as_str().trim_end_matches('/'),
            config.bot_token.expose_secret()
        );

        let http_client = match http_client {
            Some(client) => client,
            None => default_http_client(config.timeout)?,
        };

        Ok(Self {
            http_client,
            base_url,
        })
    }

    async fn send_text(&self, message: &TelegramText) -> DeliveryResult {
        let mut payload = json!({
            "chat_id": message.chat_id,
            "text": message.body,
        });
        if let Some(parse_mode) = message.parse_mode {
            payload["parse_mode"] = json!(parse_mode);
        }
        self.post("sendMessage", &payload).await
    }

    async fn send_media(&self, message: &TelegramMedia) -> DeliveryResult {
        let mut payload = serde_json::Map::new();
        payload.insert("chat_id".to_string(), json!(message.chat_id));
        payload.insert(
            message.media_type.field_name().to_string(),
            json!(message.media_url),
        );
        if let Some(caption) = message.caption.as_deref().filter(|caption| !caption.is_empty()) {
            payload.insert("caption".to_string(), json!(caption));
        }
        if let Some(parse_mode) = message.parse_mode {
            payload.insert("parse_mode".to_string(), json!(parse_mode));
        }

        self.post(message.media_type.endpoint(), &Value::Object(payload))
            .await
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "TelegramBotProvider::post",
            skip_all,
            fields(api_method = %method, message_id = tracing::field::Empty)
        )
    )]
    async fn post(&self, method: &str, payload: &Value) -> DeliveryResult {
        let url = format!("{}/{method}", self.base_url);
        let response = match self.http_client.post(url).json(payload).send().await {
            Ok(response) => response,
            Err(err) => return request_failure(err),
        };

        let data: BotApiResponse = match response.json().await {
            Ok(data) => data,
            Err(err) => {
                return DeliveryResult::fail(format!(
                    "failed to parse Telegram API response: {err}"
                ));
            }
        };

        if data.ok {
            return match data.result.and_then(|result| result.message_id) {
                Some(message_id) => {
                    let id = message_id.to_string();
                    #[cfg(feature = "tracing")]
                    {
                        info!(message_id = %id, "Telegram message sent");
                        Span::current().record("message_id", id.as_str());
                        Span::current().set_status(Status::Ok);
                    }
                    DeliveryResult::ok_with_id(DeliveryStatus::Sent, id)
                }
                None => {
                    #[cfg(feature = "tracing")]
                    Span::current().set_status(Status::Ok);
                    DeliveryResult::ok(DeliveryStatus::Sent)
                }
            };
        }

        let error_code = data.error_code.map(|code| code.to_string()).unwrap_or_default();
        let description = data
            .description
            .unwrap_or_else(|| "Unknown Telegram API error".to_string());

        #[cfg(feature = "tracing")]
        error!(code = %error_code, message = %description, "Telegram API error");

        DeliveryResult::fail_with_code(description, error_code)
    }
}

impl MessagingProvider for TelegramBotProvider {
    type Message = TelegramMessage;

    async fn send(&self, message: &TelegramMessage) -> DeliveryResult {
        match message {
            TelegramMessage::Text(text) => self.send_text(text).await,
            TelegramMessage::Media(media) => self.send_media(media).await,
        }
    }
}
