use super::types::MetaWhatsAppConfig;
use crate::errors::ConfigError;
use crate::providers::traits::MessagingProvider;
use crate::providers::util::{default_http_client, request_failure, truncate_chars};
use crate::types::{
    DeliveryResult, DeliveryStatus, MetaWhatsAppTemplate, WhatsAppMedia, WhatsAppMessage,
    WhatsAppText,
};
use reqwest_middleware::ClientWithMiddleware;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Value, json};
use url::Url;

#[cfg(feature = "tracing")]
use opentelemetry::trace::Status;
#[cfg(feature = "tracing")]
use tracing::{Span, error, info};
#[cfg(feature = "tracing")]
use tracing_opentelemetry::OpenTelemetrySpanExt;

/// Default Graph API URL.
pub const DEFAULT_API_URL: &str = "https://graph.facebook.com";

/// Meta caps text bodies at 4096 characters; longer bodies are truncated.
pub const MAX_BODY_CHARS: usize = 4096;

/// Strips a `whatsapp:` prefix and any leading `+` so the number is in the
/// plain form the Graph API expects.
fn normalize_phone(to: &str) -> &str {
    let rest = match to.get(..9) {
        Some(prefix) if prefix.eq_ignore_ascii_case("whatsapp:") => &to[9..],
        _ => to,
    };
    rest.trim_start_matches('+')
}

/// Maps a MIME type to the Graph API media type, defaulting to `document`.
fn media_type_from_mime(mime: &str) -> &'static str {
    let mime = mime.to_ascii_lowercase();
    if mime.starts_with("image/") {
        "image"
    } else if mime.starts_with("video/") {
        "video"
    } else if mime.starts_with("audio/") {
        "audio"
    } else {
        "document"
    }
}

#[derive(Debug, Deserialize)]
struct MetaResponse {
    error: Option<MetaErrorBody>,
    #[serde(default)]
    messages: Vec<MetaMessageId>,
}

#[derive(Debug, Deserialize)]
struct MetaErrorBody {
    code: Option<i64>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MetaMessageId {
    id: String,
}

/// Sends WhatsApp messages through the Meta Cloud API.
///
/// Shares [`WhatsAppText`] and [`WhatsAppMedia`] with
/// [`TwilioWhatsAppProvider`](crate::providers::TwilioWhatsAppProvider), so a
/// gateway can swap one for the other. Templates differ: this provider takes
/// [`MetaWhatsAppTemplate`] and rejects the Twilio Content API
/// [`WhatsAppTemplate`](crate::WhatsAppTemplate) shape.
///
/// Delivery status arrives via webhooks only, so `fetch_status` reports
/// unknown.
#[derive(Clone)]
pub struct MetaWhatsAppProvider {
    http_client: ClientWithMiddleware,
    access_token: SecretString,
    url: Url,
}

impl std::fmt::Debug for MetaWhatsAppProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetaWhatsAppProvider")
            .field("access_token", &"[REDACTED]")
            .field("url", &self.url)
            .finish()
    }
}

impl MetaWhatsAppProvider {
    /// Create a provider from `config`.
    pub fn new(config: MetaWhatsAppConfig) -> Result<Self, ConfigError> {
        Self::with_client(config, None)
    }

    /// Create a provider that reuses a caller-supplied HTTP client.
    pub fn with_http_client(
        config: MetaWhatsAppConfig,
        http_client: ClientWithMiddleware,
    ) -> Result<Self, ConfigError> {
        Self::with_client(config, Some(http_client))
    }

    fn with_client(
        config: MetaWhatsAppConfig,
        http_client: Option<ClientWithMiddleware>,
    ) -> Result<Self, ConfigError> {
        if config.phone_number_id.is_empty() {
            return Err(ConfigError::MissingField("phone_number_id"));
        }
        if config.access_token.expose_secret().is_empty() {
            return Err(ConfigError::MissingField("access_token"));
        }

        let endpoint = config
            .endpoint
            .unwrap_or_else(|| Url::parse(DEFAULT_API_URL).expect("Invalid default URL"));
        let url = endpoint.join(&format!(
            "/{}/{}/messages",
            config.api_version, config.phone_number_id
        ))?;

        let http_client = match http_client {
            Some(client) => client,
            None => default_http_client(config.timeout)?,
        };

        Ok(Self {
            http_client,
            access_token: config.access_token,
            url,
        })
    }

    async fn send_text(&self, message: &WhatsAppText) -> DeliveryResult {
        let body = message.body.trim();
        if body.is_empty() {
            return DeliveryResult::fail("No message body provided");
        }
        let body = truncate_chars(body, MAX_BODY_CHARS);

        let payload = json!({
            "messaging_product": "whatsapp",
            "to": normalize_phone(&message.to),
            "type": "text",
            "text": { "body": body },
        });
        self.post(&payload).await
    }

    async fn send_media(&self, message: &WhatsAppMedia) -> DeliveryResult {
        if message.media_urls.is_empty() {
            return DeliveryResult::fail("No media URLs provided");
        }

        let to = normalize_phone(&message.to);
        let caption = message.caption.as_deref().filter(|caption| !caption.is_empty());
        let mut last_result = DeliveryResult::fail("No media URLs provided");

        for (idx, media_url) in message.media_urls.iter().enumerate() {
            let mime = message.media_types.get(idx).map_or("", String::as_str);
            let meta_type = media_type_from_mime(mime);

            let mut media_obj = serde_json::Map::new();
            media_obj.insert("link".to_string(), json!(media_url));
            // The Graph API supports captions on image, video and document
            // media, but not audio, and only one caption per message.
            if let Some(caption) = caption {
                if idx == 0 && meta_type != "audio" {
                    media_obj.insert("caption".to_string(), json!(caption));
                }
            }

            let mut payload = serde_json::Map::new();
            payload.insert("messaging_product".to_string(), json!("whatsapp"));
            payload.insert("to".to_string(), json!(to));
            payload.insert("type".to_string(), json!(meta_type));
            payload.insert(meta_type.to_string(), Value::Object(media_obj));

            last_result = self.post(&Value::Object(payload)).await;
            if !last_result.succeeded() {
                return last_result;
            }
        }

        last_result
    }

    async fn send_template(&self, message: &MetaWhatsAppTemplate) -> DeliveryResult {
        let mut template_obj = json!({
            "name": message.template_name,
            "language": { "code": message.language_code },
        });
        if !message.components.is_empty() {
            template_obj["components"] = json!(message.components);
        }

        let payload = json!({
            "messaging_product": "whatsapp",
            "to": normalize_phone(&message.to),
            "type": "template",
            "template": template_obj,
        });
        self.post(&payload).await
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "MetaWhatsAppProvider::post",
            skip_all,
            fields(wamid = tracing::field::Empty)
        )
    )]
    async fn post(&self, payload: &Value) -> DeliveryResult {
        let response = match self
            .http_client
            .post(self.url.clone())
            .bearer_auth(self.access_token.expose_secret())
            .json(payload)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => return request_failure(err),
        };

        let data: MetaResponse = match response.json().await {
            Ok(data) => data,
            Err(err) => {
                return DeliveryResult::fail(format!("failed to parse Meta API response: {err}"));
            }
        };

        if let Some(error) = data.error {
            let error_code = error.code.map(|code| code.to_string()).unwrap_or_default();
            let description = error
                .message
                .unwrap_or_else(|| "Unknown Meta API error".to_string());

            #[cfg(feature = "tracing")]
            error!(code = %error_code, message = %description, "Meta WhatsApp API error");

            return DeliveryResult::fail_with_code(description, error_code);
        }

        match data.messages.into_iter().next() {
            Some(message) => {
                #[cfg(feature = "tracing")]
                {
                    info!(wamid = %message.id, "WhatsApp message sent via Meta Cloud API");
                    Span::current().record("wamid", message.id.as_str());
                    Span::current().set_status(Status::Ok);
                }
                DeliveryResult::ok_with_id(DeliveryStatus::Sent, message.id)
            }
            None => DeliveryResult::ok(DeliveryStatus::Sent),
        }
    }
}

impl MessagingProvider for MetaWhatsAppProvider {
    type Message = WhatsAppMessage;

    async fn send(&self, message: &WhatsAppMessage) -> DeliveryResult {
        match message {
            WhatsAppMessage::Text(text) => self.send_text(text).await,
            WhatsAppMessage::Media(media) => self.send_media(media).await,
            WhatsAppMessage::MetaTemplate(template) => self.send_template(template).await,
            WhatsAppMessage::Template(_) => DeliveryResult::fail(
                "MetaWhatsAppProvider does not support WhatsAppTemplate; use MetaWhatsAppTemplate",
            ),
        }
    }
}
