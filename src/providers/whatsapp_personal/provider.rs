use super::types::WhatsAppPersonalConfig;
use crate::errors::ConfigError;
use crate::providers::traits::MessagingProvider;
use crate::providers::util::default_http_client;
use crate::types::{DeliveryResult, DeliveryStatus, WhatsAppMedia, WhatsAppMessage, WhatsAppText};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest_middleware::ClientWithMiddleware;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use thiserror::Error;

#[cfg(feature = "tracing")]
use tracing::warn;

/// The adapter rejects texts longer than this instead of truncating them.
pub const MAX_BODY_CHARS: usize = 1532;

static CHAT_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+[1-9]\d{1,14}$").expect("Invalid chat id regex"));

/// Errors from a single adapter HTTP call. These never escape the provider;
/// they become failed [`DeliveryResult`]s.
#[derive(Debug, Error)]
enum AdapterError {
    #[error("Adapter error ({status}): {detail}")]
    Http { status: u16, detail: String },
    #[error("Network error communicating with adapter")]
    Network(#[source] reqwest_middleware::Error),
    #[error("Adapter returned unexpected content type: {0}")]
    ContentType(String),
    #[error("Adapter returned invalid JSON")]
    InvalidJson(#[source] reqwest::Error),
    #[error("Adapter returned non-object JSON")]
    NonObjectJson,
}

/// Normalizes a recipient to the chat id format the adapter accepts.
///
/// Group JIDs (`...@g.us`) pass through untouched. Anything else must
/// reduce to an E.164 number once formatting characters are stripped.
fn normalize_chat_id(phone_number: &str) -> Option<String> {
    let trimmed = phone_number.trim();

    if trimmed.ends_with("@g.us") {
        return Some(trimmed.to_string());
    }

    let trimmed = match trimmed.get(..9) {
        Some(prefix) if prefix.eq_ignore_ascii_case("whatsapp:") => &trimmed[9..],
        _ => trimmed,
    };

    // Allow formatted numbers like "+55 (11) 99999-9999".
    let digits_only: String = trimmed.chars().filter(|ch| ch.is_ascii_digit()).collect();
    if digits_only.is_empty() || digits_only.starts_with('0') {
        return None;
    }

    let candidate = format!("+{digits_only}");
    CHAT_ID_RE.is_match(&candidate).then_some(candidate)
}

/// Picks the adapter endpoint for a file's MIME type. Audio goes out as a
/// voice note; anything unrecognized ships as a plain file.
fn endpoint_for_mime(content_type: &str) -> &'static str {
    if content_type.starts_with("image/") {
        "sendImage"
    } else if content_type.starts_with("video/") {
        "sendVideo"
    } else if content_type.starts_with("audio/") {
        "sendVoice"
    } else {
        "sendFile"
    }
}

/// Pulls an error message out of an adapter response body.
///
/// Only `error` and `detail` are checked at the top level; `message` is
/// only read inside nested error objects so that success responses with a
/// top-level `message` field are not misread as failures.
fn extract_adapter_error(data: &Value) -> Option<String> {
    for key in ["error", "detail"] {
        match data.get(key) {
            Some(Value::String(value)) if !value.trim().is_empty() => {
                return Some(value.trim().to_string());
            }
            Some(Value::Object(nested)) => {
                for nested_key in ["message", "detail", "error"] {
                    if let Some(Value::String(value)) = nested.get(nested_key) {
                        if !value.trim().is_empty() {
                            return Some(value.trim().to_string());
                        }
                    }
                }
            }
            _ => {}
        }
    }
    None
}

fn extract_text_message_id(data: &Value) -> Option<String> {
    let payload = data.get("payload")?.as_object()?;
    for key in ["MessageSid", "Sid"] {
        if let Some(Value::String(sid)) = payload.get(key) {
            if !sid.trim().is_empty() {
                return Some(sid.trim().to_string());
            }
        }
    }
    None
}

fn extract_media_message_id(data: &Value) -> Option<String> {
    match data.get("id") {
        // Media endpoints usually return {"id": {"_serialized": ...}}.
        Some(Value::Object(raw_id)) => {
            for key in ["_serialized", "id"] {
                if let Some(Value::String(nested)) = raw_id.get(key) {
                    if !nested.trim().is_empty() {
                        return Some(nested.trim().to_string());
                    }
                }
            }
            None
        }
        Some(Value::String(raw_id)) => {
            let trimmed = raw_id.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        _ => extract_text_message_id(data),
    }
}

fn parse_send_text_response(data: &Value) -> Result<String, String> {
    if let Some(error) = extract_adapter_error(data) {
        return Err(error);
    }
    extract_text_message_id(data).ok_or_else(|| "Adapter response missing message id".to_string())
}

fn parse_send_media_response(data: &Value) -> Result<String, String> {
    if let Some(error) = extract_adapter_error(data) {
        return Err(error);
    }
    extract_media_message_id(data).ok_or_else(|| "Adapter response missing message id".to_string())
}

/// Sends WhatsApp messages through a personal-session adapter.
///
/// The adapter drives a logged-in WhatsApp Web session, so there is no
/// template support and no status polling; `fetch_status` reports unknown.
/// Media messages fan out one HTTP call per file, with the caption sent
/// ahead as its own text message. Partial failures keep the first
/// successful message id but report [`DeliveryStatus::Failed`] with the
/// collected errors.
#[derive(Clone)]
pub struct WhatsAppPersonalProvider {
    http_client: ClientWithMiddleware,
    api_key: SecretString,
    base_url: String,
    session_public_id: String,
}

impl std::fmt::Debug for WhatsAppPersonalProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhatsAppPersonalProvider")
            .field("session_public_id", &self.session_public_id)
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl WhatsAppPersonalProvider {
    /// Create a provider from `config`.
    pub fn new(config: WhatsAppPersonalConfig) -> Result<Self, ConfigError> {
        Self::with_client(config, None)
    }

    /// Create a provider that reuses a caller-supplied HTTP client.
    pub fn with_http_client(
        config: WhatsAppPersonalConfig,
        http_client: ClientWithMiddleware,
    ) -> Result<Self, ConfigError> {
        Self::with_client(config, Some(http_client))
    }

    fn with_client(
        config: WhatsAppPersonalConfig,
        http_client: Option<ClientWithMiddleware>,
    ) -> Result<Self, ConfigError> {
        if config.adapter_base_url.is_empty() {
            return Err(ConfigError::MissingField("adapter_base_url"));
        }

        let http_client = match http_client {
            Some(client) => client,
            None => default_http_client(config.timeout)?,
        };

        Ok(Self {
            http_client,
            api_key: config.api_key,
            base_url: config.adapter_base_url.trim_end_matches('/').to_string(),
            session_public_id: config.session_public_id,
        })
    }

    async fn send_text(&self, message: &WhatsAppText) -> DeliveryResult {
        let body = message.body.trim();
        if body.is_empty() {
            return DeliveryResult::fail("Cannot send an empty message");
        }
        if body.chars().count() > MAX_BODY_CHARS {
            return DeliveryResult::fail(format!(
                "Message text exceeds {MAX_BODY_CHARS} characters"
            ));
        }

        let Some(chat_id) = normalize_chat_id(&message.to) else {
            return DeliveryResult::fail("Invalid phone number");
        };

        let data = match self
            .post("/api/sendText", &json!({"chatId": chat_id, "text": body}))
            .await
        {
            Ok(data) => data,
            Err(err) => return DeliveryResult::fail(err.to_string()),
        };

        match parse_send_text_response(&data) {
            Ok(id) => DeliveryResult::ok_with_id(DeliveryStatus::Sent, id),
            Err(error) => DeliveryResult::fail(error),
        }
    }

    async fn send_media(&self, message: &WhatsAppMedia) -> DeliveryResult {
        if message.media_urls.is_empty() {
            return DeliveryResult::fail("No media URLs provided");
        }

        let Some(chat_id) = normalize_chat_id(&message.to) else {
            return DeliveryResult::fail("Invalid phone number");
        };

        let mut errors: Vec<String> = Vec::new();
        let mut external_id: Option<String> = None;

        // The caption goes out first as its own text message.
        let caption = message
            .caption
            .as_deref()
            .map(str::trim)
            .filter(|caption| !caption.is_empty());
        let mut text_sent = false;
        if let Some(caption) = caption {
            match self
                .post("/api/sendText", &json!({"chatId": chat_id, "text": caption}))
                .await
            {
                Ok(data) => match parse_send_text_response(&data) {
                    Ok(id) => {
                        external_id = Some(id);
                        text_sent = true;
                    }
                    Err(error) => errors.push(error),
                },
                Err(err) => errors.push(err.to_string()),
            }
        }

        for (idx, url) in message.media_urls.iter().enumerate() {
            let mimetype = message
                .media_types
                .get(idx)
                .map_or("application/octet-stream", String::as_str);
            let filename = message
                .media_filenames
                .get(idx)
                .filter(|filename| !filename.is_empty());
            let endpoint = endpoint_for_mime(mimetype);

            // Caption rides on the first file only when it was not already
            // delivered as a separate text message.
            let file_caption = if !text_sent && idx == 0 {
                message.caption.as_deref().filter(|caption| !caption.is_empty())
            } else {
                None
            };

            let mut file_payload = json!({"mimetype": mimetype, "url": url});
            if let Some(filename) = filename {
                file_payload["filename"] = json!(filename);
            }

            let mut request_payload = json!({"chatId": chat_id, "file": file_payload});
            if let Some(caption) = file_caption {
                request_payload["caption"] = json!(caption);
            }

            let data = match self.post(&format!("/api/{endpoint}"), &request_payload).await {
                Ok(data) => data,
                Err(err) => {
                    errors.push(err.to_string());
                    continue;
                }
            };

            match parse_send_media_response(&data) {
                Ok(id) => {
                    if external_id.is_none() {
                        external_id = Some(id);
                    }
                }
                Err(error) => errors.push(error),
            }
        }

        if !errors.is_empty() && external_id.is_none() {
            return DeliveryResult::fail(errors.join("; "));
        }

        let status = if errors.is_empty() {
            DeliveryStatus::Sent
        } else {
            DeliveryStatus::Failed
        };
        DeliveryResult::from_report(
            status,
            external_id,
            None,
            (!errors.is_empty()).then(|| errors.join("; ")),
        )
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "WhatsAppPersonalProvider::post",
            skip_all,
            fields(session = %self.session_public_id, path = %path)
        )
    )]
    async fn post(&self, path: &str, payload: &Value) -> Result<Value, AdapterError> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .http_client
            .post(url)
            .header("X-Api-Key", self.api_key.expose_secret())
            .json(payload)
            .send()
            .await
            .map_err(AdapterError::Network)?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_else(|err| err.to_string());

            #[cfg(feature = "tracing")]
            warn!(status = status.as_u16(), detail = %detail, "adapter request failed");

            return Err(AdapterError::Http {
                status: status.as_u16(),
                detail,
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !content_type.to_lowercase().contains("application/json") {
            return Err(AdapterError::ContentType(content_type));
        }

        let data: Value = response.json().await.map_err(AdapterError::InvalidJson)?;
        if !data.is_object() {
            return Err(AdapterError::NonObjectJson);
        }
        Ok(data)
    }
}

impl MessagingProvider for WhatsAppPersonalProvider {
    type Message = WhatsAppMessage;

    async fn send(&self, message: &WhatsAppMessage) -> DeliveryResult {
        match message {
            WhatsAppMessage::Text(text) => self.send_text(text).await,
            WhatsAppMessage::Media(media) => self.send_media(media).await,
            WhatsAppMessage::Template(_) => {
                DeliveryResult::fail("WhatsApp Personal does not support template messages")
            }
            WhatsAppMessage::MetaTemplate(_) => {
                DeliveryResult::fail("Unsupported message type: MetaWhatsAppTemplate")
            }
        }
    }
}
