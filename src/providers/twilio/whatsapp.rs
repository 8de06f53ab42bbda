//! WhatsApp delivery through the Twilio Messaging API.

use super::client::{CreateMessage, TwilioClient};
use super::types::TwilioConfig;
use crate::errors::ConfigError;
use crate::providers::traits::MessagingProvider;
use crate::providers::util::truncate_chars;
use crate::types::{
    DeliveryResult, PhoneAddressed, WhatsAppMedia, WhatsAppMessage, WhatsAppTemplate, WhatsAppText,
};
use reqwest_middleware::ClientWithMiddleware;

/// Maximum characters Twilio accepts in a WhatsApp body or media caption.
/// Longer texts are truncated, not rejected.
pub const MAX_WHATSAPP_BODY_CHARS: usize = 1532;

/// WhatsApp provider backed by the Twilio Business API.
///
/// Sends text, media and pre-approved [`WhatsAppTemplate`] content
/// messages. Meta-native templates belong to
/// [`MetaWhatsAppProvider`](crate::MetaWhatsAppProvider) and are rejected
/// here with a failed result.
///
/// # Example
///
/// ```rust,ignore
/// use messaging_gateway::{
///     MessagingProvider, TwilioConfig, TwilioWhatsAppProvider, WhatsAppText,
/// };
///
/// let config = TwilioConfig::new("AC...", "auth_token", "whatsapp:+14155238886");
/// let provider = TwilioWhatsAppProvider::new(config)?;
///
/// let message = WhatsAppText::new("whatsapp:+5551998644323", "Olá!").into();
/// let result = provider.send(&message).await;
/// println!("sid: {:?}", result.external_id());
/// ```
#[derive(Debug, Clone)]
pub struct TwilioWhatsAppProvider {
    client: TwilioClient,
    whatsapp_number: String,
    status_callback: Option<String>,
}

impl TwilioWhatsAppProvider {
    /// Create a provider from `config`.
    pub fn new(config: TwilioConfig) -> Result<Self, ConfigError> {
        Self::with_client(config, None)
    }

    /// Create a provider that reuses a caller-supplied HTTP client, for
    /// custom middleware or proxying.
    pub fn with_http_client(
        config: TwilioConfig,
        http_client: ClientWithMiddleware,
    ) -> Result<Self, ConfigError> {
        Self::with_client(config, Some(http_client))
    }

    fn with_client(
        config: TwilioConfig,
        http_client: Option<ClientWithMiddleware>,
    ) -> Result<Self, ConfigError> {
        if config.account_sid.is_empty() {
            return Err(ConfigError::MissingField("account_sid"));
        }
        if config.whatsapp_number.is_empty() {
            return Err(ConfigError::MissingField("whatsapp_number"));
        }

        let client = TwilioClient::new(
            config.account_sid,
            config.auth_token,
            config.endpoint,
            config.timeout,
            http_client,
        )?;

        Ok(Self {
            client,
            whatsapp_number: config.whatsapp_number,
            status_callback: config.status_callback,
        })
    }

    async fn send_text(&self, message: &WhatsAppText) -> DeliveryResult {
        if message.body.trim().is_empty() {
            return DeliveryResult::fail("No message body provided");
        }

        let body = truncate_chars(&message.body, MAX_WHATSAPP_BODY_CHARS);

        self.client
            .create_message(CreateMessage {
                to: &message.to,
                from: &self.whatsapp_number,
                body: Some(body.to_string()),
                media_urls: &[],
                content_sid: None,
                content_variables: None,
                status_callback: self.status_callback.as_deref(),
            })
            .await
    }

    async fn send_media(&self, message: &WhatsAppMedia) -> DeliveryResult {
        if message.media_urls.is_empty() {
            return DeliveryResult::fail("No media URLs provided");
        }

        let caption = message
            .caption
            .as_deref()
            .map(|caption| truncate_chars(caption, MAX_WHATSAPP_BODY_CHARS).to_string());

        self.client
            .create_message(CreateMessage {
                to: &message.to,
                from: &self.whatsapp_number,
                body: caption,
                media_urls: &message.media_urls,
                content_sid: None,
                content_variables: None,
                status_callback: self.status_callback.as_deref(),
            })
            .await
    }

    async fn send_template(&self, message: &WhatsAppTemplate) -> DeliveryResult {
        let content_variables = if message.content_variables.is_empty() {
            None
        } else {
            match serde_json::to_string(&message.content_variables) {
                Ok(encoded) => Some(encoded),
                Err(err) => {
                    return DeliveryResult::fail(format!(
                        "failed to encode content variables: {err}"
                    ));
                }
            }
        };

        self.client
            .create_message(CreateMessage {
                to: &message.to,
                from: &self.whatsapp_number,
                body: None,
                media_urls: &[],
                content_sid: Some(&message.content_sid),
                content_variables,
                status_callback: self.status_callback.as_deref(),
            })
            .await
    }
}

impl MessagingProvider for TwilioWhatsAppProvider {
    type Message = WhatsAppMessage;

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "TwilioWhatsAppProvider::send",
            skip_all,
            fields(to = %message.to())
        )
    )]
    async fn send(&self, message: &WhatsAppMessage) -> DeliveryResult {
        match message {
            WhatsAppMessage::Text(text) => self.send_text(text).await,
            WhatsAppMessage::Media(media) => self.send_media(media).await,
            WhatsAppMessage::Template(template) => self.send_template(template).await,
            WhatsAppMessage::MetaTemplate(_) => DeliveryResult::fail(
                "TwilioWhatsAppProvider does not support MetaWhatsAppTemplate; \
                 use MetaWhatsAppProvider",
            ),
        }
    }

    async fn fetch_status(&self, external_id: &str) -> Option<DeliveryResult> {
        self.client.fetch_message(external_id).await
    }
}
