//! SMS delivery through the Twilio Messaging API.

use super::client::{CreateMessage, TwilioClient};
use super::types::TwilioSmsConfig;
use crate::errors::ConfigError;
use crate::providers::traits::MessagingProvider;
use crate::providers::util::truncate_chars;
use crate::types::{DeliveryResult, SmsMessage};
use reqwest_middleware::ClientWithMiddleware;

/// Maximum characters Twilio accepts in an SMS body. Longer texts are
/// truncated, not rejected.
pub const MAX_SMS_CHARS: usize = 1600;

/// SMS provider backed by the Twilio Messaging API.
///
/// Same `Messages` resource as WhatsApp, plain E.164 numbers instead of
/// `whatsapp:`-prefixed ones.
#[derive(Debug, Clone)]
pub struct TwilioSmsProvider {
    client: TwilioClient,
    from_number: String,
    status_callback: Option<String>,
}

impl TwilioSmsProvider {
    /// Create a provider from `config`.
    pub fn new(config: TwilioSmsConfig) -> Result<Self, ConfigError> {
        Self::with_client(config, None)
    }

    /// Create a provider that reuses a caller-supplied HTTP client.
    pub fn with_http_client(
        config: TwilioSmsConfig,
        http_client: ClientWithMiddleware,
    ) -> Result<Self, ConfigError> {
        Self::with_client(config, Some(http_client))
    }

    fn with_client(
        config: TwilioSmsConfig,
        http_client: Option<ClientWithMiddleware>,
    ) -> Result<Self, ConfigError> {
        if config.account_sid.is_empty() {
            return Err(ConfigError::MissingField("account_sid"));
        }
        if config.from_number.is_empty() {
            return Err(ConfigError::MissingField("from_number"));
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
            from_number: config.from_number,
            status_callback: config.status_callback,
        })
    }
}

impl MessagingProvider for TwilioSmsProvider {
    type Message = SmsMessage;

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "TwilioSmsProvider::send",
            skip_all,
            fields(to = %message.to)
        )
    )]
    async fn send(&self, message: &SmsMessage) -> DeliveryResult {
        if message.body.trim().is_empty() {
            return DeliveryResult::fail("No message body provided");
        }

        let body = truncate_chars(&message.body, MAX_SMS_CHARS);

        self.client
            .create_message(CreateMessage {
                to: &message.to,
                from: &self.from_number,
                body: Some(body.to_string()),
                media_urls: &[],
                content_sid: None,
                content_variables: None,
                status_callback: self.status_callback.as_deref(),
            })
            .await
    }

    async fn fetch_status(&self, external_id: &str) -> Option<DeliveryResult> {
        self.client.fetch_message(external_id).await
    }
}
