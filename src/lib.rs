//! # Messaging Gateway
//!
//! A message delivery library with provider abstraction and phone-number
//! fallback for Brazil's mobile numbering migration.
//!
//! This library provides a unified interface for sending messages over
//! heterogeneous channels. Providers never throw for delivery problems:
//! every send produces a [`DeliveryResult`] describing what happened, and
//! the [`MessagingGateway`] layers invalid-number fallback on top.
//!
//! ## Supported Providers
//!
//! | Provider | Channel | Message types |
//! |----------|---------|---------------|
//! | Twilio | WhatsApp | text, media, Content API templates |
//! | Twilio | SMS | text |
//! | Meta Cloud API | WhatsApp | text, media, Meta templates |
//! | Personal adapter | WhatsApp | text, media |
//! | SendGrid | Email | HTML |
//! | SMTP2GO | Email | HTML |
//! | Telegram Bot API | Telegram | text, media |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use messaging_gateway::{
//!     MessagingGateway, SendOptions, TwilioConfig, TwilioWhatsAppProvider, WhatsAppText,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Create a provider with Twilio credentials
//!     let provider = TwilioWhatsAppProvider::new(TwilioConfig::new(
//!         "AC...",
//!         "auth_token",
//!         "whatsapp:+14155238886",
//!     ))?;
//!
//!     // Wrap it in a gateway for invalid-number fallback
//!     let gateway = MessagingGateway::new(provider);
//!
//!     let message = WhatsAppText::new("whatsapp:+5551998644323", "Hello!");
//!     let result = gateway
//!         .send(&message.into(), SendOptions { phone_fallback: true })
//!         .await;
//!
//!     println!(
//!         "status={:?} fallback={:?}",
//!         result.status(),
//!         result.used_fallback_number()
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! MessagingGateway<P>
//!         │            (invalid-number fallback, one retry)
//!         ▼
//!     Provider         (trait: TwilioWhatsAppProvider, MetaWhatsAppProvider, ...)
//!         │
//!         ▼
//!   DeliveryResult     (QUEUED / SENT / DELIVERED / READ / FAILED / UNDELIVERED)
//! ```
//!
//! ## Features
//!
//! - `tracing` - OpenTelemetry tracing instrumentation (enabled by default)
//! - `random` - randomized failures on the mock provider (enabled by default)

pub mod errors;
pub mod gateway;
pub mod phone;
pub mod pricing;
pub mod providers;
pub mod types;

// Re-export commonly used types at the crate root
pub use errors::ConfigError;
pub use gateway::{InvalidNumberMatcher, MessagingGateway, SendOptions};
pub use phone::{
    denormalize_phone, format_whatsapp_number, normalize_phone, normalize_whatsapp_id,
    phones_match,
};
pub use pricing::{TemplateCategory, template_price_micro_usd};
pub use providers::twilio::{
    ContentApiError, ContentTemplate, CreateTemplateRequest, QuickReplyButton, TemplateStatus,
};
pub use providers::{
    MessagingProvider, MetaWhatsAppConfig, MetaWhatsAppProvider, MockProvider, SendGridConfig,
    SendGridProvider, SentMessage, Smtp2GoConfig, Smtp2GoProvider, TelegramBotProvider,
    TelegramConfig, TwilioConfig, TwilioContentApi, TwilioSmsConfig, TwilioSmsProvider,
    TwilioWhatsAppProvider, WhatsAppPersonalConfig, WhatsAppPersonalProvider,
};
pub use types::{
    ChatId, DeliveryResult, DeliveryStatus, EmailMessage, GatewayResult, MetaWhatsAppTemplate,
    ParseMode, PhoneAddressed, SmsMessage, TelegramMedia, TelegramMediaType, TelegramMessage,
    TelegramText, WhatsAppMedia, WhatsAppMessage, WhatsAppTemplate, WhatsAppText,
};

// Country codes come from keshvar; re-exported so callers do not need a
// direct dependency for the common case.
pub use keshvar::Alpha2;
