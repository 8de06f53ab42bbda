//! Twilio providers for WhatsApp and SMS, plus the Content API client
//! used to manage WhatsApp templates.
//!
//! # Example
//!
//! ```rust,ignore
//! use messaging_gateway::{
//!     MessagingProvider, TwilioConfig, TwilioWhatsAppProvider, WhatsAppText,
//! };
//!
//! let provider = TwilioWhatsAppProvider::new(TwilioConfig::new(
//!     "AC...",
//!     "auth_token",
//!     "whatsapp:+14155238886",
//! ))?;
//!
//! let message = WhatsAppText::new("whatsapp:+5551998644323", "Hello!");
//! let result = provider.send(&message.into()).await;
//! assert!(result.succeeded());
//! ```

mod client;
mod status;

pub mod content;
pub mod sms;
pub mod types;
pub mod whatsapp;

// Re-export commonly used types
pub use content::{
    ContentApiError, ContentTemplate, CreateTemplateRequest, QuickReplyButton, TemplateStatus,
    TwilioContentApi, DEFAULT_CONTENT_API_URL, MAX_QUICK_REPLY_BUTTONS,
};
pub use sms::{TwilioSmsProvider, MAX_SMS_CHARS};
pub use types::{TwilioConfig, TwilioSmsConfig, DEFAULT_TIMEOUT};
pub use whatsapp::{TwilioWhatsAppProvider, MAX_WHATSAPP_BODY_CHARS};
