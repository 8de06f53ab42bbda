//! Meta WhatsApp Cloud API provider.
//!
//! # Example
//!
//! ```rust,ignore
//! use messaging_gateway::{
//!     MessagingProvider, MetaWhatsAppConfig, MetaWhatsAppProvider, WhatsAppText,
//! };
//!
//! let provider = MetaWhatsAppProvider::new(MetaWhatsAppConfig::new(
//!     "123456789",
//!     "EAA...",
//! ))?;
//!
//! let message = WhatsAppText::new("whatsapp:+5511999999999", "Hello!");
//! let result = provider.send(&message.into()).await;
//! assert!(result.succeeded());
//! ```

mod provider;
mod types;

// Re-export commonly used types
pub use provider::{MetaWhatsAppProvider, DEFAULT_API_URL, MAX_BODY_CHARS};
pub use types::{MetaWhatsAppConfig, DEFAULT_API_VERSION, DEFAULT_TIMEOUT};
