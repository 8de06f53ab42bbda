//! WhatsApp personal-session provider backed by an HTTP adapter.
//!
//! # Example
//!
//! ```rust,ignore
//! use messaging_gateway::{
//!     MessagingProvider, WhatsAppPersonalConfig, WhatsAppPersonalProvider, WhatsAppText,
//! };
//!
//! let provider = WhatsAppPersonalProvider::new(WhatsAppPersonalConfig::new(
//!     "sess_abc",
//!     "api-key",
//!     "http://adapter:3001",
//! ))?;
//!
//! let message = WhatsAppText::new("+5511999999999", "Hello!");
//! let result = provider.send(&message.into()).await;
//! assert!(result.succeeded());
//! ```

mod provider;
mod types;

// Re-export commonly used types
pub use provider::{WhatsAppPersonalProvider, MAX_BODY_CHARS};
pub use types::{WhatsAppPersonalConfig, DEFAULT_TIMEOUT};
