//! Telegram Bot API provider.
//!
//! # Example
//!
//! ```rust,ignore
//! use messaging_gateway::{
//!     MessagingProvider, ParseMode, TelegramBotProvider, TelegramConfig, TelegramText,
//! };
//!
//! let provider = TelegramBotProvider::new(TelegramConfig::new("123456:ABC-DEF"))?;
//!
//! let message = TelegramText::new(12345_i64, "<b>Hello!</b>")
//!     .with_parse_mode(ParseMode::Html);
//! let result = provider.send(&message.into()).await;
//! assert!(result.succeeded());
//! ```

mod provider;
mod types;

// Re-export commonly used types
pub use provider::{TelegramBotProvider, DEFAULT_API_URL};
pub use types::{TelegramConfig, DEFAULT_TIMEOUT};
