//! Error types for provider construction.
//!
//! Delivery problems never surface as errors in this crate; they are
//! encoded in [`DeliveryResult`](crate::DeliveryResult). The only fallible
//! moment of a provider's life is its construction: validating the config
//! and building the HTTP client.

use thiserror::Error;

/// Error raised when a provider is constructed from an invalid configuration.
///
/// # Example
///
/// ```rust
/// use messaging_gateway::{ConfigError, TwilioConfig, TwilioWhatsAppProvider};
///
/// let config = TwilioConfig::new("AC123", "token", "");
/// let err = TwilioWhatsAppProvider::new(config).unwrap_err();
/// assert!(matches!(err, ConfigError::MissingField("whatsapp_number")));
/// ```
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required configuration field is missing or empty.
    #[error("missing required config field `{0}`")]
    MissingField(&'static str),

    /// The API endpoint URL could not be parsed.
    #[error("invalid endpoint URL: {0}")]
    InvalidEndpoint(#[from] url::ParseError),

    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    BuildHttpClient(#[from] reqwest::Error),
}
