//! Twilio configuration types.

use secrecy::SecretString;
use std::time::Duration;
use url::Url;

/// Default request timeout for Twilio API calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for Twilio WhatsApp delivery and template management.
///
/// Used by [`TwilioWhatsAppProvider`](super::TwilioWhatsAppProvider) and
/// [`TwilioContentApi`](super::TwilioContentApi).
///
/// # Example
///
/// ```rust
/// use messaging_gateway::TwilioConfig;
/// use std::time::Duration;
///
/// let config = TwilioConfig::new("AC123", "auth_token", "whatsapp:+14155238886")
///     .with_status_callback("https://example.com/webhooks/twilio")
///     .with_timeout(Duration::from_secs(5));
///
/// assert_eq!(config.whatsapp_number, "whatsapp:+14155238886");
/// ```
#[derive(Clone)]
pub struct TwilioConfig {
    /// Twilio account SID (`AC...`).
    pub account_sid: String,
    /// Twilio auth token.
    pub auth_token: SecretString,
    /// Sending WhatsApp number, `whatsapp:+<E.164>`.
    pub whatsapp_number: String,
    /// Webhook URL Twilio calls with delivery status updates.
    pub status_callback: Option<String>,
    /// Request timeout.
    pub timeout: Duration,
    /// API base URL override; tests point this at a local mock server.
    pub endpoint: Option<Url>,
}

impl std::fmt::Debug for TwilioConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwilioConfig")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"[REDACTED]")
            .field("whatsapp_number", &self.whatsapp_number)
            .field("status_callback", &self.status_callback)
            .field("timeout", &self.timeout)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl TwilioConfig {
    /// Create a config with the default timeout and production endpoint.
    pub fn new(
        account_sid: impl Into<String>,
        auth_token: impl Into<String>,
        whatsapp_number: impl Into<String>,
    ) -> Self {
        Self {
            account_sid: account_sid.into(),
            auth_token: SecretString::from(auth_token.into()),
            whatsapp_number: whatsapp_number.into(),
            status_callback: None,
            timeout: DEFAULT_TIMEOUT,
            endpoint: None,
        }
    }

    /// Set the delivery status webhook URL.
    pub fn with_status_callback(mut self, url: impl Into<String>) -> Self {
        self.status_callback = Some(url.into());
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the API base URL.
    pub fn with_endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = Some(endpoint);
        self
    }
}

/// Configuration for [`TwilioSmsProvider`](super::TwilioSmsProvider).
#[derive(Clone)]
pub struct TwilioSmsConfig {
    /// Twilio account SID (`AC...`).
    pub account_sid: String,
    /// Twilio auth token.
    pub auth_token: SecretString,
    /// Sending phone number in E.164 form.
    pub from_number: String,
    /// Webhook URL Twilio calls with delivery status updates.
    pub status_callback: Option<String>,
    /// Request timeout.
    pub timeout: Duration,
    /// API base URL override; tests point this at a local mock server.
    pub endpoint: Option<Url>,
}

impl std::fmt::Debug for TwilioSmsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwilioSmsConfig")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"[REDACTED]")
            .field("from_number", &self.from_number)
            .field("status_callback", &self.status_callback)
            .field("timeout", &self.timeout)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl TwilioSmsConfig {
    /// Create a config with the default timeout and production endpoint.
    pub fn new(
        account_sid: impl Into<String>,
        auth_token: impl Into<String>,
        from_number: impl Into<String>,
    ) -> Self {
        Self {
            account_sid: account_sid.into(),
            auth_token: SecretString::from(auth_token.into()),
            from_number: from_number.into(),
            status_callback: None,
            timeout: DEFAULT_TIMEOUT,
            endpoint: None,
        }
    }

    /// Set the delivery status webhook URL.
    pub fn with_status_callback(mut self, url: impl Into<String>) -> Self {
        self.status_callback = Some(url.into());
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the API base URL.
    pub fn with_endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = Some(endpoint);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_auth_token() {
        let config = TwilioConfig::new("AC123", "super_secret", "whatsapp:+14155238886");
        let debug = format!("{config:?}");

        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("super_secret"));
    }

    #[test]
    fn test_sms_config_debug_redacts_auth_token() {
        let config = TwilioSmsConfig::new("AC123", "super_secret", "+14155238886");
        let debug = format!("{config:?}");

        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("super_secret"));
    }
}
