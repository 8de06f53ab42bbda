use secrecy::SecretString;
use std::time::Duration;
use url::Url;

/// Graph API version used when none is configured.
pub const DEFAULT_API_VERSION: &str = "v21.0";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for [`MetaWhatsAppProvider`](super::MetaWhatsAppProvider).
#[derive(Clone)]
pub struct MetaWhatsAppConfig {
    /// WhatsApp Business phone number id (not the phone number itself).
    pub phone_number_id: String,
    /// System user access token.
    pub access_token: SecretString,
    /// Graph API version, e.g. `v21.0`.
    pub api_version: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Override for the Graph API base URL. Mostly useful for tests.
    pub endpoint: Option<Url>,
}

impl MetaWhatsAppConfig {
    /// Create a config with the default API version and timeout.
    pub fn new(phone_number_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            phone_number_id: phone_number_id.into(),
            access_token: SecretString::from(access_token.into()),
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout: DEFAULT_TIMEOUT,
            endpoint: None,
        }
    }

    /// Set the Graph API version.
    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the Graph API base URL.
    pub fn with_endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = Some(endpoint);
        self
    }
}

impl std::fmt::Debug for MetaWhatsAppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetaWhatsAppConfig")
            .field("phone_number_id", &self.phone_number_id)
            .field("access_token", &"[REDACTED]")
            .field("api_version", &self.api_version)
            .field("timeout", &self.timeout)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_access_token() {
        let config = MetaWhatsAppConfig::new("123456789", "EAAsecret");
        let debug = format!("{config:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("EAAsecret"));
    }
}
