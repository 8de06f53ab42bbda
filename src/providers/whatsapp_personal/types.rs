use secrecy::SecretString;
use std::time::Duration;

/// Default request timeout for adapter calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Configuration for [`WhatsAppPersonalProvider`](super::WhatsAppPersonalProvider).
#[derive(Clone)]
pub struct WhatsAppPersonalConfig {
    /// Public id of the adapter session the messages go out on. Carried in
    /// spans so sends can be tied back to a session.
    pub session_public_id: String,
    /// Adapter API key, sent as `X-Api-Key`.
    pub api_key: SecretString,
    /// Base URL of the adapter HTTP API, e.g. `http://adapter:3001`.
    pub adapter_base_url: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl WhatsAppPersonalConfig {
    /// Create a config with the default timeout.
    pub fn new(
        session_public_id: impl Into<String>,
        api_key: impl Into<String>,
        adapter_base_url: impl Into<String>,
    ) -> Self {
        Self {
            session_public_id: session_public_id.into(),
            api_key: SecretString::from(api_key.into()),
            adapter_base_url: adapter_base_url.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl std::fmt::Debug for WhatsAppPersonalConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhatsAppPersonalConfig")
            .field("session_public_id", &self.session_public_id)
            .field("api_key", &"[REDACTED]")
            .field("adapter_base_url", &self.adapter_base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}
