use secrecy::SecretString;
use std::time::Duration;
use url::Url;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for [`TelegramBotProvider`](super::TelegramBotProvider).
#[derive(Clone)]
pub struct TelegramConfig {
    /// Bot token from @BotFather, e.g. `123456:ABC-DEF...`.
    pub bot_token: SecretString,
    /// Request timeout.
    pub timeout: Duration,
    /// Override for the Bot API base URL. Mostly useful for tests.
    pub endpoint: Option<Url>,
}

impl TelegramConfig {
    /// Create a config with the default timeout.
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self {
            bot_token: SecretString::from(bot_token.into()),
            timeout: DEFAULT_TIMEOUT,
            endpoint: None,
        }
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the Bot API base URL.
    pub fn with_endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = Some(endpoint);
        self
    }
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}
