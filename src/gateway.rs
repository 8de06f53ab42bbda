//! Delivery gateway with phone-format fallback retry.
//!
//! [`MessagingGateway`] wraps a single provider and adds the one retry
//! policy providers themselves are forbidden to have: when a send fails
//! because the destination number does not exist on the channel, and the
//! number has an alternate local encoding, the gateway retries once with
//! the alternate form.
//!
//! The canonical case is Brazil, where mobile numbers exist in a nine-digit
//! and a legacy eight-digit form and WhatsApp accounts are registered under
//! exactly one of them. A send to `whatsapp:+5551998644323` that the
//! provider rejects as an invalid number is retried as
//! `whatsapp:+555198644323`.
//!
//! Every send performs at most two provider calls. The retry only happens
//! when all of the following hold:
//!
//! - the caller opted in via [`SendOptions::phone_fallback`]
//! - the failure looks like an invalid-number rejection (see
//!   [`InvalidNumberMatcher`])
//! - the destination actually has a distinct alternate encoding

use crate::phone::denormalize_phone;
use crate::providers::traits::MessagingProvider;
use crate::types::{DeliveryResult, GatewayResult, PhoneAddressed};
use keshvar::Alpha2;

#[cfg(feature = "tracing")]
use opentelemetry::trace::Status;
#[cfg(feature = "tracing")]
use tracing::{Span, info};
#[cfg(feature = "tracing")]
use tracing_opentelemetry::OpenTelemetrySpanExt;

/// Error-message fragments that mark a failure as an invalid-number
/// rejection. Matched case-insensitively against the result's error message.
const DEFAULT_MESSAGE_PATTERNS: [&str; 6] = [
    "invalid number",
    "not a valid whatsapp",
    "number is not registered",
    "unregistered",
    "invalid 'to' phone number",
    "is not a whatsapp user",
];

/// Provider error codes that mark an invalid destination number.
/// 21211 and 21614 are Twilio's invalid / non-mobile `To` number codes.
const DEFAULT_ERROR_CODES: [&str; 2] = ["21211", "21614"];

// ============================================================================
// Send options
// ============================================================================

/// Per-send options for [`MessagingGateway::send`].
///
/// The fallback retry is opt-in per message: callers that pass pre-verified
/// numbers leave it off and are guaranteed a single provider call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendOptions {
    /// Retry once with the alternate local phone format when the provider
    /// rejects the destination as an invalid number. Defaults to `false`.
    pub phone_fallback: bool,
}

// ============================================================================
// Invalid-number classification
// ============================================================================

/// Classifies failed delivery results as invalid-number rejections.
///
/// Providers phrase "this number does not exist here" in many ways; the
/// matcher recognizes them by error-message fragments (case-insensitive
/// substring match) and by exact provider error codes. The default set
/// covers the Twilio, Meta and personal-adapter phrasings.
#[derive(Debug, Clone)]
pub struct InvalidNumberMatcher {
    message_patterns: Vec<String>,
    error_codes: Vec<String>,
}

impl InvalidNumberMatcher {
    /// Create a matcher with custom message fragments and error codes.
    ///
    /// Fragments are matched case-insensitively; codes are compared exactly.
    pub fn new(
        message_patterns: impl IntoIterator<Item = impl Into<String>>,
        error_codes: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            message_patterns: message_patterns
                .into_iter()
                .map(|p| p.into().to_lowercase())
                .collect(),
            error_codes: error_codes.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `result` is a failed delivery that looks like an
    /// invalid-number rejection. Successful results never match.
    pub fn matches(&self, result: &DeliveryResult) -> bool {
        if result.succeeded() {
            return false;
        }

        if let Some(code) = result.error_code() {
            if self.error_codes.iter().any(|c| c == code) {
                return true;
            }
        }

        let Some(message) = result.error_message() else {
            return false;
        };
        let message = message.to_lowercase();

        self.message_patterns
            .iter()
            .any(|pattern| message.contains(pattern.as_str()))
    }
}

impl Default for InvalidNumberMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_MESSAGE_PATTERNS, DEFAULT_ERROR_CODES)
    }
}

// ============================================================================
// Gateway
// ============================================================================

/// Channel-agnostic delivery gateway over a single provider.
///
/// Works with any [`MessagingProvider`] whose message type exposes a phone
/// destination ([`PhoneAddressed`]); email and Telegram messages do not, so
/// a gateway over those providers is a compile error rather than a silent
/// no-op.
///
/// # Example
///
/// ```rust,ignore
/// use messaging_gateway::{
///     MessagingGateway, SendOptions, TwilioConfig, TwilioWhatsAppProvider, WhatsAppText,
/// };
///
/// let config = TwilioConfig::new("AC...", "auth_token", "whatsapp:+14155238886");
/// let provider = TwilioWhatsAppProvider::new(config)?;
/// let gateway = MessagingGateway::new(provider);
///
/// let message = WhatsAppText::new("whatsapp:+5551998644323", "Olá!").into();
/// let result = gateway
///     .send(&message, SendOptions { phone_fallback: true })
///     .await;
///
/// if let Some(number) = result.used_fallback_number() {
///     // Persist: this recipient lives under the eight-digit form.
///     println!("delivered to alternate format {number}");
/// }
/// ```
#[derive(Debug, Clone)]
pub struct MessagingGateway<P> {
    provider: P,
    matcher: InvalidNumberMatcher,
    fallback_country: Alpha2,
}

impl<P> MessagingGateway<P>
where
    P: MessagingProvider,
    P::Message: PhoneAddressed,
{
    /// Create a gateway with the default invalid-number matcher and Brazil
    /// as the fallback country.
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            matcher: InvalidNumberMatcher::default(),
            fallback_country: Alpha2::BR,
        }
    }

    /// Replace the invalid-number matcher.
    pub fn with_matcher(mut self, matcher: InvalidNumberMatcher) -> Self {
        self.matcher = matcher;
        self
    }

    /// Set the country whose denormalization rules produce the fallback
    /// number format.
    pub fn with_fallback_country(mut self, country: Alpha2) -> Self {
        self.fallback_country = country;
        self
    }

    /// The wrapped provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Deliver a message, retrying once with the alternate phone format
    /// when an invalid-number rejection allows it.
    ///
    /// Like provider sends, this never fails with an error: the outcome is
    /// always encoded in the returned [`GatewayResult`]. When the retry
    /// path ran, the result is the one from the *last* attempt, and
    /// [`GatewayResult::used_fallback_number`] carries the alternate number
    /// only if that attempt succeeded.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "MessagingGateway::send",
            skip_all,
            fields(
                to = %message.to(),
                phone_fallback = options.phone_fallback,
                fallback_to = tracing::field::Empty,
            )
        )
    )]
    pub async fn send(&self, message: &P::Message, options: SendOptions) -> GatewayResult {
        let result = self.provider.send(message).await;

        if result.succeeded() {
            #[cfg(feature = "tracing")]
            Span::current().set_status(Status::Ok);

            return GatewayResult::new(result, None);
        }

        if !options.phone_fallback || !self.matcher.matches(&result) {
            return GatewayResult::new(result, None);
        }

        let to = message.to();
        let Some(fallback_to) = denormalize_phone(to, self.fallback_country) else {
            return GatewayResult::new(result, None);
        };
        if fallback_to == to {
            return GatewayResult::new(result, None);
        }

        #[cfg(feature = "tracing")]
        {
            Span::current().record("fallback_to", fallback_to.as_str());
            info!(
                original = %to,
                fallback = %fallback_to,
                "invalid-number rejection, retrying with alternate phone format"
            );
        }

        let fallback_message = message.with_to(fallback_to.clone());
        let fallback_result = self.provider.send(&fallback_message).await;

        let used_fallback_number = if fallback_result.succeeded() {
            #[cfg(feature = "tracing")]
            Span::current().set_status(Status::Ok);

            Some(fallback_to)
        } else {
            None
        };

        GatewayResult::new(fallback_result, used_fallback_number)
    }

    /// Fetch the current delivery status from the wrapped provider.
    ///
    /// `None` means the provider has no status polling or does not know the
    /// message.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "MessagingGateway::fetch_status",
            skip_all,
            fields(external_id = %external_id)
        )
    )]
    pub async fn fetch_status(&self, external_id: &str) -> Option<DeliveryResult> {
        self.provider.fetch_status(external_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::mock::MockProvider;
    use crate::types::{DeliveryStatus, WhatsAppMessage, WhatsAppText};

    fn message(to: &str) -> WhatsAppMessage {
        WhatsAppText::new(to, "Hello!").into()
    }

    fn invalid_number_failure() -> DeliveryResult {
        DeliveryResult::fail("Twilio API error: Invalid 'To' Phone Number")
    }

    #[test]
    fn test_matcher_default_patterns() {
        let matcher = InvalidNumberMatcher::default();

        for text in [
            "Invalid number",
            "the recipient is NOT A VALID WHATSAPP user",
            "This number is not registered on WhatsApp",
            "recipient unregistered",
            "Invalid 'To' Phone Number: whatsapp:+5551998644323",
            "+5551998644323 is not a WhatsApp user",
        ] {
            assert!(
                matcher.matches(&DeliveryResult::fail(text)),
                "expected {text:?} to match"
            );
        }

        assert!(!matcher.matches(&DeliveryResult::fail("Rate limit exceeded")));
    }

    #[test]
    fn test_matcher_error_codes() {
        let matcher = InvalidNumberMatcher::default();

        assert!(matcher.matches(&DeliveryResult::fail_with_code(
            "The 'To' number is not a mobile number",
            "21614",
        )));
        assert!(!matcher.matches(&DeliveryResult::fail_with_code(
            "Queue overflow",
            "30001",
        )));
    }

    #[test]
    fn test_matcher_never_matches_successful_results() {
        let matcher = InvalidNumberMatcher::default();

        // Even a message that would match is ignored when delivery worked.
        let result = DeliveryResult::from_report(
            DeliveryStatus::Sent,
            Some("SM123".to_string()),
            Some("21211".to_string()),
            Some("invalid number".to_string()),
        );
        assert!(!matcher.matches(&result));
    }

    #[test]
    fn test_matcher_custom_patterns() {
        let matcher = InvalidNumberMatcher::new(["blocked by recipient"], Vec::<String>::new());

        assert!(matcher.matches(&DeliveryResult::fail("Blocked by recipient")));
        assert!(!matcher.matches(&DeliveryResult::fail("Invalid number")));
    }

    #[tokio::test]
    async fn test_fallback_retries_with_denormalized_number() {
        let provider = MockProvider::with_script([
            invalid_number_failure(),
            DeliveryResult::ok_with_id(DeliveryStatus::Sent, "SM_fallback"),
        ]);
        let gateway = MessagingGateway::new(provider.clone());

        let result = gateway
            .send(
                &message("whatsapp:+5551998644323"),
                SendOptions {
                    phone_fallback: true,
                },
            )
            .await;

        assert!(result.succeeded());
        assert_eq!(result.external_id(), Some("SM_fallback"));
        assert_eq!(
            result.used_fallback_number(),
            Some("whatsapp:+555198644323")
        );

        let sent = provider.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].message.to(), "whatsapp:+5551998644323");
        assert_eq!(sent[1].message.to(), "whatsapp:+555198644323");
    }

    #[tokio::test]
    async fn test_fallback_disabled_by_default() {
        let provider = MockProvider::with_fixed_result(invalid_number_failure());
        let gateway = MessagingGateway::new(provider.clone());

        let result = gateway
            .send(&message("whatsapp:+5551998644323"), SendOptions::default())
            .await;

        assert!(!result.succeeded());
        assert_eq!(result.used_fallback_number(), None);
        assert_eq!(provider.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_unrelated_failure_is_not_retried() {
        let provider = MockProvider::with_fixed_result(DeliveryResult::fail("Rate limit exceeded"));
        let gateway = MessagingGateway::new(provider.clone());

        let result = gateway
            .send(
                &message("whatsapp:+5551998644323"),
                SendOptions {
                    phone_fallback: true,
                },
            )
            .await;

        assert!(!result.succeeded());
        assert_eq!(result.error_message(), Some("Rate limit exceeded"));
        assert_eq!(provider.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_both_attempts_fail_returns_last_result() {
        let provider = MockProvider::with_script([
            DeliveryResult::fail_with_code("Invalid number", "21211"),
            DeliveryResult::fail("still an invalid number"),
        ]);
        let gateway = MessagingGateway::new(provider.clone());

        let result = gateway
            .send(
                &message("whatsapp:+5551998644323"),
                SendOptions {
                    phone_fallback: true,
                },
            )
            .await;

        assert!(!result.succeeded());
        assert_eq!(result.error_message(), Some("still an invalid number"));
        assert_eq!(result.used_fallback_number(), None);
        assert_eq!(provider.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_number_without_alternate_format_is_not_retried() {
        let provider = MockProvider::with_fixed_result(invalid_number_failure());
        let gateway = MessagingGateway::new(provider.clone());

        // A US number has no eight-digit form; denormalization is identity.
        let result = gateway
            .send(
                &message("whatsapp:+14155238886"),
                SendOptions {
                    phone_fallback: true,
                },
            )
            .await;

        assert!(!result.succeeded());
        assert_eq!(result.used_fallback_number(), None);
        assert_eq!(provider.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_eight_digit_number_is_not_retried() {
        let provider = MockProvider::with_fixed_result(invalid_number_failure());
        let gateway = MessagingGateway::new(provider.clone());

        // Already in the legacy form; its denormalization is itself.
        let result = gateway
            .send(
                &message("whatsapp:+555198644323"),
                SendOptions {
                    phone_fallback: true,
                },
            )
            .await;

        assert_eq!(result.used_fallback_number(), None);
        assert_eq!(provider.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_error_code_triggers_fallback() {
        let provider = MockProvider::with_script([
            DeliveryResult::fail_with_code("The 'To' number is not a mobile number", "21614"),
            DeliveryResult::ok_with_id(DeliveryStatus::Sent, "SM_2"),
        ]);
        let gateway = MessagingGateway::new(provider.clone());

        let result = gateway
            .send(
                &message("whatsapp:+5551998644323"),
                SendOptions {
                    phone_fallback: true,
                },
            )
            .await;

        assert!(result.succeeded());
        assert_eq!(provider.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_undelivered_fallback_keeps_number_unset() {
        let provider = MockProvider::with_script([
            invalid_number_failure(),
            DeliveryResult::from_report(
                DeliveryStatus::Undelivered,
                Some("SM_blocked".to_string()),
                None,
                Some("recipient blocked the sender".to_string()),
            ),
        ]);
        let gateway = MessagingGateway::new(provider.clone());

        let result = gateway
            .send(
                &message("whatsapp:+5551998644323"),
                SendOptions {
                    phone_fallback: true,
                },
            )
            .await;

        assert_eq!(result.status(), DeliveryStatus::Undelivered);
        assert_eq!(result.used_fallback_number(), None);
        assert_eq!(provider.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_successful_send_passes_through() {
        let provider = MockProvider::new();
        let gateway = MessagingGateway::new(provider.clone());

        let result = gateway
            .send(
                &message("whatsapp:+5551998644323"),
                SendOptions {
                    phone_fallback: true,
                },
            )
            .await;

        assert!(result.succeeded());
        assert_eq!(result.status(), DeliveryStatus::Sent);
        assert_eq!(result.used_fallback_number(), None);
        assert_eq!(provider.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_custom_matcher_controls_retry() {
        let provider = MockProvider::with_script([
            DeliveryResult::fail("delivery window closed"),
            DeliveryResult::ok_with_id(DeliveryStatus::Sent, "SM_retry"),
        ]);
        let matcher = InvalidNumberMatcher::new(["delivery window closed"], Vec::<String>::new());
        let gateway = MessagingGateway::new(provider.clone()).with_matcher(matcher);

        let result = gateway
            .send(
                &message("whatsapp:+5551998644323"),
                SendOptions {
                    phone_fallback: true,
                },
            )
            .await;

        assert!(result.succeeded());
        assert_eq!(provider.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_status_passes_through() {
        let provider: MockProvider<WhatsAppMessage> = MockProvider::new();
        let gateway = MessagingGateway::new(provider.clone());

        let sent = gateway
            .send(&message("whatsapp:+5551998644323"), SendOptions::default())
            .await;
        let external_id = sent.external_id().expect("mock assigns ids").to_string();

        let status = gateway.fetch_status(&external_id).await;
        assert_eq!(status.map(|r| r.status()), Some(DeliveryStatus::Sent));

        assert!(gateway.fetch_status("nonexistent").await.is_none());
    }
}
