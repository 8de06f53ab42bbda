//! Core types for message delivery operations.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};

// =============================================================================
// DeliveryStatus
// =============================================================================

/// Delivery lifecycle status of a message, normalized across providers.
///
/// Every provider maps its native status vocabulary onto this enum. The
/// variants carry a precedence so consumers can decide whether a status
/// update represents forward progress:
///
/// | Status | Precedence |
/// |--------|-----------|
/// | `Read` | 6 |
/// | `Delivered` | 5 |
/// | `Sent` | 4 |
/// | `Queued` | 1 |
/// | `Failed` | -1 |
/// | `Undelivered` | -2 |
///
/// # Example
///
/// ```rust
/// use messaging_gateway::DeliveryStatus;
///
/// let stored = DeliveryStatus::Sent;
/// let update = DeliveryStatus::Delivered;
/// assert!(update.supersedes(stored));
///
/// // A late "queued" callback never overwrites "delivered".
/// assert!(!DeliveryStatus::Queued.supersedes(DeliveryStatus::Delivered));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    /// Accepted by the provider, not yet handed to the network.
    Queued,
    /// Handed to the downstream network.
    Sent,
    /// Confirmed delivered to the recipient's device.
    Delivered,
    /// Read receipt received.
    Read,
    /// Rejected or errored before reaching the network.
    Failed,
    /// Accepted by the network but could not be delivered.
    Undelivered,
}

impl DeliveryStatus {
    /// Numeric precedence of this status. Higher values represent further
    /// progress through the delivery lifecycle; failures are negative.
    pub fn precedence(self) -> i8 {
        match self {
            Self::Queued => 1,
            Self::Sent => 4,
            Self::Delivered => 5,
            Self::Read => 6,
            Self::Failed => -1,
            Self::Undelivered => -2,
        }
    }

    /// Whether a transition from `other` to `self` is forward progress.
    pub fn supersedes(self, other: DeliveryStatus) -> bool {
        self.precedence() > other.precedence()
    }

    /// Whether the delivery lifecycle is settled: the message reached the
    /// recipient's device or conclusively failed. A read receipt may still
    /// follow [`Delivered`](Self::Delivered); `Queued` and `Sent` are the
    /// in-flight states worth polling on.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Delivered | Self::Read | Self::Failed | Self::Undelivered
        )
    }

    /// Canonical lowercase name of the status.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Sent => "sent",
            Self::Delivered => "delivered",
            Self::Read => "read",
            Self::Failed => "failed",
            Self::Undelivered => "undelivered",
        }
    }
}

impl Display for DeliveryStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// DeliveryResult
// =============================================================================

/// Outcome of a single delivery attempt.
///
/// Providers never fail with an error for a delivery problem; every outcome,
/// good or bad, is encoded in one of these. Construct results through the
/// factories: [`DeliveryResult::ok`] and friends for accepted submissions,
/// [`DeliveryResult::fail`] for failures, and [`DeliveryResult::from_report`]
/// when mapping a provider's native status payload.
///
/// # Example
///
/// ```rust
/// use messaging_gateway::{DeliveryResult, DeliveryStatus};
///
/// let sent = DeliveryResult::ok_with_id(DeliveryStatus::Sent, "SM123");
/// assert!(sent.succeeded());
/// assert_eq!(sent.external_id(), Some("SM123"));
///
/// let failed = DeliveryResult::fail_with_code("Invalid 'To' Phone Number", "21211");
/// assert!(!failed.succeeded());
/// assert_eq!(failed.error_code(), Some("21211"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryResult {
    status: DeliveryStatus,
    external_id: Option<String>,
    error_code: Option<String>,
    error_message: Option<String>,
}

impl DeliveryResult {
    /// Successful submission with the given status and no provider id.
    pub fn ok(status: DeliveryStatus) -> Self {
        Self {
            status,
            external_id: None,
            error_code: None,
            error_message: None,
        }
    }

    /// Successful submission with a provider-assigned message id.
    pub fn ok_with_id(status: DeliveryStatus, external_id: impl Into<String>) -> Self {
        Self {
            status,
            external_id: Some(external_id.into()),
            error_code: None,
            error_message: None,
        }
    }

    /// Failed delivery with an error message.
    pub fn fail(error_message: impl Into<String>) -> Self {
        Self {
            status: DeliveryStatus::Failed,
            external_id: None,
            error_code: None,
            error_message: Some(error_message.into()),
        }
    }

    /// Failed delivery with a provider error code and message.
    pub fn fail_with_code(error_message: impl Into<String>, error_code: impl Into<String>) -> Self {
        Self {
            status: DeliveryStatus::Failed,
            external_id: None,
            error_code: Some(error_code.into()),
            error_message: Some(error_message.into()),
        }
    }

    /// Assemble a result from a provider's native status report.
    ///
    /// Used by provider adapters when a wire payload carries status, id and
    /// error fields together (e.g. a polled message resource). Prefer the
    /// `ok`/`fail` factories everywhere else.
    pub fn from_report(
        status: DeliveryStatus,
        external_id: Option<String>,
        error_code: Option<String>,
        error_message: Option<String>,
    ) -> Self {
        Self {
            status,
            external_id,
            error_code,
            error_message,
        }
    }

    /// Delivery status of this attempt.
    pub fn status(&self) -> DeliveryStatus {
        self.status
    }

    /// True unless the status is `Failed` or `Undelivered`.
    pub fn succeeded(&self) -> bool {
        !matches!(
            self.status,
            DeliveryStatus::Failed | DeliveryStatus::Undelivered
        )
    }

    /// Provider-assigned message id, when one was issued.
    pub fn external_id(&self) -> Option<&str> {
        self.external_id.as_deref()
    }

    /// Provider error code, when the provider reported one.
    pub fn error_code(&self) -> Option<&str> {
        self.error_code.as_deref()
    }

    /// Human-readable error description, when the provider reported one.
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }
}

// =============================================================================
// GatewayResult
// =============================================================================

/// Outcome of a gateway send, wrapping the final [`DeliveryResult`].
///
/// When the gateway retried with an alternate phone encoding and that retry
/// succeeded, [`used_fallback_number`](GatewayResult::used_fallback_number)
/// carries the encoding that worked so callers can persist it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayResult {
    delivery: DeliveryResult,
    used_fallback_number: Option<String>,
}

impl GatewayResult {
    pub(crate) fn new(delivery: DeliveryResult, used_fallback_number: Option<String>) -> Self {
        Self {
            delivery,
            used_fallback_number,
        }
    }

    /// The delivery result of the last attempt.
    pub fn delivery(&self) -> &DeliveryResult {
        &self.delivery
    }

    /// The alternate phone encoding that succeeded, if a fallback was used.
    pub fn used_fallback_number(&self) -> Option<&str> {
        self.used_fallback_number.as_deref()
    }

    /// True unless the final status is `Failed` or `Undelivered`.
    pub fn succeeded(&self) -> bool {
        self.delivery.succeeded()
    }

    /// Delivery status of the last attempt.
    pub fn status(&self) -> DeliveryStatus {
        self.delivery.status()
    }

    /// Provider-assigned message id of the last attempt.
    pub fn external_id(&self) -> Option<&str> {
        self.delivery.external_id()
    }

    /// Provider error code of the last attempt.
    pub fn error_code(&self) -> Option<&str> {
        self.delivery.error_code()
    }

    /// Human-readable error description of the last attempt.
    pub fn error_message(&self) -> Option<&str> {
        self.delivery.error_message()
    }

    /// Unwrap into the inner [`DeliveryResult`].
    pub fn into_delivery(self) -> DeliveryResult {
        self.delivery
    }
}

// =============================================================================
// PhoneAddressed
// =============================================================================

/// Messages addressed to a phone number (WhatsApp, SMS).
///
/// The gateway's fallback retry rewrites the destination of a message; this
/// trait is what makes that rewrite possible. E-mail and chat-bot messages
/// deliberately do not implement it, which keeps phone fallback
/// unrepresentable for those channels.
pub trait PhoneAddressed {
    /// Destination phone number (possibly `whatsapp:`-prefixed).
    fn to(&self) -> &str;

    /// Copy of the message with a different destination.
    fn with_to(&self, to: impl Into<String>) -> Self;
}

// =============================================================================
// WhatsApp messages
// =============================================================================

/// Plain-text WhatsApp message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhatsAppText {
    /// Destination, e.g. `whatsapp:+5511999999999`.
    pub to: String,
    /// Message body.
    pub body: String,
}

impl WhatsAppText {
    /// Create a new text message.
    pub fn new(to: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            body: body.into(),
        }
    }
}

/// WhatsApp message carrying one or more media attachments.
///
/// `media_types` and `media_filenames` are parallel to `media_urls`; missing
/// entries fall back to provider defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhatsAppMedia {
    /// Destination, e.g. `whatsapp:+5511999999999`.
    pub to: String,
    /// Publicly fetchable media URLs.
    pub media_urls: Vec<String>,
    /// MIME types parallel to `media_urls`.
    pub media_types: Vec<String>,
    /// Filenames parallel to `media_urls`.
    pub media_filenames: Vec<String>,
    /// Optional caption for the attachment(s).
    pub caption: Option<String>,
}

impl WhatsAppMedia {
    /// Create a media message with no caption and default MIME handling.
    pub fn new(to: impl Into<String>, media_urls: Vec<String>) -> Self {
        Self {
            to: to.into(),
            media_urls,
            media_types: Vec::new(),
            media_filenames: Vec::new(),
            caption: None,
        }
    }

    /// Set the caption.
    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    /// Set the MIME types, parallel to the media URLs.
    pub fn with_media_types(mut self, media_types: Vec<String>) -> Self {
        self.media_types = media_types;
        self
    }

    /// Set the filenames, parallel to the media URLs.
    pub fn with_media_filenames(mut self, media_filenames: Vec<String>) -> Self {
        self.media_filenames = media_filenames;
        self
    }
}

/// WhatsApp template message in Twilio Content API format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhatsAppTemplate {
    /// Destination, e.g. `whatsapp:+5511999999999`.
    pub to: String,
    /// Twilio content template SID (`HX...`).
    pub content_sid: String,
    /// Template variable substitutions, keyed by placeholder index.
    pub content_variables: HashMap<String, String>,
}

impl WhatsAppTemplate {
    /// Create a template message with no variable substitutions.
    pub fn new(to: impl Into<String>, content_sid: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            content_sid: content_sid.into(),
            content_variables: HashMap::new(),
        }
    }

    /// Set the template variable substitutions, keyed by placeholder index.
    pub fn with_variables(mut self, content_variables: HashMap<String, String>) -> Self {
        self.content_variables = content_variables;
        self
    }
}

/// WhatsApp template message in Meta Cloud API format.
///
/// Meta templates are addressed by name and language rather than by a
/// content SID, so they are a distinct type from [`WhatsAppTemplate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaWhatsAppTemplate {
    /// Destination, e.g. `whatsapp:+5511999999999`.
    pub to: String,
    /// Approved template name.
    pub template_name: String,
    /// Template language code, e.g. `pt_BR`.
    pub language_code: String,
    /// Template components in Meta's JSON shape (header/body/buttons).
    pub components: Vec<serde_json::Value>,
}

impl MetaWhatsAppTemplate {
    /// Create a Meta-format template message with no components.
    pub fn new(
        to: impl Into<String>,
        template_name: impl Into<String>,
        language_code: impl Into<String>,
    ) -> Self {
        Self {
            to: to.into(),
            template_name: template_name.into(),
            language_code: language_code.into(),
            components: Vec::new(),
        }
    }

    /// Set the template components.
    pub fn with_components(mut self, components: Vec<serde_json::Value>) -> Self {
        self.components = components;
        self
    }
}

/// Any message deliverable over a WhatsApp channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WhatsAppMessage {
    /// Plain text.
    Text(WhatsAppText),
    /// Media attachment(s).
    Media(WhatsAppMedia),
    /// Twilio Content API template.
    Template(WhatsAppTemplate),
    /// Meta Cloud API template.
    MetaTemplate(MetaWhatsAppTemplate),
}

impl PhoneAddressed for WhatsAppMessage {
    fn to(&self) -> &str {
        match self {
            Self::Text(m) => &m.to,
            Self::Media(m) => &m.to,
            Self::Template(m) => &m.to,
            Self::MetaTemplate(m) => &m.to,
        }
    }

    fn with_to(&self, to: impl Into<String>) -> Self {
        let to = to.into();
        match self {
            Self::Text(m) => Self::Text(WhatsAppText { to, ..m.clone() }),
            Self::Media(m) => Self::Media(WhatsAppMedia { to, ..m.clone() }),
            Self::Template(m) => Self::Template(WhatsAppTemplate { to, ..m.clone() }),
            Self::MetaTemplate(m) => Self::MetaTemplate(MetaWhatsAppTemplate { to, ..m.clone() }),
        }
    }
}

impl From<WhatsAppText> for WhatsAppMessage {
    fn from(m: WhatsAppText) -> Self {
        Self::Text(m)
    }
}

impl From<WhatsAppMedia> for WhatsAppMessage {
    fn from(m: WhatsAppMedia) -> Self {
        Self::Media(m)
    }
}

impl From<WhatsAppTemplate> for WhatsAppMessage {
    fn from(m: WhatsAppTemplate) -> Self {
        Self::Template(m)
    }
}

impl From<MetaWhatsAppTemplate> for WhatsAppMessage {
    fn from(m: MetaWhatsAppTemplate) -> Self {
        Self::MetaTemplate(m)
    }
}

// =============================================================================
// SmsMessage
// =============================================================================

/// Plain SMS message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmsMessage {
    /// Destination in E.164 format, e.g. `+5511999999999`.
    pub to: String,
    /// Message body.
    pub body: String,
}

impl SmsMessage {
    /// Create a new SMS message.
    pub fn new(to: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            body: body.into(),
        }
    }
}

impl PhoneAddressed for SmsMessage {
    fn to(&self) -> &str {
        &self.to
    }

    fn with_to(&self, to: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            body: self.body.clone(),
        }
    }
}

// =============================================================================
// EmailMessage
// =============================================================================

/// HTML e-mail message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    /// Recipient address.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// HTML body.
    pub html_content: String,
    /// Sender address.
    pub from_email: String,
    /// Optional sender display name.
    pub from_name: Option<String>,
}

impl EmailMessage {
    /// Create an e-mail message with no sender display name.
    pub fn new(
        to: impl Into<String>,
        subject: impl Into<String>,
        html_content: impl Into<String>,
        from_email: impl Into<String>,
    ) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            html_content: html_content.into(),
            from_email: from_email.into(),
            from_name: None,
        }
    }

    /// Set the sender display name.
    pub fn with_from_name(mut self, from_name: impl Into<String>) -> Self {
        self.from_name = Some(from_name.into());
        self
    }
}

// =============================================================================
// Telegram messages
// =============================================================================

/// Telegram chat identifier: a numeric chat id or a `@channelname`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatId {
    /// Numeric chat id.
    Id(i64),
    /// Channel or group username.
    Username(String),
}

impl Display for ChatId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Username(name) => write!(f, "{name}"),
        }
    }
}

impl From<i64> for ChatId {
    fn from(id: i64) -> Self {
        Self::Id(id)
    }
}

impl From<String> for ChatId {
    fn from(name: String) -> Self {
        Self::Username(name)
    }
}

impl From<&str> for ChatId {
    fn from(name: &str) -> Self {
        Self::Username(name.to_string())
    }
}

/// Text formatting mode for Telegram messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParseMode {
    /// Telegram MarkdownV2 formatting.
    #[serde(rename = "MarkdownV2")]
    MarkdownV2,
    /// HTML formatting.
    #[serde(rename = "HTML")]
    Html,
    /// Legacy Markdown formatting.
    #[serde(rename = "Markdown")]
    Markdown,
}

impl ParseMode {
    /// Wire value expected by the Bot API.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MarkdownV2 => "MarkdownV2",
            Self::Html => "HTML",
            Self::Markdown => "Markdown",
        }
    }
}

impl Display for ParseMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Plain-text Telegram message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelegramText {
    /// Destination chat.
    pub chat_id: ChatId,
    /// Message body.
    pub body: String,
    /// Optional formatting mode.
    pub parse_mode: Option<ParseMode>,
}

impl TelegramText {
    /// Create a plain-text message with no formatting.
    pub fn new(chat_id: impl Into<ChatId>, body: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            body: body.into(),
            parse_mode: None,
        }
    }

    /// Set the formatting mode.
    pub fn with_parse_mode(mut self, parse_mode: ParseMode) -> Self {
        self.parse_mode = Some(parse_mode);
        self
    }
}

/// Kind of media attached to a Telegram message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TelegramMediaType {
    /// Image sent via `sendPhoto`.
    Photo,
    /// File sent via `sendDocument`.
    Document,
    /// Video sent via `sendVideo`.
    Video,
}

impl TelegramMediaType {
    /// Bot API method used to send this media kind.
    pub fn endpoint(self) -> &'static str {
        match self {
            Self::Photo => "sendPhoto",
            Self::Document => "sendDocument",
            Self::Video => "sendVideo",
        }
    }

    /// JSON field name carrying the media URL for this kind.
    pub fn field_name(self) -> &'static str {
        match self {
            Self::Photo => "photo",
            Self::Document => "document",
            Self::Video => "video",
        }
    }
}

/// Telegram message carrying a single media attachment by URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelegramMedia {
    /// Destination chat.
    pub chat_id: ChatId,
    /// Publicly fetchable media URL.
    pub media_url: String,
    /// Kind of media, selecting the Bot API method.
    pub media_type: TelegramMediaType,
    /// Optional caption.
    pub caption: Option<String>,
    /// Optional formatting mode for the caption.
    pub parse_mode: Option<ParseMode>,
}

impl TelegramMedia {
    /// Create a media message with no caption.
    pub fn new(
        chat_id: impl Into<ChatId>,
        media_url: impl Into<String>,
        media_type: TelegramMediaType,
    ) -> Self {
        Self {
            chat_id: chat_id.into(),
            media_url: media_url.into(),
            media_type,
            caption: None,
            parse_mode: None,
        }
    }

    /// Set the caption.
    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    /// Set the formatting mode for the caption.
    pub fn with_parse_mode(mut self, parse_mode: ParseMode) -> Self {
        self.parse_mode = Some(parse_mode);
        self
    }
}

/// Any message deliverable over the Telegram channel.
///
/// Telegram messages address a chat id rather than a phone number, so they
/// are a separate family from the WhatsApp/SMS types and do not take part
/// in phone fallback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TelegramMessage {
    /// Plain text.
    Text(TelegramText),
    /// Single media attachment.
    Media(TelegramMedia),
}

impl From<TelegramText> for TelegramMessage {
    fn from(m: TelegramText) -> Self {
        Self::Text(m)
    }
}

impl From<TelegramMedia> for TelegramMessage {
    fn from(m: TelegramMedia) -> Self {
        Self::Media(m)
    }
}
