//! Twilio Content API client for WhatsApp template management.
//!
//! Template CRUD is a management concern, not delivery: operations here
//! return `Result` and fail loudly, unlike
//! [`TwilioWhatsAppProvider`](super::TwilioWhatsAppProvider) sends which
//! always produce a [`DeliveryResult`](crate::DeliveryResult).

use super::types::TwilioConfig;
use crate::errors::ConfigError;
use crate::providers::util::default_http_client;
use reqwest::StatusCode;
use reqwest_middleware::ClientWithMiddleware;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use url::Url;

#[cfg(feature = "tracing")]
use tracing::{error, warn};

/// Default Twilio Content API URL.
pub const DEFAULT_CONTENT_API_URL: &str = "https://content.twilio.com";

/// Maximum buttons WhatsApp allows on a quick-reply template; extra
/// buttons are dropped.
pub const MAX_QUICK_REPLY_BUTTONS: usize = 3;

/// Content types WhatsApp refuses to approve.
const WHATSAPP_UNSUPPORTED_TYPES: [&str; 1] = ["twilio/list-picker"];

/// Error code reported when a template uses types WhatsApp cannot approve.
const UNSUPPORTED_TYPES_CODE: &str = "92004";

/// Errors from Twilio Content API operations.
#[derive(Debug, Error)]
pub enum ContentApiError {
    /// The API rejected the request.
    #[error("Twilio Content API error (HTTP {status}): {message}")]
    Api {
        message: String,
        status: u16,
        code: Option<String>,
    },
    /// The request never completed.
    #[error("failed to call Twilio Content API: {0}")]
    HttpRequest(#[from] reqwest_middleware::Error),
    /// The response body could not be read.
    #[error("failed to read Twilio Content API response: {0}")]
    ReadResponse(#[source] reqwest::Error),
    /// The response body was not the expected JSON.
    #[error("failed to parse Twilio Content API response: {0}")]
    ParseResponse(#[source] serde_json::Error),
    /// A request URL could not be built.
    #[error("invalid Twilio Content API request URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Result type for Content API operations.
pub type Result<T> = std::result::Result<T, ContentApiError>;

// ============================================================================
// Models
// ============================================================================

/// A content template as the API returns it, with any WhatsApp approval
/// metadata folded into the flat fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentTemplate {
    /// Content SID (`HX...`).
    pub sid: String,
    /// Friendly name.
    pub friendly_name: String,
    /// Template language.
    pub language: Option<String>,
    /// Content type definitions, keyed by API type name.
    pub types: Option<Value>,
    /// Variable examples, keyed by placeholder index.
    pub variables: Option<Value>,
    /// WhatsApp approval status, when known.
    pub approval_status: Option<String>,
    /// WhatsApp template name, when submitted for approval.
    pub template_name: Option<String>,
    /// Rejection reason, when WhatsApp rejected the template.
    pub rejection_reason: Option<String>,
}

/// Approval status snapshot for one template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateStatus {
    pub sid: Option<String>,
    pub friendly_name: Option<String>,
    pub status: Option<String>,
    pub template_name: Option<String>,
    pub rejection_reason: Option<String>,
}

/// One button on a quick-reply template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickReplyButton {
    /// Payload id returned when the recipient taps the button.
    pub id: String,
    /// Button label.
    pub title: String,
}

impl QuickReplyButton {
    /// Create a button.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }
}

/// Request payload for [`TwilioContentApi::create_template`].
#[derive(Debug, Clone)]
pub struct CreateTemplateRequest {
    /// Friendly name for the template.
    pub friendly_name: String,
    /// Template language, e.g. `en` or `pt_BR`.
    pub language: String,
    /// Content type definitions keyed by type name. Underscore keys
    /// (`twilio_text`) are accepted and normalized to API form
    /// (`twilio/text`).
    pub types: serde_json::Map<String, Value>,
    /// Variable examples. A `{"placeholders": [{"index": .., "example": ..}]}`
    /// shape is converted to the API's `{"1": "example"}` form.
    pub variables: Option<Value>,
    /// WhatsApp template category (MARKETING, UTILITY, AUTHENTICATION).
    pub category: Option<String>,
    /// Submit for WhatsApp approval under this template name.
    pub whatsapp_template_name: Option<String>,
    /// Delete this existing content SID first (template replacement).
    pub replace_sid: Option<String>,
}

impl CreateTemplateRequest {
    /// Create a request with no variables, category or approval submission.
    pub fn new(
        friendly_name: impl Into<String>,
        language: impl Into<String>,
        types: serde_json::Map<String, Value>,
    ) -> Self {
        Self {
            friendly_name: friendly_name.into(),
            language: language.into(),
            types,
            variables: None,
            category: None,
            whatsapp_template_name: None,
            replace_sid: None,
        }
    }

    /// Set the variable examples.
    pub fn with_variables(mut self, variables: Value) -> Self {
        self.variables = Some(variables);
        self
    }

    /// Set the WhatsApp template category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Submit the template for WhatsApp approval under `name`.
    pub fn with_whatsapp_approval(mut self, name: impl Into<String>) -> Self {
        self.whatsapp_template_name = Some(name.into());
        self
    }

    /// Delete the template with this SID before creating the new one.
    pub fn replacing(mut self, sid: impl Into<String>) -> Self {
        self.replace_sid = Some(sid.into());
        self
    }
}

// ============================================================================
// Payload helpers
// ============================================================================

/// Normalizes internal type keys to Twilio's slash-delimited names,
/// e.g. `twilio_text` to `twilio/text`.
fn normalize_type_key(key: &str) -> String {
    match key {
        "twilio_text" => "twilio/text".to_string(),
        "twilio_quick_reply" => "twilio/quick-reply".to_string(),
        "twilio_list_picker" => "twilio/list-picker".to_string(),
        "twilio_call_to_action" => "twilio/call-to-action".to_string(),
        "twilio_card" => "twilio/card".to_string(),
        "twilio_catalog" => "twilio/catalog".to_string(),
        "twilio_carousel" => "twilio/carousel".to_string(),
        "twilio_location" => "twilio/location".to_string(),
        "twilio_media" => "twilio/media".to_string(),
        "twilio_schedule" => "twilio/schedule".to_string(),
        "whatsapp_card" => "whatsapp/card".to_string(),
        "whatsapp_authentication" => "whatsapp/authentication".to_string(),
        "whatsapp_flows" => "whatsapp/flows".to_string(),
        _ if key.contains('/') => key.to_string(),
        _ => key.replace('_', "/"),
    }
}

fn normalize_types(types: &serde_json::Map<String, Value>) -> serde_json::Map<String, Value> {
    types
        .iter()
        .map(|(key, value)| (normalize_type_key(key), value.clone()))
        .collect()
}

/// Converts a `{"placeholders": [{"index": .., "example": ..}]}` variables
/// shape to the API's `{"1": "example"}` form; anything else passes through.
fn convert_variables(variables: &Value) -> Value {
    let Some(placeholders) = variables.get("placeholders").and_then(Value::as_array) else {
        return variables.clone();
    };

    let mut converted = serde_json::Map::new();
    for placeholder in placeholders {
        let Some(index) = placeholder.get("index") else {
            continue;
        };
        let key = match index {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let example = placeholder
            .get("example")
            .cloned()
            .unwrap_or(Value::String(String::new()));
        converted.insert(key, example);
    }
    Value::Object(converted)
}

#[derive(Debug, Deserialize)]
struct ContentPayload {
    #[serde(default)]
    sid: String,
    #[serde(default)]
    friendly_name: String,
    language: Option<String>,
    types: Option<Value>,
    variables: Option<Value>,
    status: Option<String>,
    template_name: Option<String>,
    rejection_reason: Option<String>,
    approval_requests: Option<Value>,
}

impl ContentPayload {
    fn into_template(self) -> ContentTemplate {
        let approval = self.approval_requests.as_ref().and_then(Value::as_object);
        let approval_field = |key: &str| {
            approval
                .and_then(|a| a.get(key))
                .and_then(Value::as_str)
                .map(str::to_owned)
        };

        ContentTemplate {
            approval_status: self.status.or_else(|| approval_field("status")),
            template_name: self.template_name.or_else(|| approval_field("name")),
            rejection_reason: self.rejection_reason.or_else(|| approval_field("rejection_reason")),
            sid: self.sid,
            friendly_name: self.friendly_name,
            language: self.language,
            types: self.types,
            variables: self.variables,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ContentListPayload {
    #[serde(default)]
    contents: Vec<ContentPayload>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorPayload {
    code: Option<i64>,
    message: Option<String>,
    detail: Option<String>,
}

fn api_error(status: StatusCode, body: &str, fallback: &str) -> ContentApiError {
    let payload: ApiErrorPayload = serde_json::from_str(body).unwrap_or(ApiErrorPayload {
        code: None,
        message: None,
        detail: None,
    });

    ContentApiError::Api {
        message: payload
            .message
            .or(payload.detail)
            .unwrap_or_else(|| fallback.to_string()),
        status: status.as_u16(),
        code: payload.code.map(|code| code.to_string()),
    }
}

fn random_suffix() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    format!("{nanos:x}")
}

// ============================================================================
// Client
// ============================================================================

/// Twilio Content API client for managing WhatsApp message templates.
///
/// Covers creation, approval submission, status polling and listing. It
/// does not deliver messages; sending an approved template is
/// [`WhatsAppTemplate`](crate::WhatsAppTemplate) +
/// [`TwilioWhatsAppProvider`](super::TwilioWhatsAppProvider).
///
/// # Example
///
/// ```rust,ignore
/// use messaging_gateway::{CreateTemplateRequest, TwilioConfig, TwilioContentApi};
/// use serde_json::json;
///
/// let api = TwilioContentApi::new(TwilioConfig::new(
///     "AC...",
///     "auth_token",
///     "whatsapp:+14155238886",
/// ))?;
///
/// let mut types = serde_json::Map::new();
/// types.insert("twilio_text".into(), json!({"body": "Your order {{1}} is {{2}}."}));
///
/// let template = api
///     .create_template(
///         CreateTemplateRequest::new("order_update", "en", types)
///             .with_whatsapp_approval("order_update")
///             .with_category("UTILITY"),
///     )
///     .await?;
/// println!("created {}", template.sid);
/// ```
#[derive(Clone)]
pub struct TwilioContentApi {
    http_client: ClientWithMiddleware,
    account_sid: String,
    auth_token: SecretString,
    endpoint: Url,
}

impl std::fmt::Debug for TwilioContentApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwilioContentApi")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"[REDACTED]")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl TwilioContentApi {
    /// Create a client from `config`. The config's endpoint override, when
    /// set, replaces the Content API base URL.
    pub fn new(config: TwilioConfig) -> std::result::Result<Self, ConfigError> {
        Self::with_client(config, None)
    }

    /// Create a client that reuses a caller-supplied HTTP client.
    pub fn with_http_client(
        config: TwilioConfig,
        http_client: ClientWithMiddleware,
    ) -> std::result::Result<Self, ConfigError> {
        Self::with_client(config, Some(http_client))
    }

    fn with_client(
        config: TwilioConfig,
        http_client: Option<ClientWithMiddleware>,
    ) -> std::result::Result<Self, ConfigError> {
        if config.account_sid.is_empty() {
            return Err(ConfigError::MissingField("account_sid"));
        }

        let endpoint = config.endpoint.unwrap_or_else(|| {
            Url::parse(DEFAULT_CONTENT_API_URL).expect("Invalid default URL")
        });

        let http_client = match http_client {
            Some(client) => client,
            None => default_http_client(config.timeout)?,
        };

        Ok(Self {
            http_client,
            account_sid: config.account_sid,
            auth_token: config.auth_token,
            endpoint,
        })
    }

    async fn read_response(
        &self,
        response: reqwest::Response,
        fallback: &str,
    ) -> Result<Value> {
        let status = response.status();
        let body = response.text().await.map_err(ContentApiError::ReadResponse)?;

        if !status.is_success() {
            #[cfg(feature = "tracing")]
            error!(status = status.as_u16(), body = %body, "Twilio Content API error response");

            return Err(api_error(status, &body, fallback));
        }

        if body.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(ContentApiError::ParseResponse)
    }

    async fn post_json(&self, path: &str, payload: &Value, fallback: &str) -> Result<Value> {
        let url = self.endpoint.join(path)?;
        let response = self
            .http_client
            .post(url)
            .basic_auth(&self.account_sid, Some(self.auth_token.expose_secret()))
            .json(payload)
            .send()
            .await?;

        self.read_response(response, fallback).await
    }

    async fn delete_content(&self, sid: &str) -> Result<()> {
        let url = self.endpoint.join(&format!("/v1/Content/{sid}"))?;
        let response = self
            .http_client
            .delete(url)
            .basic_auth(&self.account_sid, Some(self.auth_token.expose_secret()))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.map_err(ContentApiError::ReadResponse)?;
            return Err(api_error(status, &body, "Failed to delete template"));
        }
        Ok(())
    }

    /// Create a content template, optionally replacing an existing one and
    /// optionally submitting it for WhatsApp approval.
    ///
    /// Replacement deletion is best effort: a failure to delete the old
    /// template does not abort creation.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "TwilioContentApi::create_template",
            skip_all,
            fields(friendly_name = %request.friendly_name)
        )
    )]
    pub async fn create_template(&self, request: CreateTemplateRequest) -> Result<ContentTemplate> {
        if let Some(sid) = &request.replace_sid {
            if let Err(_err) = self.delete_content(sid).await {
                #[cfg(feature = "tracing")]
                warn!(sid = %sid, error = %_err, "could not delete template being replaced");
            }
        }

        let types = normalize_types(&request.types);

        let mut payload = json!({
            "friendly_name": request.friendly_name,
            "language": request.language,
            "types": types,
        });
        if let Some(variables) = &request.variables {
            payload["variables"] = convert_variables(variables);
        }

        let created = self
            .post_json("/v1/Content", &payload, "Twilio Content API request failed")
            .await?;
        let content: ContentPayload =
            serde_json::from_value(created).map_err(ContentApiError::ParseResponse)?;
        let template = content.into_template();

        if template.sid.is_empty() {
            return Ok(template);
        }

        if let Some(name) = &request.whatsapp_template_name {
            let mut unsupported: Vec<&str> = types
                .keys()
                .map(String::as_str)
                .filter(|key| WHATSAPP_UNSUPPORTED_TYPES.contains(key))
                .collect();
            unsupported.sort_unstable();

            if !unsupported.is_empty() {
                return Err(ContentApiError::Api {
                    message: format!(
                        "WhatsApp approvals do not support the configured content types: {}",
                        unsupported.join(", ")
                    ),
                    status: 400,
                    code: Some(UNSUPPORTED_TYPES_CODE.to_string()),
                });
            }

            let mut approval = json!({ "name": name });
            if let Some(category) = &request.category {
                approval["category"] = json!(category);
            }

            self.post_json(
                &format!("/v1/Content/{}/ApprovalRequests/whatsapp", template.sid),
                &approval,
                "Failed to submit template for approval",
            )
            .await?;
        }

        Ok(template)
    }

    /// Fetch the latest status snapshot for a template.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "TwilioContentApi::get_template_status",
            skip_all,
            fields(sid = %template_sid)
        )
    )]
    pub async fn get_template_status(&self, template_sid: &str) -> Result<TemplateStatus> {
        let url = self.endpoint.join(&format!("/v1/Content/{template_sid}"))?;
        let response = self
            .http_client
            .get(url)
            .basic_auth(&self.account_sid, Some(self.auth_token.expose_secret()))
            .send()
            .await?;

        let payload = self
            .read_response(response, "Failed to fetch template status")
            .await?;

        let field = |keys: &[&str]| {
            keys.iter()
                .find_map(|key| payload.get(key))
                .and_then(Value::as_str)
                .map(str::to_owned)
        };

        Ok(TemplateStatus {
            sid: field(&["sid"]),
            friendly_name: field(&["friendly_name"]),
            status: field(&["approval_status", "status"]),
            template_name: field(&["template_name", "whatsapp_template_name"]),
            rejection_reason: field(&["rejection_reason"]),
        })
    }

    /// List all content templates together with their approval metadata.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "TwilioContentApi::list_templates", skip_all)
    )]
    pub async fn list_templates(&self, page_size: usize) -> Result<Vec<ContentTemplate>> {
        let url = self.endpoint.join("/v1/ContentAndApprovals")?;
        let response = self
            .http_client
            .get(url)
            .query(&[("PageSize", page_size.to_string())])
            .basic_auth(&self.account_sid, Some(self.auth_token.expose_secret()))
            .send()
            .await?;

        let payload = self
            .read_response(response, "Failed to list templates")
            .await?;
        let list: ContentListPayload =
            serde_json::from_value(payload).map_err(ContentApiError::ParseResponse)?;

        Ok(list
            .contents
            .into_iter()
            .map(ContentPayload::into_template)
            .collect())
    }

    /// Create a quick-reply template for session messages.
    ///
    /// Session templates need no WhatsApp approval, so the result is usable
    /// immediately within a 24-hour conversation window. At most
    /// [`MAX_QUICK_REPLY_BUTTONS`] buttons are kept. A header, when given,
    /// also produces a plain-text fallback rendering of the message.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "TwilioContentApi::create_quick_reply", skip_all)
    )]
    pub async fn create_quick_reply(
        &self,
        body: &str,
        buttons: &[QuickReplyButton],
        header: Option<&str>,
    ) -> Result<ContentTemplate> {
        let actions: Vec<Value> = buttons
            .iter()
            .take(MAX_QUICK_REPLY_BUTTONS)
            .map(|button| json!({ "id": button.id, "title": button.title }))
            .collect();

        let mut types = serde_json::Map::new();
        types.insert(
            "twilio/quick-reply".to_string(),
            json!({ "body": body, "actions": actions }),
        );
        if let Some(header) = header {
            types.insert(
                "twilio/text".to_string(),
                json!({ "body": format!("*{header}*\n\n{body}") }),
            );
        }

        let friendly_name = format!("quick_reply_{}", random_suffix());
        let payload = json!({
            "friendly_name": friendly_name,
            "language": "en",
            "types": normalize_types(&types),
        });

        let created = self
            .post_json(
                "/v1/Content",
                &payload,
                "Failed to create quick-reply content",
            )
            .await?;
        let content: ContentPayload =
            serde_json::from_value(created).map_err(ContentApiError::ParseResponse)?;

        Ok(content.into_template())
    }
}
