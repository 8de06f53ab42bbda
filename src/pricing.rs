//! WhatsApp template message pricing.
//!
//! Per-message costs for template messages by category, based on Meta's
//! Business API rates for Brazil (the default market). Prices are
//! expressed in micro-USD (1 USD = 1 000 000) so arithmetic stays exact.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

/// Price applied when the category is missing or unrecognized (utility
/// pricing).
pub const DEFAULT_TEMPLATE_PRICE_MICRO_USD: u32 = 20_000;

/// WhatsApp template category, as used in approval submissions and billing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TemplateCategory {
    /// Promotional content.
    Marketing,
    /// Transactional updates about an existing order or account.
    Utility,
    /// One-time passcodes.
    Authentication,
}

impl TemplateCategory {
    /// Per-message price in micro-USD.
    pub fn price_micro_usd(self) -> u32 {
        match self {
            Self::Marketing => 60_000,
            Self::Utility => 20_000,
            Self::Authentication => 15_000,
        }
    }

    /// Wire value expected by the approval API.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Marketing => "MARKETING",
            Self::Utility => "UTILITY",
            Self::Authentication => "AUTHENTICATION",
        }
    }
}

impl Display for TemplateCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when parsing an unrecognized category name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown template category: {0}")]
pub struct UnknownTemplateCategory(String);

impl FromStr for TemplateCategory {
    type Err = UnknownTemplateCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("MARKETING") {
            Ok(Self::Marketing)
        } else if s.eq_ignore_ascii_case("UTILITY") {
            Ok(Self::Utility)
        } else if s.eq_ignore_ascii_case("AUTHENTICATION") {
            Ok(Self::Authentication)
        } else {
            Err(UnknownTemplateCategory(s.to_string()))
        }
    }
}

/// Price for one template message in micro-USD.
///
/// Tolerant of missing or unrecognized categories the way they arrive in
/// billing data: anything unknown is charged at utility pricing.
pub fn template_price_micro_usd(category: Option<&str>) -> u32 {
    category
        .and_then(|value| value.parse::<TemplateCategory>().ok())
        .map_or(
            DEFAULT_TEMPLATE_PRICE_MICRO_USD,
            TemplateCategory::price_micro_usd,
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_prices() {
        assert_eq!(template_price_micro_usd(Some("MARKETING")), 60_000);
        assert_eq!(template_price_micro_usd(Some("UTILITY")), 20_000);
        assert_eq!(template_price_micro_usd(Some("AUTHENTICATION")), 15_000);
    }

    #[test]
    fn test_none_defaults_to_utility() {
        assert_eq!(template_price_micro_usd(None), 20_000);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(template_price_micro_usd(Some("marketing")), 60_000);
        assert_eq!(template_price_micro_usd(Some("Marketing")), 60_000);
    }

    #[test]
    fn test_unknown_defaults_to_utility() {
        assert_eq!(
            template_price_micro_usd(Some("UNKNOWN")),
            DEFAULT_TEMPLATE_PRICE_MICRO_USD
        );
    }

    #[test]
    fn test_parse() {
        assert_eq!(
            "authentication".parse::<TemplateCategory>().unwrap(),
            TemplateCategory::Authentication
        );
        assert!("SERVICE".parse::<TemplateCategory>().is_err());
        assert_eq!(TemplateCategory::Marketing.to_string(), "MARKETING");
    }
}
