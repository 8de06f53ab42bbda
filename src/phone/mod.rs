//! Phone number normalization with country-specific handling.
//!
//! Centralizes how phone numbers are normalized before storage and
//! comparison. Country rules are keyed by [`keshvar::Alpha2`]; Brazil's
//! 8-to-9-digit mobile migration is the rule that motivates the module
//! (see [`brazil`]).
//!
//! All functions are pure and null-safe: blank input yields `None`, never
//! an error, and a `whatsapp:` channel prefix on input survives on output
//! in canonical lowercase.

pub mod brazil;

use keshvar::Alpha2;

use brazil::{denormalize_brazil_phone, normalize_brazil_phone, phones_match_brazil};

/// Keep only ASCII digits.
fn digit_string(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

/// Split off a leading `whatsapp:` prefix, case-insensitively, returning
/// the canonical lowercase prefix and the remainder.
fn split_whatsapp_prefix(value: &str) -> (&'static str, &str) {
    match value.get(..9) {
        Some(prefix) if prefix.eq_ignore_ascii_case("whatsapp:") => ("whatsapp:", &value[9..]),
        _ => ("", value),
    }
}

/// Normalize a phone number to E.164 form under the given default country.
///
/// Numbers carrying the `55` country code are always treated as Brazilian
/// regardless of `default_country`; other numbers with an explicit `+` pass
/// through with formatting stripped; bare local numbers follow the default
/// country's rules.
///
/// # Example
///
/// ```rust
/// use keshvar::Alpha2;
/// use messaging_gateway::phone::normalize_phone;
///
/// assert_eq!(
///     normalize_phone("+555198644323", Alpha2::BR).as_deref(),
///     Some("+5551998644323")
/// );
/// // An international number is not rewritten to the default country.
/// assert_eq!(
///     normalize_phone("+1 (415) 555-1234", Alpha2::BR).as_deref(),
///     Some("+14155551234")
/// );
/// assert_eq!(normalize_phone("", Alpha2::BR), None);
/// ```
pub fn normalize_phone(phone: &str, default_country: Alpha2) -> Option<String> {
    let phone = phone.trim();
    if phone.is_empty() {
        return None;
    }

    let (prefix, rest) = split_whatsapp_prefix(phone);
    let candidate = rest.trim();
    if candidate.is_empty() {
        return None;
    }

    let digits = digit_string(candidate);
    if digits.is_empty() {
        return None;
    }

    // Explicit 55 numbers are always Brazilian.
    if digits.starts_with(brazil::BRAZIL_COUNTRY_CODE) {
        return normalize_brazil_phone(&format!("{prefix}{candidate}"));
    }

    // International numbers are not rewritten to the default country.
    if candidate.starts_with('+') {
        return Some(format!("{prefix}+{digits}"));
    }

    // Local numbers follow the default country.
    if matches!(default_country, Alpha2::BR) {
        return normalize_brazil_phone(&format!("{prefix}{candidate}"));
    }

    Some(format!("{prefix}+{digits}"))
}

/// Normalize a WhatsApp ID to E.164 form.
///
/// WhatsApp IDs are phone numbers, possibly prefixed with `whatsapp:`; the
/// underlying number is normalized and the prefix re-attached.
pub fn normalize_whatsapp_id(whatsapp_id: &str, default_country: Alpha2) -> Option<String> {
    let whatsapp_id = whatsapp_id.trim();
    if whatsapp_id.is_empty() {
        return None;
    }

    let (prefix, raw_phone) = split_whatsapp_prefix(whatsapp_id);
    let normalized = normalize_phone(raw_phone, default_country)?;

    if !prefix.is_empty() && !normalized.starts_with("whatsapp:") {
        return Some(format!("whatsapp:{normalized}"));
    }

    Some(normalized)
}

/// Convert a normalized phone back to its alternate legacy encoding.
///
/// Used by the gateway when the canonical format is rejected: for Brazil
/// this turns a 9-digit mobile back into the 8-digit form. Returns the
/// input unchanged when no alternate encoding exists.
pub fn denormalize_phone(phone: &str, country: Alpha2) -> Option<String> {
    if phone.trim().is_empty() {
        return None;
    }

    if matches!(country, Alpha2::BR) {
        return denormalize_brazil_phone(phone);
    }

    Some(phone.to_string())
}

/// Format a raw phone number as a `whatsapp:+E.164` channel address.
///
/// A bare 10-digit number is assumed to be US and gains the `1` country
/// code.
///
/// # Example
///
/// ```rust
/// use messaging_gateway::phone::format_whatsapp_number;
///
/// assert_eq!(
///     format_whatsapp_number("+55 (51) 99864-4323").as_deref(),
///     Some("whatsapp:+5551998644323")
/// );
/// assert_eq!(
///     format_whatsapp_number("1234567890").as_deref(),
///     Some("whatsapp:+11234567890")
/// );
/// ```
pub fn format_whatsapp_number(number: &str) -> Option<String> {
    let number = number.trim();
    if number.is_empty() {
        return None;
    }

    let (_, rest) = split_whatsapp_prefix(number);

    let mut digits = digit_string(rest);
    if digits.is_empty() {
        return None;
    }

    if digits.len() == 10 {
        digits.insert(0, '1');
    }

    Some(format!("whatsapp:+{digits}"))
}

/// Whether two phone numbers refer to the same destination after
/// country-specific normalization.
pub fn phones_match(phone1: &str, phone2: &str, country: Alpha2) -> bool {
    if matches!(country, Alpha2::BR) {
        return phones_match_brazil(phone1, phone2);
    }

    match (
        normalize_phone(phone1, country),
        normalize_phone(phone2, country),
    ) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_brazil_default() {
        assert_eq!(
            normalize_phone("+555198644323", Alpha2::BR).as_deref(),
            Some("+5551998644323")
        );
    }

    #[test]
    fn test_normalize_international_not_rewritten_to_brazil() {
        assert_eq!(
            normalize_phone("+14155551234", Alpha2::BR).as_deref(),
            Some("+14155551234")
        );
    }

    #[test]
    fn test_normalize_strips_formatting() {
        assert_eq!(
            normalize_phone("+1 (415) 555-1234", Alpha2::BR).as_deref(),
            Some("+14155551234")
        );
    }

    #[test]
    fn test_normalize_generic_country() {
        assert_eq!(
            normalize_phone("+14155238886", Alpha2::US).as_deref(),
            Some("+14155238886")
        );
    }

    #[test]
    fn test_normalize_adds_plus_prefix() {
        assert_eq!(
            normalize_phone("14155238886", Alpha2::US).as_deref(),
            Some("+14155238886")
        );
    }

    #[test]
    fn test_normalize_blank_input() {
        assert_eq!(normalize_phone("", Alpha2::BR), None);
        assert_eq!(normalize_phone("   ", Alpha2::BR), None);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for (input, country) in [
            ("+555198644323", Alpha2::BR),
            ("14155238886", Alpha2::US),
            ("whatsapp:5198644323", Alpha2::BR),
        ] {
            let once = normalize_phone(input, country).unwrap();
            let twice = normalize_phone(&once, country).unwrap();
            assert_eq!(once, twice, "not idempotent for {input}");
        }
    }

    #[test]
    fn test_whatsapp_id_with_prefix() {
        assert_eq!(
            normalize_whatsapp_id("whatsapp:+555198644323", Alpha2::BR).as_deref(),
            Some("whatsapp:+5551998644323")
        );
    }

    #[test]
    fn test_whatsapp_id_without_prefix() {
        assert_eq!(
            normalize_whatsapp_id("+555198644323", Alpha2::BR).as_deref(),
            Some("+5551998644323")
        );
    }

    #[test]
    fn test_whatsapp_id_non_brazil_prefix_preserved() {
        assert_eq!(
            normalize_whatsapp_id("whatsapp:+14155551234", Alpha2::BR).as_deref(),
            Some("whatsapp:+14155551234")
        );
    }

    #[test]
    fn test_denormalize_brazil() {
        assert_eq!(
            denormalize_phone("+5551998644323", Alpha2::BR).as_deref(),
            Some("+555198644323")
        );
    }

    #[test]
    fn test_denormalize_non_brazil_unchanged() {
        assert_eq!(
            denormalize_phone("+14155238886", Alpha2::US).as_deref(),
            Some("+14155238886")
        );
    }

    #[test]
    fn test_denormalize_blank() {
        assert_eq!(denormalize_phone("", Alpha2::BR), None);
    }

    #[test]
    fn test_format_whatsapp_us_ten_digit() {
        assert_eq!(
            format_whatsapp_number("1234567890").as_deref(),
            Some("whatsapp:+11234567890")
        );
    }

    #[test]
    fn test_format_whatsapp_plus_prefix() {
        assert_eq!(
            format_whatsapp_number("+442079460000").as_deref(),
            Some("whatsapp:+442079460000")
        );
    }

    #[test]
    fn test_format_whatsapp_already_prefixed() {
        assert_eq!(
            format_whatsapp_number("whatsapp:+123").as_deref(),
            Some("whatsapp:+123")
        );
        assert_eq!(
            format_whatsapp_number("WhatsApp:+123").as_deref(),
            Some("whatsapp:+123")
        );
    }

    #[test]
    fn test_format_whatsapp_strips_formatting() {
        assert_eq!(
            format_whatsapp_number("whatsapp:+55 (51) 99864-4323").as_deref(),
            Some("whatsapp:+5551998644323")
        );
    }

    #[test]
    fn test_format_whatsapp_rejects_blank_and_non_digit() {
        assert_eq!(format_whatsapp_number(""), None);
        assert_eq!(format_whatsapp_number("   "), None);
        assert_eq!(format_whatsapp_number("abc"), None);
    }

    #[test]
    fn test_format_whatsapp_short_number_not_padded() {
        // Fewer than 10 digits is used as-is, not US-assumed.
        assert_eq!(
            format_whatsapp_number("12345").as_deref(),
            Some("whatsapp:+12345")
        );
    }

    #[test]
    fn test_phones_match_formats() {
        assert!(phones_match("+555198644323", "+5551998644323", Alpha2::BR));
        assert!(!phones_match(
            "+5511999999999",
            "+5511888888888",
            Alpha2::BR
        ));
    }

    #[test]
    fn test_phones_match_generic_country() {
        assert!(phones_match("14155238886", "+1 415 523 8886", Alpha2::US));
        assert!(!phones_match("", "+14155238886", Alpha2::US));
    }
}
