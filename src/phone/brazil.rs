//! Brazilian phone number normalization.
//!
//! Brazil finished migrating mobile numbers from 8 to 9 digits in 2016. All
//! mobile numbers now carry nine digits (leading 9), but legacy data and
//! some external systems still hold the old 8-digit form.

use super::{digit_string, split_whatsapp_prefix};

/// Brazilian country dial code.
pub const BRAZIL_COUNTRY_CODE: &str = "55";

/// First digits that mark a local number as mobile (historically 9, 8, 7, 6).
const MOBILE_PREFIXES: &str = "9876";

/// Brazilian DDD area codes are the two-digit range 11-99.
fn is_area_code(code: &str) -> bool {
    matches!(code.parse::<u8>(), Ok(11..=99))
}

/// Normalize a Brazilian phone number to E.164 with the ninth digit.
///
/// Adds the `+55` country code when missing, inserts the ninth digit into
/// legacy 8-digit mobiles, strips formatting, and preserves a `whatsapp:`
/// prefix.
///
/// # Example
///
/// ```rust
/// use messaging_gateway::phone::brazil::normalize_brazil_phone;
///
/// assert_eq!(
///     normalize_brazil_phone("+555198644323").as_deref(),
///     Some("+5551998644323")
/// );
/// assert_eq!(
///     normalize_brazil_phone("whatsapp:+555198644323").as_deref(),
///     Some("whatsapp:+5551998644323")
/// );
/// assert_eq!(normalize_brazil_phone("123"), None);
/// ```
pub fn normalize_brazil_phone(phone: &str) -> Option<String> {
    let phone = phone.trim();
    if phone.is_empty() {
        return None;
    }

    let (prefix, rest) = split_whatsapp_prefix(phone);

    let mut digits = digit_string(rest);
    if digits.is_empty() {
        return None;
    }

    // Strip the country code when more digits follow than a full local number.
    if digits.starts_with(BRAZIL_COUNTRY_CODE) && digits.len() > 11 {
        digits.drain(..2);
    }

    // DDD area code plus an 8- or 9-digit local number.
    if digits.len() < 10 || digits.len() > 11 {
        return None;
    }

    let (area_code, local_number) = digits.split_at(2);

    if !is_area_code(area_code) {
        // Unrecognized area code: pass the digits through untouched.
        return Some(format!("{prefix}+{BRAZIL_COUNTRY_CODE}{digits}"));
    }

    // An 8-digit local number starting 9/8/7/6 is a mobile missing its
    // ninth digit; landlines start 2-5 and keep eight digits.
    let local_number = if local_number.len() == 8
        && local_number
            .chars()
            .next()
            .is_some_and(|c| MOBILE_PREFIXES.contains(c))
    {
        format!("9{local_number}")
    } else {
        local_number.to_string()
    };

    Some(format!(
        "{prefix}+{BRAZIL_COUNTRY_CODE}{area_code}{local_number}"
    ))
}

/// Convert a 9-digit Brazilian mobile back to the legacy 8-digit form.
///
/// Some WhatsApp accounts are still registered under the pre-migration
/// number; the gateway retries with this encoding when the canonical one is
/// rejected. Returns the input unchanged when no conversion applies.
///
/// # Example
///
/// ```rust
/// use messaging_gateway::phone::brazil::denormalize_brazil_phone;
///
/// assert_eq!(
///     denormalize_brazil_phone("+5551998644323").as_deref(),
///     Some("+555198644323")
/// );
/// // Landlines and foreign numbers pass through.
/// assert_eq!(
///     denormalize_brazil_phone("+555133224455").as_deref(),
///     Some("+555133224455")
/// );
/// ```
pub fn denormalize_brazil_phone(phone: &str) -> Option<String> {
    let phone = phone.trim();
    if phone.is_empty() {
        return None;
    }

    let (prefix, rest) = split_whatsapp_prefix(phone);

    let digits = digit_string(rest);
    if digits.is_empty() {
        return None;
    }

    // Only a +55 number with a full 9-digit local part is a candidate.
    if !digits.starts_with(BRAZIL_COUNTRY_CODE) || digits.len() != 13 {
        return Some(format!("{prefix}{rest}"));
    }

    let area_code = &digits[2..4];
    let local_number = &digits[4..];

    let mut local_chars = local_number.chars();
    let leads_with_nine = local_chars.next() == Some('9');
    let second_is_mobile = local_chars.next().is_some_and(|c| MOBILE_PREFIXES.contains(c));

    if leads_with_nine && second_is_mobile {
        let eight_digit = &local_number[1..];
        return Some(format!(
            "{prefix}+{BRAZIL_COUNTRY_CODE}{area_code}{eight_digit}"
        ));
    }

    Some(format!("{prefix}{rest}"))
}

/// Whether two numbers refer to the same Brazilian phone after
/// normalization (tolerating the ninth-digit discrepancy).
pub fn phones_match_brazil(phone1: &str, phone2: &str) -> bool {
    match (normalize_brazil_phone(phone1), normalize_brazil_phone(phone2)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adds_ninth_digit() {
        assert_eq!(
            normalize_brazil_phone("+555198644323").as_deref(),
            Some("+5551998644323")
        );
    }

    #[test]
    fn test_already_has_ninth_digit() {
        assert_eq!(
            normalize_brazil_phone("+5551998644323").as_deref(),
            Some("+5551998644323")
        );
    }

    #[test]
    fn test_local_format() {
        assert_eq!(
            normalize_brazil_phone("5198644323").as_deref(),
            Some("+5551998644323")
        );
    }

    #[test]
    fn test_whatsapp_prefix_preserved() {
        assert_eq!(
            normalize_brazil_phone("whatsapp:+555198644323").as_deref(),
            Some("whatsapp:+5551998644323")
        );
    }

    #[test]
    fn test_prefix_case_insensitive() {
        assert_eq!(
            normalize_brazil_phone("WhatsApp:+555198644323").as_deref(),
            Some("whatsapp:+5551998644323")
        );
    }

    #[test]
    fn test_landline_unchanged() {
        assert_eq!(
            normalize_brazil_phone("+555133224455").as_deref(),
            Some("+555133224455")
        );
    }

    #[test]
    fn test_formatting_stripped() {
        assert_eq!(
            normalize_brazil_phone("+55 (51) 9864-4323").as_deref(),
            Some("+5551998644323")
        );
    }

    #[test]
    fn test_blank_input() {
        assert_eq!(normalize_brazil_phone(""), None);
        assert_eq!(normalize_brazil_phone("  "), None);
    }

    #[test]
    fn test_invalid_short_number() {
        assert_eq!(normalize_brazil_phone("123"), None);
    }

    #[test]
    fn test_unknown_area_code_passes_through() {
        // Area code 01 is not a valid DDD; digits pass through untouched.
        assert_eq!(
            normalize_brazil_phone("0198644323").as_deref(),
            Some("+550198644323")
        );
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for input in ["+555198644323", "5198644323", "whatsapp:+555133224455"] {
            let once = normalize_brazil_phone(input).unwrap();
            let twice = normalize_brazil_phone(&once).unwrap();
            assert_eq!(once, twice, "not idempotent for {input}");
        }
    }

    #[test]
    fn test_denormalize_removes_ninth_digit() {
        assert_eq!(
            denormalize_brazil_phone("+5551998644323").as_deref(),
            Some("+555198644323")
        );
    }

    #[test]
    fn test_denormalize_landline_unchanged() {
        assert_eq!(
            denormalize_brazil_phone("+555133224455").as_deref(),
            Some("+555133224455")
        );
    }

    #[test]
    fn test_denormalize_whatsapp_prefix() {
        assert_eq!(
            denormalize_brazil_phone("whatsapp:+5551998644323").as_deref(),
            Some("whatsapp:+555198644323")
        );
    }

    #[test]
    fn test_denormalize_non_brazilian_unchanged() {
        assert_eq!(
            denormalize_brazil_phone("+14155238886").as_deref(),
            Some("+14155238886")
        );
    }

    #[test]
    fn test_denormalize_blank_input() {
        assert_eq!(denormalize_brazil_phone(""), None);
    }

    #[test]
    fn test_round_trip() {
        let normalized = normalize_brazil_phone("+555198644323").unwrap();
        let denormalized = denormalize_brazil_phone(&normalized).unwrap();
        assert_eq!(denormalized, "+555198644323");
    }

    #[test]
    fn test_phones_match_tolerates_ninth_digit() {
        assert!(phones_match_brazil("+555198644323", "+5551998644323"));
        assert!(phones_match_brazil("5198644323", "+5551998644323"));
    }

    #[test]
    fn test_phones_match_rejects_different_numbers() {
        assert!(!phones_match_brazil("+5511999999999", "+5511888888888"));
    }

    #[test]
    fn test_phones_match_rejects_unparseable() {
        assert!(!phones_match_brazil("", "+5511999999999"));
        assert!(!phones_match_brazil("abc", "+5511999999999"));
    }
}
