//! Phone number and OTP code utilities

use once_cell::sync::Lazy;
use regex::Regex;

/// Country calling code assumed for bare domestic numbers
pub const DEFAULT_COUNTRY_CODE: &str = "91";

/// Length of a domestic (national significant) mobile number
const DOMESTIC_NUMBER_LENGTH: usize = 10;

// International phone number regex (E.164 format)
static INTERNATIONAL_PHONE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\+[1-9]\d{1,14}$").unwrap()
});

/// Canonicalize a phone number to E.164 (`+<country code><number>`)
///
/// Strips a leading `+`, then a leading international `00` prefix, then every
/// non-digit character. A 12-digit result that already carries the default
/// country code gets a `+`; a bare 10-digit number is treated as domestic and
/// gets `+91`; anything else is prefixed with `+` as-is.
///
/// This never fails. Malformed input yields a malformed-looking E.164 string
/// and stricter validation is left to the caller
/// (see [`is_valid_international_phone`]).
///
/// # Examples
///
/// ```
/// use pv_shared::utils::phone::to_e164;
///
/// assert_eq!(to_e164("9703589296"), "+919703589296");
/// assert_eq!(to_e164("00919703589296"), "+919703589296");
/// ```
pub fn to_e164(phone: &str) -> String {
    let trimmed = phone.trim();
    let without_plus = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let without_idd = without_plus.strip_prefix("00").unwrap_or(without_plus);

    let digits: String = without_idd.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.len() == DOMESTIC_NUMBER_LENGTH + DEFAULT_COUNTRY_CODE.len()
        && digits.starts_with(DEFAULT_COUNTRY_CODE)
    {
        format!("+{}", digits)
    } else if digits.len() == DOMESTIC_NUMBER_LENGTH {
        format!("+{}{}", DEFAULT_COUNTRY_CODE, digits)
    } else {
        format!("+{}", digits)
    }
}

/// Normalize a submitted or stored OTP code for comparison
///
/// Trims the value and keeps only its digits. When no digits remain the
/// trimmed raw value is returned instead, so non-numeric codes still compare.
pub fn normalize_code(value: &str) -> String {
    let trimmed = value.trim();
    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.is_empty() {
        trimmed.to_string()
    } else {
        digits
    }
}

/// Check if a phone number is valid (international E.164 format)
pub fn is_valid_international_phone(phone: &str) -> bool {
    INTERNATIONAL_PHONE_REGEX.is_match(phone.trim())
}

/// Mask a phone number for logging (e.g., +91****9296)
pub fn mask_phone_number(phone: &str) -> String {
    if phone.len() >= 7 && phone.is_ascii() {
        format!("{}****{}", &phone[0..3], &phone[phone.len() - 4..])
    } else {
        "****".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_e164_domestic_number() {
        assert_eq!(to_e164("9703589296"), "+919703589296");
        assert_eq!(to_e164(" 97035 89296 "), "+919703589296");
        assert_eq!(to_e164("970-358-9296"), "+919703589296");
    }

    #[test]
    fn test_to_e164_already_international() {
        assert_eq!(to_e164("+919703589296"), "+919703589296");
        assert_eq!(to_e164("919703589296"), "+919703589296");
        assert_eq!(to_e164("+91 97035 89296"), "+919703589296");
    }

    #[test]
    fn test_to_e164_international_prefix() {
        assert_eq!(to_e164("00919703589296"), "+919703589296");
        assert_eq!(to_e164("+00919703589296"), "+919703589296");
    }

    #[test]
    fn test_to_e164_other_countries_pass_through() {
        assert_eq!(to_e164("+14155552671"), "+14155552671");
        assert_eq!(to_e164("0044 20 7183 8750"), "+442071838750");
    }

    #[test]
    fn test_to_e164_malformed_input_degrades() {
        assert_eq!(to_e164(""), "+");
        assert_eq!(to_e164("abc"), "+");
        assert_eq!(to_e164("12345"), "+12345");
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("123456"), "123456");
        assert_eq!(normalize_code("  123 456 "), "123456");
        assert_eq!(normalize_code("123-456"), "123456");
    }

    #[test]
    fn test_normalize_code_non_numeric_fallback() {
        assert_eq!(normalize_code("  ABCDEF "), "ABCDEF");
        assert_eq!(normalize_code(""), "");
    }

    #[test]
    fn test_is_valid_international_phone() {
        assert!(is_valid_international_phone("+919703589296"));
        assert!(is_valid_international_phone("+14155552671"));
        assert!(!is_valid_international_phone("9703589296")); // Missing +
        assert!(!is_valid_international_phone("+0123456789")); // Invalid country code
        assert!(!is_valid_international_phone(&to_e164("abc")));
    }

    #[test]
    fn test_mask_phone_number() {
        assert_eq!(mask_phone_number("+919703589296"), "+91****9296");
        assert_eq!(mask_phone_number("12345"), "****");
    }
}
