//! Format validators and input sanitizers for member-facing data.
//!
//! Every validator returns a plain `bool` and never panics, leaving the
//! decision of how to react to the caller.

use regex::Regex;
use std::sync::LazyLock;

static EMAIL_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok());

static TURKISH_PHONE_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^(\+90|0)?[0-9]{10}$").ok());

static UUID_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[1-5][0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}$").ok()
});

static URL_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"^https?://(www\.)?[-a-zA-Z0-9@:%._+~#=]{1,256}\.[a-zA-Z0-9()]{1,6}\b([-a-zA-Z0-9()@:%_+.~#?&/=]*)$",
    )
    .ok()
});

fn matches(pattern: &LazyLock<Option<Regex>>, input: &str) -> bool {
    pattern.as_ref().is_some_and(|regex| regex.is_match(input))
}

pub fn is_valid_email(email: &str) -> bool {
    matches(&EMAIL_PATTERN, email)
}

/// Accepts `+90` or a leading `0` in front of a 10 digit subscriber number.
pub fn is_valid_turkish_phone(phone: &str) -> bool {
    matches(&TURKISH_PHONE_PATTERN, phone)
}

/// RFC 4122 textual UUID with version 1-5 and the standard variant.
pub fn is_valid_uuid(uuid: &str) -> bool {
    matches(&UUID_PATTERN, uuid)
}

pub fn is_valid_url(url: &str) -> bool {
    matches(&URL_PATTERN, url)
}

/// Turkish national identity number (T.C. Kimlik No).
///
/// The tenth digit is `((odd * 7) - even) mod 10` and the eleventh is
/// `(odd + even + tenth) mod 10`, where `odd` sums digits 1, 3, 5, 7, 9 and
/// `even` sums digits 2, 4, 6, 8 (1-based positions).
pub fn is_valid_turkish_id(id: &str) -> bool {
    if id.len() != 11 || !id.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }

    let digits: Vec<i32> = id.bytes().map(|b| i32::from(b - b'0')).collect();

    let odd_sum = digits[0] + digits[2] + digits[4] + digits[6] + digits[8];
    let even_sum = digits[1] + digits[3] + digits[5] + digits[7];

    let tenth = (odd_sum * 7 - even_sum).rem_euclid(10);
    let eleventh = (odd_sum + even_sum + tenth).rem_euclid(10);

    digits[9] == tenth && digits[10] == eleventh
}

/// Inclusive range check.
pub fn is_in_range(value: f64, min: f64, max: f64) -> bool {
    value >= min && value <= max
}

/// Trims free text and strips angle brackets.
pub fn sanitize_input(input: &str) -> String {
    input.trim().replace(['<', '>'], "")
}

/// Normalizes an email for storage and lookup.
pub fn sanitize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub struct RequestSanitizer;

impl RequestSanitizer {
    /// Returned to clients for failures whose detail must stay server-side.
    pub const GENERIC_ERROR_MESSAGE: &'static str = "Request failed";

    pub fn create_correlation_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }
}
