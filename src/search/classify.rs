//! Free-text query classification for the patient picker.
//!
//! A raw query is routed to one of three backend search modes:
//! 1. Arabic-script name (`patarName`)
//! 2. Mobile number (`patMobile` + `mobileCountryCode`)
//! 3. Latin-script name (`patName`), the fallback
//!
//! Two phone gates exist and are deliberately separate:
//! - `is_phone_eligible`: 3+ digits, phone characters only. Decides the
//!   classification.
//! - `is_clear_phone`: 7+ digits with a digit density of at least 0.7.
//!   Decides whether a phone query is worth a remote lookup yet.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::config::DEFAULT_COUNTRY_CODE;

/// Minimum digits for a query to be classified as a phone number.
pub const MIN_PHONE_DIGITS: usize = 3;

/// Minimum digits before a phone query is sent to the backend.
pub const MIN_DISPATCH_PHONE_DIGITS: usize = 7;

/// Minimum share of digits among all characters for dispatch.
pub const MIN_PHONE_DIGIT_RATIO: f64 = 0.7;

/// Minimum characters for a name query.
pub const MIN_NAME_CHARS: usize = 2;

static PHONE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9\s+\-()]+$").unwrap());

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// Which search-field family a query belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum QueryKind {
    PhoneNumber,
    ScriptName,
    LatinName,
}

/// Normalized phone query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneQuery {
    /// Matched calling code, or 0 when none was recognized.
    pub country_code: u32,
    /// Remaining digits with leading zeros stripped. Saturates on digit
    /// runs too long for `u128`.
    pub local_number: u128,
}

/// Outcome of classifying a raw query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum Classification {
    PhoneNumber(PhoneQuery),
    ScriptName(String),
    LatinName(String),
}

impl Classification {
    pub fn kind(&self) -> QueryKind {
        match self {
            Self::PhoneNumber(_) => QueryKind::PhoneNumber,
            Self::ScriptName(_) => QueryKind::ScriptName,
            Self::LatinName(_) => QueryKind::LatinName,
        }
    }

    /// True when there is nothing to search for (blank input).
    pub fn is_empty(&self) -> bool {
        match self {
            Self::PhoneNumber(_) => false,
            Self::ScriptName(s) | Self::LatinName(s) => s.is_empty(),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Classifier
// ═══════════════════════════════════════════════════════════

/// Classifier configured with the calling codes to split off phone queries.
#[derive(Debug, Clone)]
pub struct QueryClassifier {
    country_codes: Vec<String>,
}

impl QueryClassifier {
    pub fn new<I, S>(country_codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            country_codes: country_codes.into_iter().map(Into::into).collect(),
        }
    }

    /// Classify a query. First match wins: script, phone, Latin name.
    pub fn classify(&self, raw: &str) -> Classification {
        let trimmed = raw.trim();

        if contains_script_chars(trimmed) {
            return Classification::ScriptName(trimmed.to_string());
        }
        if is_phone_eligible(trimmed) {
            return Classification::PhoneNumber(self.normalize_phone(&digits_only(trimmed)));
        }
        Classification::LatinName(trimmed.to_string())
    }

    /// Split a digit string into calling code and local number.
    pub fn normalize_phone(&self, digits: &str) -> PhoneQuery {
        for code in &self.country_codes {
            if digits.len() > code.len() && digits.starts_with(code.as_str()) {
                if let Ok(country_code) = code.parse::<u32>() {
                    return PhoneQuery {
                        country_code,
                        local_number: parse_local(&digits[code.len()..]),
                    };
                }
            }
        }
        PhoneQuery {
            country_code: 0,
            local_number: parse_local(digits),
        }
    }
}

impl Default for QueryClassifier {
    fn default() -> Self {
        Self::new([DEFAULT_COUNTRY_CODE])
    }
}

/// Classify with the default calling code.
pub fn classify(raw: &str) -> Classification {
    QueryClassifier::default().classify(raw)
}

// ═══════════════════════════════════════════════════════════
// Predicates
// ═══════════════════════════════════════════════════════════

/// True when the string holds any Arabic-script code point
/// (Arabic, Supplement, Extended-A, Presentation Forms A/B).
pub fn contains_script_chars(s: &str) -> bool {
    s.chars().any(|c| {
        matches!(c,
            '\u{0600}'..='\u{06FF}'
            | '\u{0750}'..='\u{077F}'
            | '\u{08A0}'..='\u{08FF}'
            | '\u{FB50}'..='\u{FDFF}'
            | '\u{FE70}'..='\u{FEFF}')
    })
}

/// ASCII digits of `s`, in order.
pub fn digits_only(s: &str) -> String {
    s.chars().filter(char::is_ascii_digit).collect()
}

/// Classification gate: 3+ digits and nothing but phone characters.
pub fn is_phone_eligible(s: &str) -> bool {
    let trimmed = s.trim();
    digits_only(trimmed).len() >= MIN_PHONE_DIGITS && PHONE_CHARS.is_match(trimmed)
}

/// Dispatch gate: 7+ digits making up at least 70% of the characters.
pub fn is_clear_phone(s: &str) -> bool {
    let trimmed = s.trim();
    let total = trimmed.chars().count();
    if total == 0 {
        return false;
    }
    let digits = digits_only(trimmed).len();
    digits >= MIN_DISPATCH_PHONE_DIGITS && (digits as f64 / total as f64) >= MIN_PHONE_DIGIT_RATIO
}

/// Minimum length a query must reach: digits for phone-like terms,
/// characters for names.
pub fn min_query_length(term: &str) -> usize {
    if is_phone_eligible(term) {
        MIN_PHONE_DIGITS
    } else {
        MIN_NAME_CHARS
    }
}

/// Length of `term` in the unit `min_query_length` uses.
pub fn query_length(term: &str) -> usize {
    let trimmed = term.trim();
    if is_phone_eligible(trimmed) {
        digits_only(trimmed).len()
    } else {
        trimmed.chars().count()
    }
}

/// Whether `term` has reached the minimum length for its kind.
pub fn meets_min_length(term: &str) -> bool {
    let trimmed = term.trim();
    !trimmed.is_empty() && query_length(trimmed) >= min_query_length(trimmed)
}

/// Whether a patient query should reach the backend now.
pub fn is_patient_dispatchable(term: &str) -> bool {
    let trimmed = term.trim();
    if !meets_min_length(trimmed) {
        return false;
    }
    match classify(trimmed).kind() {
        QueryKind::PhoneNumber => is_clear_phone(trimmed),
        QueryKind::ScriptName | QueryKind::LatinName => true,
    }
}

fn parse_local(digits: &str) -> u128 {
    let significant = digits.trim_start_matches('0');
    if significant.is_empty() {
        return 0;
    }
    // Input is ASCII digits only; overflow is the one parse failure.
    significant.parse().unwrap_or(u128::MAX)
}
