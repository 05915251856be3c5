use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use voterflow_core_types::RememberedFields;

use crate::normalize::{normalize_date, normalize_gender};

static AADHAAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{12}\b").unwrap());
static MOBILE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{10})\b").unwrap());
static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap());
static GENDER_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(male|female|other|m|f|o)\b").unwrap());
static DATE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)\b(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[\s,.-]+\d{1,2}[\s,.-]+\d{4}\b")
            .unwrap(),
        Regex::new(r"(?i)\b\d{1,2}[\s,.-]+(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[\s,.-]+\d{4}\b")
            .unwrap(),
        Regex::new(r"\b\d{1,2}[\s.,/-]+\d{1,2}[\s.,/-]+\d{4}\b").unwrap(),
        Regex::new(r"\b\d{4}[\s.,/-]+\d{1,2}[\s.,/-]+\d{1,2}\b").unwrap(),
    ]
});

/// Scan free text for registration fields.
///
/// Each pattern is looked for independently, so the surrounding prose and
/// the order of values do not matter. Malformed input just yields fewer
/// fields; this never fails.
pub fn extract_fields(message: &str) -> RememberedFields {
    let mut fields = RememberedFields::default();

    if let Some(m) = AADHAAR.find(message) {
        fields.aadhaar = Some(m.as_str().to_string());
    }

    // A 12-digit run contains 10-digit substrings, but the word boundary
    // keeps the aadhaar from doubling as a mobile number.
    if let Some(caps) = MOBILE.captures(message) {
        fields.mobile = Some(caps[1].to_string());
    }

    if let Some(m) = EMAIL.find(message) {
        fields.email = Some(m.as_str().to_string());
    }

    for pattern in DATE_PATTERNS.iter() {
        if let Some(m) = pattern.find(message) {
            if let Some(dob) = normalize_date(m.as_str()) {
                fields.dob = Some(dob);
                break;
            }
        }
    }

    if let Some(caps) = GENDER_WORD.captures(message) {
        if let Some(gender) = normalize_gender(&caps[1]) {
            fields.gender = Some(gender.as_str().to_string());
        }
    }

    fields
}

/// Outcome of the comma-separated positional pre-pass.
#[derive(Clone, Debug, PartialEq)]
pub enum FastPath {
    /// Three tokens where the middle one looks like a password rather than
    /// an email fragment. Advisory only; short registration fragments can
    /// collide with this shape.
    Login {
        email: String,
        password: String,
        mobile: String,
    },
    /// Nine or more tokens mapped positionally onto the registration form.
    Registration(RememberedFields),
}

/// Positional comma-separated parsing, tried before the model is invoked.
///
/// Token positions 0..9 map to aadhaar, full name, father's name, dob,
/// gender, mobile, email, address, state, district. A 3-token message is
/// instead read as login credentials when the middle token lacks an '@'
/// and is longer than 5 characters. Returns `None` when neither shape
/// applies.
pub fn fast_path(message: &str) -> Option<FastPath> {
    let parts: Vec<&str> = message.split(',').map(str::trim).collect();

    if parts.len() == 3 && !parts[1].contains('@') && parts[1].len() > 5 {
        debug!("fast path matched login credential shape");
        return Some(FastPath::Login {
            email: parts[0].to_string(),
            password: parts[1].to_string(),
            mobile: parts[2].to_string(),
        });
    }

    if parts.len() < 9 {
        return None;
    }

    let token = |idx: usize| -> Option<String> {
        parts
            .get(idx)
            .map(|p| p.to_string())
            .filter(|p| !p.is_empty())
    };

    let scanned = extract_fields(message);
    let mut fields = RememberedFields {
        aadhaar: token(0).or(scanned.aadhaar),
        full_name: token(1),
        father_name: token(2),
        dob: token(3),
        gender: token(4),
        mobile: token(5).or(scanned.mobile),
        email: token(6).or(scanned.email),
        address: token(7),
        state: token(8),
        // District sometimes rides along in the state position.
        district: token(9).or_else(|| token(8)),
        ..Default::default()
    };

    if let Some(raw) = fields.dob.take() {
        fields.dob = Some(normalize_date(&raw).unwrap_or(raw));
    }
    if let Some(raw) = fields.gender.take() {
        fields.gender = Some(
            normalize_gender(&raw)
                .map(|g| g.as_str().to_string())
                .unwrap_or(raw),
        );
    }

    debug!(set = fields.set_count(), "fast path matched registration shape");
    Some(FastPath::Registration(fields))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_fields_regardless_of_order() {
        let message =
            "my email is ravi@x.com, gender male, aadhaar 123456789012 and phone 9876543210";
        let fields = extract_fields(message);
        assert_eq!(fields.aadhaar.as_deref(), Some("123456789012"));
        assert_eq!(fields.mobile.as_deref(), Some("9876543210"));
        assert_eq!(fields.email.as_deref(), Some("ravi@x.com"));
        assert_eq!(fields.gender.as_deref(), Some("Male"));

        let reordered =
            "9876543210 is my number; I'm male; 123456789012; reach me at ravi@x.com";
        let fields = extract_fields(reordered);
        assert_eq!(fields.aadhaar.as_deref(), Some("123456789012"));
        assert_eq!(fields.mobile.as_deref(), Some("9876543210"));
        assert_eq!(fields.email.as_deref(), Some("ravi@x.com"));
        assert_eq!(fields.gender.as_deref(), Some("Male"));
    }

    #[test]
    fn extracts_dates_in_prose() {
        let fields = extract_fields("I was born on feb 01 2005 in Tirupati");
        assert_eq!(fields.dob.as_deref(), Some("2005-02-01"));
    }

    #[test]
    fn malformed_input_yields_nothing() {
        let fields = extract_fields(",,,,;;;###");
        assert!(fields.is_empty());
    }

    #[test]
    fn fast_path_maps_ten_positions() {
        let message = "123456789012, Ravi Kumar, Suresh Kumar, feb 01 2005, male, 9876543210, ravi@x.com, Gandhi Nagar, AP, Tirupati";
        let Some(FastPath::Registration(fields)) = fast_path(message) else {
            panic!("expected registration fast path");
        };
        assert_eq!(fields.aadhaar.as_deref(), Some("123456789012"));
        assert_eq!(fields.full_name.as_deref(), Some("Ravi Kumar"));
        assert_eq!(fields.father_name.as_deref(), Some("Suresh Kumar"));
        assert_eq!(fields.dob.as_deref(), Some("2005-02-01"));
        assert_eq!(fields.gender.as_deref(), Some("Male"));
        assert_eq!(fields.mobile.as_deref(), Some("9876543210"));
        assert_eq!(fields.email.as_deref(), Some("ravi@x.com"));
        assert_eq!(fields.address.as_deref(), Some("Gandhi Nagar"));
        assert_eq!(fields.state.as_deref(), Some("AP"));
        assert_eq!(fields.district.as_deref(), Some("Tirupati"));
        assert!(fields.has_full_registration());
    }

    #[test]
    fn fast_path_nine_tokens_reuses_state_as_district() {
        let message =
            "123456789012, Ravi Kumar, Suresh Kumar, 2005-02-01, male, 9876543210, ravi@x.com, Gandhi Nagar, AP";
        let Some(FastPath::Registration(fields)) = fast_path(message) else {
            panic!("expected registration fast path");
        };
        assert_eq!(fields.state.as_deref(), Some("AP"));
        assert_eq!(fields.district.as_deref(), Some("AP"));
    }

    #[test]
    fn fast_path_three_tokens_reads_as_login() {
        let Some(FastPath::Login {
            email,
            password,
            mobile,
        }) = fast_path("ravi@x.com, Secret123, 9876543210")
        else {
            panic!("expected login fast path");
        };
        assert_eq!(email, "ravi@x.com");
        assert_eq!(password, "Secret123");
        assert_eq!(mobile, "9876543210");
    }

    #[test]
    fn fast_path_three_short_tokens_is_not_login() {
        assert_eq!(fast_path("a, bc, d"), None);
        assert_eq!(fast_path("one, two, three"), None);
        assert_eq!(fast_path("ravi@x.com, r@x.in, 9876543210"), None);
    }

    #[test]
    fn fast_path_ignores_plain_prose() {
        assert_eq!(fast_path("please register me to vote"), None);
    }
}
