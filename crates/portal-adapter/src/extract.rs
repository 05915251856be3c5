//! Scraping of portal response text.
//!
//! The portal renders outcomes as free-form text panels, so ids and codes
//! are pulled out with ordered regex alternates. First match wins.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use voterflow_core_types::StatusData;

static OTP_DEMO: Lazy<Regex> = Lazy::new(|| Regex::new(r"Demo:\s*(\d{6})").unwrap());
static OTP_BOUNDED: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{6})\b").unwrap());
static OTP_ANY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{6})").unwrap());

static APPLICATION_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"APP\d+X\d+").unwrap());

// Labels match case-insensitively but the captured id stays uppercase,
// so filler words like "is" never win the capture.
static VOTER_ID_LABELED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i:Voter ID)[:\s]+([A-Z0-9]+)").unwrap());
static VOTER_ID_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(VOT\d{6})\b").unwrap());
static VOTER_ID_SENTENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i:Your Voter ID is)[:\s]+([A-Z0-9]+)").unwrap());

static EMBEDDED_JSON: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{[\s\S]*\}").unwrap());
static STATUS_VOTER_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i:voterId)["\s:]+([A-Z0-9]+)"#).unwrap());
static STATUS_VOTER_EPIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b([A-Z]{2}\d{7})\b").unwrap());

/// Six-digit code from the OTP panel. The demo portal prints the code in
/// its own response, prefixed `Demo:` in the usual case.
pub fn extract_otp(text: &str) -> Option<String> {
    if let Some(caps) = OTP_DEMO.captures(text) {
        return Some(caps[1].to_string());
    }
    if let Some(caps) = OTP_BOUNDED.captures(text) {
        return Some(caps[1].to_string());
    }
    OTP_ANY.captures(text).map(|caps| caps[1].to_string())
}

/// Application id of the form `APP<digits>X<digits>`.
pub fn extract_application_id(text: &str) -> Option<String> {
    APPLICATION_ID.find(text).map(|m| m.as_str().to_string())
}

/// Voter id, trying the labeled form, the bare `VOT` code, then the
/// sentence form.
pub fn extract_voter_id(text: &str) -> Option<String> {
    for pattern in [&*VOTER_ID_LABELED, &*VOTER_ID_CODE, &*VOTER_ID_SENTENCE] {
        if let Some(caps) = pattern.captures(text) {
            return Some(caps[1].to_string());
        }
    }
    None
}

/// Structured status from the status panel.
///
/// The panel usually embeds a JSON object; when it does not, fall back to
/// keyword and id scraping over the raw text.
pub fn parse_status(application_id: &str, text: &str) -> StatusData {
    if let Some(json) = EMBEDDED_JSON.find(text) {
        if let Ok(parsed) = serde_json::from_str::<Value>(json.as_str()) {
            return StatusData {
                application_id: parsed["applicationId"]
                    .as_str()
                    .unwrap_or(application_id)
                    .to_string(),
                status: parsed["status"].as_str().unwrap_or("Unknown").to_string(),
                voter_id: parsed["voterId"].as_str().map(str::to_string),
                submitted_date: parsed["submittedDate"].as_str().map(str::to_string),
                remarks: parsed["remarks"].as_str().unwrap_or(text).to_string(),
            };
        }
    }

    let status = if text.contains("Pending") {
        "Pending"
    } else if text.contains("Approved") {
        "Approved"
    } else if text.contains("Rejected") {
        "Rejected"
    } else {
        "Unknown"
    };

    let voter_id = STATUS_VOTER_FIELD
        .captures(text)
        .or_else(|| STATUS_VOTER_EPIC.captures(text))
        .map(|caps| caps[1].to_string());

    StatusData {
        application_id: application_id.to_string(),
        status: status.to_string(),
        voter_id,
        submitted_date: None,
        remarks: text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn otp_prefers_demo_prefix() {
        let text = "OTP sent to 9876543210. Demo: 482913 (valid 5 min, ref 123456)";
        assert_eq!(extract_otp(text).as_deref(), Some("482913"));
    }

    #[test]
    fn otp_falls_back_to_bounded_six_digits() {
        assert_eq!(
            extract_otp("Your code is 104385, do not share it").as_deref(),
            Some("104385")
        );
    }

    #[test]
    fn otp_last_resort_matches_embedded_digits() {
        assert_eq!(extract_otp("code=382716x").as_deref(), Some("382716"));
        assert_eq!(extract_otp("no code here"), None);
    }

    #[test]
    fn application_id_shape() {
        let text = "Registration submitted! Your application ID is APP1755X4821.";
        assert_eq!(
            extract_application_id(text).as_deref(),
            Some("APP1755X4821")
        );
        assert_eq!(extract_application_id("APP12 X3"), None);
    }

    #[test]
    fn voter_id_alternates_in_order() {
        assert_eq!(
            extract_voter_id("Approved. Voter ID: VOT123456").as_deref(),
            Some("VOT123456")
        );
        assert_eq!(
            extract_voter_id("issued VOT654321 today").as_deref(),
            Some("VOT654321")
        );
        assert_eq!(
            extract_voter_id("Your Voter ID is AB1234567").as_deref(),
            Some("AB1234567")
        );
        assert_eq!(extract_voter_id("still pending"), None);
    }

    #[test]
    fn status_parses_embedded_json() {
        let text = r#"Application found: {"applicationId":"APP1X2","status":"Approved","voterId":"VOT000111","submittedDate":"2026-01-10","remarks":"All checks passed"}"#;
        let data = parse_status("APP1X2", text);
        assert_eq!(data.status, "Approved");
        assert_eq!(data.voter_id.as_deref(), Some("VOT000111"));
        assert_eq!(data.submitted_date.as_deref(), Some("2026-01-10"));
        assert_eq!(data.remarks, "All checks passed");
    }

    #[test]
    fn status_keyword_fallback() {
        let data = parse_status("APP9X9", "Your application is still Pending review.");
        assert_eq!(data.status, "Pending");
        assert_eq!(data.application_id, "APP9X9");
        assert!(data.voter_id.is_none());
        assert!(data.remarks.contains("Pending"));
    }

    #[test]
    fn status_fallback_scrapes_epic_style_id() {
        let data = parse_status("APP9X9", "Approved, card number XY1234567 dispatched");
        assert_eq!(data.status, "Approved");
        assert_eq!(data.voter_id.as_deref(), Some("XY1234567"));
    }
}
