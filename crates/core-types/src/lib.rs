//! Shared primitives for the voterflow assistant stack.
//!
//! Every layer speaks in these types: the remembered per-user form fields,
//! the ten-field registration payload, chat transcript entries, and the
//! structured outcomes the portal adapter reports back to the agent loop.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Canonical gender values accepted by the portal's registration form.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Other => "Other",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field names of the registration payload, in portal schema order.
pub const REGISTRATION_FIELDS: [&str; 10] = [
    "aadhaar",
    "fullName",
    "fatherName",
    "dob",
    "gender",
    "mobile",
    "email",
    "address",
    "state",
    "district",
];

/// Flat per-user mapping of remembered form fields and credentials.
///
/// Absent means unset; there is no null-vs-missing distinction. Merging is
/// a per-field overwrite where only `Some` values replace existing ones.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RememberedFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub father_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dob: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aadhaar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voter_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_application_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_status: Option<String>,
}

impl RememberedFields {
    /// Overwrite every field for which `updates` carries a value.
    pub fn merge(&mut self, updates: &RememberedFields) {
        macro_rules! take {
            ($field:ident) => {
                if let Some(value) = &updates.$field {
                    self.$field = Some(value.clone());
                }
            };
        }
        take!(full_name);
        take!(father_name);
        take!(dob);
        take!(gender);
        take!(mobile);
        take!(aadhaar);
        take!(voter_id);
        take!(email);
        take!(password);
        take!(address);
        take!(state);
        take!(district);
        take!(last_application_id);
        take!(registration_status);
    }

    pub fn is_empty(&self) -> bool {
        self.set_count() == 0
    }

    /// Number of fields carrying a non-empty value.
    pub fn set_count(&self) -> usize {
        self.set_fields().len()
    }

    fn set_fields(&self) -> Vec<(&'static str, &str)> {
        [
            ("fullName", self.full_name.as_deref()),
            ("fatherName", self.father_name.as_deref()),
            ("dob", self.dob.as_deref()),
            ("gender", self.gender.as_deref()),
            ("mobile", self.mobile.as_deref()),
            ("aadhaar", self.aadhaar.as_deref()),
            ("voterId", self.voter_id.as_deref()),
            ("email", self.email.as_deref()),
            ("password", self.password.as_deref()),
            ("address", self.address.as_deref()),
            ("state", self.state.as_deref()),
            ("district", self.district.as_deref()),
            ("lastApplicationId", self.last_application_id.as_deref()),
            ("registrationStatus", self.registration_status.as_deref()),
        ]
        .into_iter()
        .filter_map(|(name, value)| match value {
            Some(v) if !v.trim().is_empty() => Some((name, v)),
            _ => None,
        })
        .collect()
    }

    fn registration_slot(&self, field: &str) -> Option<&str> {
        let value = match field {
            "aadhaar" => self.aadhaar.as_deref(),
            "fullName" => self.full_name.as_deref(),
            "fatherName" => self.father_name.as_deref(),
            "dob" => self.dob.as_deref(),
            "gender" => self.gender.as_deref(),
            "mobile" => self.mobile.as_deref(),
            "email" => self.email.as_deref(),
            "address" => self.address.as_deref(),
            "state" => self.state.as_deref(),
            "district" => self.district.as_deref(),
            _ => None,
        };
        value.filter(|v| !v.trim().is_empty())
    }

    /// Names of required registration fields still missing, in schema order.
    pub fn missing_registration_fields(&self) -> Vec<&'static str> {
        REGISTRATION_FIELDS
            .iter()
            .copied()
            .filter(|field| self.registration_slot(field).is_none())
            .collect()
    }

    pub fn has_full_registration(&self) -> bool {
        self.missing_registration_fields().is_empty()
    }

    /// Assemble the ten-field payload, or report which fields are missing.
    pub fn registration_payload(&self) -> Result<RegistrationPayload, Vec<&'static str>> {
        let missing = self.missing_registration_fields();
        if !missing.is_empty() {
            return Err(missing);
        }
        Ok(RegistrationPayload {
            aadhaar: self.aadhaar.clone().unwrap_or_default(),
            full_name: self.full_name.clone().unwrap_or_default(),
            father_name: self.father_name.clone().unwrap_or_default(),
            dob: self.dob.clone().unwrap_or_default(),
            gender: self.gender.clone().unwrap_or_default(),
            mobile: self.mobile.clone().unwrap_or_default(),
            email: self.email.clone().unwrap_or_default(),
            address: self.address.clone().unwrap_or_default(),
            state: self.state.clone().unwrap_or_default(),
            district: self.district.clone().unwrap_or_default(),
        })
    }

    /// Render the set fields as prompt lines ("- Name: Ravi Kumar").
    pub fn render_for_prompt(&self) -> String {
        let labels = [
            ("fullName", "Name"),
            ("mobile", "Mobile"),
            ("email", "Email"),
            ("aadhaar", "Aadhaar"),
            ("fatherName", "Father's name"),
            ("dob", "Date of birth"),
            ("gender", "Gender"),
            ("address", "Address"),
            ("state", "State"),
            ("district", "District"),
            ("lastApplicationId", "Last Application ID"),
            ("voterId", "Voter ID"),
        ];
        let set = self.set_fields();
        let mut out = String::new();
        for (field, label) in labels {
            if let Some((_, value)) = set.iter().find(|(name, _)| *name == field) {
                out.push_str(&format!("- {label}: {value}\n"));
            }
        }
        out
    }
}

/// The ten required registration form fields, all present and non-empty.
///
/// `dob` is canonical `YYYY-MM-DD` and `gender` canonical Male/Female/Other
/// by the time a payload is constructed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationPayload {
    pub aadhaar: String,
    pub full_name: String,
    pub father_name: String,
    pub dob: String,
    pub gender: String,
    pub mobile: String,
    pub email: String,
    pub address: String,
    pub state: String,
    pub district: String,
}

impl RegistrationPayload {
    /// Names of fields that are blank, in schema order.
    pub fn empty_fields(&self) -> Vec<&'static str> {
        let values = [
            ("aadhaar", &self.aadhaar),
            ("fullName", &self.full_name),
            ("fatherName", &self.father_name),
            ("dob", &self.dob),
            ("gender", &self.gender),
            ("mobile", &self.mobile),
            ("email", &self.email),
            ("address", &self.address),
            ("state", &self.state),
            ("district", &self.district),
        ];
        values
            .into_iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| name)
            .collect()
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
    System,
}

/// One conversation turn as persisted in the transcript store.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_called: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_args: Option<Value>,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, content)
    }

    fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            function_called: None,
            function_args: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_function(mut self, name: impl Into<String>, args: Value) -> Self {
        self.function_called = Some(name.into());
        self.function_args = Some(args);
        self
    }
}

/// Result of a login-or-signup attempt.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoginOutcome {
    pub success: bool,
    pub message: String,
}

impl LoginOutcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Result of a registration submission, with ids scraped from the response.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationOutcome {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voter_id: Option<String>,
}

impl RegistrationOutcome {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            application_id: None,
            voter_id: None,
        }
    }
}

/// Structured application status data scraped from the status response.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusData {
    pub application_id: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voter_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_date: Option<String>,
    pub remarks: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StatusOutcome {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<StatusData>,
}

impl StatusOutcome {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl SearchOutcome {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}
