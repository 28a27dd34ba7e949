use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of the community (congregation or campus) owning a record table.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CommunityId(pub String);

impl CommunityId {
    pub fn new(value: impl AsRef<str>) -> Self {
        Self(value.as_ref().trim().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommunityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether a registrant belongs to the congregation or is visiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegistrantType {
    #[serde(alias = "member", alias = "MEMBER")]
    Member,
    #[serde(alias = "guest", alias = "GUEST")]
    Guest,
}

impl RegistrantType {
    pub const fn label(self) -> &'static str {
        match self {
            RegistrantType::Member => "Member",
            RegistrantType::Guest => "Guest",
        }
    }
}

/// One person named in a submission, as posted by the form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registrant {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(rename = "type")]
    pub registrant_type: RegistrantType,
}

impl Registrant {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Form payload for a single submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationForm {
    #[serde(default)]
    pub community: Option<String>,
    #[serde(default)]
    pub session_info: Option<String>,
    pub sunday_date: NaiveDate,
    pub registrants: Vec<Registrant>,
}

/// Stored registration row. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRecord {
    pub timestamp: DateTime<Utc>,
    pub community: CommunityId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub registrant_type: RegistrantType,
    pub session_label: String,
    pub sunday_date: Option<NaiveDate>,
}

impl RegistrationRecord {
    pub fn registrant(&self) -> Registrant {
        Registrant {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            registrant_type: self.registrant_type,
        }
    }
}

/// Lower-cases and trims an address so grouping and deduplication agree.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}
