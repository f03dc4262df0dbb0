//! Newsletter entities and stream event payloads.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A newsletter as returned by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Newsletter {
    pub id: i64,
    pub title: String,
    pub content: String,
    #[serde(
        serialize_with = "serialize_timestamp",
        deserialize_with = "deserialize_timestamp"
    )]
    pub created_at: DateTime<Utc>,
}

/// Title and content sent on create and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsletterDraft {
    pub title: String,
    pub content: String,
}

impl NewsletterDraft {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }
}

impl From<&Newsletter> for NewsletterDraft {
    fn from(newsletter: &Newsletter) -> Self {
        Self::new(newsletter.title.clone(), newsletter.content.clone())
    }
}

/// Kind of change carried by a stream event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Update,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Create => write!(f, "create"),
            Action::Update => write!(f, "update"),
        }
    }
}

impl FromStr for Action {
    type Err = String;

    /// Accepts both the envelope form (`create`/`update`) and the database
    /// trigger form (`INSERT`/`UPDATE`).
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "create" | "insert" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            _ => Err(format!("Unknown stream action: {value}")),
        }
    }
}

/// A server-pushed notification of a newsletter creation or modification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamEvent {
    pub action: Action,
    pub newsletter: Newsletter,
}

impl StreamEvent {
    pub fn create(newsletter: Newsletter) -> Self {
        Self {
            action: Action::Create,
            newsletter,
        }
    }

    pub fn update(newsletter: Newsletter) -> Self {
        Self {
            action: Action::Update,
            newsletter,
        }
    }
}

/// Trigger-row payload: `{"operation": "INSERT", "id": .., "title": .., ...}`.
#[derive(Debug, Deserialize)]
pub(crate) struct TriggerRow {
    pub operation: String,
    #[serde(flatten)]
    pub newsletter: Newsletter,
}

/// Parses a service timestamp.
///
/// RFC 3339 values keep their offset; naive values (the service stores UTC
/// without a zone) are read as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn serialize_timestamp<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&value.to_rfc3339())
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
}
