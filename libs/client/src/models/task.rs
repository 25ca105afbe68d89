//! Task model and request payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Task entity as returned by the remote API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Task {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub completed: bool,
    /// Id of the owning user
    #[serde(rename = "user_id")]
    pub owner: String,
    #[serde(
        default,
        deserialize_with = "timestamp::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(
        default,
        deserialize_with = "timestamp::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<DateTime<Utc>>,
}

/// New task creation payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewTask {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Task update payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct TaskUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct TaskListEnvelope {
    tasks: Vec<Task>,
}

/// Body of a task listing, either `{"tasks": [...]}` or a bare array
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum TaskListBody {
    Envelope(TaskListEnvelope),
    Bare(Vec<Task>),
}

impl From<TaskListBody> for Vec<Task> {
    fn from(body: TaskListBody) -> Self {
        match body {
            TaskListBody::Envelope(envelope) => envelope.tasks,
            TaskListBody::Bare(tasks) => tasks,
        }
    }
}

/// RFC 3339 or naive ISO-8601 timestamps; naive values are taken as UTC
mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|s| parse(&s).map_err(serde::de::Error::custom))
            .transpose()
    }

    pub fn parse(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .or_else(|_| {
                NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").map(|dt| dt.and_utc())
            })
    }
}
