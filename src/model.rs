use serde::{Deserialize, Serialize};

pub type ChannelId = String;
pub type MessageId = String;

/// Kind of upstream resource a change refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceType {
    SchoolNotice,
    TeacherAbsence,
    /// Any resource the relay does not render; keeps the raw portal tag for logs.
    Other(String),
}

impl ResourceType {
    pub fn from_portal(tag: &str) -> Self {
        match tag {
            "SchoolNotices" => ResourceType::SchoolNotice,
            "Calendars/TeacherFreeDays" => ResourceType::TeacherAbsence,
            other => ResourceType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ResourceType::SchoolNotice => "SchoolNotices",
            ResourceType::TeacherAbsence => "Calendars/TeacherFreeDays",
            ResourceType::Other(tag) => tag,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    Add,
    Edit,
    Delete,
    #[serde(other)]
    Unknown,
}

/// One upstream event, consumed once per successful cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub id: String,
    pub resource_type: ResourceType,
    pub operation: Operation,
    pub resource_id: String,
    pub resource_url: Option<String>,
    pub added_at: Option<String>,
    pub extra_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub id: String,
    pub subject: String,
    pub body: String,
    pub author_id: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub first_name: String,
    pub last_name: String,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Absence {
    pub teacher_id: String,
    pub reason: Option<String>,
    pub note: Option<String>,
    /// Portal text, kept as sent (`2024-03-04`).
    pub date_from: String,
    pub date_to: String,
    /// Portal text (`08:00`); `None` for whole-day absences.
    pub time_from: Option<String>,
    pub time_to: Option<String>,
    pub created_at: String,
}

impl Absence {
    /// Start of the absence, with the time of day appended when known.
    pub fn starts(&self) -> String {
        join_date_time(&self.date_from, self.time_from.as_deref())
    }

    pub fn ends(&self) -> String {
        join_date_time(&self.date_to, self.time_to.as_deref())
    }
}

fn join_date_time(date: &str, time: Option<&str>) -> String {
    match time {
        Some(time) => format!("{date} {time}"),
        None => date.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelKind {
    Text,
    Announcement,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: String,
    pub name: String,
}
