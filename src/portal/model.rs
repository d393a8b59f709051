//! Wire shapes of the portal's JSON responses.
use serde::Deserialize;

use crate::model::{Absence, ChangeRecord, Notice, Operation, ResourceType, User};

#[derive(Deserialize, Debug)]
pub struct IdRef {
    #[serde(rename = "Id", deserialize_with = "id_string")]
    pub id: String,
}

#[derive(Deserialize, Debug)]
pub struct PushChangesResp {
    #[serde(rename = "Changes", default)]
    pub changes: Vec<RawChange>,
}

#[derive(Deserialize, Debug)]
pub struct RawResource {
    #[serde(rename = "Id", deserialize_with = "id_string")]
    pub id: String,
    #[serde(rename = "Type")]
    pub typ: String,
    #[serde(rename = "Url", default)]
    pub url: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct RawChange {
    #[serde(rename = "Id", deserialize_with = "id_string")]
    pub id: String,
    #[serde(rename = "Resource")]
    pub resource: RawResource,
    #[serde(rename = "Type")]
    pub operation: Operation,
    #[serde(rename = "AddDate", default)]
    pub add_date: Option<String>,
    #[serde(rename = "extraData", default)]
    pub extra_data: Option<String>,
}

impl From<RawChange> for ChangeRecord {
    fn from(raw: RawChange) -> Self {
        ChangeRecord {
            id: raw.id,
            resource_type: ResourceType::from_portal(&raw.resource.typ),
            operation: raw.operation,
            resource_id: raw.resource.id,
            resource_url: raw.resource.url,
            added_at: raw.add_date,
            extra_text: raw.extra_data.filter(|t| !t.is_empty()),
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct SchoolNoticeResp {
    #[serde(rename = "SchoolNotice")]
    pub notice: RawNotice,
}

#[derive(Deserialize, Debug)]
pub struct RawNotice {
    #[serde(rename = "Id", deserialize_with = "id_string")]
    pub id: String,
    #[serde(rename = "Subject")]
    pub subject: String,
    #[serde(rename = "Content")]
    pub content: String,
    #[serde(rename = "AddedBy")]
    pub added_by: IdRef,
    #[serde(rename = "CreationDate")]
    pub creation_date: String,
}

impl From<RawNotice> for Notice {
    fn from(raw: RawNotice) -> Self {
        Notice {
            id: raw.id,
            subject: raw.subject,
            body: raw.content,
            author_id: raw.added_by.id,
            created_at: raw.creation_date,
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct UserResp {
    #[serde(rename = "User")]
    pub user: RawUser,
}

#[derive(Deserialize, Debug)]
pub struct RawUser {
    #[serde(rename = "FirstName")]
    pub first_name: String,
    #[serde(rename = "LastName")]
    pub last_name: String,
}

impl From<RawUser> for User {
    fn from(raw: RawUser) -> Self {
        User {
            first_name: raw.first_name,
            last_name: raw.last_name,
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct TeacherFreeDayResp {
    #[serde(rename = "TeacherFreeDay")]
    pub free_day: RawTeacherFreeDay,
}

#[derive(Deserialize, Debug)]
pub struct RawTeacherFreeDay {
    #[serde(rename = "Teacher")]
    pub teacher: IdRef,
    #[serde(rename = "DateFrom")]
    pub date_from: String,
    #[serde(rename = "DateTo")]
    pub date_to: String,
    #[serde(rename = "TimeFrom", default)]
    pub time_from: Option<String>,
    #[serde(rename = "TimeTo", default)]
    pub time_to: Option<String>,
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
    #[serde(rename = "Reason", default)]
    pub reason: Option<String>,
    #[serde(rename = "AddDate")]
    pub add_date: String,
}

impl From<RawTeacherFreeDay> for Absence {
    fn from(raw: RawTeacherFreeDay) -> Self {
        Absence {
            teacher_id: raw.teacher.id,
            reason: raw.reason.filter(|r| !r.is_empty()),
            note: raw.name.filter(|n| !n.is_empty()),
            date_from: raw.date_from,
            date_to: raw.date_to,
            time_from: raw.time_from.filter(|t| !t.is_empty()),
            time_to: raw.time_to.filter(|t| !t.is_empty()),
            created_at: raw.add_date,
        }
    }
}

/// The portal sends ids as numbers for some resources and strings for others.
fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumOrStr {
        Num(i64),
        Str(String),
    }
    Ok(match NumOrStr::deserialize(deserializer)? {
        NumOrStr::Num(n) => n.to_string(),
        NumOrStr::Str(s) => s,
    })
}
