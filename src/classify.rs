use crate::model::{ChangeRecord, Operation, ResourceType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Edited,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    UnknownResource,
    UnknownOperation,
}

/// What the relay does with one change record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handling {
    EditSchoolNotice(ChangeKind),
    /// Deleted notices have no retrievable content; logged and skipped.
    DeleteSchoolNotice,
    EditTeacherAbsence(ChangeKind),
    DeleteTeacherAbsence,
    Ignore(IgnoreReason),
}

pub fn classify(record: &ChangeRecord) -> Handling {
    let kind = match record.operation {
        Operation::Add => Some(ChangeKind::Added),
        Operation::Edit => Some(ChangeKind::Edited),
        Operation::Delete => None,
        Operation::Unknown => return Handling::Ignore(IgnoreReason::UnknownOperation),
    };
    match (&record.resource_type, kind) {
        (ResourceType::SchoolNotice, Some(kind)) => Handling::EditSchoolNotice(kind),
        (ResourceType::SchoolNotice, None) => Handling::DeleteSchoolNotice,
        (ResourceType::TeacherAbsence, Some(kind)) => Handling::EditTeacherAbsence(kind),
        (ResourceType::TeacherAbsence, None) => Handling::DeleteTeacherAbsence,
        (ResourceType::Other(_), _) => Handling::Ignore(IgnoreReason::UnknownResource),
    }
}
