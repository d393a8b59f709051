//! Rendering of notices and teacher absences into chat messages.

use crate::classify::ChangeKind;
use crate::matcher::{apply_rules, InterestRule};
use crate::model::{Absence, Notice, User};

/// Longest embed description the chat accepts, in characters.
pub const MAX_DESCRIPTION_LEN: usize = 4096;

pub const NOTICE_COLOR: u32 = 0xD3A5FF;
pub const ABSENCE_COLOR: u32 = 0xE56390;

const SCHEDULE_KEYWORDS: [&str; 6] = [
    "zmiany w planie",
    "poniedziałek",
    "wtorek",
    "środa",
    "czwartek",
    "piątek",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Embed {
    pub color: u32,
    pub author: Option<String>,
    pub title: String,
    pub description: String,
    pub fields: Vec<EmbedField>,
    pub footer: String,
}

/// Plain header line plus one rich embed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub header: String,
    pub embed: Embed,
}

impl OutboundMessage {
    /// Same message with the footer extended by the time of the last edit.
    pub fn with_edit_footer(mut self, created_at: &str, edited_at: &str) -> Self {
        self.embed.footer = format!("Dodano: {created_at} | Ostatnia zmiana: {edited_at}");
        self
    }
}

/// Whether a notice subject announces schedule changes.
pub fn is_schedule_change(subject: &str) -> bool {
    let subject = subject.to_lowercase();
    SCHEDULE_KEYWORDS.iter().any(|k| subject.contains(k))
}

pub fn notice_header(kind: ChangeKind) -> &'static str {
    match kind {
        ChangeKind::Added => "Nowe ogłoszenie w Librusie",
        ChangeKind::Edited => "Ogłoszenie w Librusie (Zmienione)",
    }
}

/// Render a school notice for one recipient, tagging its interest rules when
/// the notice is a schedule change.
pub fn render_notice(
    kind: ChangeKind,
    notice: &Notice,
    author: &User,
    rules: &[InterestRule],
) -> OutboundMessage {
    let mut header = format!("**{}**\n", notice_header(kind));
    let mut description = notice.body.clone();

    if !rules.is_empty() && is_schedule_change(&notice.subject) {
        let highlight = apply_rules(&notice.body, rules);
        if !highlight.mention_ids.is_empty() {
            header.push_str(&highlight.mention_line());
        }
        description = highlight.text;
    }

    OutboundMessage {
        header,
        embed: Embed {
            color: NOTICE_COLOR,
            author: Some(author.full_name()),
            title: format!("**__{}__**", notice.subject),
            description: truncate_chars(&description, MAX_DESCRIPTION_LEN),
            fields: Vec::new(),
            footer: format!("Dodano: {}", notice.created_at),
        },
    }
}

pub fn absence_header(kind: Option<ChangeKind>) -> &'static str {
    match kind {
        Some(ChangeKind::Added) => "Dodano nieobecność nauczyciela",
        Some(ChangeKind::Edited) => "Zmieniono nieobecność nauczyciela",
        None => "Usunięto nieobecność nauczyciela",
    }
}

/// Render a teacher absence. `kind` is `None` for deletions.
pub fn render_absence(
    kind: Option<ChangeKind>,
    absence: &Absence,
    teacher: &User,
    extra_text: Option<&str>,
) -> OutboundMessage {
    let mut description = String::new();
    for line in [extra_text, absence.note.as_deref()]
        .into_iter()
        .flatten()
        .filter(|l| !l.is_empty())
    {
        description.push('\n');
        description.push_str(line);
    }

    let mut fields = vec![
        EmbedField {
            name: "Od:".into(),
            value: absence.starts(),
        },
        EmbedField {
            name: "Do:".into(),
            value: absence.ends(),
        },
    ];
    if let Some(reason) = absence.reason.as_deref().filter(|r| !r.is_empty()) {
        fields.push(EmbedField {
            name: "Powód:".into(),
            value: reason.to_string(),
        });
    }

    OutboundMessage {
        header: format!("**{}**", absence_header(kind)),
        embed: Embed {
            color: ABSENCE_COLOR,
            author: None,
            title: teacher.full_name(),
            description: truncate_chars(&description, MAX_DESCRIPTION_LEN),
            fields,
            footer: format!("Dodano: {}", absence.created_at),
        },
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
