//! Class-role interest rules.
//!
//! A role named like `3B` or `2e4` stands for a school class. Its rule finds
//! loosely written references to that class in prose, e.g. `3bi` inside
//! "w klasach 3bi i 3c" matches both `3B` and `3I`.

use once_cell::sync::Lazy;
use regex::Regex;

static CLASS_ROLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([1-4])([A-Ia-i])(?:3|4)?$").expect("valid class role regex"));

#[derive(Debug, Clone)]
pub struct InterestRule {
    pub group_id: String,
    pub group_name: String,
    pattern: Regex,
}

impl InterestRule {
    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }
}

/// Build a rule for a group whose name follows the class naming convention.
pub fn compile_rule(group_id: &str, group_name: &str) -> Option<InterestRule> {
    let caps = CLASS_ROLE.captures(group_name)?;
    let year = &caps[1];
    let letter = &caps[2];
    let source = format!(
        "{year}[A-Ia-i]*[{}{}][A-Ia-i]*",
        letter.to_uppercase(),
        letter.to_lowercase()
    );
    // The source only ever contains a digit and class letters.
    let pattern = Regex::new(&source).ok()?;
    Some(InterestRule {
        group_id: group_id.to_string(),
        group_name: group_name.to_string(),
        pattern,
    })
}

/// Result of running a recipient's rules over a text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Highlight {
    /// Matching group ids in rule order, without duplicates.
    pub mention_ids: Vec<String>,
    pub text: String,
}

impl Highlight {
    pub fn mention_line(&self) -> String {
        self.mention_ids
            .iter()
            .map(|id| format!("<@&{id}>"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

pub fn apply_rules(text: &str, rules: &[InterestRule]) -> Highlight {
    let mut mention_ids: Vec<String> = Vec::new();
    let mut spans: Vec<(usize, usize)> = Vec::new();

    for rule in rules {
        let before = spans.len();
        spans.extend(rule.pattern.find_iter(text).map(|m| (m.start(), m.end())));
        if spans.len() > before && !mention_ids.contains(&rule.group_id) {
            mention_ids.push(rule.group_id.clone());
        }
    }

    Highlight {
        mention_ids,
        text: embolden(text, merge_spans(spans)),
    }
}

/// Sort and coalesce overlapping or touching spans.
fn merge_spans(mut spans: Vec<(usize, usize)>) -> Vec<(usize, usize)> {
    spans.sort_unstable();
    let mut merged: Vec<(usize, usize)> = Vec::with_capacity(spans.len());
    for (start, end) in spans {
        match merged.last_mut() {
            Some(last) if start <= last.1 => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }
    merged
}

fn embolden(text: &str, spans: Vec<(usize, usize)>) -> String {
    let mut out = String::with_capacity(text.len() + spans.len() * 4);
    let mut cursor = 0;
    for (start, end) in spans {
        if text[..start].ends_with("**") && text[end..].starts_with("**") {
            continue;
        }
        out.push_str(&text[cursor..start]);
        out.push_str("**");
        out.push_str(&text[start..end]);
        out.push_str("**");
        cursor = end;
    }
    out.push_str(&text[cursor..]);
    out
}
