//! Unresolved-placeholder tokens.
//!
//! Wherever a letter needs information the facts do not contain, the draft
//! carries `[MISSING: <field>]` instead of invented prose.

use regex::Regex;
use std::sync::OnceLock;

pub const PLACEHOLDER_PREFIX: &str = "[MISSING: ";

/// Format the placeholder token for a missing field label.
pub fn placeholder(label: &str) -> String {
    format!("{PLACEHOLDER_PREFIX}{label}]")
}

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[MISSING:\s*([^\]\s][^\]\n]*?)\s*\]").expect("placeholder regex"))
}

/// Labels of every placeholder token in `text`, in order of appearance.
pub fn find_placeholders(text: &str) -> Vec<String> {
    placeholder_regex()
        .captures_iter(text)
        .map(|caps| caps[1].to_string())
        .collect()
}

pub fn count_placeholders(text: &str) -> usize {
    placeholder_regex().find_iter(text).count()
}

/// Summary issue for a draft body, or `None` when the draft is complete.
pub fn placeholder_issue(count: usize) -> Option<String> {
    (count > 0).then(|| {
        format!("draft contains {count} placeholder(s) for missing information")
    })
}
