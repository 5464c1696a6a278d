//! Prompt construction for drafting and for the critic pass.
//!
//! Every prompt is a pure function of its inputs so identical facts and hints
//! always produce identical provider requests.

use crate::facts::Facts;

use super::parser::{EXPLANATIONS_MARKER, NO_FINDINGS, SECTION_TAG, UNSUPPORTED_TAG};
use super::placeholder::placeholder;
use super::provider::Prompt;
use super::StyleHints;

/// The seven mandatory sections, as `##` headings, in letter order.
pub const SECTIONS: [&str; 7] = [
    "Recipient and Date",
    "Introduction",
    "Statement of Facts",
    "Liability",
    "Damages",
    "Demand",
    "Exhibits",
];

pub const DRAFT_SYSTEM_PROMPT: &str = r#"You are a careful litigation assistant who drafts pre-suit demand letters.

Follow these rules precisely:

1. SOURCE OF TRUTH
   - Use ONLY the information in the CASE FACTS JSON
   - Never invent names, dates, amounts, addresses, statutes, or events
   - A field that is null, empty, or absent is MISSING

2. MISSING INFORMATION
   - Wherever the letter needs a missing fact, write the token [MISSING: <field>]
   - Do not omit the sentence and do not guess a value
   - Use the field names given in KNOWN MISSING FIELDS when they apply

3. FORMAT
   - Output markdown only, without code fences
   - Use exactly the `##` section headings listed in REQUIRED SECTIONS, in order
   - Use **bold** for amounts and deadlines, bullet lists for damages and exhibits"#;

pub const CRITIC_SYSTEM_PROMPT: &str = r#"You review demand letters for statements that the case facts do not support.

Compare every factual sentence in the DRAFT with the CASE FACTS JSON. A sentence is unsupported when it asserts a name, date, amount, event, or legal conclusion that cannot be traced to the facts. Placeholder tokens like [MISSING: venue] are always acceptable."#;

fn facts_json(facts: &Facts) -> String {
    serde_json::to_string_pretty(facts).unwrap_or_else(|e| {
        log::warn!("failed to serialize facts for prompt: {}", e);
        String::from("{}")
    })
}

fn missing_fields_line(facts: &Facts) -> String {
    let missing: Vec<&str> = facts.missing_fields().iter().map(|f| f.label()).collect();
    if missing.is_empty() {
        "none".to_string()
    } else {
        missing.join(", ")
    }
}

/// Build the drafting prompt.
pub fn build_draft_prompt(
    facts: &Facts,
    template: Option<&str>,
    style: Option<&StyleHints>,
) -> Prompt {
    let mut user = String::new();

    user.push_str("Draft a demand letter from the case facts below.\n\n");
    user.push_str("CASE FACTS (JSON):\n");
    user.push_str(&facts_json(facts));
    user.push_str("\n\nKNOWN MISSING FIELDS: ");
    user.push_str(&missing_fields_line(facts));

    user.push_str("\n\nREQUIRED SECTIONS (use these exact headings, in this order):\n");
    for section in SECTIONS {
        user.push_str("## ");
        user.push_str(section);
        user.push('\n');
    }

    user.push_str(&format!(
        "\nThe Demand section must state the amount demanded and a response deadline; \
         if the deadline is missing write {} instead of choosing one. \
         The Liability section must rely only on the incident narrative.\n",
        placeholder("demand deadline")
    ));

    user.push_str(&format!(
        "\nRATIONALE BLOCK: after the letter, write a line containing exactly {EXPLANATIONS_MARKER} \
         and then one line per section in the form\n{SECTION_TAG} <section heading>] <one-sentence reason for what the section says>\n"
    ));

    if let Some(style) = style {
        if let Some(tone) = style.tone.as_deref() {
            user.push_str(&format!("\nTONE: {tone}\n"));
        }
        if let Some(letterhead) = style.letterhead.as_deref() {
            user.push_str(&format!(
                "\nLETTERHEAD: the letter will be printed under \"{letterhead}\"; do not repeat it in the body.\n"
            ));
        }
        if let Some(jurisdiction) = style.jurisdiction.as_deref() {
            user.push_str(&format!(
                "\nJURISDICTION: {jurisdiction}. Cite only law of this jurisdiction, and only where the facts support it.\n"
            ));
        }
    }

    if let Some(template) = template.filter(|t| !t.trim().is_empty()) {
        user.push_str(
            "\nTEMPLATE (follow its structure and wording where the facts allow):\n",
        );
        user.push_str(template.trim());
        user.push('\n');
    }

    Prompt {
        system: DRAFT_SYSTEM_PROMPT.to_string(),
        user,
    }
}

/// Build the critic-pass prompt for a finished draft body.
pub fn build_critic_prompt(facts: &Facts, draft_markdown: &str) -> Prompt {
    let user = format!(
        "CASE FACTS (JSON):\n{}\n\nDRAFT:\n{}\n\n\
         List every unsupported sentence, one per line, in the form\n\
         {UNSUPPORTED_TAG} <exact sentence> | REASON: <why it is unsupported>\n\
         If every sentence is supported, reply with the single word {NO_FINDINGS}.\n",
        facts_json(facts),
        draft_markdown.trim()
    );

    Prompt {
        system: CRITIC_SYSTEM_PROMPT.to_string(),
        user,
    }
}
