//! Deterministic fallback letter used when the provider cannot draft one.
//!
//! Only fields present in the facts are written out. Each missing field is
//! rendered as exactly one placeholder token, and the liability analysis is
//! always left as a placeholder since it needs legal reasoning.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::facts::{DamageItem, Facts, MissingField};

use super::placeholder::placeholder;
use super::prompt::SECTIONS;

pub const LIABILITY_LABEL: &str = "liability analysis";

/// Format a dollar amount as `$1,234` or `$1,234.50`.
pub fn format_currency(amount: f64) -> String {
    let cents = (amount * 100.0).round() as i64;
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.abs();
    let dollars = (cents / 100).to_string();

    let mut grouped = String::with_capacity(dollars.len() + dollars.len() / 3);
    for (i, ch) in dollars.chars().enumerate() {
        if i > 0 && (dollars.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match cents % 100 {
        0 => format!("{sign}${grouped}"),
        rem => format!("{sign}${grouped}.{rem:02}"),
    }
}

fn value_or_placeholder(value: Option<&str>, field: MissingField) -> String {
    match value {
        Some(v) => v.to_string(),
        None => placeholder(field.label()),
    }
}

fn push_items(out: &mut String, heading: &str, items: &[DamageItem]) {
    if items.is_empty() {
        return;
    }
    out.push_str(&format!("**{heading}:**\n\n"));
    for item in items {
        out.push_str(&format!("- {}: {}\n", item.item, format_currency(item.amount)));
    }
    out.push('\n');
}

/// Build the fallback letter for `facts`, dated `date`.
pub fn fallback_markdown(facts: &Facts, date: NaiveDate) -> String {
    let plaintiff = &facts.parties.plaintiff;
    let defendant = &facts.parties.defendant;
    let mut out = String::new();

    out.push_str("# Demand Letter\n\n");

    out.push_str(&format!("## {}\n\n", SECTIONS[0]));
    out.push_str(&format!("{}\n\n", date.format("%B %-d, %Y")));
    out.push_str(&format!("**To:** {defendant}\n\n"));
    out.push_str(&format!("**Re:** Demand on behalf of {plaintiff}\n\n"));

    out.push_str(&format!("## {}\n\n", SECTIONS[1]));
    out.push_str(&format!(
        "This office, {}, represents {plaintiff} in connection with the matter described below. \
         Please direct all further communication regarding this matter to the undersigned.\n\n",
        value_or_placeholder(facts.parties.firm.as_deref(), MissingField::FirmName)
    ));

    out.push_str(&format!("## {}\n\n", SECTIONS[2]));
    out.push_str(&format!(
        "On {}, the following occurred: {}\n\n",
        value_or_placeholder(facts.incident_date.as_deref(), MissingField::IncidentDate),
        facts.incident
    ));
    if let Some(category) = facts.category.as_deref() {
        out.push_str(&format!("This matter concerns: {category}.\n\n"));
    }
    out.push_str(&format!(
        "Venue for any proceedings: {}.\n\n",
        value_or_placeholder(facts.venue.as_deref(), MissingField::Venue)
    ));

    out.push_str(&format!("## {}\n\n", SECTIONS[3]));
    out.push_str(&format!("{}\n\n", placeholder(LIABILITY_LABEL)));

    out.push_str(&format!("## {}\n\n", SECTIONS[4]));
    let amount = facts.damages.amount_claimed.map(format_currency);
    out.push_str(&format!(
        "{plaintiff} claims damages totaling **{}**.\n\n",
        amount
            .clone()
            .unwrap_or_else(|| placeholder(MissingField::AmountClaimed.label()))
    ));
    if facts.damages.has_breakdown() {
        push_items(&mut out, "Special damages", &facts.damages.specials);
        push_items(&mut out, "General damages", &facts.damages.generals);
    } else {
        out.push_str(&format!(
            "Itemized breakdown: {}\n\n",
            placeholder(MissingField::DamagesBreakdown.label())
        ));
    }

    out.push_str(&format!("## {}\n\n", SECTIONS[5]));
    let demanded = amount
        .map(|a| format!("**{a}**"))
        .unwrap_or_else(|| "the amount stated above".to_string());
    let deadline = match facts.demand_deadline_days {
        Some(days) => format!("**{days} days** of the date of this letter"),
        None => placeholder(MissingField::DemandDeadline.label()),
    };
    out.push_str(&format!(
        "We demand that {defendant} pay {demanded} within {deadline}. \
         If we do not receive a satisfactory response, {plaintiff} reserves all rights and remedies.\n\n"
    ));

    out.push_str(&format!("## {}\n\n", SECTIONS[6]));
    if facts.exhibits.is_empty() {
        out.push_str(&format!("{}\n\n", placeholder(MissingField::Exhibits.label())));
    } else {
        for (i, exhibit) in facts.exhibits.iter().enumerate() {
            let letter = exhibit_letter(i);
            match exhibit.description.as_deref() {
                Some(description) => {
                    out.push_str(&format!("- Exhibit {letter}: {}: {description}\n", exhibit.name))
                }
                None => out.push_str(&format!("- Exhibit {letter}: {}\n", exhibit.name)),
            }
        }
        out.push('\n');
    }

    out.push_str("Sincerely,\n\n");
    out.push_str(&value_or_placeholder(
        facts.parties.attorney.as_deref(),
        MissingField::AttorneyName,
    ));
    if let Some(firm) = facts.parties.firm.as_deref() {
        out.push_str(&format!("  \n{firm}"));
    }
    out.push('\n');

    out
}

/// Exhibit labels: A..Z, then AA, AB, ...
fn exhibit_letter(index: usize) -> String {
    let mut n = index;
    let mut label = Vec::new();
    loop {
        label.push((b'A' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    label.iter().rev().collect()
}

/// Rationale entries recorded for a fallback draft.
pub fn fallback_explanations() -> BTreeMap<String, String> {
    SECTIONS
        .iter()
        .map(|section| {
            let reason = if *section == SECTIONS[3] {
                "Left as a placeholder; liability analysis requires a generated or attorney-written draft."
            } else {
                "Filled from the fallback template using only the stored facts."
            };
            (section.to_string(), reason.to_string())
        })
        .collect()
}
