//! Section-level change log between consecutive draft versions.

/// `(heading, body)` pairs split on `##` headings. Text before the first
/// `##` heading is keyed by an empty heading.
fn sections(markdown: &str) -> Vec<(String, String)> {
    let mut sections: Vec<(String, String)> = vec![(String::new(), String::new())];

    for line in markdown.lines() {
        if let Some(heading) = line.strip_prefix("## ") {
            sections.push((heading.trim().to_string(), String::new()));
            continue;
        }
        if let Some((_, body)) = sections.last_mut() {
            body.push_str(line.trim_end());
            body.push('\n');
        }
    }

    for (_, body) in &mut sections {
        *body = body.trim().to_string();
    }
    sections.retain(|(heading, body)| !heading.is_empty() || !body.is_empty());
    sections
}

fn label(heading: &str) -> String {
    if heading.is_empty() {
        "preamble".to_string()
    } else {
        format!("section \"{}\"", heading)
    }
}

/// Describe how `next` differs from `previous`, section by section.
pub fn change_log(previous: Option<(u32, &str)>, next: &str) -> Vec<String> {
    let Some((previous_version, previous)) = previous else {
        return vec!["initial draft".to_string()];
    };

    let before = sections(previous);
    let after = sections(next);
    let mut entries = Vec::new();

    for (heading, body) in &after {
        match before.iter().find(|(h, _)| h == heading) {
            None => entries.push(format!("added {}", label(heading))),
            Some((_, old)) if old != body => entries.push(format!("changed {}", label(heading))),
            Some(_) => {}
        }
    }
    for (heading, _) in &before {
        if !after.iter().any(|(h, _)| h == heading) {
            entries.push(format!("removed {}", label(heading)));
        }
    }

    if entries.is_empty() {
        entries.push(format!("no changes from version {}", previous_version));
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_version_is_initial() {
        assert_eq!(change_log(None, "## Demand\nPay."), vec!["initial draft"]);
    }

    #[test]
    fn test_detects_added_changed_removed() {
        let v1 = "# Letter\n\n## Introduction\nHello.\n\n## Liability\n[MISSING: liability analysis]\n";
        let v2 = "# Letter\n\n## Introduction\nHello.\n\n## Damages\n$500\n\n## Liability\nACME breached.\n";
        assert_eq!(
            change_log(Some((1, v1)), v2),
            vec![
                "added section \"Damages\"".to_string(),
                "changed section \"Liability\"".to_string(),
            ]
        );

        let v3 = "# Letter\n\n## Introduction\nHello.\n";
        assert_eq!(
            change_log(Some((2, v2)), v3),
            vec![
                "removed section \"Damages\"".to_string(),
                "removed section \"Liability\"".to_string(),
            ]
        );
    }

    #[test]
    fn test_identical_drafts_report_no_changes() {
        let md = "## Demand\nPay **$500**.\n";
        assert_eq!(
            change_log(Some((4, md)), md),
            vec!["no changes from version 4".to_string()]
        );
    }

    #[test]
    fn test_whitespace_only_edits_are_ignored() {
        assert_eq!(
            change_log(Some((1, "## A\ntext  \n\n")), "## A\n\ntext\n"),
            vec!["no changes from version 1".to_string()]
        );
    }
}
