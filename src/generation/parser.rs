//! Provider response parsing.
//!
//! The marker syntax lives entirely behind [`ResponseParser`], so a
//! structured-output parser can replace it without touching the adapter.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

/// Line separating the letter from the rationale block.
pub const EXPLANATIONS_MARKER: &str = "---EXPLANATIONS---";
/// Prefix of one rationale entry: `[SECTION: <name>] <reason>`.
pub const SECTION_TAG: &str = "[SECTION:";
/// Prefix of one critic finding: `UNSUPPORTED: <sentence> | REASON: <why>`.
pub const UNSUPPORTED_TAG: &str = "UNSUPPORTED:";
/// Critic reply meaning "nothing to report".
pub const NO_FINDINGS: &str = "NONE";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedDraft {
    pub body: String,
    pub explanations: BTreeMap<String, String>,
}

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("provider response contained no draft body")]
    EmptyBody,
}

pub trait ResponseParser: Send + Sync {
    /// Split a drafting response into letter body and per-section rationale.
    fn parse_draft(&self, raw: &str) -> Result<ParsedDraft, ParseError>;

    /// Extract unsupported-claim issue strings from a critic response.
    fn parse_critique(&self, raw: &str) -> Vec<String>;
}

/// Parser for the line-marker syntax requested by the prompts.
#[derive(Debug, Default, Clone, Copy)]
pub struct MarkerResponseParser;

fn section_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(?:[-*]\s+)?\[SECTION:\s*([^\]]+?)\s*\]\s*:?\s*(.*)$")
            .expect("section regex")
    })
}

fn unsupported_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*(?:[-*]\s+|\d+\.\s+)?UNSUPPORTED:\s*(.+?)\s*(?:\|\s*REASON:\s*(.*?))?\s*$")
            .expect("unsupported regex")
    })
}

/// Strip a ```markdown fence the model may have wrapped the letter in.
fn strip_code_fence(body: &str) -> &str {
    let trimmed = body.trim();
    if let Some(rest) = trimmed.strip_prefix("```") {
        let rest = rest.split_once('\n').map(|(_, r)| r).unwrap_or("");
        return rest.trim_end().strip_suffix("```").unwrap_or(rest).trim();
    }
    trimmed
}

impl MarkerResponseParser {
    fn parse_explanations(block: &str) -> BTreeMap<String, String> {
        let mut explanations = BTreeMap::new();
        let mut current: Option<(String, String)> = None;

        for line in block.lines() {
            if let Some(caps) = section_regex().captures(line) {
                if let Some((name, reason)) = current.take() {
                    explanations.insert(name, reason);
                }
                current = Some((caps[1].to_string(), caps[2].trim().to_string()));
            } else if let Some((_, reason)) = current.as_mut() {
                let line = line.trim();
                if !line.is_empty() {
                    if !reason.is_empty() {
                        reason.push(' ');
                    }
                    reason.push_str(line);
                }
            }
        }

        if let Some((name, reason)) = current {
            explanations.insert(name, reason);
        }
        explanations
    }
}

impl ResponseParser for MarkerResponseParser {
    fn parse_draft(&self, raw: &str) -> Result<ParsedDraft, ParseError> {
        let mut body_lines = Vec::new();
        let mut rest = None;

        let mut lines = raw.lines();
        for line in lines.by_ref() {
            if line.trim() == EXPLANATIONS_MARKER {
                rest = Some(lines.by_ref().collect::<Vec<_>>().join("\n"));
                break;
            }
            body_lines.push(line);
        }

        let joined = body_lines.join("\n");
        let body = strip_code_fence(&joined);
        if body.is_empty() {
            return Err(ParseError::EmptyBody);
        }

        let explanations = match rest {
            Some(block) => {
                let parsed = Self::parse_explanations(&block);
                if parsed.is_empty() {
                    log::warn!("explanation marker present but no section entries matched");
                }
                parsed
            }
            None => {
                log::warn!("provider response has no explanation block");
                BTreeMap::new()
            }
        };

        Ok(ParsedDraft {
            body: body.to_string(),
            explanations,
        })
    }

    fn parse_critique(&self, raw: &str) -> Vec<String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(NO_FINDINGS) {
            return Vec::new();
        }

        let findings: Vec<String> = trimmed
            .lines()
            .filter_map(|line| unsupported_regex().captures(line))
            .map(|caps| {
                let sentence = caps[1].trim().trim_matches('"');
                match caps.get(2).map(|m| m.as_str().trim()).filter(|r| !r.is_empty()) {
                    Some(reason) => format!("unsupported claim: \"{sentence}\" ({reason})"),
                    None => format!("unsupported claim: \"{sentence}\""),
                }
            })
            .collect();

        if findings.is_empty() {
            log::warn!("critic response matched no findings; treating as none");
        }
        findings
    }
}
