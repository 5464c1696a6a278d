use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::generation::{CriticStatus, GenerationResult, GenerationSource, StyleHints};

/// One immutable version of a letter for a facts record.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct Draft {
    pub facts_id: Uuid,
    #[schema(example = 1)]
    pub version: u32,
    #[schema(example = "## Introduction\n\nThis office represents John Doe.")]
    pub draft_markdown: String,
    pub issues: Vec<String>,
    pub explanations: BTreeMap<String, String>,
    pub change_log: Vec<String>,
    pub generated_at: DateTime<Utc>,
    pub source: GenerationSource,
    #[schema(example = "openai")]
    pub provider: String,
    pub input_tokens: Option<u32>,
    pub output_tokens: Option<u32>,
    /// Version this draft was copied from by a restore.
    pub restored_from: Option<u32>,
    /// Letterhead in effect at generation; the export default.
    #[serde(default)]
    pub letterhead: Option<String>,
}

/// Draft content before the store assigns its version.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDraft {
    pub draft_markdown: String,
    pub issues: Vec<String>,
    pub explanations: BTreeMap<String, String>,
    pub source: GenerationSource,
    pub provider: String,
    pub input_tokens: Option<u32>,
    pub output_tokens: Option<u32>,
    pub restored_from: Option<u32>,
    pub letterhead: Option<String>,
}

impl From<GenerationResult> for NewDraft {
    fn from(result: GenerationResult) -> Self {
        Self {
            draft_markdown: result.draft_markdown,
            issues: result.issues,
            explanations: result.explanations,
            source: result.source,
            provider: result.provider,
            input_tokens: result.input_tokens,
            output_tokens: result.output_tokens,
            restored_from: None,
            letterhead: None,
        }
    }
}

impl NewDraft {
    /// A copy of `draft`'s content, marked as restored from its version.
    pub fn restored(draft: &Draft) -> Self {
        Self {
            draft_markdown: draft.draft_markdown.clone(),
            issues: draft.issues.clone(),
            explanations: draft.explanations.clone(),
            source: draft.source,
            provider: draft.provider.clone(),
            input_tokens: None,
            output_tokens: None,
            restored_from: Some(draft.version),
            letterhead: draft.letterhead.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct GenerateRequest {
    #[schema(example = "california-consumer")]
    pub template_id: Option<String>,
    #[schema(example = "firm but courteous")]
    pub tone: Option<String>,
    #[schema(example = "Smith & Partners LLP")]
    pub letterhead: Option<String>,
}

impl GenerateRequest {
    pub fn style(&self) -> StyleHints {
        StyleHints {
            tone: self.tone.clone(),
            letterhead: self.letterhead.clone(),
            jurisdiction: None,
        }
    }
}

/// Stored draft plus what happened while generating it.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GenerateResponse {
    pub draft: Draft,
    pub attempts: u32,
    pub backoff_ms: Vec<u64>,
    pub critic: CriticStatus,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct ExportRequest {
    #[schema(example = "# Demand Letter\n\n## Introduction\n\nThis office represents John Doe.")]
    pub draft_markdown: String,
    pub letterhead: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ExportQuery {
    pub letterhead: Option<String>,
}

/// Version listing entry without the letter body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DraftSummary {
    pub version: u32,
    pub generated_at: DateTime<Utc>,
    pub source: GenerationSource,
    pub issue_count: usize,
    pub restored_from: Option<u32>,
}

impl From<&Draft> for DraftSummary {
    fn from(draft: &Draft) -> Self {
        Self {
            version: draft.version,
            generated_at: draft.generated_at,
            source: draft.source,
            issue_count: draft.issues.len(),
            restored_from: draft.restored_from,
        }
    }
}
