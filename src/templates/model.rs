use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::facts::validation::{validate_required, ValidationError, ValidationErrors, Validator};
use crate::generation::StyleHints;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct Template {
    #[schema(example = "california-consumer")]
    pub id: String,
    #[schema(example = "California consumer refund")]
    pub name: String,
    #[schema(example = "Dear {{defendant}},\n\nWe write regarding ...")]
    pub content: String,
    #[schema(example = "CA")]
    pub jurisdiction: Option<String>,
    #[serde(default)]
    pub style: StyleHints,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct UpsertTemplateRequest {
    pub name: String,
    pub content: String,
    #[serde(default)]
    pub jurisdiction: Option<String>,
    #[serde(default)]
    pub style: StyleHints,
}

impl UpsertTemplateRequest {
    pub fn into_template(self, id: String) -> Template {
        Template {
            id,
            name: self.name.trim().to_string(),
            content: self.content,
            jurisdiction: self.jurisdiction.filter(|j| !j.trim().is_empty()),
            style: self.style,
            updated_at: Utc::now(),
        }
    }
}

fn slug_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9_-]{0,63}$").expect("slug regex"))
}

pub fn is_valid_slug(id: &str) -> bool {
    slug_regex().is_match(id)
}

impl Validator for Template {
    fn validate(&self) -> Result<(), String> {
        let mut errors = ValidationErrors::new();

        if !is_valid_slug(&self.id) {
            errors.add(
                ValidationError::new("id", "Template id must be a lowercase slug")
                    .with_suggestion("Use letters, digits, '-' or '_', e.g. 'california-consumer'"),
            );
        }
        validate_required(&self.name, "name", "Template name", &mut errors);
        validate_required(&self.content, "content", "Template content", &mut errors);

        errors.into_result()
    }
}
