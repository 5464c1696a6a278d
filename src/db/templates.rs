//! Letter templates

use super::{DraftStore, StoreError};
use crate::facts::Validator;
use crate::templates::model::Template;

impl DraftStore {
    /// Insert or replace a template. Returns whether it was newly created.
    pub fn upsert_template(&self, template: Template) -> Result<(Template, bool), StoreError> {
        template.validate().map_err(StoreError::Validation)?;

        let created = self
            .templates
            .write()
            .insert(template.id.clone(), template.clone())
            .is_none();
        log::info!(
            "{} template '{}'",
            if created { "created" } else { "updated" },
            template.id
        );
        Ok((template, created))
    }

    pub fn get_template(&self, id: &str) -> Result<Template, StoreError> {
        self.templates
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::TemplateNotFound(id.to_string()))
    }

    /// All templates ordered by id.
    pub fn list_templates(&self) -> Vec<Template> {
        let mut templates: Vec<Template> = self.templates.read().values().cloned().collect();
        templates.sort_by(|a, b| a.id.cmp(&b.id));
        templates
    }
}
