//! Draft versions

use chrono::Utc;
use uuid::Uuid;

use super::{DraftStore, StoreError};
use crate::drafts::changelog::change_log;
use crate::drafts::model::{Draft, NewDraft};

impl DraftStore {
    /// Append a draft as version `N + 1`, where `N` is the latest version.
    ///
    /// Version assignment for one facts record is serialized; different
    /// facts records proceed independently.
    pub async fn append_draft(&self, facts_id: Uuid, new: NewDraft) -> Result<Draft, StoreError> {
        self.ensure_facts(facts_id)?;

        let lock = self.version_lock(facts_id);
        let _guard = lock.lock().await;

        let previous = self
            .drafts
            .read()
            .get(&facts_id)
            .and_then(|versions| versions.last())
            .map(|d| (d.version, d.draft_markdown.clone()));

        let version = previous.as_ref().map_or(1, |(v, _)| v + 1);
        let mut log_entries = change_log(
            previous.as_ref().map(|(v, md)| (*v, md.as_str())),
            &new.draft_markdown,
        );
        if let Some(source_version) = new.restored_from {
            log_entries.insert(0, format!("restored from version {}", source_version));
        }

        let draft = Draft {
            facts_id,
            version,
            draft_markdown: new.draft_markdown,
            issues: new.issues,
            explanations: new.explanations,
            change_log: log_entries,
            generated_at: Utc::now(),
            source: new.source,
            provider: new.provider,
            input_tokens: new.input_tokens,
            output_tokens: new.output_tokens,
            restored_from: new.restored_from,
            letterhead: new.letterhead,
        };

        self.drafts
            .write()
            .entry(facts_id)
            .or_default()
            .push(draft.clone());
        log::info!("stored draft v{} for facts {}", version, facts_id);

        Ok(draft)
    }

    /// Every version for a facts record, oldest first.
    pub fn list_drafts(&self, facts_id: Uuid) -> Result<Vec<Draft>, StoreError> {
        self.ensure_facts(facts_id)?;
        Ok(self
            .drafts
            .read()
            .get(&facts_id)
            .cloned()
            .unwrap_or_default())
    }

    pub fn get_draft(&self, facts_id: Uuid, version: u32) -> Result<Draft, StoreError> {
        self.ensure_facts(facts_id)?;
        // versions are contiguous from 1, so version v sits at index v - 1
        self.drafts
            .read()
            .get(&facts_id)
            .and_then(|versions| versions.get((version as usize).checked_sub(1)?))
            .cloned()
            .ok_or(StoreError::DraftNotFound { facts_id, version })
    }

    pub fn latest_draft(&self, facts_id: Uuid) -> Result<Option<Draft>, StoreError> {
        self.ensure_facts(facts_id)?;
        Ok(self
            .drafts
            .read()
            .get(&facts_id)
            .and_then(|versions| versions.last())
            .cloned())
    }

    /// Copy version `version` forward as a new latest version.
    pub async fn restore_draft(&self, facts_id: Uuid, version: u32) -> Result<Draft, StoreError> {
        let source = self.get_draft(facts_id, version)?;
        self.append_draft(facts_id, NewDraft::restored(&source)).await
    }
}
