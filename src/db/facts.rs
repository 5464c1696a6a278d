//! Facts records

use std::path::Path;

use anyhow::Context;
use uuid::Uuid;

use super::{DraftStore, StoreError};
use crate::facts::{Facts, FactsRecord, ImportReport, ImportedFacts, RejectedFacts, Validator};

impl DraftStore {
    /// Normalize, validate and store a new facts record.
    pub fn create_facts(&self, facts: Facts) -> Result<FactsRecord, StoreError> {
        let facts = facts.normalized();
        facts.validate().map_err(StoreError::Validation)?;

        let record = FactsRecord::new(facts);
        self.facts.write().insert(record.id, record.clone());
        log::info!(
            "created facts {} ({} v. {})",
            record.id,
            record.facts.parties.plaintiff,
            record.facts.parties.defendant
        );
        Ok(record)
    }

    /// Store every valid record of `batch`; invalid ones are reported by
    /// index and do not stop the rest.
    pub fn import_facts(&self, batch: Vec<Facts>) -> ImportReport {
        let mut report = ImportReport::default();
        for (index, facts) in batch.into_iter().enumerate() {
            match self.create_facts(facts) {
                Ok(record) => report.imported.push(ImportedFacts {
                    index,
                    id: record.id,
                }),
                Err(e) => {
                    log::debug!("import record {} rejected: {}", index, e);
                    report.rejected.push(RejectedFacts {
                        index,
                        message: e.to_string(),
                    });
                }
            }
        }
        log::info!(
            "imported {} facts record(s), rejected {}",
            report.imported.len(),
            report.rejected.len()
        );
        report
    }

    /// Import a JSON array of facts from `path`.
    pub fn seed_facts(&self, path: &Path) -> anyhow::Result<ImportReport> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read facts seed {}", path.display()))?;
        let batch: Vec<Facts> = serde_json::from_str(&raw)
            .with_context(|| format!("facts seed {} is not a JSON array of facts", path.display()))?;
        Ok(self.import_facts(batch))
    }

    pub fn get_facts(&self, id: Uuid) -> Result<FactsRecord, StoreError> {
        self.facts
            .read()
            .get(&id)
            .cloned()
            .ok_or(StoreError::FactsNotFound(id))
    }

    /// All facts records, oldest first.
    pub fn list_facts(&self) -> Vec<FactsRecord> {
        let mut records: Vec<FactsRecord> = self.facts.read().values().cloned().collect();
        records.sort_by_key(|r| r.created_at);
        records
    }

    pub(crate) fn ensure_facts(&self, id: Uuid) -> Result<(), StoreError> {
        if self.facts.read().contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::FactsNotFound(id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facts() -> Facts {
        serde_json::from_value(serde_json::json!({
            "parties": { "plaintiff": " John Doe ", "defendant": "ACME Corp", "firm": "" },
            "incident": "defective product, no refund"
        }))
        .unwrap()
    }

    #[test]
    fn test_create_normalizes_and_get_returns_record() {
        let store = DraftStore::new();
        let record = store.create_facts(facts()).unwrap();
        assert_eq!(record.facts.parties.plaintiff, "John Doe");
        assert!(record.facts.parties.firm.is_none());
        assert_eq!(store.get_facts(record.id).unwrap().id, record.id);
        assert_eq!(store.list_facts().len(), 1);
    }

    #[test]
    fn test_invalid_facts_are_rejected() {
        let store = DraftStore::new();
        let mut invalid = facts();
        invalid.incident = "   ".into();
        match store.create_facts(invalid) {
            Err(StoreError::Validation(message)) => assert!(message.contains("incident")),
            other => panic!("expected validation error, got {:?}", other.map(|r| r.id)),
        }
        assert!(store.list_facts().is_empty());
    }

    fn complaint(company: &str, narrative: &str) -> serde_json::Value {
        serde_json::json!({
            "parties": { "plaintiff": "Consumer", "defendant": company },
            "incident": narrative,
            "damages": { "amount_claimed": null },
            "venue": "CA",
            "category": "Credit reporting",
            "incident_date": "2024-03-02"
        })
    }

    #[test]
    fn test_import_keeps_valid_records_and_reports_invalid_ones() {
        let store = DraftStore::new();
        let batch: Vec<Facts> = serde_json::from_value(serde_json::json!([
            complaint("ACME Bank", "Charged twice for the same statement and refused a refund."),
            complaint("Globex Credit", "   "),
            complaint("Initech Loans", "Reported a paid-off loan as delinquent for six months."),
        ]))
        .unwrap();

        let report = store.import_facts(batch);
        assert_eq!(
            report.imported.iter().map(|i| i.index).collect::<Vec<_>>(),
            vec![0, 2]
        );
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].index, 1);
        assert!(report.rejected[0].message.contains("incident"));

        let stored = store.get_facts(report.imported[0].id).unwrap();
        assert_eq!(stored.facts.venue.as_deref(), Some("CA"));
        assert_eq!(stored.facts.category.as_deref(), Some("Credit reporting"));
        assert_eq!(stored.facts.incident_date.as_deref(), Some("2024-03-02"));
        assert!(stored.facts.damages.amount_claimed.is_none());
        assert_eq!(store.list_facts().len(), 2);
    }

    #[test]
    fn test_seed_file_is_imported() {
        let path = std::env::temp_dir().join(format!("facts-seed-{}.json", Uuid::new_v4()));
        let seed = serde_json::json!([
            complaint("ACME Bank", "Charged twice for the same statement and refused a refund."),
        ]);
        std::fs::write(&path, seed.to_string()).unwrap();

        let store = DraftStore::new();
        let report = store.seed_facts(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(report.imported.len(), 1);
        assert!(report.rejected.is_empty());
        assert_eq!(store.list_facts()[0].facts.parties.defendant, "ACME Bank");
    }

    #[test]
    fn test_missing_or_malformed_seed_is_an_error() {
        let store = DraftStore::new();
        let missing = std::env::temp_dir().join(format!("facts-seed-{}.json", Uuid::new_v4()));
        assert!(store.seed_facts(&missing).is_err());

        let path = std::env::temp_dir().join(format!("facts-seed-{}.json", Uuid::new_v4()));
        std::fs::write(&path, "{\"parties\": {}}").unwrap();
        let result = store.seed_facts(&path);
        std::fs::remove_file(&path).ok();
        assert!(result.is_err());
        assert!(store.list_facts().is_empty());
    }

    #[test]
    fn test_unknown_facts_id() {
        let store = DraftStore::new();
        let id = Uuid::new_v4();
        assert_eq!(store.get_facts(id).unwrap_err(), StoreError::FactsNotFound(id));
    }
}
