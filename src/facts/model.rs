use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::validation::{
    validate_amount, validate_required, ValidationErrors, Validator,
};

/// The two sides of the dispute, plus the sender's counsel when known.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct Parties {
    #[schema(example = "John Doe")]
    pub plaintiff: String,
    #[schema(example = "ACME Corp")]
    pub defendant: String,
    #[serde(default)]
    pub attorney: Option<String>,
    #[serde(default)]
    pub firm: Option<String>,
}

/// One line of a damages breakdown.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct DamageItem {
    pub item: String,
    pub amount: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct Damages {
    #[schema(example = 500.0)]
    #[serde(default)]
    pub amount_claimed: Option<f64>,
    /// Economic losses (medical bills, repair costs, refunds owed).
    #[serde(default)]
    pub specials: Vec<DamageItem>,
    /// Non-economic losses (pain and suffering, inconvenience).
    #[serde(default)]
    pub generals: Vec<DamageItem>,
}

impl Damages {
    pub fn has_breakdown(&self) -> bool {
        !self.specials.is_empty() || !self.generals.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct Exhibit {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Structured case input that seeds draft generation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct Facts {
    pub parties: Parties,
    #[schema(example = "Defective product, no refund issued after three requests.")]
    pub incident: String,
    #[serde(default)]
    pub damages: Damages,
    #[serde(default)]
    pub venue: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub incident_date: Option<String>,
    #[serde(default)]
    pub demand_deadline_days: Option<u32>,
    #[serde(default)]
    pub exhibits: Vec<Exhibit>,
}

/// A record accepted by a bulk import, by its position in the batch.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct ImportedFacts {
    pub index: usize,
    pub id: Uuid,
}

/// A record a bulk import refused, with the validation message.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct RejectedFacts {
    pub index: usize,
    #[schema(example = "[incident] Incident narrative must not be empty")]
    pub message: String,
}

/// Per-record outcome of a bulk import.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct ImportReport {
    pub imported: Vec<ImportedFacts>,
    pub rejected: Vec<RejectedFacts>,
}

/// A fact the letter needs but the case record does not supply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MissingField {
    AttorneyName,
    FirmName,
    Venue,
    IncidentDate,
    AmountClaimed,
    DamagesBreakdown,
    DemandDeadline,
    Exhibits,
}

impl MissingField {
    /// Label used inside placeholder tokens.
    pub fn label(&self) -> &'static str {
        match self {
            Self::AttorneyName => "attorney name",
            Self::FirmName => "firm name",
            Self::Venue => "venue",
            Self::IncidentDate => "incident date",
            Self::AmountClaimed => "amount claimed",
            Self::DamagesBreakdown => "damages breakdown",
            Self::DemandDeadline => "demand deadline",
            Self::Exhibits => "exhibits",
        }
    }
}

fn blank_to_none(value: &mut Option<String>) {
    if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
        *value = None;
    }
}

impl Facts {
    /// Trim required strings and collapse blank optional strings to `None`.
    ///
    /// Called once at the boundary so the rest of the crate can treat
    /// `Some(_)` as "present".
    pub fn normalized(mut self) -> Self {
        self.parties.plaintiff = self.parties.plaintiff.trim().to_string();
        self.parties.defendant = self.parties.defendant.trim().to_string();
        self.incident = self.incident.trim().to_string();
        blank_to_none(&mut self.parties.attorney);
        blank_to_none(&mut self.parties.firm);
        blank_to_none(&mut self.venue);
        blank_to_none(&mut self.category);
        blank_to_none(&mut self.incident_date);
        for exhibit in &mut self.exhibits {
            blank_to_none(&mut exhibit.description);
        }
        self
    }

    /// Letter-relevant fields absent from this record, in letter order.
    pub fn missing_fields(&self) -> Vec<MissingField> {
        let mut missing = Vec::new();
        if self.parties.attorney.is_none() {
            missing.push(MissingField::AttorneyName);
        }
        if self.parties.firm.is_none() {
            missing.push(MissingField::FirmName);
        }
        if self.venue.is_none() {
            missing.push(MissingField::Venue);
        }
        if self.incident_date.is_none() {
            missing.push(MissingField::IncidentDate);
        }
        if self.damages.amount_claimed.is_none() {
            missing.push(MissingField::AmountClaimed);
        }
        if !self.damages.has_breakdown() {
            missing.push(MissingField::DamagesBreakdown);
        }
        if self.demand_deadline_days.is_none() {
            missing.push(MissingField::DemandDeadline);
        }
        if self.exhibits.is_empty() {
            missing.push(MissingField::Exhibits);
        }
        missing
    }
}

impl Validator for Facts {
    fn validate(&self) -> Result<(), String> {
        let mut errors = ValidationErrors::new();

        validate_required(
            &self.parties.plaintiff,
            "parties.plaintiff",
            "Plaintiff",
            &mut errors,
        );
        validate_required(
            &self.parties.defendant,
            "parties.defendant",
            "Defendant",
            &mut errors,
        );
        validate_required(&self.incident, "incident", "Incident narrative", &mut errors);

        if let Some(amount) = self.damages.amount_claimed {
            validate_amount(amount, "damages.amount_claimed", &mut errors);
        }
        for (i, item) in self.damages.specials.iter().enumerate() {
            let field = format!("damages.specials[{i}]");
            validate_required(&item.item, &field, "Damage item", &mut errors);
            validate_amount(item.amount, &field, &mut errors);
        }
        for (i, item) in self.damages.generals.iter().enumerate() {
            let field = format!("damages.generals[{i}]");
            validate_required(&item.item, &field, "Damage item", &mut errors);
            validate_amount(item.amount, &field, &mut errors);
        }
        if self.demand_deadline_days == Some(0) {
            errors.add(
                super::validation::ValidationError::new(
                    "demand_deadline_days",
                    "Demand deadline must be at least one day",
                )
                .with_suggestion("Omit the field to leave the deadline open"),
            );
        }
        for (i, exhibit) in self.exhibits.iter().enumerate() {
            validate_required(
                &exhibit.name,
                &format!("exhibits[{i}].name"),
                "Exhibit name",
                &mut errors,
            );
        }

        errors.into_result()
    }
}

/// Stored facts. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FactsRecord {
    pub id: Uuid,
    pub facts: Facts,
    pub created_at: DateTime<Utc>,
}

impl FactsRecord {
    pub fn new(facts: Facts) -> Self {
        Self {
            id: Uuid::new_v4(),
            facts,
            created_at: Utc::now(),
        }
    }
}
