//! Case facts: the structured input a demand letter is drafted from.

pub mod model;
pub mod routes;
pub mod validation;

pub use model::{
    DamageItem, Damages, Exhibit, Facts, FactsRecord, ImportReport, ImportedFacts, MissingField,
    Parties, RejectedFacts,
};
pub use validation::Validator;
