//! Letter templates that steer prompt construction.

pub mod model;
pub mod routes;

pub use model::{Template, UpsertTemplateRequest};
