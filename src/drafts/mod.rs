//! Draft versions: generation, history, restore and export.

pub mod changelog;
pub mod model;
pub mod routes;

pub use model::{Draft, NewDraft};
