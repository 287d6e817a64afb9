use thiserror::Error;

use crate::table::VariableEntity;

/// A single entity-type disagreement found while validating a view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityTypeViolation {
    pub variable: String,
    pub entity_type: String,
}

#[derive(Error, Debug)]
pub enum VantageError {
    #[error("no value set for entity '{entity}' in table '{table}'")]
    NoSuchValueSet { table: String, entity: VariableEntity },
    #[error("no variable '{variable}' in table '{table}'")]
    NoSuchVariable { table: String, variable: String },
    #[error("no table '{table}' in datasource '{datasource}'")]
    NoSuchTable { datasource: String, table: String },
    #[error("view '{view}' of entity type '{expected}' lists sources of other entity types")]
    IncompatibleEntityType {
        view: String,
        expected: String,
        violations: Vec<EntityTypeViolation>,
    },
    #[error("table '{table}' contains duplicated variable names: {names:?}")]
    DuplicateVariableNames { table: String, names: Vec<String> },
    #[error("Persistence error: {0}")]
    Persistence(String),
    #[error("Definition error: {0}")]
    Definition(String),
    #[error("Lock poisoned: {0}")]
    Lock(String),
}

pub type Result<T> = std::result::Result<T, VantageError>;

// Helper conversions
impl From<rusqlite::Error> for VantageError {
    fn from(e: rusqlite::Error) -> Self { Self::Persistence(e.to_string()) }
}
impl From<serde_json::Error> for VantageError {
    fn from(e: serde_json::Error) -> Self { Self::Definition(e.to_string()) }
}
