//! Error types for profile resolution

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid StructureDefinition: {0}")]
    InvalidStructureDefinition(String),

    #[error("Multiple conflicting profiles resolved for '{identifier}' (origins: {origins:?})")]
    ResolvingConflict {
        identifier: String,
        origins: Vec<String>,
    },

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
