//! Version-agnostic FHIR models
//!
//! Types shared by the profile tooling: StructureDefinition, ElementDefinition
//! and the pieces they are built from.

pub mod complex;
pub mod element_definition;
pub mod error;
pub mod structure_definition;

// Re-export commonly used types
pub use complex::*;
pub use element_definition::*;
pub use error::{Error, Result};
pub use structure_definition::*;
