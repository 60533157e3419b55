//! FHIR data models
//!
//! This crate provides strongly-typed Rust structures for the profile
//! machinery: StructureDefinition, ElementDefinition, snapshots and
//! differentials.
//!
//! # Module Organization
//!
//! - `common`: Version-agnostic models that work across FHIR versions
//!
//! # Design Philosophy
//!
//! - **Version-agnostic core**: Common fields present across FHIR versions
//! - **Extensible**: unmodeled fields are kept in an `extras` map and
//!   round-trip untouched
//! - **Strongly-typed**: type safety for the operations the tooling performs
//! - **Flexible**: serializes/deserializes to/from JSON
//!
//! # Example
//!
//! ```rust
//! use crucible_models::common::{StructureDefinition, StructureDefinitionKind};
//! use serde_json::json;
//!
//! let sd_json = json!({
//!     "resourceType": "StructureDefinition",
//!     "url": "http://hl7.org/fhir/StructureDefinition/Patient",
//!     "name": "Patient",
//!     "status": "active",
//!     "kind": "resource",
//!     "abstract": false,
//!     "type": "Patient"
//! });
//!
//! let sd: StructureDefinition = serde_json::from_value(sd_json).unwrap();
//! assert_eq!(sd.name, "Patient");
//! assert_eq!(sd.kind, StructureDefinitionKind::Resource);
//! ```

pub mod common;

// Re-export commonly used types
pub use common::*;
