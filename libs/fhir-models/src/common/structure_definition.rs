//! FHIR StructureDefinition model
//!
//! Version-agnostic model for profiles: a constrained or newly defined type,
//! carrying an author-supplied differential and a fully resolved snapshot.

use super::element_definition::{Differential, Snapshot};
use super::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Canonical url prefix under which the core type definitions are published
pub const CANONICAL_BASE: &str = "http://hl7.org/fhir/StructureDefinition";

/// Canonical url of the core definition for a type code (e.g. "string", "HumanName")
pub fn core_type_url(code: &str) -> String {
    format!("{}/{}", CANONICAL_BASE, code)
}

/// FHIR StructureDefinition - a profile constraining a base type or another profile
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StructureDefinition {
    /// Logical id of this artifact
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Canonical identifier, unique key for resolution
    pub url: String,

    /// Business version
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Computer-friendly name
    pub name: String,

    /// Publication status (draft | active | retired | unknown)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    /// Kind of structure being defined
    pub kind: StructureDefinitionKind,

    /// Whether the structure is abstract
    #[serde(rename = "abstract", skip_serializing_if = "Option::is_none")]
    pub abstract_: Option<bool>,

    /// Type this structure describes ("Patient", "HumanName", "Extension", ...)
    #[serde(rename = "type")]
    pub type_name: String,

    /// Canonical url of the structure this one is derived from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_definition: Option<String>,

    /// How this structure relates to its base
    #[serde(skip_serializing_if = "Option::is_none")]
    pub derivation: Option<TypeDerivation>,

    /// Differential view: author-supplied constraints over the base
    #[serde(skip_serializing_if = "Option::is_none")]
    pub differential: Option<Differential>,

    /// Snapshot view: fully resolved element list
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<Snapshot>,

    /// Fields not modeled above, carried through untouched
    #[serde(flatten)]
    pub extras: HashMap<String, Value>,
}

/// Kind of structure a StructureDefinition describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StructureDefinitionKind {
    PrimitiveType,
    ComplexType,
    Resource,
    Logical,
}

/// Relationship of a StructureDefinition to its base
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeDerivation {
    Specialization,
    Constraint,
}

impl StructureDefinition {
    /// Parse from JSON Value
    pub fn from_value(value: &Value) -> Result<Self> {
        serde_json::from_value(value.clone()).map_err(Error::from)
    }

    /// Serialize to JSON Value
    pub fn to_value(&self) -> Result<Value> {
        serde_json::to_value(self).map_err(Error::from)
    }

    /// True if this profile constrains an existing type rather than defining a new one
    pub fn is_constraint(&self) -> bool {
        matches!(self.derivation, Some(TypeDerivation::Constraint))
    }

    /// True if this profile defines an extension
    pub fn is_extension(&self) -> bool {
        self.type_name == "Extension"
    }
}
