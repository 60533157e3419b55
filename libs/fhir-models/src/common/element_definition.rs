//! FHIR ElementDefinition model
//!
//! Version-agnostic model for ElementDefinition (used in StructureDefinition snapshots and differentials)

use super::complex::Extension;
use super::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// FHIR ElementDefinition - defines an element in a resource or data type structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ElementDefinition {
    /// Unique id for inter-element referencing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Path of the element in the hierarchy (e.g., "Patient.name")
    pub path: String,

    /// Name for this particular element (in a slice)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slice_name: Option<String>,

    /// This element is sliced - slices follow
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slicing: Option<ElementDefinitionSlicing>,

    /// Short label
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short: Option<String>,

    /// Full formal definition
    #[serde(skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,

    /// Comments about the use of this element
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    /// Why this element has been constrained
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requirements: Option<String>,

    /// Other names
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<Vec<String>>,

    /// Minimum cardinality
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<u32>,

    /// Maximum cardinality (a number or "*")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<String>,

    /// Base definition information (path, min, max of the defining ancestor)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<ElementDefinitionBase>,

    /// Path of another element whose expanded subtree this element reuses
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_reference: Option<String>,

    /// Data type and profile for this element
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub types: Option<Vec<ElementDefinitionType>>,

    /// Specified value if missing from instance
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,

    /// Implicit meaning when this element is missing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meaning_when_missing: Option<String>,

    /// Value must be exactly this
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed: Option<Value>,

    /// Value must have at least these property values
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<Value>,

    /// Example value (as defined for type)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,

    /// Max length for strings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<i32>,

    /// Reference to invariant about presence
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<Vec<String>>,

    /// Condition that must evaluate to true
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constraint: Option<Vec<ElementDefinitionConstraint>>,

    /// If this element must be supported
    #[serde(skip_serializing_if = "Option::is_none")]
    pub must_support: Option<bool>,

    /// If this modifies the meaning of other elements
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_modifier: Option<bool>,

    /// Include when in summary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_summary: Option<bool>,

    /// ValueSet details if this is coded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binding: Option<ElementDefinitionBinding>,

    /// Map element to another set of definitions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mapping: Option<Vec<ElementDefinitionMapping>>,

    /// Extensions attached to the element itself
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<Vec<Extension>>,

    /// Fields not modeled above, carried through untouched
    #[serde(flatten)]
    pub extras: HashMap<String, Value>,
}

/// Base definition information for an element
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ElementDefinitionBase {
    /// Path that identifies the base element
    pub path: String,

    /// Min cardinality of the base element
    pub min: u32,

    /// Max cardinality of the base element
    pub max: String,
}

/// Data type for an element
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ElementDefinitionType {
    /// Data type code
    pub code: String,

    /// Profile (StructureDefinition canonical URLs) that apply
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<Vec<String>>,

    /// Profile (StructureDefinition) for Reference target types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_profile: Option<Vec<String>>,
}

/// Classification of a type code, decided once at the type entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    /// Lowercase-initial codes: "string", "boolean", "uri", ...
    Primitive,
    /// Uppercase-initial datatype codes: "HumanName", "Quantity", ...
    Complex,
    Reference,
    Extension,
}

impl ElementDefinitionType {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            profile: None,
            target_profile: None,
        }
    }

    /// Classify the type code. All type-kind tests in the engine go through here.
    pub fn kind(&self) -> TypeKind {
        match self.code.as_str() {
            "Extension" => TypeKind::Extension,
            "Reference" => TypeKind::Reference,
            code => match code.chars().next() {
                Some(c) if c.is_ascii_lowercase() => TypeKind::Primitive,
                _ => TypeKind::Complex,
            },
        }
    }

    /// First declared profile url, if any
    pub fn primary_profile(&self) -> Option<&str> {
        self.profile
            .as_ref()
            .and_then(|p| p.first())
            .map(|s| s.as_str())
    }
}

/// Slicing information for an element
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ElementDefinitionSlicing {
    /// Element paths that are used to distinguish slices
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<Vec<String>>,

    /// Text description of how slicing works
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// If elements must be in same order as slices
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ordered: Option<bool>,

    /// Slicing rules (closed | open | openAtEnd)
    pub rules: SlicingRules,
}

/// Slicing rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SlicingRules {
    Closed,
    Open,
    OpenAtEnd,
}

/// ValueSet binding for a coded element
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ElementDefinitionBinding {
    /// Binding strength (required | extensible | preferred | example)
    pub strength: BindingStrength,

    /// Human explanation of the value set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Source of value set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_set: Option<String>,
}

/// Strength of a ValueSet binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingStrength {
    Required,
    Extensible,
    Preferred,
    Example,
}

/// Constraint on an element
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ElementDefinitionConstraint {
    /// Target of 'condition' reference
    pub key: String,

    /// Severity (error | warning)
    pub severity: ConstraintSeverity,

    /// Human description of constraint
    pub human: String,

    /// Expression of constraint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,

    /// XPath expression of constraint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xpath: Option<String>,
}

/// Severity of a constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstraintSeverity {
    Error,
    Warning,
}

/// Mapping to another standard
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ElementDefinitionMapping {
    /// Reference to mapping declaration
    pub identity: String,

    /// Computable language of mapping
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// Details of the mapping
    pub map: String,
}

/// Parsed maximum cardinality
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxCardinality {
    Bounded(u32),
    Unbounded,
}

impl MaxCardinality {
    /// Parse a `max` string: "*" is unbounded, anything else must be a number
    pub fn parse(s: &str) -> Result<Self> {
        if s == "*" {
            Ok(MaxCardinality::Unbounded)
        } else {
            s.parse::<u32>()
                .map(MaxCardinality::Bounded)
                .map_err(|_| Error::InvalidFieldValue(format!("max cardinality '{}'", s)))
        }
    }

    /// True if this cardinality fits inside `outer` (narrowing direction)
    pub fn within(&self, outer: &MaxCardinality) -> bool {
        match (self, outer) {
            (_, MaxCardinality::Unbounded) => true,
            (MaxCardinality::Unbounded, MaxCardinality::Bounded(_)) => false,
            (MaxCardinality::Bounded(a), MaxCardinality::Bounded(b)) => a <= b,
        }
    }
}

impl ElementDefinition {
    /// Create an element carrying only a path
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Get the key for this element (path:sliceName for slices, just path otherwise)
    pub fn key(&self) -> String {
        if let Some(ref slice_name) = self.slice_name {
            format!("{}:{}", self.path, slice_name)
        } else {
            self.path.clone()
        }
    }

    /// Check if this element has a slice name
    pub fn is_slice(&self) -> bool {
        self.slice_name.is_some()
    }

    /// Get the parent path (everything before the last '.')
    pub fn parent_path(&self) -> Option<&str> {
        self.path.rfind('.').map(|pos| &self.path[..pos])
    }

    /// Last segment of the path ("given" for "Patient.name.given")
    pub fn last_segment(&self) -> &str {
        self.path.rsplit('.').next().unwrap_or(&self.path)
    }

    /// Number of path segments; corresponds to tree depth
    pub fn depth(&self) -> usize {
        self.path.matches('.').count() + 1
    }

    /// Check if this element is a descendant of the given path
    pub fn is_descendant_of(&self, parent_path: &str) -> bool {
        self.path.starts_with(parent_path)
            && self.path.len() > parent_path.len()
            && self.path.as_bytes().get(parent_path.len()) == Some(&b'.')
    }

    /// Check if this is a choice type element (ends with [x])
    pub fn is_choice_type(&self) -> bool {
        self.path.ends_with("[x]")
    }

    /// Get type codes for this element
    pub fn type_codes(&self) -> Vec<String> {
        self.types
            .as_ref()
            .map(|types| types.iter().map(|t| t.code.clone()).collect())
            .unwrap_or_default()
    }

    /// First declared type, if any
    pub fn primary_type(&self) -> Option<&ElementDefinitionType> {
        self.types.as_ref().and_then(|t| t.first())
    }

    /// First profile url of the first declared type, if any
    pub fn primary_type_profile(&self) -> Option<&str> {
        self.primary_type().and_then(|t| t.primary_profile())
    }

    /// Check if element is required (min > 0)
    pub fn is_required(&self) -> bool {
        self.min.unwrap_or(0) > 0
    }

    /// Check if element repeats (max = "*" or max > 1)
    pub fn is_repeating(&self) -> bool {
        self.max
            .as_ref()
            .map(|m| m == "*" || m.parse::<u32>().map(|n| n > 1).unwrap_or(false))
            .unwrap_or(false)
    }

    /// Parsed `max`; `None` when the element does not constrain it
    pub fn max_cardinality(&self) -> Result<Option<MaxCardinality>> {
        self.max.as_deref().map(MaxCardinality::parse).transpose()
    }

    /// Get the cardinality as a string (e.g., "0..1", "1..*")
    pub fn cardinality_string(&self) -> String {
        let min = self.min.unwrap_or(0);
        let max = self.max.as_deref().unwrap_or("*");
        format!("{}..{}", min, max)
    }
}

/// Snapshot - a set of elements that define the structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    pub element: Vec<ElementDefinition>,
}

/// Differential - a set of elements that define changes from the base
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Differential {
    pub element: Vec<ElementDefinition>,
}

impl Snapshot {
    /// Create a new empty snapshot
    pub fn new() -> Self {
        Self {
            element: Vec::new(),
        }
    }

    /// Parse from JSON Value
    pub fn from_value(value: &Value) -> Result<Self> {
        serde_json::from_value(value.clone()).map_err(Error::from)
    }

    /// Serialize to JSON Value
    pub fn to_value(&self) -> Result<Value> {
        serde_json::to_value(self).map_err(Error::from)
    }

    /// Get an element by path
    pub fn get_element(&self, path: &str) -> Option<&ElementDefinition> {
        self.element.iter().find(|e| e.path == path)
    }

    /// Get all direct children of a path
    pub fn get_children(&self, parent_path: &str) -> Vec<&ElementDefinition> {
        let expected_depth = parent_path.matches('.').count() + 2;
        self.element
            .iter()
            .filter(|e| e.is_descendant_of(parent_path) && e.depth() == expected_depth)
            .collect()
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::new()
    }
}

impl Differential {
    /// Create a new empty differential
    pub fn new() -> Self {
        Self {
            element: Vec::new(),
        }
    }

    /// Parse from JSON Value
    pub fn from_value(value: &Value) -> Result<Self> {
        serde_json::from_value(value.clone()).map_err(Error::from)
    }

    /// Get an element by path
    pub fn get_element(&self, path: &str) -> Option<&ElementDefinition> {
        self.element.iter().find(|e| e.path == path)
    }
}

impl Default for Differential {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_key() {
        let elem = ElementDefinition {
            slice_name: Some("official".to_string()),
            ..ElementDefinition::new("Patient.name")
        };

        assert_eq!(elem.key(), "Patient.name:official");
        assert!(elem.is_slice());
    }

    #[test]
    fn test_path_helpers() {
        let elem = ElementDefinition::new("Patient.name.given");

        assert_eq!(elem.parent_path(), Some("Patient.name"));
        assert_eq!(elem.last_segment(), "given");
        assert_eq!(elem.depth(), 3);
        assert!(elem.is_descendant_of("Patient.name"));
        assert!(elem.is_descendant_of("Patient"));
        assert!(!elem.is_descendant_of("Patient.na"));

        let root = ElementDefinition::new("Patient");
        assert_eq!(root.parent_path(), None);
        assert_eq!(root.last_segment(), "Patient");
        assert_eq!(root.depth(), 1);
    }

    #[test]
    fn test_is_choice_type() {
        let mut elem = ElementDefinition::new("Observation.value[x]");
        assert!(elem.is_choice_type());

        elem.path = "Observation.value".to_string();
        assert!(!elem.is_choice_type());
    }

    #[test]
    fn test_cardinality() {
        let elem = ElementDefinition {
            min: Some(1),
            max: Some("*".to_string()),
            ..ElementDefinition::new("Patient.name")
        };

        assert_eq!(elem.cardinality_string(), "1..*");
        assert!(elem.is_required());
        assert!(elem.is_repeating());
        assert_eq!(
            elem.max_cardinality().unwrap(),
            Some(MaxCardinality::Unbounded)
        );
    }

    #[test]
    fn test_max_cardinality_parse() {
        assert_eq!(
            MaxCardinality::parse("3").unwrap(),
            MaxCardinality::Bounded(3)
        );
        assert_eq!(
            MaxCardinality::parse("*").unwrap(),
            MaxCardinality::Unbounded
        );
        assert!(MaxCardinality::parse("many").is_err());

        assert!(MaxCardinality::Bounded(2).within(&MaxCardinality::Unbounded));
        assert!(MaxCardinality::Bounded(2).within(&MaxCardinality::Bounded(2)));
        assert!(!MaxCardinality::Bounded(3).within(&MaxCardinality::Bounded(2)));
        assert!(!MaxCardinality::Unbounded.within(&MaxCardinality::Bounded(3)));
    }

    #[test]
    fn test_type_kind() {
        assert_eq!(
            ElementDefinitionType::new("string").kind(),
            TypeKind::Primitive
        );
        assert_eq!(
            ElementDefinitionType::new("HumanName").kind(),
            TypeKind::Complex
        );
        assert_eq!(
            ElementDefinitionType::new("Reference").kind(),
            TypeKind::Reference
        );
        assert_eq!(
            ElementDefinitionType::new("Extension").kind(),
            TypeKind::Extension
        );
    }

    #[test]
    fn test_serde_round_trip_keeps_unknown_fields() {
        let json = serde_json::json!({
            "path": "Patient.name",
            "sliceName": "official",
            "min": 1,
            "max": "1",
            "nameReference": "Patient.contact.name",
            "customProperty": {"nested": true}
        });

        let elem: ElementDefinition = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(elem.slice_name.as_deref(), Some("official"));
        assert_eq!(elem.name_reference.as_deref(), Some("Patient.contact.name"));
        assert!(elem.extras.contains_key("customProperty"));

        let back = serde_json::to_value(&elem).unwrap();
        assert_eq!(back.get("customProperty"), json.get("customProperty"));
        assert_eq!(back.get("sliceName"), json.get("sliceName"));
    }

    #[test]
    fn test_snapshot_children() {
        let snapshot = Snapshot {
            element: vec![
                ElementDefinition::new("Patient"),
                ElementDefinition::new("Patient.name"),
                ElementDefinition::new("Patient.name.given"),
                ElementDefinition::new("Patient.birthDate"),
            ],
        };

        let children = snapshot.get_children("Patient");
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].path, "Patient.name");
        assert_eq!(children[1].path, "Patient.birthDate");
    }
}
