//! Shared fixtures for the snapshot generation tests: a resolver preloaded
//! with pared-down core type definitions, builders for constraint profiles,
//! and element list lookup helpers.
#![allow(dead_code)]

use crucible_context::MapResolver;
use crucible_models::{ElementDefinition, StructureDefinition};
use serde_json::{json, Value};

pub const CORE: &str = "http://hl7.org/fhir/StructureDefinition";
pub const EXAMPLE: &str = "http://example.org/StructureDefinition";

/// A resolver holding the core types the tests constrain.
pub fn core_resolver() -> MapResolver {
    let mut resolver = MapResolver::new();
    for value in [
        patient(),
        observation(),
        questionnaire(),
        human_name(),
        quantity(),
        extension(),
        string_type(),
    ] {
        resolver.register_value(&value).expect("core fixture");
    }
    resolver
}

pub fn sd(value: Value) -> StructureDefinition {
    serde_json::from_value(value).expect("fixture StructureDefinition")
}

/// A constraint profile on a core resource, with the given differential
/// elements.
pub fn constraint(name: &str, base_type: &str, elements: Value) -> StructureDefinition {
    sd(json!({
        "resourceType": "StructureDefinition",
        "url": format!("{EXAMPLE}/{name}"),
        "name": name,
        "status": "active",
        "kind": "resource",
        "abstract": false,
        "type": base_type,
        "baseDefinition": format!("{CORE}/{base_type}"),
        "derivation": "constraint",
        "differential": { "element": elements }
    }))
}

pub fn find<'a>(elements: &'a [ElementDefinition], path: &str) -> &'a ElementDefinition {
    elements
        .iter()
        .find(|e| e.path == path && e.slice_name.is_none())
        .unwrap_or_else(|| panic!("no element at '{path}'"))
}

pub fn find_slice<'a>(
    elements: &'a [ElementDefinition],
    path: &str,
    slice_name: &str,
) -> &'a ElementDefinition {
    elements
        .iter()
        .find(|e| e.path == path && e.slice_name.as_deref() == Some(slice_name))
        .unwrap_or_else(|| panic!("no slice '{slice_name}' at '{path}'"))
}

pub fn paths(elements: &[ElementDefinition]) -> Vec<&str> {
    elements.iter().map(|e| e.path.as_str()).collect()
}

fn patient() -> Value {
    json!({
        "resourceType": "StructureDefinition",
        "url": format!("{CORE}/Patient"),
        "name": "Patient",
        "status": "active",
        "kind": "resource",
        "abstract": false,
        "type": "Patient",
        "snapshot": {
            "element": [
                { "path": "Patient", "min": 0, "max": "*" },
                { "path": "Patient.extension", "min": 0, "max": "*",
                  "type": [{ "code": "Extension" }] },
                { "path": "Patient.identifier", "min": 0, "max": "*",
                  "type": [{ "code": "Identifier" }] },
                { "path": "Patient.active", "min": 0, "max": "1",
                  "type": [{ "code": "boolean" }] },
                { "path": "Patient.name", "min": 0, "max": "*",
                  "short": "A name associated with the patient",
                  "type": [{ "code": "HumanName" }] },
                { "path": "Patient.gender", "min": 0, "max": "1",
                  "type": [{ "code": "code" }] }
            ]
        }
    })
}

fn observation() -> Value {
    json!({
        "resourceType": "StructureDefinition",
        "url": format!("{CORE}/Observation"),
        "name": "Observation",
        "status": "active",
        "kind": "resource",
        "abstract": false,
        "type": "Observation",
        "snapshot": {
            "element": [
                { "path": "Observation", "min": 0, "max": "*" },
                { "path": "Observation.status", "min": 1, "max": "1",
                  "type": [{ "code": "code" }] },
                { "path": "Observation.value[x]", "min": 0, "max": "1",
                  "type": [{ "code": "Quantity" }, { "code": "CodeableConcept" }] }
            ]
        }
    })
}

/// Recursive item group, referenced by name from `Questionnaire.item.item`.
fn questionnaire() -> Value {
    json!({
        "resourceType": "StructureDefinition",
        "url": format!("{CORE}/Questionnaire"),
        "name": "Questionnaire",
        "status": "active",
        "kind": "resource",
        "abstract": false,
        "type": "Questionnaire",
        "snapshot": {
            "element": [
                { "path": "Questionnaire", "min": 0, "max": "*" },
                { "path": "Questionnaire.item", "min": 0, "max": "*" },
                { "path": "Questionnaire.item.linkId", "min": 1, "max": "1",
                  "type": [{ "code": "string" }] },
                { "path": "Questionnaire.item.text", "min": 0, "max": "1",
                  "type": [{ "code": "string" }] },
                { "path": "Questionnaire.item.item", "min": 0, "max": "*",
                  "nameReference": "item" }
            ]
        }
    })
}

fn human_name() -> Value {
    json!({
        "resourceType": "StructureDefinition",
        "url": format!("{CORE}/HumanName"),
        "name": "HumanName",
        "status": "active",
        "kind": "complex-type",
        "abstract": false,
        "type": "HumanName",
        "snapshot": {
            "element": [
                { "path": "HumanName", "min": 0, "max": "*" },
                { "path": "HumanName.use", "min": 0, "max": "1",
                  "type": [{ "code": "code" }] },
                { "path": "HumanName.family", "min": 0, "max": "*",
                  "type": [{ "code": "string" }] },
                { "path": "HumanName.given", "min": 0, "max": "*",
                  "type": [{ "code": "string" }] },
                { "path": "HumanName.prefix", "min": 0, "max": "*",
                  "type": [{ "code": "string" }] }
            ]
        }
    })
}

fn quantity() -> Value {
    json!({
        "resourceType": "StructureDefinition",
        "url": format!("{CORE}/Quantity"),
        "name": "Quantity",
        "status": "active",
        "kind": "complex-type",
        "abstract": false,
        "type": "Quantity",
        "snapshot": {
            "element": [
                { "path": "Quantity", "min": 0, "max": "*" },
                { "path": "Quantity.value", "min": 0, "max": "1",
                  "type": [{ "code": "decimal" }] },
                { "path": "Quantity.unit", "min": 0, "max": "1",
                  "type": [{ "code": "string" }] },
                { "path": "Quantity.system", "min": 0, "max": "1",
                  "type": [{ "code": "uri" }] },
                { "path": "Quantity.code", "min": 0, "max": "1",
                  "type": [{ "code": "code" }] }
            ]
        }
    })
}

fn extension() -> Value {
    json!({
        "resourceType": "StructureDefinition",
        "url": format!("{CORE}/Extension"),
        "name": "Extension",
        "status": "active",
        "kind": "complex-type",
        "abstract": false,
        "type": "Extension",
        "snapshot": {
            "element": [
                { "path": "Extension", "min": 0, "max": "*" },
                { "path": "Extension.url", "min": 1, "max": "1",
                  "type": [{ "code": "uri" }] },
                { "path": "Extension.value[x]", "min": 0, "max": "1",
                  "type": [{ "code": "string" }] }
            ]
        }
    })
}

fn string_type() -> Value {
    json!({
        "resourceType": "StructureDefinition",
        "url": format!("{CORE}/string"),
        "name": "string",
        "status": "active",
        "kind": "primitive-type",
        "abstract": false,
        "type": "string",
        "snapshot": {
            "element": [
                { "path": "string", "min": 0, "max": "*" },
                { "path": "string.value", "min": 0, "max": "1" }
            ]
        }
    })
}
