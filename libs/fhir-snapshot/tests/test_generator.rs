//! End-to-end snapshot generation: merging, ordering, provenance, policy.

mod test_support;

use crucible_snapshot::{
    validate_snapshot, MergePolicy, SnapshotGenerator, CHANGED_BY_DIFFERENTIAL,
};
use serde_json::json;
use test_support::*;

#[test]
fn test_constraint_is_merged_and_rest_is_inherited() {
    let resolver = core_resolver();
    let mut profile = constraint(
        "NamedPatient",
        "Patient",
        json!([
            { "path": "Patient.name", "min": 1, "short": "Required name" }
        ]),
    );

    let mut generator = SnapshotGenerator::new(&resolver);
    generator.generate(&mut profile).unwrap();

    let snapshot = profile.snapshot.as_ref().unwrap();
    let name = find(&snapshot.element, "Patient.name");
    assert_eq!(name.min, Some(1));
    assert_eq!(name.max.as_deref(), Some("*"));
    assert_eq!(name.short.as_deref(), Some("Required name"));
    assert_eq!(name.type_codes(), vec!["HumanName"]);

    // Untouched siblings come through unchanged.
    let active = find(&snapshot.element, "Patient.active");
    assert_eq!(active.min, Some(0));
    assert_eq!(active.max.as_deref(), Some("1"));
    assert_eq!(active.type_codes(), vec!["boolean"]);
}

#[test]
fn test_snapshot_keeps_base_element_order() {
    let resolver = core_resolver();
    // Differential order deliberately disagrees with the base order.
    let mut profile = constraint(
        "ReorderedPatient",
        "Patient",
        json!([
            { "path": "Patient.gender", "min": 1 },
            { "path": "Patient.name", "min": 1 }
        ]),
    );

    let mut generator = SnapshotGenerator::new(&resolver);
    generator.generate(&mut profile).unwrap();

    let snapshot = profile.snapshot.as_ref().unwrap();
    assert_eq!(
        paths(&snapshot.element),
        vec![
            "Patient",
            "Patient.extension",
            "Patient.identifier",
            "Patient.active",
            "Patient.name",
            "Patient.gender",
        ]
    );
    assert_eq!(find(&snapshot.element, "Patient.gender").min, Some(1));
    assert_eq!(find(&snapshot.element, "Patient.name").min, Some(1));
}

#[test]
fn test_base_provenance_records_pre_merge_values() {
    let resolver = core_resolver();
    let mut profile = constraint(
        "NamedPatient",
        "Patient",
        json!([
            { "path": "Patient.name", "min": 1, "max": "1" }
        ]),
    );

    let mut generator = SnapshotGenerator::new(&resolver);
    generator.generate(&mut profile).unwrap();

    let snapshot = profile.snapshot.as_ref().unwrap();
    let name = find(&snapshot.element, "Patient.name");
    assert_eq!(name.min, Some(1));
    let base = name.base.as_ref().unwrap();
    assert_eq!(base.path, "Patient.name");
    assert_eq!(base.min, 0);
    assert_eq!(base.max, "*");
}

#[test]
fn test_inherited_provenance_survives_a_profile_chain() {
    let mut resolver = core_resolver();
    resolver
        .register(constraint(
            "Mid",
            "Patient",
            json!([{ "path": "Patient.name", "min": 1 }]),
        ))
        .unwrap();
    let mut leaf = constraint(
        "Leaf",
        "Patient",
        json!([{ "path": "Patient.name", "max": "1" }]),
    );
    leaf.base_definition = Some(format!("{EXAMPLE}/Mid"));

    let policy = MergePolicy {
        expand_external_profiles: true,
        ..MergePolicy::default()
    };
    let mut generator = SnapshotGenerator::with_policy(&resolver, policy);
    generator.generate(&mut leaf).unwrap();

    let snapshot = leaf.snapshot.as_ref().unwrap();
    let name = find(&snapshot.element, "Patient.name");
    assert_eq!(name.min, Some(1));
    assert_eq!(name.max.as_deref(), Some("1"));
    // Provenance still points at the values the element was introduced with.
    let base = name.base.as_ref().unwrap();
    assert_eq!(base.min, 0);
    assert_eq!(base.max, "*");
}

#[test]
fn test_rewrite_element_base_restamps_from_direct_base() {
    let mut resolver = core_resolver();
    resolver
        .register(constraint(
            "Mid",
            "Patient",
            json!([{ "path": "Patient.name", "min": 1 }]),
        ))
        .unwrap();
    let mut leaf = constraint(
        "Leaf",
        "Patient",
        json!([{ "path": "Patient.name", "max": "1" }]),
    );
    leaf.base_definition = Some(format!("{EXAMPLE}/Mid"));

    let policy = MergePolicy {
        expand_external_profiles: true,
        rewrite_element_base: true,
        ..MergePolicy::default()
    };
    let mut generator = SnapshotGenerator::with_policy(&resolver, policy);
    generator.generate(&mut leaf).unwrap();

    let snapshot = leaf.snapshot.as_ref().unwrap();
    // Rewriting stamps what the direct base ends up with, so the mid-level
    // tightening shows through.
    let name = find(&snapshot.element, "Patient.name");
    assert_eq!(name.base.as_ref().unwrap().min, 1);
    let active = find(&snapshot.element, "Patient.active");
    assert_eq!(active.base.as_ref().unwrap().min, 0);
}

#[test]
fn test_normalized_provenance_resolves_the_defining_type() {
    let mut resolver = core_resolver();
    resolver
        .register_value(&json!({
            "resourceType": "StructureDefinition",
            "url": format!("{CORE}/Resource"),
            "name": "Resource",
            "status": "active",
            "kind": "resource",
            "abstract": true,
            "type": "Resource",
            "snapshot": {
                "element": [
                    { "path": "Resource", "min": 0, "max": "*" },
                    { "path": "Resource.id", "min": 0, "max": "1",
                      "type": [{ "code": "id" }] }
                ]
            }
        }))
        .unwrap();
    // A base whose snapshot already contains expanded datatype children,
    // without any provenance of its own.
    resolver
        .register_value(&json!({
            "resourceType": "StructureDefinition",
            "url": format!("{EXAMPLE}/ExpandedPatient"),
            "name": "ExpandedPatient",
            "status": "active",
            "kind": "resource",
            "abstract": false,
            "type": "Patient",
            "snapshot": {
                "element": [
                    { "path": "Patient", "min": 0, "max": "*",
                      "type": [{ "code": "Resource" }] },
                    { "path": "Patient.id", "min": 0, "max": "1",
                      "type": [{ "code": "id" }] },
                    { "path": "Patient.name", "min": 0, "max": "*",
                      "type": [{ "code": "HumanName" }] },
                    { "path": "Patient.name.given", "min": 0, "max": "*",
                      "type": [{ "code": "string" }] }
                ]
            }
        }))
        .unwrap();
    let mut profile = constraint(
        "GivenPatient",
        "Patient",
        json!([{ "path": "Patient.name.given", "min": 1 }]),
    );
    profile.base_definition = Some(format!("{EXAMPLE}/ExpandedPatient"));

    let policy = MergePolicy {
        rewrite_element_base: true,
        normalize_element_base: true,
        ..MergePolicy::default()
    };
    let mut generator = SnapshotGenerator::with_policy(&resolver, policy);
    generator.generate(&mut profile).unwrap();

    let snapshot = profile.snapshot.as_ref().unwrap();
    // Children of a datatype-valued element point at the datatype's own
    // definition, found through the parent's declared type.
    let given = find(&snapshot.element, "Patient.name.given");
    assert_eq!(given.min, Some(1));
    let base = given.base.as_ref().unwrap();
    assert_eq!(base.path, "HumanName.given");
    assert_eq!(base.min, 0);
    assert_eq!(base.max, "*");

    // Elements of the root type's ancestry resolve through the root chain.
    let id = find(&snapshot.element, "Patient.id");
    assert_eq!(id.base.as_ref().unwrap().path, "Resource.id");

    // An element no ancestor defines stamps itself.
    let name = find(&snapshot.element, "Patient.name");
    assert_eq!(name.base.as_ref().unwrap().path, "Patient.name");
}

#[test]
fn test_mark_changes_flags_touched_elements_only() {
    let resolver = core_resolver();
    let mut profile = constraint(
        "NamedPatient",
        "Patient",
        json!([{ "path": "Patient.name", "min": 1 }]),
    );

    let policy = MergePolicy {
        mark_changes: true,
        ..MergePolicy::default()
    };
    let mut generator = SnapshotGenerator::with_policy(&resolver, policy);
    generator.generate(&mut profile).unwrap();

    let snapshot = profile.snapshot.as_ref().unwrap();
    let marked = |path: &str| {
        find(&snapshot.element, path)
            .extension
            .as_ref()
            .map_or(false, |exts| {
                exts.iter().any(|e| e.url == CHANGED_BY_DIFFERENTIAL)
            })
    };
    assert!(marked("Patient.name"));
    assert!(!marked("Patient.active"));
    assert!(!marked("Patient.gender"));
}

#[test]
fn test_prohibiting_an_element_is_legal() {
    let resolver = core_resolver();
    let mut profile = constraint(
        "NoPhoto",
        "Patient",
        json!([{ "path": "Patient.name", "max": "0" }]),
    );

    let mut generator = SnapshotGenerator::new(&resolver);
    generator.generate(&mut profile).unwrap();

    let snapshot = profile.snapshot.as_ref().unwrap();
    assert_eq!(find(&snapshot.element, "Patient.name").max.as_deref(), Some("0"));
}

#[test]
fn test_expansion_is_deterministic() {
    let resolver = core_resolver();
    let profile = constraint(
        "NamedPatient",
        "Patient",
        json!([
            { "path": "Patient.name", "min": 1 },
            { "path": "Patient.name.given", "max": "1" }
        ]),
    );

    let mut generator = SnapshotGenerator::new(&resolver);
    let first = generator.expand(&profile).unwrap();
    let second = generator.expand(&profile).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_generated_snapshot_is_well_formed() {
    let resolver = core_resolver();
    let mut profile = constraint(
        "NamedPatient",
        "Patient",
        json!([
            { "path": "Patient.name.given", "min": 1 },
            { "path": "Patient.gender", "min": 1 }
        ]),
    );

    let mut generator = SnapshotGenerator::new(&resolver);
    generator.generate(&mut profile).unwrap();

    let snapshot = profile.snapshot.as_ref().unwrap();
    validate_snapshot(snapshot).unwrap();
    // Every element carries a normalized id.
    assert!(snapshot.element.iter().all(|e| e.id.is_some()));
    assert_eq!(
        find(&snapshot.element, "Patient.name.given").id.as_deref(),
        Some("Patient.name.given")
    );
}

#[test]
fn test_differential_is_left_untouched() {
    let resolver = core_resolver();
    let mut profile = constraint(
        "NamedPatient",
        "Patient",
        json!([{ "path": "Patient.name.given", "min": 1 }]),
    );
    let differential_before = profile.differential.clone();

    let mut generator = SnapshotGenerator::new(&resolver);
    generator.generate(&mut profile).unwrap();

    assert_eq!(profile.differential, differential_before);
}
