//! Element-level merge
//!
//! Overlays one differential element onto its matched base element. The
//! merge is presence-driven: every field the differential sets replaces the
//! inherited value, every field it leaves out is kept. Cardinality must
//! narrow; that is validated before anything is written, so a failed merge
//! leaves the base element untouched.

use crucible_models::{ElementDefinition, Extension};

use crate::error::{Error, Result};
use crate::slicing::merge_slicing;

/// Marker extension recorded on every element a differential actually
/// changed, when change marking is enabled.
pub const CHANGED_BY_DIFFERENTIAL: &str =
    "http://hl7.org/fhir/StructureDefinition/changedByDifferential";

/// Overlay `diff` onto `target`. Returns whether any field changed.
pub(crate) fn merge_element_fields(
    target: &mut ElementDefinition,
    diff: &ElementDefinition,
    mark_changes: bool,
) -> Result<bool> {
    validate_narrowing(target, diff)?;

    let mut changed = false;

    // A differing differential path renames the element, which is how a
    // choice element picks up its type-specific name.
    if diff.path != target.path {
        target.path = diff.path.clone();
        changed = true;
    }

    overlay(&mut target.slice_name, &diff.slice_name, &mut changed);
    overlay(&mut target.short, &diff.short, &mut changed);
    overlay(&mut target.definition, &diff.definition, &mut changed);
    overlay(&mut target.comment, &diff.comment, &mut changed);
    overlay(&mut target.requirements, &diff.requirements, &mut changed);
    overlay(&mut target.alias, &diff.alias, &mut changed);
    overlay(&mut target.min, &diff.min, &mut changed);
    overlay(&mut target.max, &diff.max, &mut changed);
    overlay(&mut target.name_reference, &diff.name_reference, &mut changed);
    overlay(&mut target.types, &diff.types, &mut changed);
    overlay(&mut target.default_value, &diff.default_value, &mut changed);
    overlay(
        &mut target.meaning_when_missing,
        &diff.meaning_when_missing,
        &mut changed,
    );
    overlay(&mut target.fixed, &diff.fixed, &mut changed);
    overlay(&mut target.pattern, &diff.pattern, &mut changed);
    overlay(&mut target.example, &diff.example, &mut changed);
    overlay(&mut target.max_length, &diff.max_length, &mut changed);
    overlay(&mut target.condition, &diff.condition, &mut changed);
    overlay(&mut target.constraint, &diff.constraint, &mut changed);
    overlay(&mut target.must_support, &diff.must_support, &mut changed);
    overlay(&mut target.is_modifier, &diff.is_modifier, &mut changed);
    overlay(&mut target.is_summary, &diff.is_summary, &mut changed);
    overlay(&mut target.binding, &diff.binding, &mut changed);
    overlay(&mut target.mapping, &diff.mapping, &mut changed);
    overlay(&mut target.extension, &diff.extension, &mut changed);

    if let Some(diff_slicing) = &diff.slicing {
        let merged = merge_slicing(target.slicing.as_ref(), diff_slicing);
        if target.slicing.as_ref() != Some(&merged) {
            target.slicing = Some(merged);
            changed = true;
        }
    }

    for (key, value) in &diff.extras {
        if target.extras.get(key) != Some(value) {
            target.extras.insert(key.clone(), value.clone());
            changed = true;
        }
    }

    if changed && mark_changes {
        mark_changed(target);
    }
    Ok(changed)
}

/// Record the changed-by-differential marker on an element, once.
pub(crate) fn mark_changed(element: &mut ElementDefinition) {
    let extensions = element.extension.get_or_insert_with(Vec::new);
    if extensions.iter().any(|e| e.url == CHANGED_BY_DIFFERENTIAL) {
        return;
    }
    extensions.push(Extension::boolean(CHANGED_BY_DIFFERENTIAL, true));
}

fn overlay<T: Clone + PartialEq>(target: &mut Option<T>, diff: &Option<T>, changed: &mut bool) {
    if let Some(value) = diff {
        if target.as_ref() != Some(value) {
            *target = Some(value.clone());
            *changed = true;
        }
    }
}

/// A differential may narrow cardinality but never widen it: min may not
/// drop below the base min, max may not exceed the base max.
fn validate_narrowing(target: &ElementDefinition, diff: &ElementDefinition) -> Result<()> {
    if let Some(diff_min) = diff.min {
        if diff_min < target.min.unwrap_or(0) {
            return Err(widening(target, diff));
        }
    }
    if let (Some(diff_max), Some(base_max)) = (diff.max_cardinality()?, target.max_cardinality()?)
    {
        if !diff_max.within(&base_max) {
            return Err(widening(target, diff));
        }
    }
    Ok(())
}

fn widening(target: &ElementDefinition, diff: &ElementDefinition) -> Error {
    let min = diff.min.or(target.min).unwrap_or(0);
    let max = diff
        .max
        .clone()
        .or_else(|| target.max.clone())
        .unwrap_or_else(|| "*".to_string());
    Error::CardinalityWidening {
        path: target.path.clone(),
        base: target.cardinality_string(),
        constrained: format!("{min}..{max}"),
    }
}
