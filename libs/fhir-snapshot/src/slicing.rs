//! Slicing support
//!
//! Helpers for merging slicing headers and for the extension shorthand,
//! where a differential introduces named extension slices without spelling
//! out the slicing entry.

use crucible_models::{ElementDefinition, ElementDefinitionSlicing, SlicingRules, TypeKind};

/// Prefabricated slicing header for extension elements sliced without an
/// explicit entry: discriminate by url, unordered, open.
pub fn extension_slicing() -> ElementDefinitionSlicing {
    ElementDefinitionSlicing {
        discriminator: Some(vec!["url".to_string()]),
        description: None,
        ordered: Some(false),
        rules: SlicingRules::Open,
    }
}

/// Whether an element's declared type makes it an extension element.
pub fn is_extension_element(element: &ElementDefinition) -> bool {
    element
        .primary_type()
        .map_or(false, |t| t.kind() == TypeKind::Extension)
}

/// Merge a differential slicing header onto the base element's, field by
/// field. Fields the differential leaves out are inherited; the combined
/// rules never loosen what the base demanded.
pub fn merge_slicing(
    base: Option<&ElementDefinitionSlicing>,
    diff: &ElementDefinitionSlicing,
) -> ElementDefinitionSlicing {
    let Some(base) = base else {
        return diff.clone();
    };
    ElementDefinitionSlicing {
        discriminator: diff
            .discriminator
            .clone()
            .or_else(|| base.discriminator.clone()),
        description: diff.description.clone().or_else(|| base.description.clone()),
        ordered: diff.ordered.or(base.ordered),
        rules: merge_rules(base.rules, diff.rules),
    }
}

/// The most restrictive of two rule sets wins; `Closed` beats `OpenAtEnd`
/// beats `Open`.
fn merge_rules(base: SlicingRules, diff: SlicingRules) -> SlicingRules {
    if base == SlicingRules::Closed || diff == SlicingRules::Closed {
        SlicingRules::Closed
    } else if base == SlicingRules::OpenAtEnd || diff == SlicingRules::OpenAtEnd {
        SlicingRules::OpenAtEnd
    } else {
        diff
    }
}
