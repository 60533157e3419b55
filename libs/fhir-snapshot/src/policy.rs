//! Merge behavior configuration

/// Settings that steer snapshot generation.
///
/// A policy is passed explicitly to the generator and threaded through every
/// recursive call, so the result is a pure function of (base tree,
/// differential tree, policy, resolver) with no ambient configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergePolicy {
    /// Annotate every element actually touched by a differential constraint
    /// with the changed-by-differential marker extension.
    pub mark_changes: bool,

    /// Before merging a differential element that narrows its type's profile,
    /// first resolve that profile and merge its constraints, so local
    /// constraints take final precedence.
    pub expand_type_profiles: bool,

    /// Skip unresolved type/extension profile references with a diagnostic
    /// instead of failing the whole generation. The element falls back to its
    /// core type where one is declared.
    pub ignore_unresolved_profiles: bool,

    /// Recursively generate the snapshot of a referenced profile that lacks
    /// one, instead of requiring it pre-resolved.
    pub expand_external_profiles: bool,

    /// Recompute every element's base provenance from the resolved ancestor
    /// chain instead of trusting inherited values.
    pub rewrite_element_base: bool,

    /// When rewriting provenance, locate the defining ancestor by structural
    /// element name rather than literal path (handles path changes across
    /// inheritance, e.g. `HumanName.given` under `Patient.name.given`).
    pub normalize_element_base: bool,
}

impl Default for MergePolicy {
    fn default() -> Self {
        Self {
            mark_changes: false,
            expand_type_profiles: true,
            ignore_unresolved_profiles: false,
            expand_external_profiles: false,
            rewrite_element_base: false,
            normalize_element_base: false,
        }
    }
}
