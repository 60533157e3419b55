//! Element id maintenance
//!
//! Snapshot elements carry a stable human-readable id derived from their
//! location: the path, with `:sliceName` appended on sliced elements. The
//! generator recomputes ids after every merge; the helpers here are also
//! usable standalone on lists produced elsewhere.

use crucible_models::{Differential, ElementDefinition, Snapshot};

/// Recompute the id of every element in a snapshot.
pub fn normalize_snapshot(snapshot: &mut Snapshot) {
    for element in &mut snapshot.element {
        normalize_element_id(element);
    }
}

/// Recompute the id of every element in a differential.
pub fn normalize_differential(differential: &mut Differential) {
    for element in &mut differential.element {
        normalize_element_id(element);
    }
}

/// Set an element's id from its path and slice name. Sliced elements get
/// `path:sliceName`; unsliced elements keep an existing id unless it is
/// missing, in which case the path is used.
pub fn normalize_element_id(element: &mut ElementDefinition) {
    match &element.slice_name {
        Some(slice_name) => {
            let expected = format!("{}:{}", element.path, slice_name);
            if element.id.as_ref() != Some(&expected) {
                element.id = Some(expected);
            }
        }
        None => {
            if element.id.is_none() {
                element.id = Some(element.path.clone());
            }
        }
    }
}

/// Extract the slice name from an id of the form `path:sliceName`.
pub fn slice_name_from_id(id: &str, path: &str) -> Option<String> {
    id.strip_prefix(path)
        .and_then(|suffix| suffix.strip_prefix(':'))
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

/// Whether an element's id agrees with its path and slice name.
pub fn id_is_consistent(element: &ElementDefinition) -> bool {
    match (&element.id, &element.slice_name) {
        (Some(id), Some(slice_name)) => *id == format!("{}:{}", element.path, slice_name),
        (Some(id), None) => *id == element.path || !id.contains(':'),
        (None, _) => true,
    }
}
