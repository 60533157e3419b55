//! Differential tree completion
//!
//! A differential is a sparse element list: authors only mention the paths
//! they constrain, so `Patient.contact.name` may appear without
//! `Patient.contact` or even `Patient`. Completion inserts path-only
//! placeholder elements until every element's parent precedes it, which is
//! what the matcher's recursive descent requires.

use crucible_models::ElementDefinition;

use crate::error::{Error, Result};

/// Insert placeholder parents until the list forms a well-ordered tree.
///
/// Placeholders carry nothing but their path, so merging them onto a base
/// element changes nothing. Running completion on an already complete list
/// returns it unchanged.
pub fn complete_differential(elements: &[ElementDefinition]) -> Result<Vec<ElementDefinition>> {
    let mut diff: Vec<ElementDefinition> = elements.to_vec();
    let mut index = 0;
    while index < diff.len() {
        let this_path = diff[index].path.clone();
        let prev_path = if index > 0 {
            diff[index - 1].path.clone()
        } else {
            String::new()
        };

        if !this_path.contains('.') {
            if index != 0 {
                return Err(Error::MultipleRoots(this_path));
            }
            index += 1;
        } else if is_sibling(&this_path, &prev_path) || is_direct_child(&prev_path, &this_path) {
            index += 1;
        } else {
            // parent_of is Some here because this_path contains a dot
            let Some(parent) = parent_of(&this_path) else {
                index += 1;
                continue;
            };
            if prev_path.starts_with(&format!("{parent}.")) {
                // The parent is already open further up; this element starts
                // a new branch under it.
                index += 1;
            } else {
                // Leave index untouched so the placeholder is re-examined,
                // inserting grandparents as needed.
                diff.insert(index, ElementDefinition::new(parent));
            }
        }
    }
    Ok(diff)
}

fn parent_of(path: &str) -> Option<&str> {
    path.rfind('.').map(|i| &path[..i])
}

fn is_sibling(a: &str, b: &str) -> bool {
    match (parent_of(a), parent_of(b)) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

fn is_direct_child(parent: &str, child: &str) -> bool {
    if parent.is_empty() {
        return false;
    }
    child
        .strip_prefix(parent)
        .map_or(false, |rest| rest.starts_with('.') && !rest[1..].contains('.'))
}
