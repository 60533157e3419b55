//! Element list validation
//!
//! Standalone checks that an element list honors the pre-order invariant
//! (single root, parents before children, descendants contiguous) and that a
//! differential stays inside its base type's root. The generator trusts its
//! own output; these helpers exist for callers that ingest element lists from
//! untrusted sources, and for tests.

use crucible_models::{Differential, ElementDefinition, Snapshot};

use crate::error::{Error, Result};

/// Check that a snapshot element list is a well-formed pre-order tree.
pub fn validate_snapshot(snapshot: &Snapshot) -> Result<()> {
    if snapshot.element.is_empty() {
        return Err(Error::InvalidElementOrder(
            "snapshot has no elements".to_string(),
        ));
    }
    validate_preorder(&snapshot.element)
}

/// Check that a differential's paths all sit under the base type's root and
/// that, where both parent and child appear, they are in pre-order.
pub fn validate_differential(differential: &Differential, base_root: &str) -> Result<()> {
    let root_prefix = format!("{base_root}.");
    for element in &differential.element {
        if element.path != base_root && !element.path.starts_with(&root_prefix) {
            return Err(Error::PathOutsideBase {
                path: element.path.clone(),
                root: base_root.to_string(),
            });
        }
    }
    validate_relative_order(&differential.element)
}

/// Strict pre-order: the first element is the only root, every other
/// element's parent is on the open ancestor stack when it appears.
fn validate_preorder(elements: &[ElementDefinition]) -> Result<()> {
    let mut stack: Vec<&str> = Vec::new();
    for (index, element) in elements.iter().enumerate() {
        match element.parent_path() {
            None => {
                if index != 0 {
                    return Err(Error::MultipleRoots(element.path.clone()));
                }
            }
            Some(parent) => {
                while let Some(top) = stack.last() {
                    if *top == parent {
                        break;
                    }
                    stack.pop();
                }
                if stack.last() != Some(&parent) {
                    return Err(Error::InvalidElementOrder(format!(
                        "element '{}' appears without its parent '{}' open",
                        element.path, parent
                    )));
                }
            }
        }
        stack.push(&element.path);
    }
    Ok(())
}

/// Lenient ordering for sparse differentials: a parent may be absent, but
/// where it does appear it must not come after its children.
fn validate_relative_order(elements: &[ElementDefinition]) -> Result<()> {
    for (index, element) in elements.iter().enumerate() {
        if let Some(parent) = element.parent_path() {
            let parent_later = elements[index + 1..]
                .iter()
                .any(|e| e.path == parent && e.slice_name.is_none());
            if parent_later {
                return Err(Error::InvalidElementOrder(format!(
                    "element '{}' appears before its parent '{}'",
                    element.path, parent
                )));
            }
        }
    }
    Ok(())
}
