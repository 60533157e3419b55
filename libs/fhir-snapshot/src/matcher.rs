//! Pairing differential children with base snapshot children
//!
//! For one level of the tree, the matcher decides what the generator should
//! do with each differential child: merge it onto an existing base element,
//! add it as a new slice, or merge it into the base element's slicing entry.
//! Matches come back in differential declaration order and reference both
//! trees by bookmark, so they stay valid while the generator edits the
//! snapshot.

use crate::error::{Error, Result};
use crate::navigator::ElementNavigator;
use crate::slicing::is_extension_element;
use crate::tree::Bookmark;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchAction {
    /// Overlay the differential element onto the matched base element.
    Merge,
    /// Introduce a new slice: clone the base element and overlay onto the
    /// clone, placed after the last existing slice.
    Add,
    /// Merge the differential's slicing entry into the base element.
    Slice,
}

#[derive(Debug, Clone, Copy)]
pub struct ElementMatch {
    /// Matched element in the base snapshot.
    pub base: Bookmark,
    /// Differential element to apply.
    pub diff: Bookmark,
    pub action: MatchAction,
}

struct BaseChild {
    bookmark: Bookmark,
    name: String,
    slice_name: Option<String>,
    sliced: bool,
    choice_types: Vec<String>,
    extension: bool,
}

struct DiffChild {
    bookmark: Bookmark,
    path: String,
    name: String,
    slice_name: Option<String>,
    has_slicing: bool,
}

/// Indices into the base children that share one element name: the entry
/// first, existing slices after it.
struct BaseTarget {
    entry: usize,
    members: Vec<usize>,
}

/// Pair every differential child of the current element with a base child.
/// Both navigators are restored to their entry positions before returning.
pub fn match_children(
    snap: &mut ElementNavigator,
    diff: &mut ElementNavigator,
) -> Result<Vec<ElementMatch>> {
    let snap_start = snap.bookmark();
    let diff_start = diff.bookmark();
    let result = match_children_inner(snap, diff);
    snap.return_to_bookmark(snap_start);
    diff.return_to_bookmark(diff_start);
    result
}

fn match_children_inner(
    snap: &mut ElementNavigator,
    diff: &mut ElementNavigator,
) -> Result<Vec<ElementMatch>> {
    let base_children = collect_base_children(snap);
    let diff_children = collect_diff_children(diff);

    let mut matches = Vec::new();
    let mut index = 0;
    while index < diff_children.len() {
        let child = &diff_children[index];
        let target = find_base_target(&base_children, &child.name)?
            .ok_or_else(|| Error::UnmatchedElement(child.path.clone()))?;

        // The group is the run of consecutive differential siblings that
        // resolve to the same base entry; named slices and the renamed forms
        // of one choice element all land in one group.
        let mut end = index + 1;
        while end < diff_children.len() {
            let next = find_base_target(&base_children, &diff_children[end].name)?;
            if next.map(|t| t.entry) == Some(target.entry) {
                end += 1;
            } else {
                break;
            }
        }
        let group = &diff_children[index..end];

        if group.len() == 1 && group[0].slice_name.is_none() && !group[0].has_slicing {
            matches.push(ElementMatch {
                base: base_children[target.entry].bookmark,
                diff: group[0].bookmark,
                action: MatchAction::Merge,
            });
        } else {
            match_slice_group(&base_children, &target, group, &mut matches)?;
        }
        index = end;
    }
    Ok(matches)
}

fn match_slice_group(
    base_children: &[BaseChild],
    target: &BaseTarget,
    group: &[DiffChild],
    matches: &mut Vec<ElementMatch>,
) -> Result<()> {
    let entry = &base_children[target.entry];

    // The slicing entry: an explicit header when the differential carries
    // one, the prefabricated url-discriminated header for extensions, an
    // inherited header when the base is already sliced. Anything else cannot
    // introduce slices.
    let header = group
        .iter()
        .find(|m| m.has_slicing && m.slice_name.is_none());
    if let Some(header) = header {
        matches.push(ElementMatch {
            base: entry.bookmark,
            diff: header.bookmark,
            action: MatchAction::Slice,
        });
    } else if !entry.sliced {
        let named = group.iter().find(|m| m.slice_name.is_some());
        match named {
            Some(first_named) if entry.extension => {
                matches.push(ElementMatch {
                    base: entry.bookmark,
                    diff: first_named.bookmark,
                    action: MatchAction::Slice,
                });
            }
            Some(first_named) => {
                return Err(Error::SliceWithoutEntry(first_named.path.clone()));
            }
            None => {
                // Several unsliced constraints on one path and no header to
                // tell them apart.
                return Err(Error::AmbiguousMatch(group[0].path.clone()));
            }
        }
    }

    let header_bookmark = header.map(|h| h.bookmark);
    for member in group {
        if Some(member.bookmark) == header_bookmark {
            continue;
        }
        match &member.slice_name {
            Some(name) => {
                let existing = target
                    .members
                    .iter()
                    .find(|&&idx| base_children[idx].slice_name.as_deref() == Some(name));
                match existing {
                    Some(&idx) => matches.push(ElementMatch {
                        base: base_children[idx].bookmark,
                        diff: member.bookmark,
                        action: MatchAction::Merge,
                    }),
                    None => matches.push(ElementMatch {
                        base: entry.bookmark,
                        diff: member.bookmark,
                        action: MatchAction::Add,
                    }),
                }
            }
            None => {
                // An unsliced member alongside slices constrains the entry.
                matches.push(ElementMatch {
                    base: entry.bookmark,
                    diff: member.bookmark,
                    action: MatchAction::Merge,
                });
            }
        }
    }
    Ok(())
}

fn collect_base_children(snap: &mut ElementNavigator) -> Vec<BaseChild> {
    let mut children = Vec::new();
    if !snap.move_to_first_child() {
        return children;
    }
    loop {
        let bookmark = snap.bookmark();
        if let Some(element) = snap.current() {
            children.push(BaseChild {
                bookmark,
                name: element.last_segment().to_string(),
                slice_name: element.slice_name.clone(),
                sliced: element.slicing.is_some(),
                choice_types: if element.is_choice_type() {
                    element.type_codes()
                } else {
                    Vec::new()
                },
                extension: is_extension_element(element),
            });
        }
        if !snap.move_to_next_sibling() {
            break;
        }
    }
    children
}

fn collect_diff_children(diff: &mut ElementNavigator) -> Vec<DiffChild> {
    let mut children = Vec::new();
    if !diff.move_to_first_child() {
        return children;
    }
    loop {
        let bookmark = diff.bookmark();
        if let Some(element) = diff.current() {
            children.push(DiffChild {
                bookmark,
                path: element.path.clone(),
                name: element.last_segment().to_string(),
                slice_name: element.slice_name.clone(),
                has_slicing: element.slicing.is_some(),
            });
        }
        if !diff.move_to_next_sibling() {
            break;
        }
    }
    children
}

/// Locate the base children a differential name refers to. A literal match
/// wins; failing that, a type-suffixed name may match exactly one choice
/// element (`valueQuantity` against `value[x]` typed `Quantity`).
fn find_base_target(children: &[BaseChild], diff_name: &str) -> Result<Option<BaseTarget>> {
    let literal: Vec<usize> = children
        .iter()
        .enumerate()
        .filter(|(_, c)| c.name == diff_name)
        .map(|(i, _)| i)
        .collect();
    if let Some(&entry) = literal.first() {
        if literal.len() > 1 && !children[entry].sliced && children[literal[1]].slice_name.is_none()
        {
            return Err(Error::AmbiguousMatch(diff_name.to_string()));
        }
        return Ok(Some(BaseTarget {
            entry,
            members: literal,
        }));
    }

    let renamed: Vec<usize> = children
        .iter()
        .enumerate()
        .filter(|(_, c)| is_choice_shorthand(&c.name, diff_name, &c.choice_types))
        .map(|(i, _)| i)
        .collect();
    match renamed.len() {
        0 => Ok(None),
        1 => Ok(Some(BaseTarget {
            entry: renamed[0],
            members: renamed,
        })),
        _ => Err(Error::AmbiguousMatch(diff_name.to_string())),
    }
}

/// `valueQuantity` is shorthand for `value[x]` when `Quantity` is one of the
/// declared choice types. Primitive codes compare case-insensitively, since
/// the rename capitalizes them (`valueString` for `string`).
fn is_choice_shorthand(base_name: &str, diff_name: &str, choice_types: &[String]) -> bool {
    let Some(stem) = base_name.strip_suffix("[x]") else {
        return false;
    };
    let Some(suffix) = diff_name.strip_prefix(stem) else {
        return false;
    };
    !suffix.is_empty() && choice_types.iter().any(|code| suffix.eq_ignore_ascii_case(code))
}
