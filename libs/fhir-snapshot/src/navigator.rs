//! Cursor-based navigation over an element tree
//!
//! The navigator owns its tree and exposes the traversal and structural
//! editing operations the generator is written against: sibling and child
//! movement, bookmarks, slice-aware positioning, and subtree copies. A fresh
//! navigator starts above the root element, so `move_to_first_child` lands
//! on the root itself.

use crucible_models::ElementDefinition;

use crate::tree::{Bookmark, ElementTree, NodeId};

#[derive(Debug, Clone, Default)]
pub struct ElementNavigator {
    tree: ElementTree,
    current: Option<NodeId>,
}

impl ElementNavigator {
    pub fn new(elements: Vec<ElementDefinition>) -> Self {
        Self {
            tree: ElementTree::from_elements(elements),
            current: None,
        }
    }

    pub fn from_tree(tree: ElementTree) -> Self {
        Self {
            tree,
            current: None,
        }
    }

    pub fn tree(&self) -> &ElementTree {
        &self.tree
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// The element under the cursor, if the cursor is on one.
    pub fn current(&self) -> Option<&ElementDefinition> {
        self.current.map(|id| self.tree.get(id))
    }

    pub fn current_mut(&mut self) -> Option<&mut ElementDefinition> {
        self.current.map(move |id| self.tree.get_mut(id))
    }

    /// Path of the current element, or the empty string above the root.
    pub fn path(&self) -> &str {
        self.current
            .map(|id| self.tree.get(id).path.as_str())
            .unwrap_or("")
    }

    fn current_depth(&self) -> usize {
        self.current.map(|id| self.tree.get(id).depth()).unwrap_or(0)
    }

    /// Move to the first child of the current element. Above the root this
    /// lands on the root element.
    pub fn move_to_first_child(&mut self) -> bool {
        let next_position = match self.current {
            None => 0,
            Some(id) => self.tree.position(id) + 1,
        };
        let depth = self.current_depth();
        match self.tree.at(next_position) {
            Some(next) if self.tree.get(next).depth() == depth + 1 => {
                self.current = Some(next);
                true
            }
            _ => false,
        }
    }

    /// Move to the next sibling, skipping over the current subtree.
    pub fn move_to_next_sibling(&mut self) -> bool {
        let Some(id) = self.current else { return false };
        let depth = self.tree.get(id).depth();
        let next_position = self.tree.subtree_end(id);
        match self.tree.at(next_position) {
            Some(next) if self.tree.get(next).depth() == depth => {
                self.current = Some(next);
                true
            }
            _ => false,
        }
    }

    /// Move to the first child whose last path segment is `name`. The cursor
    /// is left untouched when no such child exists.
    pub fn move_to_child(&mut self, name: &str) -> bool {
        let saved = self.current;
        if !self.move_to_first_child() {
            return false;
        }
        loop {
            if let Some(element) = self.current() {
                if element.last_segment() == name {
                    return true;
                }
            }
            if !self.move_to_next_sibling() {
                break;
            }
        }
        self.current = saved;
        false
    }

    /// Move to the parent element; from the root this moves above the root.
    pub fn move_to_parent(&mut self) -> bool {
        let Some(id) = self.current else { return false };
        let depth = self.tree.get(id).depth();
        if depth == 1 {
            self.current = None;
            return true;
        }
        let mut position = self.tree.position(id);
        while position > 0 {
            position -= 1;
            if let Some(node) = self.tree.at(position) {
                if self.tree.get(node).depth() < depth {
                    self.current = Some(node);
                    return true;
                }
            }
        }
        false
    }

    /// Whether the current element has children. Above the root this reports
    /// whether the tree has any element at all.
    pub fn has_children(&self) -> bool {
        match self.current {
            None => !self.tree.is_empty(),
            Some(id) => match self.tree.at(self.tree.position(id) + 1) {
                Some(next) => self.tree.get(next).depth() > self.tree.get(id).depth(),
                None => false,
            },
        }
    }

    /// From a slice entry, move to the last element of its slice group: the
    /// run of following siblings that carry a slice name or repeat the entry
    /// path. Stays put when the group has no further members.
    pub fn move_to_last_slice(&mut self) -> bool {
        let Some(id) = self.current else { return false };
        let entry_path = self.tree.get(id).path.clone();
        loop {
            let Some(id) = self.current else { return false };
            let depth = self.tree.get(id).depth();
            let next_position = self.tree.subtree_end(id);
            let next = match self.tree.at(next_position) {
                Some(next) if self.tree.get(next).depth() == depth => next,
                _ => return true,
            };
            let element = self.tree.get(next);
            if element.path == entry_path || element.slice_name.is_some() {
                self.current = Some(next);
            } else {
                return true;
            }
        }
    }

    /// Jump to the element a name reference designates. A leading `#` is
    /// ignored; a dotted reference matches a full path, a bare name matches
    /// the last path segment of the first element carrying it.
    pub fn jump_to_name_reference(&mut self, name: &str) -> bool {
        let target = name.strip_prefix('#').unwrap_or(name);
        let dotted = target.contains('.');
        let mut found = None;
        for (id, element) in self.tree.iter() {
            let hit = if dotted {
                element.path == target
            } else {
                element.last_segment() == target
            };
            if hit {
                found = Some(id);
                break;
            }
        }
        match found {
            Some(id) => {
                self.current = Some(id);
                true
            }
            None => false,
        }
    }

    /// Save the cursor position. Bookmarks survive structural edits.
    pub fn bookmark(&self) -> Bookmark {
        Bookmark(self.current)
    }

    /// Restore a previously saved position.
    pub fn return_to_bookmark(&mut self, bookmark: Bookmark) -> bool {
        match bookmark.node() {
            None => {
                self.current = None;
                true
            }
            Some(id) if self.tree.contains(id) => {
                self.current = Some(id);
                true
            }
            Some(_) => false,
        }
    }

    /// Deep-copy the current subtree and splice the copy in directly after
    /// the subtree at `after`. The cursor moves to the copied root, which
    /// gets a fresh identity; every position saved before the call still
    /// resolves to the element it was taken on.
    pub fn duplicate_after(&mut self, after: Bookmark) -> bool {
        let Some(source) = self.current else { return false };
        let Some(after) = after.node() else { return false };
        if !self.tree.contains(after) {
            return false;
        }
        let copy = self.tree.duplicate_after(source, after);
        self.current = Some(copy);
        true
    }

    /// Splice a pre-ordered run of elements in directly after the subtree at
    /// `after`, moving the cursor to the spliced root. Fails when the run is
    /// empty or `after` does not point at an element.
    pub fn graft_after(&mut self, elements: Vec<ElementDefinition>, after: Bookmark) -> bool {
        let Some(after) = after.node() else { return false };
        if elements.is_empty() || !self.tree.contains(after) {
            return false;
        }
        let root = self.tree.graft_after(elements, after);
        self.current = Some(root);
        true
    }

    /// Replace the (absent) children of the current element with deep copies
    /// of the source cursor's children, re-prefixing their paths onto the
    /// current path. Fails when the current element already has children or
    /// the source has none.
    pub fn copy_children(&mut self, source: &ElementNavigator) -> bool {
        let Some(target) = self.current else { return false };
        if self.has_children() {
            return false;
        }
        let Some(source_id) = source.current else { return false };

        let source_path = source.tree.get(source_id).path.clone();
        let mut elements = source.tree.subtree_elements(source_id);
        if elements.len() <= 1 {
            return false;
        }
        elements.remove(0);

        let target_path = self.tree.get(target).path.clone();
        for element in &mut elements {
            let suffix = element.path[source_path.len()..].to_string();
            element.path = format!("{target_path}{suffix}");
        }
        self.tree.graft_after(elements, target);
        true
    }

    /// Rewrite the current element's path, re-prefixing its descendants.
    pub fn rebase_current(&mut self, new_path: &str) -> bool {
        let Some(id) = self.current else { return false };
        self.tree.rebase_subtree(id, new_path);
        true
    }

    pub fn into_elements(self) -> Vec<ElementDefinition> {
        self.tree.into_elements()
    }

    pub fn to_elements(&self) -> Vec<ElementDefinition> {
        self.tree.to_elements()
    }
}
