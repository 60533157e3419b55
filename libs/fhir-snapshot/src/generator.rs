//! Snapshot generation
//!
//! The generator resolves a profile's base, stamps base provenance, completes
//! the differential, and walks both element trees in lock-step: at every level
//! the matcher pairs differential children with base children, and each pair
//! is merged, sliced, or added as a new slice instance. Elements the
//! differential descends into are expanded on demand, by name reference or by
//! resolving their declared type.
//!
//! The generator is stateful only for the duration of one call chain: it
//! tracks the set of profile urls currently being expanded, and refuses to
//! re-enter one, so circular base or type-profile chains fail fast instead of
//! recursing without bound.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde_json::Value;

use crucible_context::ProfileResolver;
use crucible_models::{
    ElementDefinition, ElementDefinitionBase, ElementDefinitionType, Snapshot,
    StructureDefinition, TypeKind,
};

use crate::differential::complete_differential;
use crate::error::{Error, Result};
use crate::matcher::{match_children, MatchAction};
use crate::merge::{mark_changed, merge_element_fields};
use crate::navigator::ElementNavigator;
use crate::normalization::normalize_element_id;
use crate::policy::MergePolicy;
use crate::slicing::{extension_slicing, is_extension_element};
use crate::tree::{Bookmark, NodeId};

/// A type-profile reference, optionally addressing a single element inside
/// the profile (`url#elementName`).
struct ProfileReference<'a> {
    url: &'a str,
    element: Option<&'a str>,
}

impl<'a> ProfileReference<'a> {
    fn parse(reference: &'a str) -> Self {
        match reference.split_once('#') {
            Some((url, element)) if !element.is_empty() => Self {
                url,
                element: Some(element),
            },
            _ => Self {
                url: reference,
                element: None,
            },
        }
    }
}

/// Generates the snapshot element list of a constraint or extension profile
/// by merging its differential onto its base profile's snapshot.
pub struct SnapshotGenerator<R> {
    resolver: R,
    policy: MergePolicy,
    /// Urls of profiles currently being expanded, for cycle detection.
    in_progress: HashSet<String>,
}

impl<R: ProfileResolver> SnapshotGenerator<R> {
    pub fn new(resolver: R) -> Self {
        Self::with_policy(resolver, MergePolicy::default())
    }

    pub fn with_policy(resolver: R, policy: MergePolicy) -> Self {
        Self {
            resolver,
            policy,
            in_progress: HashSet::new(),
        }
    }

    pub fn policy(&self) -> MergePolicy {
        self.policy
    }

    /// (Re-)generate `structure.snapshot` from its differential and base.
    /// Any previous snapshot is replaced; the differential is left untouched.
    pub fn generate(&mut self, structure: &mut StructureDefinition) -> Result<()> {
        let elements = self.expand(structure)?;
        structure.snapshot = Some(Snapshot { element: elements });
        Ok(())
    }

    /// Expand the differential against the base profile and return the merged
    /// element list. The given structure is not modified.
    pub fn expand(&mut self, structure: &StructureDefinition) -> Result<Vec<ElementDefinition>> {
        if !self.in_progress.insert(structure.url.clone()) {
            return Err(Error::CircularDependency(structure.url.clone()));
        }
        let result = self.expand_guarded(structure);
        self.in_progress.remove(&structure.url);
        result
    }

    /// Expand the children of a single element inside an element list,
    /// without running a full profile merge. Returns the expanded list.
    pub fn expand_element(
        &mut self,
        elements: &[ElementDefinition],
        path: &str,
    ) -> Result<Vec<ElementDefinition>> {
        let mut nav = ElementNavigator::new(elements.to_vec());
        if !move_to_path(&mut nav, path) {
            return Err(Error::UnmatchedElement(path.to_string()));
        }
        self.expand_children(&mut nav)?;
        Ok(nav.into_elements())
    }

    fn expand_guarded(&mut self, structure: &StructureDefinition) -> Result<Vec<ElementDefinition>> {
        tracing::debug!(url = %structure.url, "expanding profile");

        let differential = structure
            .differential
            .as_ref()
            .ok_or_else(|| Error::MissingDifferential(structure.url.clone()))?;
        if !structure.is_constraint() && !structure.is_extension() {
            return Err(Error::NotDerived(structure.url.clone()));
        }
        let base_url = structure
            .base_definition
            .as_deref()
            .ok_or_else(|| Error::MissingBaseDefinition(structure.url.clone()))?;

        // An unresolved base is always fatal; `ignore_unresolved_profiles`
        // covers element-level type and extension profiles only.
        let base = self
            .resolver
            .resolve(base_url)?
            .ok_or_else(|| Error::UnresolvedProfile(base_url.to_string()))?;
        let mut elements = self.snapshot_elements(base)?;
        self.stamp_base_provenance(&mut elements)?;

        let completed = complete_differential(&differential.element)?;

        let mut snap = ElementNavigator::new(elements);
        let mut diff = ElementNavigator::new(completed);
        self.merge_children(&mut snap, &mut diff)?;

        let mut elements = snap.into_elements();
        for element in &mut elements {
            normalize_element_id(element);
        }
        Ok(elements)
    }

    /// The snapshot elements of a resolved profile, generating the snapshot
    /// on demand when the policy allows it.
    fn snapshot_elements(
        &mut self,
        structure: Arc<StructureDefinition>,
    ) -> Result<Vec<ElementDefinition>> {
        if let Some(snapshot) = &structure.snapshot {
            return Ok(snapshot.element.clone());
        }
        if !self.policy.expand_external_profiles {
            return Err(Error::MissingSnapshot(structure.url.clone()));
        }
        tracing::debug!(url = %structure.url, "recursively generating snapshot for external profile");
        let mut owned = (*structure).clone();
        self.generate(&mut owned)?;
        match owned.snapshot {
            Some(snapshot) => Ok(snapshot.element),
            None => Err(Error::MissingSnapshot(owned.url)),
        }
    }

    /// Merge one level of the differential tree into the snapshot tree. Both
    /// navigators are restored to their entry positions on exit, so the
    /// caller can continue walking after a recursive descent.
    fn merge_children(
        &mut self,
        snap: &mut ElementNavigator,
        diff: &mut ElementNavigator,
    ) -> Result<()> {
        let snap_start = snap.bookmark();
        let diff_start = diff.bookmark();
        let result = self.merge_children_inner(snap, diff);
        snap.return_to_bookmark(snap_start);
        diff.return_to_bookmark(diff_start);
        result
    }

    fn merge_children_inner(
        &mut self,
        snap: &mut ElementNavigator,
        diff: &mut ElementNavigator,
    ) -> Result<()> {
        let matches = match_children(snap, diff)?;

        // New slice instances clone the slice entry as it stood before this
        // pass merged anything onto it; constraints the slicing header puts
        // on the entry stay on the entry.
        let mut pristine: HashMap<NodeId, Vec<ElementDefinition>> = HashMap::new();
        for pair in &matches {
            if pair.action != MatchAction::Add {
                continue;
            }
            if let Some(id) = pair.base.node() {
                pristine
                    .entry(id)
                    .or_insert_with(|| snap.tree().subtree_elements(id));
            }
        }

        for pair in matches {
            snap.return_to_bookmark(pair.base);
            diff.return_to_bookmark(pair.diff);

            match pair.action {
                MatchAction::Add => {
                    // Materialize the new slice after the last existing slice
                    // of the group.
                    snap.move_to_last_slice();
                    let last_slice = snap.bookmark();
                    let entry = pair
                        .base
                        .node()
                        .and_then(|id| pristine.get(&id))
                        .cloned()
                        .unwrap_or_default();
                    if !snap.graft_after(entry, last_slice) {
                        continue;
                    }
                    if let Some(copy) = snap.current_mut() {
                        copy.slicing = None;
                        if self.policy.mark_changes {
                            mark_changed(copy);
                        }
                    }
                    self.merge_element(snap, diff)?;
                }
                MatchAction::Merge => self.merge_element(snap, diff)?,
                MatchAction::Slice => self.make_slice(snap, diff)?,
            }
        }
        Ok(())
    }

    /// Merge the differential element under `diff` onto the snapshot element
    /// under `snap`, expanding and recursing into children as needed.
    fn merge_element(
        &mut self,
        snap: &mut ElementNavigator,
        diff: &mut ElementNavigator,
    ) -> Result<()> {
        if self.policy.expand_type_profiles {
            self.merge_type_profile(snap, diff)?;
        }

        let Some(diff_element) = diff.current().cloned() else {
            return Ok(());
        };
        let Some(target) = snap.current_mut() else {
            return Ok(());
        };
        merge_element_fields(target, &diff_element, self.policy.mark_changes)?;

        if diff.has_children() {
            if !snap.has_children() {
                // A (shorthand) type slice has already reduced a choice to a
                // single type by now; anything still ambiguous cannot take
                // child constraints.
                let type_count = snap
                    .current()
                    .and_then(|e| e.types.as_ref())
                    .map_or(0, |t| t.len());
                if type_count > 1 {
                    return Err(Error::ChoiceWithoutTypeSlice(diff.path().to_string()));
                }
                self.expand_children(snap)?;
                if !snap.has_children() {
                    return Err(Error::NestedConstraintsOnLeaf(diff.path().to_string()));
                }
            }
            self.merge_children(snap, diff)?;
            self.fix_extension_url(snap);
        }
        Ok(())
    }

    /// Merge constraints inherited from a custom element-type profile before
    /// the local differential element is applied, so local constraints take
    /// final precedence.
    fn merge_type_profile(
        &mut self,
        snap: &mut ElementNavigator,
        diff: &mut ElementNavigator,
    ) -> Result<()> {
        let Some(diff_type) = diff.current().and_then(|e| e.primary_type().cloned()) else {
            return Ok(());
        };
        if diff_type.kind() == TypeKind::Reference {
            return Ok(());
        }
        let Some(snap_type) = snap.current().and_then(|e| e.primary_type().cloned()) else {
            return Ok(());
        };
        let Some(diff_profile) = diff_type.primary_profile() else {
            return Ok(());
        };
        if Some(diff_profile) == snap_type.primary_profile() {
            return Ok(());
        }

        let reference = ProfileReference::parse(diff_profile);
        let Some(structure) = self.resolver.resolve(reference.url)? else {
            if !self.policy.ignore_unresolved_profiles {
                return Err(Error::UnresolvedProfile(reference.url.to_string()));
            }
            tracing::warn!(
                profile = reference.url,
                path = diff.path(),
                "skipping unresolved element type profile"
            );
            return Ok(());
        };

        if structure.snapshot.is_none()
            && !self.policy.expand_external_profiles
            && self.policy.ignore_unresolved_profiles
        {
            tracing::warn!(
                profile = reference.url,
                path = diff.path(),
                "skipping element type profile without a snapshot"
            );
            return Ok(());
        }
        let mut elements = self.snapshot_elements(structure)?;

        // Rebase the external profile onto the constrained element, so its
        // paths line up with the snapshot under construction.
        let rebase_path = match reference.element {
            Some(_) => parent_path(diff.path()).unwrap_or(diff.path()).to_string(),
            None => diff.path().to_string(),
        };
        rebase_elements(&mut elements, &rebase_path);
        self.stamp_base_provenance(&mut elements)?;

        let mut base_nav = ElementNavigator::new(elements);
        match reference.element {
            Some(name) => {
                if !base_nav.jump_to_name_reference(name) {
                    return Err(Error::InvalidNameReference(
                        reference.url.to_string(),
                        name.to_string(),
                    ));
                }
            }
            None => {
                base_nav.move_to_first_child();
            }
        }

        if diff.has_children() {
            // The differential constrains children too: merge the full
            // external subtree first, then let the local constraints win.
            self.merge_element(snap, &mut base_nav)?;
        } else {
            let Some(external) = base_nav.current().cloned() else {
                return Ok(());
            };
            let Some(target) = snap.current_mut() else {
                return Ok(());
            };
            merge_element_fields(target, &external, self.policy.mark_changes)?;
        }
        Ok(())
    }

    /// Merge the differential's slicing entry onto the unsliced base element.
    /// No new element is created; slice instances follow as separate matches.
    fn make_slice(&mut self, snap: &mut ElementNavigator, diff: &mut ElementNavigator) -> Result<()> {
        let Some(diff_element) = diff.current().cloned() else {
            return Ok(());
        };
        let Some(base) = snap.current() else {
            return Ok(());
        };
        if !base.is_repeating() && !base.is_choice_type() {
            return Err(Error::SliceOnNonRepeatingElement(diff_element.path.clone()));
        }

        let entry = if diff_element.slicing.is_some() {
            diff_element
        } else if is_extension_element(base) || is_extension_element(&diff_element) {
            // Extension slices may omit the slicing entry; fabricate the
            // conventional url-discriminated header.
            ElementDefinition {
                slicing: Some(extension_slicing()),
                ..ElementDefinition::new(base.path.clone())
            }
        } else {
            return Err(Error::SliceWithoutEntry(diff_element.path.clone()));
        };

        let Some(target) = snap.current_mut() else {
            return Ok(());
        };
        merge_element_fields(target, &entry, self.policy.mark_changes)?;
        Ok(())
    }

    /// Expand the children of the current element on demand: copy the subtree
    /// its name reference designates, or the children of its declared type's
    /// defining profile. Leaves without either are left untouched.
    fn expand_children(&mut self, nav: &mut ElementNavigator) -> Result<()> {
        if nav.has_children() {
            return Ok(());
        }
        let Some(element) = nav.current().cloned() else {
            return Ok(());
        };

        if let Some(name_ref) = &element.name_reference {
            let mut source = nav.clone();
            if !source.jump_to_name_reference(name_ref) {
                return Err(Error::InvalidNameReference(
                    element.path.clone(),
                    name_ref.clone(),
                ));
            }
            nav.copy_children(&source);
        } else if let Some(types) = &element.types {
            if types.len() > 1 {
                return Err(Error::ChoiceWithoutTypeSlice(element.path.clone()));
            }
            let Some(primary) = types.first() else {
                return Ok(());
            };
            let mut elements = self.type_snapshot_elements(&element, primary)?;
            self.stamp_base_provenance(&mut elements)?;
            let mut source = ElementNavigator::new(elements);
            source.move_to_first_child();
            nav.copy_children(&source);
        }
        Ok(())
    }

    /// Resolve the defining profile for an element's single declared type and
    /// return its snapshot elements: the custom type profile when one is
    /// declared and the policy merges those, the core type otherwise.
    fn type_snapshot_elements(
        &mut self,
        element: &ElementDefinition,
        primary: &ElementDefinitionType,
    ) -> Result<Vec<ElementDefinition>> {
        let kind = primary.kind();
        let type_profile = primary.primary_profile().map(str::to_string);

        let structure = match &type_profile {
            Some(profile)
                if kind != TypeKind::Extension
                    && kind != TypeKind::Reference
                    && self.policy.expand_type_profiles =>
            {
                match self.resolver.resolve(profile)? {
                    Some(structure) => Some(structure),
                    None if self.policy.ignore_unresolved_profiles => {
                        tracing::warn!(
                            profile = profile.as_str(),
                            path = element.path.as_str(),
                            "unresolved type profile, falling back to core type"
                        );
                        self.resolver.resolve_core_type(&primary.code)?
                    }
                    None => None,
                }
            }
            _ => self.resolver.resolve_core_type(&primary.code)?,
        };

        let Some(structure) = structure else {
            return Err(match type_profile {
                Some(profile) => Error::UnresolvedProfile(profile),
                None => Error::UnresolvedCoreType(primary.code.clone()),
            });
        };
        self.snapshot_elements(structure)
    }

    /// After merging the children of an extension element, give its `url`
    /// child the extension profile's canonical url as fixed value when the
    /// differential left it unset.
    fn fix_extension_url(&self, nav: &mut ElementNavigator) {
        let Some(element) = nav.current() else { return };
        if !is_extension_element(element) || !nav.has_children() {
            return;
        }
        let Some(profile) = element.primary_type_profile().map(str::to_string) else {
            return;
        };
        let entry = nav.bookmark();
        if nav.move_to_child("url") {
            if let Some(url_element) = nav.current_mut() {
                if url_element.fixed.is_none() {
                    url_element.fixed = Some(Value::String(profile));
                }
            }
        }
        nav.return_to_bookmark(entry);
    }

    /// Stamp base provenance on every element that lacks it (or on all of
    /// them under `rewrite_element_base`): the defining path and cardinality
    /// this element was first introduced with.
    ///
    /// Under normalization the defining ancestor is located by structural
    /// element name rather than literal path: first across the root type's
    /// ancestry, then across the chain of the parent element's declared type,
    /// so `Patient.name.given` resolves to `HumanName.given`.
    fn stamp_base_provenance(&mut self, elements: &mut [ElementDefinition]) -> Result<()> {
        let normalize = self.policy.normalize_element_base;
        let root_chain = match elements.first().and_then(|root| root.primary_type()) {
            Some(primary) if normalize => {
                let code = primary.code.clone();
                self.type_chain(&code)?
            }
            _ => Vec::new(),
        };
        // Complex type declared by each element, keyed by path, for chasing
        // a child's defining ancestor through its parent's type.
        let parent_types: HashMap<String, String> = if normalize {
            elements
                .iter()
                .filter_map(|e| {
                    let primary = e.primary_type()?;
                    (primary.kind() == TypeKind::Complex)
                        .then(|| (e.path.clone(), primary.code.clone()))
                })
                .collect()
        } else {
            HashMap::new()
        };
        let mut chains: HashMap<String, Vec<Arc<StructureDefinition>>> = HashMap::new();

        for index in 0..elements.len() {
            if !self.policy.rewrite_element_base && elements[index].base.is_some() {
                continue;
            }
            let name = elements[index].last_segment().to_string();
            let mut defining = find_defining(&root_chain, &name);
            if normalize && defining.is_none() {
                let parent_type = parent_path(&elements[index].path)
                    .and_then(|parent| parent_types.get(parent))
                    .cloned();
                if let Some(code) = parent_type {
                    if !chains.contains_key(&code) {
                        let chain = self.type_chain(&code)?;
                        chains.insert(code.clone(), chain);
                    }
                    defining = find_defining(&chains[&code], &name);
                }
            }
            let (path, min, max) = match defining {
                Some(ancestor) => ancestor,
                None => {
                    let element = &elements[index];
                    (
                        element.path.clone(),
                        element.min.unwrap_or(0),
                        element.max.clone().unwrap_or_else(|| "*".to_string()),
                    )
                }
            };
            elements[index].base = Some(ElementDefinitionBase { path, min, max });
        }
        Ok(())
    }

    /// Core type definitions `code` derives from, including `code` itself,
    /// ordered most ancestral first.
    fn type_chain(&mut self, code: &str) -> Result<Vec<Arc<StructureDefinition>>> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut code = Some(code.to_string());

        while let Some(type_code) = code {
            if !seen.insert(type_code.clone()) {
                break;
            }
            let Some(structure) = self.resolver.resolve_core_type(&type_code)? else {
                return Err(Error::UnresolvedCoreType(type_code));
            };
            code = structure
                .snapshot
                .as_ref()
                .and_then(|s| s.element.first())
                .and_then(|root| root.primary_type())
                .map(|t| t.code.clone());
            chain.push(structure);
        }
        chain.reverse();
        Ok(chain)
    }
}

/// Locate the element a type chain defines under `name`, most ancestral
/// definition first. Returns its path and cardinality.
fn find_defining(
    chain: &[Arc<StructureDefinition>],
    name: &str,
) -> Option<(String, u32, String)> {
    chain
        .iter()
        .flat_map(|sd| sd.snapshot.iter().flat_map(|s| s.element.iter()))
        .find(|e| e.last_segment() == name)
        .map(|e| {
            (
                e.path.clone(),
                e.min.unwrap_or(0),
                e.max.clone().unwrap_or_else(|| "*".to_string()),
            )
        })
}

/// Position a navigator on the first element with the given path.
fn move_to_path(nav: &mut ElementNavigator, path: &str) -> bool {
    let found = nav
        .tree()
        .iter()
        .find(|(_, element)| element.path == path)
        .map(|(id, _)| id);
    match found {
        Some(id) => nav.return_to_bookmark(Bookmark(Some(id))),
        None => false,
    }
}

fn parent_path(path: &str) -> Option<&str> {
    path.rfind('.').map(|i| &path[..i])
}

/// Rewrite an external profile's element paths so its root sits at
/// `new_root`, keeping every descendant's suffix.
fn rebase_elements(elements: &mut [ElementDefinition], new_root: &str) {
    let Some(old_root) = elements.first().map(|root| root.path.clone()) else {
        return;
    };
    for element in elements {
        let suffix = element.path[old_root.len().min(element.path.len())..].to_string();
        element.path = format!("{new_root}{suffix}");
    }
}
