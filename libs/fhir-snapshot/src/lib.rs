//! Profile snapshot generation
//!
//! This crate turns a StructureDefinition's differential into a fully
//! resolved snapshot: the base profile's element tree is copied, the sparse
//! differential is completed into a tree, and the two are merged element by
//! element, with slice-aware matching, on-demand expansion of unexpanded
//! subtrees, and base provenance stamping.
//!
//! # Example
//!
//! ```rust,no_run
//! use crucible_context::MapResolver;
//! use crucible_models::StructureDefinition;
//! use crucible_snapshot::{MergePolicy, SnapshotGenerator};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # let resolver = MapResolver::new();
//! # let mut profile: StructureDefinition = unimplemented!();
//! // Register base profiles and core types in the resolver, then:
//! let mut generator = SnapshotGenerator::with_policy(&resolver, MergePolicy::default());
//! generator.generate(&mut profile)?;
//! // profile.snapshot now holds the merged element list.
//! # Ok(())
//! # }
//! ```

pub mod differential;
pub mod error;
pub mod expanded;
pub mod generator;
pub mod matcher;
pub mod merge;
pub mod navigator;
pub mod normalization;
pub mod policy;
pub mod slicing;
pub mod tree;
pub mod validation;

pub use differential::complete_differential;
pub use error::{Error, Result};
pub use expanded::ExpandedResolver;
pub use generator::SnapshotGenerator;
pub use matcher::{match_children, ElementMatch, MatchAction};
pub use merge::CHANGED_BY_DIFFERENTIAL;
pub use navigator::ElementNavigator;
pub use normalization::{normalize_differential, normalize_snapshot};
pub use policy::MergePolicy;
pub use tree::{Bookmark, ElementTree, NodeId};
pub use validation::{validate_differential, validate_snapshot};

pub use crucible_models::{Differential, ElementDefinition, ElementDefinitionType, Snapshot};
