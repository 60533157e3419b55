//! Error types for snapshot generation

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Profile '{0}' has no differential to merge")]
    MissingDifferential(String),

    #[error("Profile '{0}' does not declare a base profile")]
    MissingBaseDefinition(String),

    #[error("Profile '{0}' is neither a constraint nor an extension definition")]
    NotDerived(String),

    #[error("Unresolved profile reference '{0}'")]
    UnresolvedProfile(String),

    #[error("No structure definition found for core type '{0}'")]
    UnresolvedCoreType(String),

    #[error("Profile '{0}' has no snapshot, and external expansion is disabled")]
    MissingSnapshot(String),

    #[error("Differential constrains '{0}', which does not exist in the base profile")]
    UnmatchedElement(String),

    #[error("Differential element '{0}' matches multiple base elements")]
    AmbiguousMatch(String),

    #[error("Differential constrains children of '{0}', but the base element is a leaf with no type to expand")]
    NestedConstraintsOnLeaf(String),

    #[error("Differential constrains children of choice element '{0}' without narrowing it to a single type")]
    ChoiceWithoutTypeSlice(String),

    #[error("Element '{0}' has a name reference '{1}' that does not resolve to any element")]
    InvalidNameReference(String, String),

    #[error("Differential widens cardinality of '{path}' from {base} to {constrained}")]
    CardinalityWidening {
        path: String,
        base: String,
        constrained: String,
    },

    #[error("Differential slices '{0}' without providing a slicing entry")]
    SliceWithoutEntry(String),

    #[error("Differential slices '{0}', but the base element is not a repeating or choice element")]
    SliceOnNonRepeatingElement(String),

    #[error("Circular dependency detected while expanding '{0}'")]
    CircularDependency(String),

    #[error("Differential has multiple root elements; second root is '{0}'")]
    MultipleRoots(String),

    #[error("Element list violates pre-order: {0}")]
    InvalidElementOrder(String),

    #[error("Differential path '{path}' does not start with base type root '{root}'")]
    PathOutsideBase { path: String, root: String },

    #[error("FHIR context error: {0}")]
    FhirContext(#[from] crucible_context::Error),

    #[error("Model error: {0}")]
    Model(#[from] crucible_models::Error),
}
