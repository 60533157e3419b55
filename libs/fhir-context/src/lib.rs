//! Profile resolution for the snapshot tooling
//!
//! Provides the trait-based contract through which the engine fetches
//! StructureDefinitions by canonical url, plus an in-memory implementation
//! suitable for tests and pre-loaded profile sets.

pub mod error;
pub mod resolver;

pub use error::{Error, Result};
pub use resolver::{MapResolver, ProfileResolver};
