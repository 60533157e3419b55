//! The resolution contract and an in-memory implementation

use crate::error::{Error, Result};
use crucible_models::{core_type_url, StructureDefinition};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Collaborator contract through which the snapshot engine fetches profiles.
///
/// Implementations decide where profiles come from (memory, package files,
/// a terminology server); the engine only ever asks by canonical url.
pub trait ProfileResolver {
    /// Fetch a profile by canonical url. Absence is `Ok(None)`, not an error.
    fn resolve(&self, url: &str) -> Result<Option<Arc<StructureDefinition>>>;

    /// Fetch the root definition profile for a base type code ("string",
    /// "HumanName", ...). Callers treat absence as an internal inconsistency.
    fn resolve_core_type(&self, code: &str) -> Result<Option<Arc<StructureDefinition>>> {
        self.resolve(&core_type_url(code))
    }
}

impl<R: ProfileResolver + ?Sized> ProfileResolver for &R {
    fn resolve(&self, url: &str) -> Result<Option<Arc<StructureDefinition>>> {
        (**self).resolve(url)
    }
}

/// In-memory resolver backed by a url map.
///
/// Registering the same url from two different origins records a conflict;
/// resolving a conflicted url reports it instead of picking a winner.
#[derive(Default)]
pub struct MapResolver {
    entries: HashMap<String, Entry>,
}

struct Entry {
    profile: Arc<StructureDefinition>,
    origins: Vec<String>,
}

impl MapResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a profile under its canonical url.
    pub fn register(&mut self, profile: StructureDefinition) -> Result<()> {
        self.register_from(profile, "memory")
    }

    /// Register a profile, recording where it came from.
    pub fn register_from(
        &mut self,
        profile: StructureDefinition,
        origin: impl Into<String>,
    ) -> Result<()> {
        if profile.url.is_empty() {
            return Err(Error::InvalidStructureDefinition(
                "profile has no canonical url".to_string(),
            ));
        }
        let origin = origin.into();
        let url = profile.url.clone();
        let profile = Arc::new(profile);

        match self.entries.get_mut(&url) {
            Some(entry) => {
                if entry.origins.contains(&origin) {
                    // Re-registration from the same origin replaces the entry.
                    entry.profile = profile;
                } else {
                    entry.origins.push(origin);
                }
            }
            None => {
                self.entries.insert(
                    url,
                    Entry {
                        profile,
                        origins: vec![origin],
                    },
                );
            }
        }
        Ok(())
    }

    /// Parse a JSON value as a StructureDefinition and register it.
    pub fn register_value(&mut self, value: &Value) -> Result<()> {
        let profile: StructureDefinition = serde_json::from_value(value.clone())?;
        self.register(profile)
    }
}

impl ProfileResolver for MapResolver {
    fn resolve(&self, url: &str) -> Result<Option<Arc<StructureDefinition>>> {
        match self.entries.get(url) {
            None => Ok(None),
            Some(entry) if entry.origins.len() > 1 => Err(Error::ResolvingConflict {
                identifier: url.to_string(),
                origins: entry.origins.clone(),
            }),
            Some(entry) => Ok(Some(Arc::clone(&entry.profile))),
        }
    }
}
