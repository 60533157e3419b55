//! Caching resolver wrapper
//!
//! A [`ProfileResolver`] decorator that guarantees every resolved profile
//! carries a snapshot: profiles that only ship a differential are expanded on
//! first resolution and the result is cached by canonical url. Base chains
//! are materialized through the wrapper itself, so transitively required
//! snapshots land in the same cache; an in-flight set refuses circular base
//! chains.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use crucible_context::{Error, ProfileResolver, Result};
use crucible_models::StructureDefinition;

use crate::generator::SnapshotGenerator;
use crate::policy::MergePolicy;

pub struct ExpandedResolver<R> {
    inner: R,
    policy: MergePolicy,
    expanded: RwLock<HashMap<String, Arc<StructureDefinition>>>,
    in_flight: RwLock<HashSet<String>>,
}

impl<R: ProfileResolver> ExpandedResolver<R> {
    pub fn new(inner: R) -> Self {
        Self::with_policy(inner, MergePolicy::default())
    }

    pub fn with_policy(inner: R, policy: MergePolicy) -> Self {
        Self {
            inner,
            policy,
            expanded: RwLock::new(HashMap::new()),
            in_flight: RwLock::new(HashSet::new()),
        }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    fn cached(&self, url: &str) -> Option<Arc<StructureDefinition>> {
        self.expanded.read().ok().and_then(|m| m.get(url).cloned())
    }

    fn cache(&self, url: &str, structure: Arc<StructureDefinition>) {
        if let Ok(mut map) = self.expanded.write() {
            map.insert(url.to_string(), structure);
        }
    }

    fn enter(&self, url: &str) -> Result<()> {
        let mut in_flight = self
            .in_flight
            .write()
            .map_err(|_| poisoned(url))?;
        if !in_flight.insert(url.to_string()) {
            return Err(Error::InvalidStructureDefinition(format!(
                "circular base chain while materializing snapshot for '{url}'"
            )));
        }
        Ok(())
    }

    fn leave(&self, url: &str) {
        if let Ok(mut in_flight) = self.in_flight.write() {
            in_flight.remove(url);
        }
    }

    fn materialize(
        &self,
        url: &str,
        structure: Arc<StructureDefinition>,
    ) -> Result<Arc<StructureDefinition>> {
        self.enter(url)?;
        let result = (|| {
            let mut owned = (*structure).clone();
            // Base profiles are resolved back through this wrapper, so every
            // snapshot built along the way is cached too.
            let mut generator = SnapshotGenerator::with_policy(self, self.policy);
            generator.generate(&mut owned).map_err(|e| {
                Error::InvalidStructureDefinition(format!(
                    "failed to generate snapshot for '{url}': {e}"
                ))
            })?;
            Ok(Arc::new(owned))
        })();
        self.leave(url);
        result
    }
}

impl<R: ProfileResolver> ProfileResolver for ExpandedResolver<R> {
    fn resolve(&self, url: &str) -> Result<Option<Arc<StructureDefinition>>> {
        if let Some(hit) = self.cached(url) {
            return Ok(Some(hit));
        }
        let Some(structure) = self.inner.resolve(url)? else {
            return Ok(None);
        };
        let expanded = if structure.snapshot.is_some() {
            structure
        } else {
            self.materialize(url, structure)?
        };
        self.cache(url, Arc::clone(&expanded));
        Ok(Some(expanded))
    }
}

fn poisoned(url: &str) -> Error {
    Error::InvalidStructureDefinition(format!(
        "in-flight tracking unavailable while resolving '{url}'"
    ))
}
