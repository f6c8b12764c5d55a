//! Projection specs
//!
//! Each non-empty resolution is registered under a fresh [`ResolutionKey`].
//! The projection engine receives only the key and asks back which version
//! applies to a given namespace under it.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::graph::ElementId;
use crate::resolution::VersionResolution;
use crate::version::Version;

/// Opaque handle to one registered version assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ResolutionKey(u64);

impl fmt::Display for ResolutionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "resolution:{}", self.0)
    }
}

/// Instruction handed to the projection engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectionInstruction {
    pub projection_name: String,
    pub key: ResolutionKey,
}

/// Projections producing one version snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionProjection {
    /// Root version value, `None` for an unversioned root
    pub version: Option<String>,
    /// Empty when there is nothing to project
    pub projections: Vec<ProjectionInstruction>,
}

/// Key → version assignment table. Keys are never reused or overwritten.
#[derive(Debug, Default)]
pub struct ProjectionTable {
    next_key: u64,
    entries: HashMap<ResolutionKey, BTreeMap<ElementId, Version>>,
}

impl ProjectionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an assignment under a fresh key
    pub fn register(&mut self, versions: BTreeMap<ElementId, Version>) -> ResolutionKey {
        let key = ResolutionKey(self.next_key);
        self.next_key += 1;
        self.entries.insert(key, versions);
        key
    }

    /// Version of `namespace` under `key`
    pub fn lookup(&self, key: ResolutionKey, namespace: ElementId) -> Option<&Version> {
        self.entries.get(&key)?.get(&namespace)
    }

    pub fn versions(&self, key: ResolutionKey) -> Option<&BTreeMap<ElementId, Version>> {
        self.entries.get(&key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Turn resolutions into projection specs, registering each assignment
    pub fn build(
        &mut self,
        projection_name: &str,
        resolutions: Vec<VersionResolution>,
    ) -> Vec<VersionProjection> {
        resolutions
            .into_iter()
            .map(|resolution| {
                if resolution.is_empty() {
                    return VersionProjection {
                        version: None,
                        projections: Vec::new(),
                    };
                }
                let version = resolution.root_version.as_ref().map(|v| v.value.clone());
                let key = self.register(resolution.versions);
                VersionProjection {
                    version,
                    projections: vec![ProjectionInstruction {
                        projection_name: projection_name.to_string(),
                        key,
                    }],
                }
            })
            .collect()
    }
}
