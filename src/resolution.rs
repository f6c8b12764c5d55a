//! Version resolution
//!
//! Expands a root namespace into one concrete version assignment per version
//! of its axis, pulling in the mapped or pinned version of every dependency.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::dependency::{resolve_entries, DependencyGraph, ResolvedDependency};
use crate::error::{Result, VersioningError};
use crate::graph::{DiagnosticCode, DiagnosticItem, Diagnostics, ElementId, ElementKind, SchemaGraph};
use crate::version::{AxisRegistry, Version};

/// One global version assignment for a root namespace
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionResolution {
    /// Version of the root namespace, `None` when the root is unversioned
    pub root_version: Option<Version>,
    /// Version picked for every involved namespace
    pub versions: BTreeMap<ElementId, Version>,
}

impl VersionResolution {
    fn unversioned() -> Self {
        Self {
            root_version: None,
            versions: BTreeMap::new(),
        }
    }

    pub fn version_of(&self, namespace: ElementId) -> Option<&Version> {
        self.versions.get(&namespace)
    }

    /// Nothing to project
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}

fn inconsistent(
    graph: &SchemaGraph,
    root: ElementId,
    dependency: ElementId,
    expected: &'static str,
) -> VersioningError {
    let err = VersioningError::InconsistentDependency {
        namespace: graph.namespace_full_name(root),
        dependency: graph.namespace_full_name(dependency),
        expected,
    };
    tracing::error!("{}", err);
    err
}

/// Resolve every version assignment reachable from `root`
///
/// Output follows the root axis in ascending index order. A dependency whose
/// shape disagrees with the root being versioned is an internal failure and
/// aborts the whole resolution.
pub fn resolve_versions(
    graph: &SchemaGraph,
    axes: &AxisRegistry,
    deps: &DependencyGraph,
    diags: &mut Diagnostics,
    root: ElementId,
) -> Result<Vec<VersionResolution>> {
    if graph.kind(root) != Some(ElementKind::Namespace) {
        return Err(VersioningError::NotANamespace(root));
    }

    let dependencies = deps
        .find_for(graph, root)
        .map(|(_, entries)| resolve_entries(axes, entries))
        .unwrap_or_default();

    let Some(axis) = axes.get(root) else {
        let mut resolution = VersionResolution::unversioned();
        for (dependency, entry) in &dependencies {
            match entry {
                ResolvedDependency::Fixed(version) => {
                    resolution.versions.insert(*dependency, version.clone());
                }
                ResolvedDependency::Mapping(_) => {
                    return Err(inconsistent(graph, root, *dependency, "a picked version"));
                }
            }
        }
        return Ok(vec![resolution]);
    };

    let mut resolutions = Vec::with_capacity(axis.len());
    for version in axis.all() {
        let mut resolution = VersionResolution {
            root_version: Some(version.clone()),
            versions: BTreeMap::from([(root, version.clone())]),
        };

        for (dependency, entry) in &dependencies {
            if let ResolvedDependency::Fixed(_) = entry {
                return Err(inconsistent(graph, root, *dependency, "a mapping of version"));
            }
            match entry.target_for(version) {
                Some(target) => {
                    resolution.versions.insert(*dependency, target.clone());
                }
                None => diags.push(
                    DiagnosticItem::new(
                        root,
                        DiagnosticCode::MissingDependencyMapping,
                        format!(
                            "Version '{}' of namespace {} has no mapping to a version of {}.",
                            version.name,
                            graph.namespace_full_name(root),
                            graph.namespace_full_name(*dependency)
                        ),
                    )
                    .with_context(format!("dependency: {}", graph.namespace_full_name(*dependency))),
                ),
            }
        }

        resolutions.push(resolution);
    }

    tracing::debug!(
        root = %graph.namespace_full_name(root),
        resolutions = resolutions.len(),
        dependencies = dependencies.len(),
        "resolved versions"
    );
    Ok(resolutions)
}
