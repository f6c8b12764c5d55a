//! Version dependencies between namespaces
//!
//! A namespace declares which versions of other namespaces it builds on. An
//! unversioned consumer pins one version of each dependency; a versioned
//! consumer maps each of its own versions to a version of the dependency.

use serde::Serialize;
use std::collections::HashMap;

use crate::graph::{DiagnosticCode, Diagnostics, ElementId, ElementKind, SchemaGraph};
use crate::version::{AxisRegistry, Version};

/// Raw argument of a dependency declaration, as written in the schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyArg {
    /// A single element reference, expected to be a version tag
    Element(ElementId),
    /// A tuple; the outer list holds `[consumerTag, dependencyTag]` pairs
    Tuple(Vec<DependencyArg>),
}

impl DependencyArg {
    /// Mapping argument built from `(consumer tag, dependency tag)` pairs
    pub fn mapping(pairs: &[(ElementId, ElementId)]) -> Self {
        DependencyArg::Tuple(
            pairs
                .iter()
                .map(|&(from, to)| {
                    DependencyArg::Tuple(vec![DependencyArg::Element(from), DependencyArg::Element(to)])
                })
                .collect(),
        )
    }

    fn element(&self) -> Option<ElementId> {
        match self {
            DependencyArg::Element(id) => Some(*id),
            DependencyArg::Tuple(_) => None,
        }
    }
}

/// Declared dependency on one namespace
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DependencyEntry {
    /// Pinned version; consumer is unversioned
    Fixed(Version),
    /// Consumer tag → dependency version, in declaration order
    Mapping(Vec<(ElementId, Version)>),
}

impl DependencyEntry {
    pub fn shape(&self) -> &'static str {
        match self {
            DependencyEntry::Fixed(_) => "a picked version",
            DependencyEntry::Mapping(_) => "a mapping of version",
        }
    }
}

/// Dependency entry with consumer tags resolved to versions
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ResolvedDependency {
    Fixed(Version),
    Mapping(Vec<(Version, Version)>),
}

impl ResolvedDependency {
    /// Dependency version mapped from `source`
    pub fn target_for(&self, source: &Version) -> Option<&Version> {
        match self {
            ResolvedDependency::Fixed(_) => None,
            ResolvedDependency::Mapping(pairs) => {
                pairs.iter().find(|(from, _)| from == source).map(|(_, to)| to)
            }
        }
    }
}

/// Parsed, validated declaration ready to be recorded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDependency {
    pub dependency: ElementId,
    pub entry: DependencyEntry,
}

/// Dependency declarations of every namespace in a compilation
#[derive(Debug, Default)]
pub struct DependencyGraph {
    entries: HashMap<ElementId, Vec<(ElementId, DependencyEntry)>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a declaration. A second mapping onto the same dependency extends
    /// the first; any other redeclaration replaces it.
    pub fn declare(&mut self, consumer: ElementId, parsed: ParsedDependency) {
        let entries = self.entries.entry(consumer).or_default();
        let ParsedDependency { dependency, entry } = parsed;

        let Some(pos) = entries.iter().position(|(ns, _)| *ns == dependency) else {
            entries.push((dependency, entry));
            return;
        };

        match (&mut entries[pos].1, entry) {
            (DependencyEntry::Mapping(existing), DependencyEntry::Mapping(extra)) => {
                for (tag, target) in extra {
                    match existing.iter_mut().find(|(t, _)| *t == tag) {
                        Some(pair) => pair.1 = target,
                        None => existing.push((tag, target)),
                    }
                }
            }
            (current, replacement) => *current = replacement,
        }
    }

    /// Entries declared directly on `consumer`
    pub fn direct(&self, consumer: ElementId) -> Option<&[(ElementId, DependencyEntry)]> {
        self.entries.get(&consumer).map(|e| e.as_slice())
    }

    /// Entries of the nearest namespace, starting at `namespace` itself, that
    /// declares any. Returns the declaring namespace too. No merging across levels.
    pub fn find_for(
        &self,
        graph: &SchemaGraph,
        namespace: ElementId,
    ) -> Option<(ElementId, &[(ElementId, DependencyEntry)])> {
        let mut current = Some(namespace);
        let mut depth = 0;
        while let Some(ns) = current {
            if let Some(entries) = self.direct(ns) {
                return Some((ns, entries));
            }
            depth += 1;
            if depth > graph.element_count() {
                tracing::warn!(namespace = %namespace, "cyclic namespace containment");
                return None;
            }
            current = graph.parent_namespace(ns);
        }
        None
    }

    /// Drop one declared entry; returns it if present
    pub fn remove(&mut self, consumer: ElementId, dependency: ElementId) -> Option<DependencyEntry> {
        let entries = self.entries.get_mut(&consumer)?;
        let pos = entries.iter().position(|(ns, _)| *ns == dependency)?;
        let (_, entry) = entries.remove(pos);
        if entries.is_empty() {
            self.entries.remove(&consumer);
        }
        Some(entry)
    }

    /// Every consumer with at least one direct declaration, in id order
    pub fn consumers(&self) -> Vec<ElementId> {
        let mut consumers: Vec<_> = self.entries.keys().copied().collect();
        consumers.sort();
        consumers
    }
}

/// Resolve consumer tags of mapping entries to versions. Tags that are not
/// versions are dropped.
pub fn resolve_entries(
    axes: &AxisRegistry,
    entries: &[(ElementId, DependencyEntry)],
) -> Vec<(ElementId, ResolvedDependency)> {
    entries
        .iter()
        .map(|(ns, entry)| {
            let resolved = match entry {
                DependencyEntry::Fixed(v) => ResolvedDependency::Fixed(v.clone()),
                DependencyEntry::Mapping(pairs) => ResolvedDependency::Mapping(
                    pairs
                        .iter()
                        .filter_map(|(tag, target)| match axes.version_for_tag(*tag) {
                            Some(source) => Some((source.clone(), target.clone())),
                            None => {
                                tracing::debug!(tag = %tag, "dropping mapping entry with unknown consumer version");
                                None
                            }
                        })
                        .collect(),
                ),
            };
            (*ns, resolved)
        })
        .collect()
}

fn report_version_not_found(graph: &SchemaGraph, diags: &mut Diagnostics, tag: ElementId) {
    let enum_name = graph.enum_of(tag).map(|e| graph.name(e)).unwrap_or("<none>");
    diags.version_not_found(tag, graph.name(tag), enum_name, None);
}

fn enum_member_endpoint(
    graph: &SchemaGraph,
    diags: &mut Diagnostics,
    endpoint: Option<&DependencyArg>,
    fallback: ElementId,
) -> Option<ElementId> {
    let id = endpoint
        .and_then(DependencyArg::element)
        .filter(|&id| graph.kind(id) == Some(ElementKind::EnumMember));
    if id.is_none() {
        let target = endpoint.and_then(DependencyArg::element).unwrap_or(fallback);
        diags.report(
            target,
            DiagnosticCode::VersionedDependencyTupleEnumMember,
            "Versioned dependency tuple must contain an enum member on both sides.",
        );
    }
    id
}

/// Validate a dependency argument, reporting every problem found
///
/// Returns `None` when nothing usable remains. Bad mapping entries are skipped
/// individually; targets spanning two namespaces reject the whole declaration.
pub fn parse_dependency(
    graph: &SchemaGraph,
    axes: &AxisRegistry,
    diags: &mut Diagnostics,
    consumer: ElementId,
    arg: &DependencyArg,
) -> Option<ParsedDependency> {
    match arg {
        DependencyArg::Element(tag) => {
            let Some(version) = axes.version_for_tag(*tag) else {
                report_version_not_found(graph, diags, *tag);
                return None;
            };
            Some(ParsedDependency {
                dependency: version.namespace,
                entry: DependencyEntry::Fixed(version.clone()),
            })
        }
        DependencyArg::Tuple(entries) => {
            let mut target_namespace: Option<ElementId> = None;
            let mut pairs = Vec::new();

            for entry in entries {
                let DependencyArg::Tuple(values) = entry else {
                    let target = entry.element().unwrap_or(consumer);
                    diags.report(
                        target,
                        DiagnosticCode::VersionedDependencyTuple,
                        "Versioned dependency mapping must be a tuple [SourceVersion, TargetVersion].",
                    );
                    continue;
                };

                let Some(source) = enum_member_endpoint(graph, diags, values.first(), consumer) else {
                    continue;
                };
                let Some(target) = enum_member_endpoint(graph, diags, values.get(1), consumer) else {
                    continue;
                };

                let Some(target_version) = axes.version_for_tag(target) else {
                    report_version_not_found(graph, diags, target);
                    continue;
                };

                match target_namespace {
                    None => target_namespace = Some(target_version.namespace),
                    Some(ns) if ns != target_version.namespace => {
                        diags.dependency_same_namespace(
                            target,
                            &graph.namespace_full_name(ns),
                            &graph.namespace_full_name(target_version.namespace),
                        );
                        return None;
                    }
                    Some(_) => {}
                }

                // A repeated consumer tag overrides, as a later declaration would
                match pairs.iter_mut().find(|(tag, _)| *tag == source) {
                    Some(pair) => pair.1 = target_version.clone(),
                    None => pairs.push((source, target_version.clone())),
                }
            }

            target_namespace.map(|dependency| ParsedDependency {
                dependency,
                entry: DependencyEntry::Mapping(pairs),
            })
        }
    }
}
