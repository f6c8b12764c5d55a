//! Versioning context
//!
//! One [`VersioningContext`] per compilation. It borrows the schema graph and
//! owns every store and cache the engine keeps, so separate compilations never
//! share state.

use crate::config::VersioningConfig;
use crate::dependency::{
    parse_dependency, resolve_entries, DependencyArg, DependencyEntry, DependencyGraph,
    ResolvedDependency,
};
use crate::error::{Result, VersioningError};
use crate::evaluator::{self, Applicability};
use crate::governing::{CacheStats, GoverningAxisCache};
use crate::graph::{DiagnosticCode, DiagnosticItem, Diagnostics, ElementId, ElementKind, SchemaGraph};
use crate::lifecycle::{LifecycleMark, LifecycleRecord, LifecycleStore, MarkOutcome};
use crate::projection::{ProjectionTable, ResolutionKey, VersionProjection};
use crate::resolution::{resolve_versions, VersionResolution};
use crate::version::{AxisRegistry, Version, VersionAxis};

/// Versioning state of one compilation
pub struct VersioningContext<'g> {
    graph: &'g SchemaGraph,
    config: VersioningConfig,
    axes: AxisRegistry,
    lifecycle: LifecycleStore,
    governing: GoverningAxisCache,
    dependencies: DependencyGraph,
    projections: ProjectionTable,
    diagnostics: Diagnostics,
}

impl<'g> VersioningContext<'g> {
    pub fn new(graph: &'g SchemaGraph) -> Self {
        Self::with_config(graph, VersioningConfig::default())
    }

    pub fn with_config(graph: &'g SchemaGraph, config: VersioningConfig) -> Self {
        Self {
            graph,
            lifecycle: LifecycleStore::new(config.lifecycle.duplicate_marks),
            config,
            axes: AxisRegistry::new(),
            governing: GoverningAxisCache::new(),
            dependencies: DependencyGraph::new(),
            projections: ProjectionTable::new(),
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn graph(&self) -> &'g SchemaGraph {
        self.graph
    }

    pub fn config(&self) -> &VersioningConfig {
        &self.config
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Hand the collected diagnostics to the caller, leaving an empty collection
    pub fn take_diagnostics(&mut self) -> Diagnostics {
        std::mem::take(&mut self.diagnostics)
    }

    // =========================================================================
    // Axis declaration
    // =========================================================================

    /// Declare the version axis of `namespace` from tags in the given order
    pub fn declare_axis(&mut self, namespace: ElementId, tags: &[ElementId]) -> Result<&VersionAxis> {
        self.governing.invalidate();
        self.axes.declare(self.graph, namespace, tags)
    }

    /// Declare the version axis of `namespace` from the members of an enum
    pub fn versioned(&mut self, namespace: ElementId, versions_enum: ElementId) -> Result<&VersionAxis> {
        if self.graph.kind(versions_enum) != Some(ElementKind::Enum) {
            return Err(VersioningError::NotAnEnum(versions_enum));
        }
        let members = self.graph.enum_members(versions_enum);
        self.declare_axis(namespace, &members)
    }

    /// Axis owned directly by `namespace`
    pub fn axis(&self, namespace: ElementId) -> Option<&VersionAxis> {
        self.axes.get(namespace)
    }

    pub fn version_for_tag(&self, tag: ElementId) -> Option<&Version> {
        self.axes.version_for_tag(tag)
    }

    /// Nearest namespace, starting at `namespace`, that owns an axis
    pub fn find_versioned_namespace(&self, namespace: ElementId) -> Option<ElementId> {
        let mut current = Some(namespace);
        let mut depth = 0;
        while let Some(ns) = current {
            if self.axes.is_versioned(ns) {
                return Some(ns);
            }
            depth += 1;
            if depth > self.graph.element_count() {
                return None;
            }
            current = self.graph.parent_namespace(ns);
        }
        None
    }

    // =========================================================================
    // Lifecycle marks
    // =========================================================================

    /// Resolve a tag used by a mark on `element`, reporting when it is not a
    /// version of the axis governing `element`
    fn check_is_version(&mut self, element: ElementId, tag: ElementId) -> Option<Version> {
        let graph = self.graph;
        if let Some(version) = self.axes.version_for_tag(tag).cloned() {
            // Marks are only meaningful on the axis that governs the element
            let governing = self.governing_axis(element).map(|(ns, _)| ns);
            match governing {
                Some(ns) if ns != version.namespace => {
                    self.diagnostics.push(
                        DiagnosticItem::new(
                            tag,
                            DiagnosticCode::VersionNotOnGoverningAxis,
                            format!(
                                "Version '{}' of namespace {} cannot be used on '{}', which is versioned by namespace {}.",
                                version.name,
                                graph.namespace_full_name(version.namespace),
                                graph.name(element),
                                graph.namespace_full_name(ns)
                            ),
                        )
                        .with_context(format!("element: {}", element)),
                    );
                    return None;
                }
                _ => return Some(version),
            }
        }

        let tag_name = graph.name(tag);
        let enum_name = graph.enum_of(tag).map(|e| graph.name(e)).unwrap_or("<none>");
        let suggestion = if self.config.diagnostics.suggestions {
            self.governing_axis(element)
                .and_then(|(_, axis)| axis.suggest(tag_name))
                .map(|v| v.name.clone())
        } else {
            None
        };
        self.diagnostics
            .version_not_found(tag, tag_name, enum_name, suggestion.as_deref());
        None
    }

    fn apply_mark(&mut self, element: ElementId, mark: LifecycleMark, tag: ElementId) -> bool {
        let Some(version) = self.check_is_version(element, tag) else {
            return false;
        };

        let outcome = match mark {
            LifecycleMark::Added => self.lifecycle.mark_added(element, version.clone()),
            LifecycleMark::Removed => self.lifecycle.mark_removed(element, version.clone()),
            LifecycleMark::MadeOptional => self.lifecycle.mark_optional(element, version.clone()),
        };

        match outcome {
            MarkOutcome::Recorded => true,
            MarkOutcome::KeptExisting(existing) => {
                tracing::warn!(element = %element, mark = mark.as_str(), "ignoring repeated lifecycle mark");
                self.diagnostics.push(
                    DiagnosticItem::new(
                        element,
                        DiagnosticCode::DuplicateLifecycleMark,
                        format!(
                            "'{}' is already marked @{}({}); ignoring @{}({}).",
                            self.graph.name(element),
                            mark.as_str(),
                            existing.name,
                            mark.as_str(),
                            version.name
                        ),
                    ),
                );
                false
            }
            MarkOutcome::Replaced(previous) => {
                self.diagnostics.push(DiagnosticItem::new(
                    element,
                    DiagnosticCode::DuplicateLifecycleMark,
                    format!(
                        "'{}' @{}({}) replaces earlier @{}({}).",
                        self.graph.name(element),
                        mark.as_str(),
                        version.name,
                        mark.as_str(),
                        previous.name
                    ),
                ));
                true
            }
        }
    }

    /// `@added(tag)`; returns whether the mark was recorded
    pub fn added(&mut self, element: ElementId, tag: ElementId) -> bool {
        self.apply_mark(element, LifecycleMark::Added, tag)
    }

    pub fn removed(&mut self, element: ElementId, tag: ElementId) -> bool {
        self.apply_mark(element, LifecycleMark::Removed, tag)
    }

    pub fn made_optional(&mut self, element: ElementId, tag: ElementId) -> bool {
        self.apply_mark(element, LifecycleMark::MadeOptional, tag)
    }

    /// `@renamedFrom(tag, oldName)`
    pub fn renamed_from(&mut self, element: ElementId, tag: ElementId, old_name: &str) -> bool {
        let Some(version) = self.check_is_version(element, tag) else {
            return false;
        };
        self.lifecycle.add_rename(element, version, old_name);
        true
    }

    pub fn lifecycle(&self, element: ElementId) -> Option<&LifecycleRecord> {
        self.lifecycle.get(element)
    }

    pub fn added_on(&self, element: ElementId) -> Option<&Version> {
        self.lifecycle.get_added(element)
    }

    pub fn removed_on(&self, element: ElementId) -> Option<&Version> {
        self.lifecycle.get_removed(element)
    }

    pub fn made_optional_on(&self, element: ElementId) -> Option<&Version> {
        self.lifecycle.get_optional(element)
    }

    /// Versions at which `element` was renamed, ascending
    pub fn renamed_from_versions(&self, element: ElementId) -> Option<Vec<&Version>> {
        self.lifecycle
            .get_renames_ascending(element)
            .map(|renames| renames.iter().map(|r| &r.version).collect())
    }

    pub fn name_at_version(&self, element: ElementId, version: &Version) -> Option<&str> {
        self.lifecycle.name_at_version(element, version)
    }

    // =========================================================================
    // Governing axis
    // =========================================================================

    /// Namespace and axis that govern `element`
    pub fn governing_axis(&self, element: ElementId) -> Option<(ElementId, &VersionAxis)> {
        let ns = self
            .governing
            .governing_namespace(self.graph, &self.axes, element)?;
        self.axes.get(ns).map(|axis| (ns, axis))
    }

    pub fn governing_cache_stats(&self) -> CacheStats {
        self.governing.stats()
    }

    // =========================================================================
    // Dependencies
    // =========================================================================

    /// `@versionedDependency(arg)` on `consumer`; returns whether anything was recorded
    pub fn versioned_dependency(&mut self, consumer: ElementId, arg: &DependencyArg) -> bool {
        let Some(parsed) = parse_dependency(self.graph, &self.axes, &mut self.diagnostics, consumer, arg)
        else {
            return false;
        };

        if self.config.dependencies.check_shapes_on_declare {
            let versioned = self.axes.is_versioned(consumer);
            if versioned && matches!(parsed.entry, DependencyEntry::Fixed(_)) {
                self.report_shape(consumer, parsed.dependency, &parsed.entry);
                return false;
            }
        }

        tracing::debug!(
            consumer = %self.graph.namespace_full_name(consumer),
            dependency = %self.graph.namespace_full_name(parsed.dependency),
            "declared versioned dependency"
        );
        self.dependencies.declare(consumer, parsed);
        true
    }

    fn report_shape(&mut self, consumer: ElementId, dependency: ElementId, entry: &DependencyEntry) {
        let expected = match entry {
            DependencyEntry::Fixed(_) => "a mapping of version",
            DependencyEntry::Mapping(_) => "a picked version",
        };
        self.diagnostics.push(
            DiagnosticItem::new(
                consumer,
                DiagnosticCode::VersionedDependencyShape,
                format!(
                    "Namespace {} version dependency to {} should be {} but is {}.",
                    self.graph.namespace_full_name(consumer),
                    self.graph.namespace_full_name(dependency),
                    expected,
                    entry.shape()
                ),
            )
            .with_context(if self.axes.is_versioned(consumer) {
                "namespace is versioned"
            } else {
                "namespace is not versioned"
            }),
        );
    }

    /// Report and drop every direct dependency whose shape disagrees with its
    /// consumer being versioned. Run once all declarations are applied.
    pub fn validate_dependency_shapes(&mut self) -> usize {
        let mut mismatched = Vec::new();
        for consumer in self.dependencies.consumers() {
            let versioned = self.axes.is_versioned(consumer);
            for (dependency, entry) in self.dependencies.direct(consumer).unwrap_or_default() {
                let ok = match entry {
                    DependencyEntry::Fixed(_) => !versioned,
                    DependencyEntry::Mapping(_) => versioned,
                };
                if !ok {
                    mismatched.push((consumer, *dependency, entry.clone()));
                }
            }
        }

        for (consumer, dependency, entry) in &mismatched {
            self.report_shape(*consumer, *dependency, entry);
            self.dependencies.remove(*consumer, *dependency);
        }
        mismatched.len()
    }

    /// Dependencies in effect for `namespace` (its own or the nearest ancestor's)
    pub fn dependencies_of(&self, namespace: ElementId) -> Option<Vec<(ElementId, ResolvedDependency)>> {
        self.dependencies
            .find_for(self.graph, namespace)
            .map(|(_, entries)| resolve_entries(&self.axes, entries))
    }

    // =========================================================================
    // Resolution & projection
    // =========================================================================

    /// Every version assignment for `root`, in ascending root-version order
    pub fn resolve(&mut self, root: ElementId) -> Result<Vec<VersionResolution>> {
        resolve_versions(self.graph, &self.axes, &self.dependencies, &mut self.diagnostics, root)
    }

    /// Projection specs for `root`, registering each assignment under a new key
    pub fn build_projections(&mut self, root: ElementId) -> Result<Vec<VersionProjection>> {
        let resolutions = self.resolve(root)?;
        Ok(self
            .projections
            .build(&self.config.projection.name, resolutions))
    }

    /// Resolutions of `root` as pretty JSON, keyed by dotted namespace name
    pub fn export_resolutions(&mut self, root: ElementId) -> Result<String> {
        let resolutions = self.resolve(root)?;
        let graph = self.graph;
        let export: Vec<serde_json::Value> = resolutions
            .iter()
            .map(|r| {
                let versions: serde_json::Map<String, serde_json::Value> = r
                    .versions
                    .iter()
                    .map(|(ns, v)| (graph.namespace_full_name(*ns), serde_json::Value::from(v.value.clone())))
                    .collect();
                serde_json::json!({
                    "root_version": r.root_version.as_ref().map(|v| v.value.clone()),
                    "versions": versions,
                })
            })
            .collect();
        Ok(serde_json::to_string_pretty(&export)?)
    }

    /// Version that applies to `namespace` under `key`
    pub fn version_for_namespace(&self, key: ResolutionKey, namespace: ElementId) -> Option<&Version> {
        self.projections.lookup(key, namespace)
    }

    /// Project `key` onto the axis governing `element`
    pub fn version_for_key(&self, element: ElementId, key: ResolutionKey) -> Option<&Version> {
        let (ns, _) = self.governing_axis(element)?;
        self.projections.lookup(key, ns)
    }

    // =========================================================================
    // Point-in-time queries
    // =========================================================================

    /// `version` if it lies on the axis governing `element`
    fn on_governing_axis<'v>(&self, element: ElementId, version: &'v Version) -> Option<&'v Version> {
        let (ns, _) = self.governing_axis(element)?;
        if version.namespace != ns {
            tracing::warn!(
                element = %element,
                version = %version,
                "query version is not on the element's governing axis"
            );
            return None;
        }
        Some(version)
    }

    pub fn exists_at_or_after_added(&self, element: ElementId, version: &Version) -> Applicability {
        self.on_governing_axis(element, version)
            .map(|v| evaluator::exists_at_or_after_added(&self.lifecycle, element, v))
            .unwrap_or(Applicability::NotApplicable)
    }

    pub fn removed_at_or_before(&self, element: ElementId, version: &Version) -> Applicability {
        self.on_governing_axis(element, version)
            .map(|v| evaluator::removed_at_or_before(&self.lifecycle, element, v))
            .unwrap_or(Applicability::NotApplicable)
    }

    pub fn made_optional_at_or_after(&self, element: ElementId, version: &Version) -> Applicability {
        self.on_governing_axis(element, version)
            .map(|v| evaluator::made_optional_at_or_after(&self.lifecycle, element, v))
            .unwrap_or(Applicability::NotApplicable)
    }

    pub fn has_different_name_at(&self, element: ElementId, version: &Version) -> bool {
        self.on_governing_axis(element, version)
            .is_some_and(|v| evaluator::has_different_name_at(&self.lifecycle, element, v))
    }

    // ========== Key-based queries (projection engine) ==========

    fn at_key(
        &self,
        element: ElementId,
        key: ResolutionKey,
        query: fn(&LifecycleStore, ElementId, &Version) -> Applicability,
    ) -> Applicability {
        self.version_for_key(element, key)
            .map(|v| query(&self.lifecycle, element, v))
            .unwrap_or(Applicability::NotApplicable)
    }

    /// Element is added after the version selected by `key` (so absent there)
    pub fn added_after(&self, element: ElementId, key: ResolutionKey) -> bool {
        match self.at_key(element, key, evaluator::exists_at_or_after_added) {
            Applicability::DoesNotApply => true,
            Applicability::Applies | Applicability::NotApplicable => false,
        }
    }

    /// Element is removed at or before the version selected by `key`
    pub fn removed_on_or_before(&self, element: ElementId, key: ResolutionKey) -> bool {
        self.at_key(element, key, evaluator::removed_at_or_before)
            .or_default_to(false)
    }

    /// Element becomes optional only after the version selected by `key` (so required there)
    pub fn made_optional_after(&self, element: ElementId, key: ResolutionKey) -> bool {
        match self.at_key(element, key, evaluator::made_optional_at_or_after) {
            Applicability::DoesNotApply => true,
            Applicability::Applies | Applicability::NotApplicable => false,
        }
    }

    /// Old name in effect under `key`, `None` when the declared name applies
    pub fn name_at_key(&self, element: ElementId, key: ResolutionKey) -> Option<&str> {
        let version = self.version_for_key(element, key)?;
        self.lifecycle
            .name_at_version(element, version)
            .filter(|name| !name.is_empty())
    }

    pub fn has_different_name_at_version(&self, element: ElementId, key: ResolutionKey) -> bool {
        self.name_at_key(element, key).is_some()
    }
}
