//! Resolution Tests
//!
//! End-to-end checks of axis declaration, dependency declaration, version
//! resolution and projection building through `VersioningContext`.

use schema_versioning::{
    DependencyArg, DiagnosticCode, ElementId, ResolvedDependency, SchemaGraph, VersioningConfig,
    VersioningContext, VersioningError,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Namespace with a `Versions` enum; returns the namespace, the enum and its members
fn versioned_ns(
    graph: &mut SchemaGraph,
    name: &str,
    parent: Option<ElementId>,
    versions: &[&str],
) -> (ElementId, ElementId, Vec<ElementId>) {
    let ns = graph.add_namespace(name, parent);
    let e = graph.add_enum("Versions", Some(ns));
    let tags = versions
        .iter()
        .map(|v| graph.add_enum_member(e, v, None))
        .collect();
    (ns, e, tags)
}

fn names(resolution: &schema_versioning::VersionResolution, ns: ElementId) -> Option<&str> {
    resolution.version_of(ns).map(|v| v.name.as_str())
}

// =============================================================================
// Resolution shape
// =============================================================================

#[test]
fn test_one_resolution_per_version_in_order() {
    init_tracing();
    let mut graph = SchemaGraph::new();
    let (a, a_enum, _) = versioned_ns(&mut graph, "A", None, &["v1", "v2", "v3", "v4"]);

    let mut ctx = VersioningContext::new(&graph);
    ctx.versioned(a, a_enum).unwrap();
    let resolutions = ctx.resolve(a).unwrap();

    let roots: Vec<_> = resolutions
        .iter()
        .map(|r| r.root_version.as_ref().unwrap().index)
        .collect();
    assert_eq!(roots, vec![0, 1, 2, 3]);
    for r in &resolutions {
        assert_eq!(r.version_of(a), r.root_version.as_ref());
        assert_eq!(r.versions.len(), 1);
    }
}

#[test]
fn test_unversioned_root_without_dependencies() {
    let mut graph = SchemaGraph::new();
    let root = graph.add_namespace("Plain", None);

    let mut ctx = VersioningContext::new(&graph);
    let resolutions = ctx.resolve(root).unwrap();

    assert_eq!(resolutions.len(), 1);
    assert!(resolutions[0].root_version.is_none());
    assert!(resolutions[0].is_empty());

    let projections = ctx.build_projections(root).unwrap();
    assert_eq!(projections.len(), 1);
    assert!(projections[0].version.is_none());
    assert!(projections[0].projections.is_empty());
}

#[test]
fn test_resolve_rejects_non_namespace() {
    let mut graph = SchemaGraph::new();
    let model = graph.add_model("Widget", None);

    let mut ctx = VersioningContext::new(&graph);
    match ctx.resolve(model) {
        Err(VersioningError::NotANamespace(id)) => assert_eq!(id, model),
        other => panic!("Expected NotANamespace, got {:?}", other),
    }
}

// =============================================================================
// Dependencies
// =============================================================================

#[test]
fn test_unversioned_consumer_pins_dependency() {
    let mut graph = SchemaGraph::new();
    let (lib, lib_enum, lib_tags) = versioned_ns(&mut graph, "Lib", None, &["l1", "l2"]);
    let app = graph.add_namespace("App", None);

    let mut ctx = VersioningContext::new(&graph);
    ctx.versioned(lib, lib_enum).unwrap();
    assert!(ctx.versioned_dependency(app, &DependencyArg::Element(lib_tags[1])));

    let resolutions = ctx.resolve(app).unwrap();
    assert_eq!(resolutions.len(), 1);
    assert!(resolutions[0].root_version.is_none());
    assert_eq!(names(&resolutions[0], lib), Some("l2"));
    assert_eq!(resolutions[0].versions.len(), 1);
}

#[test]
fn test_every_version_mapped_to_one_dependency_version() {
    let mut graph = SchemaGraph::new();
    let (a, a_enum, a_tags) = versioned_ns(&mut graph, "A", None, &["v1", "v2", "v3"]);
    let (b, b_enum, b_tags) = versioned_ns(&mut graph, "B", None, &["vX", "vY"]);

    let mut ctx = VersioningContext::new(&graph);
    ctx.versioned(a, a_enum).unwrap();
    ctx.versioned(b, b_enum).unwrap();
    let pairs: Vec<_> = a_tags.iter().map(|&t| (t, b_tags[0])).collect();
    assert!(ctx.versioned_dependency(a, &DependencyArg::mapping(&pairs)));

    let resolutions = ctx.resolve(a).unwrap();
    assert_eq!(resolutions.len(), 3);
    for (r, expected) in resolutions.iter().zip(["v1", "v2", "v3"]) {
        assert_eq!(names(r, a), Some(expected));
        assert_eq!(names(r, b), Some("vX"));
    }
    assert!(ctx.diagnostics().is_empty());
}

#[test]
fn test_mapped_dependency() {
    let mut graph = SchemaGraph::new();
    let (a, a_enum, a_tags) = versioned_ns(&mut graph, "A", None, &["v1", "v2"]);
    let (c, c_enum, c_tags) = versioned_ns(&mut graph, "C", None, &["w1", "w2", "w3"]);

    let mut ctx = VersioningContext::new(&graph);
    ctx.versioned(a, a_enum).unwrap();
    ctx.versioned(c, c_enum).unwrap();
    ctx.versioned_dependency(a, &DependencyArg::mapping(&[(a_tags[0], c_tags[1]), (a_tags[1], c_tags[2])]));

    let resolutions = ctx.resolve(a).unwrap();
    assert_eq!(resolutions.len(), 2);
    assert_eq!(names(&resolutions[0], a), Some("v1"));
    assert_eq!(names(&resolutions[0], c), Some("w2"));
    assert_eq!(names(&resolutions[1], a), Some("v2"));
    assert_eq!(names(&resolutions[1], c), Some("w3"));
}

#[test]
fn test_dependency_declared_before_axis() {
    let mut graph = SchemaGraph::new();
    let (a, a_enum, a_tags) = versioned_ns(&mut graph, "A", None, &["v1", "v2"]);
    let (c, c_enum, c_tags) = versioned_ns(&mut graph, "C", None, &["w1", "w2"]);

    let mut ctx = VersioningContext::new(&graph);
    ctx.versioned(c, c_enum).unwrap();
    // Consumer tags resolve lazily, so A's own axis may come later
    ctx.versioned_dependency(a, &DependencyArg::mapping(&[(a_tags[0], c_tags[0]), (a_tags[1], c_tags[1])]));
    ctx.versioned(a, a_enum).unwrap();

    assert_eq!(ctx.validate_dependency_shapes(), 0);
    let resolutions = ctx.resolve(a).unwrap();
    assert_eq!(names(&resolutions[1], c), Some("w2"));
}

#[test]
fn test_missing_mapping_is_reported() {
    let mut graph = SchemaGraph::new();
    let (a, a_enum, a_tags) = versioned_ns(&mut graph, "A", None, &["v1", "v2"]);
    let (c, c_enum, c_tags) = versioned_ns(&mut graph, "C", None, &["w1"]);

    let mut ctx = VersioningContext::new(&graph);
    ctx.versioned(a, a_enum).unwrap();
    ctx.versioned(c, c_enum).unwrap();
    ctx.versioned_dependency(a, &DependencyArg::mapping(&[(a_tags[0], c_tags[0])]));

    let resolutions = ctx.resolve(a).unwrap();
    assert_eq!(resolutions.len(), 2);
    assert_eq!(names(&resolutions[0], c), Some("w1"));
    assert_eq!(names(&resolutions[1], c), None);

    let missing: Vec<_> = ctx
        .diagnostics()
        .with_code(DiagnosticCode::MissingDependencyMapping)
        .collect();
    assert_eq!(missing.len(), 1);
    assert!(missing[0].message.contains("'v2'"));
}

#[test]
fn test_ancestor_dependency_inheritance() {
    let mut graph = SchemaGraph::new();
    let (a, a_enum, a_tags) = versioned_ns(&mut graph, "A", None, &["v1", "v2"]);
    let (c, c_enum, c_tags) = versioned_ns(&mut graph, "C", None, &["w1", "w2"]);
    let child = graph.add_namespace("Child", Some(a));
    let grandchild = graph.add_namespace("Deep", Some(child));

    let mut ctx = VersioningContext::new(&graph);
    ctx.versioned(a, a_enum).unwrap();
    ctx.versioned(c, c_enum).unwrap();
    ctx.versioned_dependency(a, &DependencyArg::mapping(&[(a_tags[0], c_tags[0]), (a_tags[1], c_tags[1])]));

    let own = ctx.dependencies_of(a).unwrap();
    assert_eq!(ctx.dependencies_of(child).unwrap(), own);
    assert_eq!(ctx.dependencies_of(grandchild).unwrap(), own);
    assert_eq!(own.len(), 1);
    assert_eq!(own[0].0, c);
    assert!(matches!(own[0].1, ResolvedDependency::Mapping(ref pairs) if pairs.len() == 2));
    assert!(ctx.dependencies_of(c).is_none());

    assert_eq!(ctx.find_versioned_namespace(grandchild), Some(a));
}

#[test]
fn test_nearest_declaration_wins_without_merging() {
    let mut graph = SchemaGraph::new();
    let (lib, lib_enum, lib_tags) = versioned_ns(&mut graph, "Lib", None, &["l1", "l2"]);
    let (other, other_enum, other_tags) = versioned_ns(&mut graph, "Other", None, &["o1"]);
    let parent = graph.add_namespace("Parent", None);
    let child = graph.add_namespace("Child", Some(parent));

    let mut ctx = VersioningContext::new(&graph);
    ctx.versioned(lib, lib_enum).unwrap();
    ctx.versioned(other, other_enum).unwrap();
    ctx.versioned_dependency(parent, &DependencyArg::Element(lib_tags[0]));
    ctx.versioned_dependency(child, &DependencyArg::Element(other_tags[0]));

    let resolutions = ctx.resolve(child).unwrap();
    assert_eq!(resolutions.len(), 1);
    assert_eq!(names(&resolutions[0], other), Some("o1"));
    assert_eq!(names(&resolutions[0], lib), None);
}

// =============================================================================
// Shape mismatches
// =============================================================================

#[test]
fn test_fixed_pin_on_versioned_consumer_rejected_at_declaration() {
    let mut graph = SchemaGraph::new();
    let (a, a_enum, _) = versioned_ns(&mut graph, "A", None, &["v1"]);
    let (b, b_enum, b_tags) = versioned_ns(&mut graph, "B", None, &["vX"]);

    let mut ctx = VersioningContext::new(&graph);
    ctx.versioned(a, a_enum).unwrap();
    ctx.versioned(b, b_enum).unwrap();

    assert!(!ctx.versioned_dependency(a, &DependencyArg::Element(b_tags[0])));
    assert_eq!(
        ctx.diagnostics()
            .with_code(DiagnosticCode::VersionedDependencyShape)
            .count(),
        1
    );
    assert!(ctx.dependencies_of(a).is_none());
}

#[test]
fn test_validate_shapes_drops_late_mismatch() {
    let mut graph = SchemaGraph::new();
    let (a, a_enum, _) = versioned_ns(&mut graph, "A", None, &["v1", "v2"]);
    let (b, b_enum, b_tags) = versioned_ns(&mut graph, "B", None, &["vX"]);

    let mut ctx = VersioningContext::new(&graph);
    ctx.versioned(b, b_enum).unwrap();
    // Axis of A is not known yet, so the pin is accepted for now
    assert!(ctx.versioned_dependency(a, &DependencyArg::Element(b_tags[0])));
    ctx.versioned(a, a_enum).unwrap();

    assert_eq!(ctx.validate_dependency_shapes(), 1);
    assert!(ctx.diagnostics().has_errors());
    let resolutions = ctx.resolve(a).unwrap();
    assert_eq!(resolutions.len(), 2);
    assert_eq!(names(&resolutions[0], b), None);
}

#[test]
fn test_inherited_mismatch_is_fatal() {
    let mut graph = SchemaGraph::new();
    let (lib, lib_enum, lib_tags) = versioned_ns(&mut graph, "Lib", None, &["l1"]);
    let parent = graph.add_namespace("Parent", None);
    let (child, child_enum, _) = versioned_ns(&mut graph, "Child", Some(parent), &["c1", "c2"]);

    let mut ctx = VersioningContext::new(&graph);
    ctx.versioned(lib, lib_enum).unwrap();
    ctx.versioned(child, child_enum).unwrap();
    ctx.versioned_dependency(parent, &DependencyArg::Element(lib_tags[0]));
    assert_eq!(ctx.validate_dependency_shapes(), 0);

    match ctx.resolve(child) {
        Err(err @ VersioningError::InconsistentDependency { .. }) => {
            assert_eq!(
                err.to_string(),
                "Unexpected error: Namespace Parent.Child version dependency to Lib should be a mapping of version."
            );
        }
        other => panic!("Expected InconsistentDependency, got {:?}", other),
    }
}

#[test]
fn test_shape_check_can_be_deferred() {
    let mut graph = SchemaGraph::new();
    let (a, a_enum, _) = versioned_ns(&mut graph, "A", None, &["v1"]);
    let (b, b_enum, b_tags) = versioned_ns(&mut graph, "B", None, &["vX"]);

    let mut config = VersioningConfig::default();
    config.dependencies.check_shapes_on_declare = false;
    let mut ctx = VersioningContext::with_config(&graph, config);
    ctx.versioned(a, a_enum).unwrap();
    ctx.versioned(b, b_enum).unwrap();

    assert!(ctx.versioned_dependency(a, &DependencyArg::Element(b_tags[0])));
    assert!(matches!(
        ctx.resolve(a),
        Err(VersioningError::InconsistentDependency { .. })
    ));
}

// =============================================================================
// Projections
// =============================================================================

#[test]
fn test_projection_keys_resolve_back_to_versions() {
    let mut graph = SchemaGraph::new();
    let (a, a_enum, a_tags) = versioned_ns(&mut graph, "A", None, &["v1", "v2"]);
    let (c, c_enum, c_tags) = versioned_ns(&mut graph, "C", None, &["w1", "w2", "w3"]);
    let model = graph.add_model("Widget", Some(a));

    let mut ctx = VersioningContext::new(&graph);
    ctx.versioned(a, a_enum).unwrap();
    ctx.versioned(c, c_enum).unwrap();
    ctx.versioned_dependency(a, &DependencyArg::mapping(&[(a_tags[0], c_tags[1]), (a_tags[1], c_tags[2])]));

    let projections = ctx.build_projections(a).unwrap();
    assert_eq!(projections.len(), 2);
    assert_eq!(projections[0].version.as_deref(), Some("v1"));
    assert_eq!(projections[1].version.as_deref(), Some("v2"));

    let k0 = projections[0].projections[0].key;
    let k1 = projections[1].projections[0].key;
    assert_ne!(k0, k1);
    assert_eq!(projections[0].projections[0].projection_name, "v");
    assert_eq!(ctx.version_for_namespace(k1, c).map(|v| v.name.as_str()), Some("w3"));
    assert_eq!(ctx.version_for_key(model, k0).map(|v| v.name.as_str()), Some("v1"));

    // Building again registers fresh keys
    let again = ctx.build_projections(a).unwrap();
    assert_ne!(again[0].projections[0].key, k0);
}

#[test]
fn test_version_value_defaults_to_member_name() {
    let mut graph = SchemaGraph::new();
    let ns = graph.add_namespace("Service", None);
    let e = graph.add_enum("Versions", Some(ns));
    graph.add_enum_member(e, "v2021", Some("2021-01-01"));
    graph.add_enum_member(e, "v2022", None);

    let mut ctx = VersioningContext::new(&graph);
    ctx.versioned(ns, e).unwrap();
    let projections = ctx.build_projections(ns).unwrap();

    assert_eq!(projections[0].version.as_deref(), Some("2021-01-01"));
    assert_eq!(projections[1].version.as_deref(), Some("v2022"));
}

#[test]
fn test_projection_serializes() {
    let mut graph = SchemaGraph::new();
    let (a, a_enum, _) = versioned_ns(&mut graph, "A", None, &["v1"]);

    let mut ctx = VersioningContext::new(&graph);
    ctx.versioned(a, a_enum).unwrap();
    let projections = ctx.build_projections(a).unwrap();

    let json = serde_json::to_value(&projections).unwrap();
    assert_eq!(json[0]["version"], "v1");
    assert_eq!(json[0]["projections"][0]["projection_name"], "v");
    assert!(json[0]["projections"][0]["key"].is_u64());
}

#[test]
fn test_export_resolutions_uses_namespace_names() {
    let mut graph = SchemaGraph::new();
    let (a, a_enum, a_tags) = versioned_ns(&mut graph, "A", None, &["v1", "v2"]);
    let (c, c_enum, c_tags) = versioned_ns(&mut graph, "C", None, &["w1", "w2"]);

    let mut ctx = VersioningContext::new(&graph);
    ctx.versioned(a, a_enum).unwrap();
    ctx.versioned(c, c_enum).unwrap();
    ctx.versioned_dependency(a, &DependencyArg::mapping(&[(a_tags[0], c_tags[1]), (a_tags[1], c_tags[1])]));

    let json: serde_json::Value = serde_json::from_str(&ctx.export_resolutions(a).unwrap()).unwrap();
    assert_eq!(json.as_array().unwrap().len(), 2);
    assert_eq!(json[1]["root_version"], "v2");
    assert_eq!(json[1]["versions"]["A"], "v2");
    assert_eq!(json[1]["versions"]["C"], "w2");
}

#[test]
fn test_repeated_source_tag_resolves_like_split_declarations() {
    let mut graph = SchemaGraph::new();
    let (a, a_enum, a_tags) = versioned_ns(&mut graph, "A", None, &["v1"]);
    let (c, c_enum, c_tags) = versioned_ns(&mut graph, "C", None, &["w1", "w2"]);

    let mut single = VersioningContext::new(&graph);
    single.versioned(a, a_enum).unwrap();
    single.versioned(c, c_enum).unwrap();
    single.versioned_dependency(a, &DependencyArg::mapping(&[(a_tags[0], c_tags[0]), (a_tags[0], c_tags[1])]));

    let mut split = VersioningContext::new(&graph);
    split.versioned(a, a_enum).unwrap();
    split.versioned(c, c_enum).unwrap();
    split.versioned_dependency(a, &DependencyArg::mapping(&[(a_tags[0], c_tags[0])]));
    split.versioned_dependency(a, &DependencyArg::mapping(&[(a_tags[0], c_tags[1])]));

    let from_single = single.resolve(a).unwrap();
    let from_split = split.resolve(a).unwrap();
    assert_eq!(names(&from_single[0], c), Some("w2"));
    assert_eq!(from_single, from_split);
    assert!(single.diagnostics().is_empty());
}

#[test]
fn test_inherited_mapping_on_unversioned_root_is_fatal() {
    let mut graph = SchemaGraph::new();
    let (c, c_enum, c_tags) = versioned_ns(&mut graph, "C", None, &["w1", "w2"]);
    let parent = graph.add_namespace("Parent", None);
    let local = graph.add_enum("Local", Some(parent));
    let local_tag = graph.add_enum_member(local, "l1", None);
    let child = graph.add_namespace("Child", Some(parent));

    let mut config = VersioningConfig::default();
    config.dependencies.check_shapes_on_declare = false;
    let mut ctx = VersioningContext::with_config(&graph, config);
    ctx.versioned(c, c_enum).unwrap();
    assert!(ctx.versioned_dependency(parent, &DependencyArg::mapping(&[(local_tag, c_tags[1])])));

    match ctx.resolve(child) {
        Err(err @ VersioningError::InconsistentDependency { .. }) => {
            assert_eq!(
                err.to_string(),
                "Unexpected error: Namespace Parent.Child version dependency to C should be a picked version."
            );
        }
        other => panic!("Expected InconsistentDependency, got {:?}", other),
    }
}

#[test]
fn test_validate_shapes_drops_mapping_on_unversioned_consumer() {
    let mut graph = SchemaGraph::new();
    let (c, c_enum, c_tags) = versioned_ns(&mut graph, "C", None, &["w1"]);
    let app = graph.add_namespace("App", None);
    let local = graph.add_enum("Local", Some(app));
    let local_tag = graph.add_enum_member(local, "l1", None);

    let mut ctx = VersioningContext::new(&graph);
    ctx.versioned(c, c_enum).unwrap();
    assert!(ctx.versioned_dependency(app, &DependencyArg::mapping(&[(local_tag, c_tags[0])])));

    assert_eq!(ctx.validate_dependency_shapes(), 1);
    let shape: Vec<_> = ctx
        .diagnostics()
        .with_code(DiagnosticCode::VersionedDependencyShape)
        .collect();
    assert_eq!(shape.len(), 1);
    assert_eq!(shape[0].target, app);
    assert!(shape[0].message.contains("should be a picked version"));
    assert!(ctx.dependencies_of(app).is_none());

    let resolutions = ctx.resolve(app).unwrap();
    assert_eq!(resolutions.len(), 1);
    assert!(resolutions[0].is_empty());
}
