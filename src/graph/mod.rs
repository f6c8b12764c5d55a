//! Schema Element Graph
//!
//! Containment graph for the schema elements the versioning engine reasons about.
//! Nodes are elements (namespaces, models, properties, enum members, ...), edges
//! point from a container to the element it contains.
//!
//! The graph is append-only: elements are never removed, so an [`ElementId`] is a
//! stable identity for the lifetime of a compilation and is safe to use as a
//! cache or map key.

pub mod diagnostics;

pub use diagnostics::{DiagnosticCode, DiagnosticItem, Diagnostics, Severity};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identity of an element in a [`SchemaGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(usize);

impl ElementId {
    pub fn index(self) -> usize {
        self.0
    }

    fn node(self) -> NodeIndex {
        NodeIndex::new(self.0)
    }
}

impl From<NodeIndex> for ElementId {
    fn from(idx: NodeIndex) -> Self {
        ElementId(idx.index())
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kind of a schema element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    Namespace,
    Interface,
    Operation,
    Model,
    ModelProperty,
    Union,
    UnionVariant,
    Enum,
    EnumMember,
    Scalar,
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Namespace => "namespace",
            Self::Interface => "interface",
            Self::Operation => "operation",
            Self::Model => "model",
            Self::ModelProperty => "model property",
            Self::Union => "union",
            Self::UnionVariant => "union variant",
            Self::Enum => "enum",
            Self::EnumMember => "enum member",
            Self::Scalar => "scalar",
        };
        write!(f, "{}", s)
    }
}

/// Edge weight: how the source element contains the target element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Containment {
    /// Namespace → namespace/interface/operation/model/union/enum/scalar
    Namespace,
    /// Interface → operation
    Interface,
    /// Model → property
    Model,
    /// Union → variant
    Union,
    /// Enum → member
    Enum,
    /// Source property → derived (spread, inherited or aliased) property
    SourceProperty,
}

/// Node data for a single element
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaElement {
    pub name: String,
    pub kind: ElementKind,
    /// Declared value of an enum member
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// Append-only containment graph of schema elements
#[derive(Debug, Default)]
pub struct SchemaGraph {
    graph: DiGraph<SchemaElement, Containment>,
}

impl SchemaGraph {
    pub fn new() -> Self {
        Self::default()
    }

    // ========== Builders ==========

    fn add(&mut self, name: &str, kind: ElementKind, value: Option<String>) -> ElementId {
        self.graph
            .add_node(SchemaElement {
                name: name.to_string(),
                kind,
                value,
            })
            .into()
    }

    fn link(&mut self, parent: Option<ElementId>, child: ElementId, edge: Containment) {
        if let Some(parent) = parent {
            self.graph.add_edge(parent.node(), child.node(), edge);
        }
    }

    /// Add a namespace, optionally nested in `parent`
    pub fn add_namespace(&mut self, name: &str, parent: Option<ElementId>) -> ElementId {
        let id = self.add(name, ElementKind::Namespace, None);
        self.link(parent, id, Containment::Namespace);
        id
    }

    pub fn add_interface(&mut self, name: &str, namespace: Option<ElementId>) -> ElementId {
        let id = self.add(name, ElementKind::Interface, None);
        self.link(namespace, id, Containment::Namespace);
        id
    }

    /// Add an operation declared in a namespace, an interface, or both
    pub fn add_operation(
        &mut self,
        name: &str,
        namespace: Option<ElementId>,
        interface: Option<ElementId>,
    ) -> ElementId {
        let id = self.add(name, ElementKind::Operation, None);
        self.link(namespace, id, Containment::Namespace);
        self.link(interface, id, Containment::Interface);
        id
    }

    pub fn add_model(&mut self, name: &str, namespace: Option<ElementId>) -> ElementId {
        let id = self.add(name, ElementKind::Model, None);
        self.link(namespace, id, Containment::Namespace);
        id
    }

    /// Add a model property. `source` marks the property it was copied from
    /// (spread, `is`, or alias).
    pub fn add_property(
        &mut self,
        model: Option<ElementId>,
        name: &str,
        source: Option<ElementId>,
    ) -> ElementId {
        let id = self.add(name, ElementKind::ModelProperty, None);
        self.link(model, id, Containment::Model);
        self.link(source, id, Containment::SourceProperty);
        id
    }

    pub fn add_union(&mut self, name: &str, namespace: Option<ElementId>) -> ElementId {
        let id = self.add(name, ElementKind::Union, None);
        self.link(namespace, id, Containment::Namespace);
        id
    }

    pub fn add_variant(&mut self, union: ElementId, name: &str) -> ElementId {
        let id = self.add(name, ElementKind::UnionVariant, None);
        self.link(Some(union), id, Containment::Union);
        id
    }

    pub fn add_enum(&mut self, name: &str, namespace: Option<ElementId>) -> ElementId {
        let id = self.add(name, ElementKind::Enum, None);
        self.link(namespace, id, Containment::Namespace);
        id
    }

    pub fn add_enum_member(
        &mut self,
        parent_enum: ElementId,
        name: &str,
        value: Option<&str>,
    ) -> ElementId {
        let id = self.add(name, ElementKind::EnumMember, value.map(String::from));
        self.link(Some(parent_enum), id, Containment::Enum);
        id
    }

    pub fn add_scalar(&mut self, name: &str, namespace: Option<ElementId>) -> ElementId {
        let id = self.add(name, ElementKind::Scalar, None);
        self.link(namespace, id, Containment::Namespace);
        id
    }

    // ========== Queries ==========

    pub fn element_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn get(&self, id: ElementId) -> Option<&SchemaElement> {
        self.graph.node_weight(id.node())
    }

    pub fn kind(&self, id: ElementId) -> Option<ElementKind> {
        self.get(id).map(|e| e.kind)
    }

    pub fn name(&self, id: ElementId) -> &str {
        self.get(id).map(|e| e.name.as_str()).unwrap_or("<unknown>")
    }

    /// Container of `id` reached through an edge of the given kind
    pub fn container(&self, id: ElementId, via: Containment) -> Option<ElementId> {
        if self.get(id).is_none() {
            return None;
        }
        self.graph
            .edges_directed(id.node(), Direction::Incoming)
            .find(|e| *e.weight() == via)
            .map(|e| e.source().into())
    }

    pub fn namespace_of(&self, id: ElementId) -> Option<ElementId> {
        self.container(id, Containment::Namespace)
    }

    pub fn interface_of(&self, id: ElementId) -> Option<ElementId> {
        self.container(id, Containment::Interface)
    }

    pub fn model_of(&self, id: ElementId) -> Option<ElementId> {
        self.container(id, Containment::Model)
    }

    pub fn union_of(&self, id: ElementId) -> Option<ElementId> {
        self.container(id, Containment::Union)
    }

    pub fn enum_of(&self, id: ElementId) -> Option<ElementId> {
        self.container(id, Containment::Enum)
    }

    pub fn source_property(&self, id: ElementId) -> Option<ElementId> {
        self.container(id, Containment::SourceProperty)
    }

    /// Parent of a namespace (`None` for a root namespace)
    pub fn parent_namespace(&self, id: ElementId) -> Option<ElementId> {
        self.namespace_of(id)
    }

    /// Members of an enum, in declaration order
    pub fn enum_members(&self, enum_id: ElementId) -> Vec<ElementId> {
        if self.get(enum_id).is_none() {
            return Vec::new();
        }
        let mut members: Vec<ElementId> = self
            .graph
            .edges_directed(enum_id.node(), Direction::Outgoing)
            .filter(|e| *e.weight() == Containment::Enum)
            .map(|e| e.target().into())
            .collect();
        // Node indices grow with insertion, so sorting restores declaration order
        members.sort();
        members
    }

    /// Dotted name of a namespace including all its ancestors (e.g. `Azure.Core`)
    pub fn namespace_full_name(&self, id: ElementId) -> String {
        let mut parts = vec![self.name(id).to_string()];
        let mut current = self.parent_namespace(id);
        while let Some(ns) = current {
            // Guard against malformed cyclic containment
            if parts.len() > self.element_count() {
                break;
            }
            parts.push(self.name(ns).to_string());
            current = self.parent_namespace(ns);
        }
        parts.reverse();
        parts.join(".")
    }
}
