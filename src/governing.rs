//! Governing-axis resolution
//!
//! Finds the nearest ancestor namespace owning a version axis for any element.
//! Results are memoized per element for the lifetime of the compilation.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};

use crate::graph::{ElementId, ElementKind, SchemaGraph};
use crate::version::AxisRegistry;

/// One step of the upward walk
enum Step {
    /// Element is a namespace owning an axis
    Found(ElementId),
    /// Continue with the container (or stop unversioned on `None`)
    Next(Option<ElementId>),
}

/// Cache counters, mostly useful in tests and tracing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub entries: usize,
}

/// Memoized element → governing namespace lookup
///
/// Uses interior mutability so read-side queries can stay `&self`. Each
/// compilation owns its own instance.
#[derive(Debug, Default)]
pub struct GoverningAxisCache {
    cache: RefCell<HashMap<ElementId, Option<ElementId>>>,
    hits: Cell<usize>,
    misses: Cell<usize>,
}

impl GoverningAxisCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Namespace whose axis governs `element`, `None` when unversioned
    pub fn governing_namespace(
        &self,
        graph: &SchemaGraph,
        axes: &AxisRegistry,
        element: ElementId,
    ) -> Option<ElementId> {
        if let Some(&cached) = self.cache.borrow().get(&element) {
            self.hits.set(self.hits.get() + 1);
            return cached;
        }
        self.misses.set(self.misses.get() + 1);

        let mut path = Vec::new();
        let mut visited = HashSet::new();
        let mut current = Some(element);

        let result = loop {
            let Some(el) = current else {
                break None;
            };
            if let Some(&cached) = self.cache.borrow().get(&el) {
                break cached;
            }
            if !visited.insert(el) {
                tracing::warn!(element = %el, "cyclic containment while resolving version axis");
                break None;
            }
            path.push(el);

            match step(graph, axes, el) {
                Step::Found(ns) => break Some(ns),
                Step::Next(next) => current = next,
            }
        };

        tracing::debug!(
            element = %element,
            walked = path.len(),
            governing = ?result,
            "resolved governing axis"
        );

        // Every element on the walked chain shares the answer
        let mut cache = self.cache.borrow_mut();
        for el in path {
            cache.entry(el).or_insert(result);
        }
        result
    }

    /// Forget every memoized answer. Needed after a new axis is declared.
    pub fn invalidate(&mut self) {
        let dropped = self.cache.get_mut().len();
        self.cache.get_mut().clear();
        if dropped > 0 {
            tracing::debug!(dropped, "governing axis cache invalidated");
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.get(),
            misses: self.misses.get(),
            entries: self.cache.borrow().len(),
        }
    }
}

fn step(graph: &SchemaGraph, axes: &AxisRegistry, el: ElementId) -> Step {
    let Some(kind) = graph.kind(el) else {
        return Step::Next(None);
    };

    match kind {
        ElementKind::Namespace => {
            if axes.is_versioned(el) {
                Step::Found(el)
            } else {
                Step::Next(graph.parent_namespace(el))
            }
        }
        ElementKind::Operation => {
            Step::Next(graph.namespace_of(el).or_else(|| graph.interface_of(el)))
        }
        ElementKind::Interface | ElementKind::Model | ElementKind::Union | ElementKind::Enum => {
            Step::Next(graph.namespace_of(el))
        }
        ElementKind::ModelProperty => {
            Step::Next(graph.source_property(el).or_else(|| graph.model_of(el)))
        }
        ElementKind::UnionVariant => Step::Next(graph.union_of(el)),
        ElementKind::EnumMember => Step::Next(graph.enum_of(el)),
        ElementKind::Scalar => Step::Next(None),
    }
}
