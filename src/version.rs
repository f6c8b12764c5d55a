//! Version axes
//!
//! A versioned namespace owns one [`VersionAxis`]: the ordered list of versions
//! declared for it. Ordering inside an axis comes from declaration order only.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::error::{Result, VersioningError};
use crate::graph::{ElementId, ElementKind, SchemaGraph};

/// One version of a namespace
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Version {
    /// Name of the declaring tag (e.g. `v2022_01_01`)
    pub name: String,
    /// Serialized value, defaults to `name`
    pub value: String,
    /// Position in the owning axis, starting at 0
    pub index: usize,
    /// Namespace owning the axis
    pub namespace: ElementId,
    /// Tag (enum member) this version was declared from
    pub tag: ElementId,
}

impl Version {
    /// Whether both versions live on the same axis
    pub fn same_axis(&self, other: &Version) -> bool {
        self.namespace == other.namespace
    }
}

/// Versions only compare within one axis. Across axes the result is `None`;
/// project through a resolution first.
impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if !self.same_axis(other) {
            return None;
        }
        Some(self.index.cmp(&other.index))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// Ordered versions of one namespace. Immutable once declared.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionAxis {
    namespace: ElementId,
    versions: Vec<Version>,
    #[serde(skip)]
    by_tag: HashMap<ElementId, usize>,
}

impl VersionAxis {
    fn new(graph: &SchemaGraph, namespace: ElementId, tags: &[ElementId]) -> Self {
        let versions: Vec<Version> = tags
            .iter()
            .enumerate()
            .map(|(index, &tag)| {
                let element = graph.get(tag);
                let name = element.map(|e| e.name.clone()).unwrap_or_default();
                let value = element
                    .and_then(|e| e.value.clone())
                    .unwrap_or_else(|| name.clone());
                Version {
                    name,
                    value,
                    index,
                    namespace,
                    tag,
                }
            })
            .collect();
        let by_tag = versions.iter().map(|v| (v.tag, v.index)).collect();

        Self {
            namespace,
            versions,
            by_tag,
        }
    }

    pub fn namespace(&self) -> ElementId {
        self.namespace
    }

    pub fn lookup(&self, tag: ElementId) -> Option<&Version> {
        self.by_tag.get(&tag).map(|&i| &self.versions[i])
    }

    /// All versions in ascending index order
    pub fn all(&self) -> &[Version] {
        &self.versions
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn latest(&self) -> Option<&Version> {
        self.versions.last()
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Version> {
        self.versions.iter().find(|v| v.name == name)
    }

    /// Closest version name to `query` (fuzzy)
    pub fn suggest(&self, query: &str) -> Option<&Version> {
        use fuzzy_matcher::skim::SkimMatcherV2;
        use fuzzy_matcher::FuzzyMatcher;

        let matcher = SkimMatcherV2::default();
        self.versions
            .iter()
            .filter_map(|v| {
                matcher
                    .fuzzy_match(&v.name, query)
                    .or_else(|| matcher.fuzzy_match(query, &v.name))
                    .map(|score| (score, v))
            })
            .max_by_key(|(score, _)| *score)
            .map(|(_, v)| v)
    }
}

/// All axes declared in one compilation
#[derive(Debug, Default)]
pub struct AxisRegistry {
    axes: HashMap<ElementId, VersionAxis>,
    /// tag -> namespace owning the axis that declares it
    tag_owner: HashMap<ElementId, ElementId>,
}

impl AxisRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the axis of `namespace`, indexing `tags` in the order given
    pub fn declare(
        &mut self,
        graph: &SchemaGraph,
        namespace: ElementId,
        tags: &[ElementId],
    ) -> Result<&VersionAxis> {
        if graph.kind(namespace) != Some(ElementKind::Namespace) {
            return Err(VersioningError::NotANamespace(namespace));
        }
        if self.axes.contains_key(&namespace) {
            return Err(VersioningError::DuplicateAxis {
                namespace: graph.namespace_full_name(namespace),
            });
        }
        if tags.is_empty() {
            return Err(VersioningError::EmptyAxis {
                namespace: graph.namespace_full_name(namespace),
            });
        }

        let mut seen = HashSet::new();
        for &tag in tags {
            if !seen.insert(tag) || self.tag_owner.contains_key(&tag) {
                return Err(VersioningError::DuplicateVersionTag { tag });
            }
        }

        tracing::debug!(
            namespace = %graph.namespace_full_name(namespace),
            versions = tags.len(),
            "declared version axis"
        );

        for &tag in tags {
            self.tag_owner.insert(tag, namespace);
        }
        let axis = VersionAxis::new(graph, namespace, tags);
        Ok(self.axes.entry(namespace).or_insert(axis))
    }

    /// Axis owned directly by `namespace`
    pub fn get(&self, namespace: ElementId) -> Option<&VersionAxis> {
        self.axes.get(&namespace)
    }

    pub fn is_versioned(&self, namespace: ElementId) -> bool {
        self.axes.contains_key(&namespace)
    }

    /// Resolve a tag to the version it declares, on whichever axis owns it
    pub fn version_for_tag(&self, tag: ElementId) -> Option<&Version> {
        let namespace = self.tag_owner.get(&tag)?;
        self.axes.get(namespace)?.lookup(tag)
    }

    pub fn len(&self) -> usize {
        self.axes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.axes.is_empty()
    }
}
