//! Point-in-time evaluation
//!
//! Answers "was this element added / removed / made optional at version V".
//! `V` must already be projected onto the element's governing axis.

use serde::Serialize;
use std::cmp::Ordering;

use crate::graph::ElementId;
use crate::lifecycle::{LifecycleMark, LifecycleStore};
use crate::version::Version;

/// Tri-state result of a lifecycle query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Applicability {
    /// No mark recorded, element unversioned, or query on another axis
    NotApplicable,
    /// The mark is in effect at the queried version
    Applies,
    /// The mark exists but takes effect after the queried version
    DoesNotApply,
}

impl Applicability {
    /// Compare a query version against the version a mark was applied on
    pub fn at(query: &Version, applied_on: Option<&Version>) -> Self {
        let Some(applied_on) = applied_on else {
            return Self::NotApplicable;
        };
        match query.partial_cmp(applied_on) {
            None => Self::NotApplicable,
            Some(Ordering::Less) => Self::DoesNotApply,
            Some(Ordering::Equal | Ordering::Greater) => Self::Applies,
        }
    }

    /// `Some(true/false)` when applicable
    pub fn applies(self) -> Option<bool> {
        match self {
            Self::NotApplicable => None,
            Self::Applies => Some(true),
            Self::DoesNotApply => Some(false),
        }
    }

    pub fn is_applicable(self) -> bool {
        self != Self::NotApplicable
    }

    /// Collapse to a boolean, choosing the value for the not-applicable case
    pub fn or_default_to(self, not_applicable: bool) -> bool {
        self.applies().unwrap_or(not_applicable)
    }
}

fn mark_at(store: &LifecycleStore, element: ElementId, mark: LifecycleMark, v: &Version) -> Applicability {
    Applicability::at(v, store.get_mark(element, mark))
}

/// `v` is at or after the element's added version
pub fn exists_at_or_after_added(store: &LifecycleStore, element: ElementId, v: &Version) -> Applicability {
    mark_at(store, element, LifecycleMark::Added, v)
}

/// `v` is at or after the element's removed version (gone from there on)
pub fn removed_at_or_before(store: &LifecycleStore, element: ElementId, v: &Version) -> Applicability {
    mark_at(store, element, LifecycleMark::Removed, v)
}

/// `v` is at or after the version the element became optional
pub fn made_optional_at_or_after(
    store: &LifecycleStore,
    element: ElementId,
    v: &Version,
) -> Applicability {
    mark_at(store, element, LifecycleMark::MadeOptional, v)
}

/// The element used a different name at `v`
pub fn has_different_name_at(store: &LifecycleStore, element: ElementId, v: &Version) -> bool {
    store
        .name_at_version(element, v)
        .is_some_and(|name| !name.is_empty())
}
