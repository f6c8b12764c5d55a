//! Lifecycle metadata
//!
//! Per-element record of when it was added, removed, made optional or renamed.
//! Records only grow: a mark is never taken back once applied.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::config::DuplicateMarkPolicy;
use crate::graph::ElementId;
use crate::version::Version;

/// One rename event: from `version` onward the element no longer uses `old_name`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameRecord {
    pub version: Version,
    pub old_name: String,
}

/// Lifecycle marks of one element
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub added_on: Option<Version>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removed_on: Option<Version>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub made_optional_on: Option<Version>,
    /// Sorted ascending by version index
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub renames: Vec<RenameRecord>,
}

impl LifecycleRecord {
    /// True when nothing was ever marked
    pub fn is_empty(&self) -> bool {
        self.added_on.is_none()
            && self.removed_on.is_none()
            && self.made_optional_on.is_none()
            && self.renames.is_empty()
    }

    fn push_rename(&mut self, version: Version, old_name: String) {
        self.renames.push(RenameRecord { version, old_name });
        // Stable sort: renames at the same index keep application order
        self.renames.sort_by_key(|r| r.version.index);
    }

    /// Name recorded by the first rename strictly after `version`
    pub fn name_at_version(&self, version: &Version) -> Option<&str> {
        self.renames
            .iter()
            .find(|r| r.version.partial_cmp(version) == Some(Ordering::Greater))
            .map(|r| r.old_name.as_str())
    }
}

/// Which mark is being applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleMark {
    Added,
    Removed,
    MadeOptional,
}

impl LifecycleMark {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Removed => "removed",
            Self::MadeOptional => "madeOptional",
        }
    }
}

/// Outcome of applying a single-valued mark
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkOutcome {
    Recorded,
    /// A mark of the same kind was kept; carries the version already on record
    KeptExisting(Version),
    /// A mark of the same kind was overwritten; carries the replaced version
    Replaced(Version),
}

/// Lifecycle records of every element in a compilation
#[derive(Debug, Default)]
pub struct LifecycleStore {
    records: HashMap<ElementId, LifecycleRecord>,
    policy: DuplicateMarkPolicy,
}

impl LifecycleStore {
    pub fn new(policy: DuplicateMarkPolicy) -> Self {
        Self {
            records: HashMap::new(),
            policy,
        }
    }

    fn apply(&mut self, element: ElementId, mark: LifecycleMark, version: Version) -> MarkOutcome {
        let policy = self.policy;
        let record = self.records.entry(element).or_default();
        let slot = match mark {
            LifecycleMark::Added => &mut record.added_on,
            LifecycleMark::Removed => &mut record.removed_on,
            LifecycleMark::MadeOptional => &mut record.made_optional_on,
        };

        if let Some(existing) = slot.as_mut() {
            return match policy {
                DuplicateMarkPolicy::KeepFirst => MarkOutcome::KeptExisting(existing.clone()),
                DuplicateMarkPolicy::Replace => {
                    MarkOutcome::Replaced(std::mem::replace(existing, version))
                }
            };
        }
        *slot = Some(version);
        MarkOutcome::Recorded
    }

    pub fn mark_added(&mut self, element: ElementId, version: Version) -> MarkOutcome {
        self.apply(element, LifecycleMark::Added, version)
    }

    pub fn mark_removed(&mut self, element: ElementId, version: Version) -> MarkOutcome {
        self.apply(element, LifecycleMark::Removed, version)
    }

    pub fn mark_optional(&mut self, element: ElementId, version: Version) -> MarkOutcome {
        self.apply(element, LifecycleMark::MadeOptional, version)
    }

    /// Append a rename. Renames at the same index are all kept.
    pub fn add_rename(&mut self, element: ElementId, version: Version, old_name: impl Into<String>) {
        self.records
            .entry(element)
            .or_default()
            .push_rename(version, old_name.into());
    }

    pub fn get(&self, element: ElementId) -> Option<&LifecycleRecord> {
        self.records.get(&element)
    }

    pub fn get_added(&self, element: ElementId) -> Option<&Version> {
        self.get(element)?.added_on.as_ref()
    }

    pub fn get_removed(&self, element: ElementId) -> Option<&Version> {
        self.get(element)?.removed_on.as_ref()
    }

    pub fn get_optional(&self, element: ElementId) -> Option<&Version> {
        self.get(element)?.made_optional_on.as_ref()
    }

    pub fn get_mark(&self, element: ElementId, mark: LifecycleMark) -> Option<&Version> {
        match mark {
            LifecycleMark::Added => self.get_added(element),
            LifecycleMark::Removed => self.get_removed(element),
            LifecycleMark::MadeOptional => self.get_optional(element),
        }
    }

    pub fn get_renames_ascending(&self, element: ElementId) -> Option<&[RenameRecord]> {
        self.get(element)
            .map(|r| r.renames.as_slice())
            .filter(|r| !r.is_empty())
    }

    /// Old name in effect at `version`, or `None` when the declared name applies
    pub fn name_at_version(&self, element: ElementId, version: &Version) -> Option<&str> {
        self.get(element)?.name_at_version(version)
    }
}
