//! Diagnostics
//!
//! Collects user-facing problems found while applying version annotations.
//! A reported declaration is skipped; compilation carries on.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ElementId;

// =============================================================================
// Diagnostic Codes
// =============================================================================

/// Diagnostic code for categorizing issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticCode {
    // === Version references ===
    /// Tag does not belong to any declared version axis
    VersionNotFound,

    // === Dependencies ===
    /// Entry of a dependency mapping is not a tuple
    VersionedDependencyTuple,
    /// Tuple endpoint is missing or not an enum member
    VersionedDependencyTupleEnumMember,
    /// Mapping targets span more than one namespace
    VersionedDependencySameNamespace,
    /// Fixed/mapping form disagrees with the consumer being versioned
    VersionedDependencyShape,
    /// Consumer version has no entry in a dependency mapping
    MissingDependencyMapping,
    /// Version belongs to an axis other than the one governing the element
    VersionNotOnGoverningAxis,

    // === Lifecycle ===
    /// Second added/removed/madeOptional mark on the same element
    DuplicateLifecycleMark,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VersionNotFound => "version-not-found",
            Self::VersionedDependencyTuple => "versioned-dependency-tuple",
            Self::VersionedDependencyTupleEnumMember => "versioned-dependency-tuple-enum-member",
            Self::VersionedDependencySameNamespace => "versioned-dependency-same-namespace",
            Self::VersionedDependencyShape => "versioned-dependency-shape",
            Self::MissingDependencyMapping => "missing-dependency-mapping",
            Self::VersionNotOnGoverningAxis => "version-not-on-governing-axis",
            Self::DuplicateLifecycleMark => "duplicate-lifecycle-mark",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::VersionNotFound
            | Self::VersionedDependencyTuple
            | Self::VersionedDependencyTupleEnumMember
            | Self::VersionedDependencySameNamespace
            | Self::VersionedDependencyShape
            | Self::MissingDependencyMapping
            | Self::VersionNotOnGoverningAxis => Severity::Error,

            Self::DuplicateLifecycleMark => Severity::Warning,
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Severity
// =============================================================================

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

// =============================================================================
// Diagnostic Item
// =============================================================================

/// A single diagnostic item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticItem {
    /// Element the diagnostic is attached to
    pub target: ElementId,
    pub code: DiagnosticCode,
    /// Human-readable message
    pub message: String,
    /// Additional context (suggestions, related namespaces)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<String>,
}

impl DiagnosticItem {
    pub fn new(target: ElementId, code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            target,
            code,
            message: message.into(),
            context: Vec::new(),
        }
    }

    pub fn with_context(mut self, ctx: impl Into<String>) -> Self {
        self.context.push(ctx.into());
        self
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }
}

impl fmt::Display for DiagnosticItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {} ({})",
            self.code,
            self.code.severity(),
            self.message,
            self.target
        )?;

        for ctx in &self.context {
            write!(f, "\n  - {}", ctx)?;
        }

        Ok(())
    }
}

// =============================================================================
// Diagnostics Collection
// =============================================================================

/// Collection of diagnostics reported during one compilation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    items: Vec<DiagnosticItem>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: DiagnosticItem) {
        tracing::debug!(code = %item.code, target = %item.target, "{}", item.message);
        self.items.push(item);
    }

    pub fn report(&mut self, target: ElementId, code: DiagnosticCode, message: impl Into<String>) {
        self.push(DiagnosticItem::new(target, code, message));
    }

    /// Report an unresolvable version reference
    pub fn version_not_found(
        &mut self,
        target: ElementId,
        version: &str,
        enum_name: &str,
        suggestion: Option<&str>,
    ) {
        let mut item = DiagnosticItem::new(
            target,
            DiagnosticCode::VersionNotFound,
            format!(
                "The provided version '{}' from '{}' is not declared as a version enum. Use '@versioned(...)' on the containing namespace.",
                version, enum_name
            ),
        );
        if let Some(s) = suggestion {
            item = item.with_context(format!("did you mean '{}'?", s));
        }
        self.push(item);
    }

    /// Report dependency targets spanning two namespaces
    pub fn dependency_same_namespace(&mut self, target: ElementId, first: &str, second: &str) {
        self.push(
            DiagnosticItem::new(
                target,
                DiagnosticCode::VersionedDependencySameNamespace,
                format!(
                    "Versioned dependency mapping must all point to the same namespace but 2 versions have different namespaces '{}' and '{}'.",
                    first, second
                ),
            )
            .with_context(format!("namespaces: {} / {}", first, second)),
        );
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|i| i.severity() == Severity::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &DiagnosticItem> {
        self.items.iter().filter(|i| i.severity() == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &DiagnosticItem> {
        self.items.iter().filter(|i| i.severity() == Severity::Warning)
    }

    /// Items with the given code
    pub fn with_code(&self, code: DiagnosticCode) -> impl Iterator<Item = &DiagnosticItem> {
        self.items.iter().filter(move |i| i.code == code)
    }

    pub fn all(&self) -> &[DiagnosticItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    /// Format all diagnostics for display
    pub fn format_all(&self) -> String {
        let mut output = String::new();

        for item in &self.items {
            output.push_str(&format!("{}\n", item));
        }

        if self.has_errors() {
            output.push_str(&format!(
                "\n{} error(s), {} warning(s)\n",
                self.error_count(),
                self.warning_count()
            ));
        } else if !self.is_empty() {
            output.push_str(&format!("\n{} warning(s)\n", self.warning_count()));
        }

        output
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_all())
    }
}

impl IntoIterator for Diagnostics {
    type Item = DiagnosticItem;
    type IntoIter = std::vec::IntoIter<DiagnosticItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a DiagnosticItem;
    type IntoIter = std::slice::Iter<'a, DiagnosticItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::SchemaGraph;

    #[test]
    fn test_diagnostic_severity() {
        assert_eq!(DiagnosticCode::VersionNotFound.severity(), Severity::Error);
        assert_eq!(DiagnosticCode::DuplicateLifecycleMark.severity(), Severity::Warning);
        assert_eq!(DiagnosticCode::VersionNotOnGoverningAxis.severity(), Severity::Error);
    }

    #[test]
    fn test_code_strings() {
        assert_eq!(DiagnosticCode::MissingDependencyMapping.as_str(), "missing-dependency-mapping");
        assert_eq!(DiagnosticCode::VersionedDependencyShape.to_string(), "versioned-dependency-shape");
        assert_eq!(
            DiagnosticCode::VersionNotOnGoverningAxis.as_str(),
            "version-not-on-governing-axis"
        );
    }

    #[test]
    fn test_diagnostics_collection() {
        let mut g = SchemaGraph::new();
        let ns = g.add_namespace("Service", None);
        let model = g.add_model("Widget", Some(ns));

        let mut diags = Diagnostics::new();
        diags.version_not_found(model, "v9", "Versions", Some("v2"));
        diags.report(model, DiagnosticCode::DuplicateLifecycleMark, "already added");

        assert_eq!(diags.error_count(), 1);
        assert_eq!(diags.warning_count(), 1);
        assert!(diags.has_errors());
        assert!(diags.format_all().contains("did you mean 'v2'?"));
        assert!(diags.format_all().contains("1 error(s), 1 warning(s)"));
    }
}
