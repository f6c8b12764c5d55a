//! Error types for the versioning engine
//!
//! Authoring mistakes in user schemas are reported through
//! [`Diagnostics`](crate::graph::Diagnostics). The errors here are API misuse
//! and broken invariants that stop the current operation.

use thiserror::Error;

use crate::graph::ElementId;

/// Result type for versioning operations
pub type Result<T> = std::result::Result<T, VersioningError>;

/// Versioning engine errors
#[derive(Error, Debug)]
pub enum VersioningError {
    #[error("Namespace {namespace} already has a version axis")]
    DuplicateAxis { namespace: String },

    #[error("Version axis for namespace {namespace} has no versions")]
    EmptyAxis { namespace: String },

    #[error("Version tag {tag} is declared more than once")]
    DuplicateVersionTag { tag: ElementId },

    #[error("Element {0} is not a namespace")]
    NotANamespace(ElementId),

    #[error("Element {0} is not an enum")]
    NotAnEnum(ElementId),

    #[error("Unexpected error: Namespace {namespace} version dependency to {dependency} should be {expected}.")]
    InconsistentDependency {
        namespace: String,
        dependency: String,
        expected: &'static str,
    },

    #[error("Config error: {0}")]
    Config(#[from] config_crate::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
