//! Schema Versioning
//!
//! Version axes, lifecycle marks and cross-namespace version resolution for a
//! schema graph. One [`VersioningContext`] per compilation holds all state.
//!
//! ## Features
//!
//! - **Version Axes**: A namespace declares an ordered list of versions
//! - **Lifecycle Marks**: Elements are added, removed, made optional or renamed at a version
//! - **Governing Axis**: Every element is versioned by its nearest versioned namespace
//! - **Dependencies**: Namespaces pin or map versions of the namespaces they build on
//! - **Resolution**: A root namespace expands into one version assignment per version
//! - **Projection Specs**: Each assignment is registered under a key for the projection engine
//!
//! ## Flow
//!
//! ```text
//! SchemaGraph ──► VersioningContext ──┬─► versioned / added / removed / renamed_from
//!                                     ├─► versioned_dependency
//!                                     ├─► resolve ──► Vec<VersionResolution>
//!                                     └─► build_projections ──► Vec<VersionProjection>
//!                                                      │
//!                         projection engine ◄──────────┘  (added_after, name_at_key, ...)
//! ```

pub mod config;
pub mod context;
pub mod dependency;
pub mod error;
pub mod evaluator;
pub mod governing;
pub mod graph;
pub mod lifecycle;
pub mod projection;
pub mod resolution;
pub mod version;

pub use config::{DuplicateMarkPolicy, VersioningConfig};
pub use context::VersioningContext;
pub use dependency::{DependencyArg, DependencyEntry, ResolvedDependency};
pub use error::{Result, VersioningError};
pub use evaluator::Applicability;
pub use governing::CacheStats;
pub use graph::{
    Containment, DiagnosticCode, DiagnosticItem, Diagnostics, ElementId, ElementKind, SchemaElement,
    SchemaGraph, Severity,
};
pub use lifecycle::{LifecycleRecord, RenameRecord};
pub use projection::{ProjectionInstruction, ResolutionKey, VersionProjection};
pub use resolution::VersionResolution;
pub use version::{Version, VersionAxis};
