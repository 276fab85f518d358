//! Core types for depgraph.
//!
//! This crate provides the constraint algebra, dependency and requirements
//! parsing, the graph store and the configuration shared by the resolver and
//! the command line.

pub mod config;
pub mod dependency;
pub mod error;
pub mod graph;
pub mod logging;
pub mod package;
pub mod requirements;
pub mod version;

// Re-export commonly used types
pub use crate::config::{BarePinPolicy, DepGraphConfig};
pub use crate::dependency::{parse_dependencies, parse_dependency, DeclaredDependency};
pub use crate::error::{DepGraphError, DepGraphResult};
pub use crate::graph::{
    EdgeLabel, GraphSnapshot, GraphStore, JsonGraphStore, LookupMode, MemoryGraphStore, PackageNode,
};
pub use crate::logging::{init_logging, LogFormat, LogLevel, LoggingConfig};
pub use crate::package::{PackageMetadata, PackageName, Pin};
pub use crate::requirements::Requirements;
pub use crate::version::{
    is_bare, narrow_to_observed_range, ConstraintKind, Unsatisfiable, Version, VersionConstraint,
};
