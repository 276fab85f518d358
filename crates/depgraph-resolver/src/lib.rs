//! Dependency graph resolution for depgraph.
//!
//! This crate walks the declared dependencies of pinned packages into a
//! graph store, reconciling every package reached more than once, and checks
//! which interpreter releases the pinned set supports.

pub mod cache;
pub mod compat;
pub mod merge;
pub mod pypi;
pub mod registry;
pub mod resolution;
pub mod resolver;
pub mod runtime;

pub use cache::{CacheStats, Prefetch, RegistryCache};
pub use compat::{
    runtime_window, CompatibilityChecker, PinRange, Recommendation, RuntimeRanges, RuntimeWindow,
    RuntimeWindowError,
};
pub use merge::{merge, MergeOutcome};
pub use pypi::PyPIClient;
pub use registry::{MemoryRegistry, Registry};
pub use resolution::{ResolutionContext, ResolutionMetrics};
pub use resolver::{fetch_version, GraphResolver, ResolverOptions};
pub use runtime::{
    parse_release_listing, release_source, PythonOrgReleases, RuntimeReleaseSource, StaticReleases,
};
