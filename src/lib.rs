//! depgraph: conflict-aware dependency graphs for pinned Python requirements.
//!
//! Walks the declared dependencies of every pin into a persistent graph,
//! narrowing the constraints of packages reached more than once, and reports
//! which Python releases the whole pinned set supports.

pub use depgraph_cli as cli;
pub use depgraph_core as core;
pub use depgraph_resolver as resolver;

/// Version of depgraph
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
