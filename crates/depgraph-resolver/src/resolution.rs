use std::collections::HashSet;
use std::fmt;
use std::time::Instant;

use serde::Serialize;

use depgraph_core::package::PackageName;

use crate::cache::RegistryCache;
use crate::registry::Registry;

/// Metrics from one resolution run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionMetrics {
    /// Number of root pins resolved
    pub root_count: usize,
    /// Number of packages whose dependencies were expanded
    pub package_count: usize,
    /// Time taken for resolution (ms)
    pub resolution_time_ms: u64,
    /// Number of registry requests
    pub network_requests: usize,
    /// Number of registry answers served from the cache
    pub cache_hits: usize,
    /// Number of revisits reconciled with the recorded value
    pub merges: usize,
}

impl fmt::Display for ResolutionMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} roots, {} packages, {} merges, {} requests ({} cached) in {}ms",
            self.root_count,
            self.package_count,
            self.merges,
            self.network_requests,
            self.cache_hits,
            self.resolution_time_ms
        )
    }
}

/// State owned by one resolution run
///
/// Holds the registry cache, the set of packages already expanded and the
/// running metrics. Nothing in here outlives the run.
pub struct ResolutionContext<'a, R: ?Sized> {
    pub(crate) cache: RegistryCache<'a, R>,
    pub(crate) expanded: HashSet<PackageName>,
    pub(crate) metrics: ResolutionMetrics,
    started: Instant,
}

impl<'a, R: Registry + ?Sized> ResolutionContext<'a, R> {
    pub fn new(registry: &'a R) -> Self {
        Self {
            cache: RegistryCache::new(registry),
            expanded: HashSet::new(),
            metrics: ResolutionMetrics::default(),
            started: Instant::now(),
        }
    }

    pub fn cache(&self) -> &RegistryCache<'a, R> {
        &self.cache
    }

    /// Whether `name` has had its dependencies expanded in this run
    pub fn is_expanded(&self, name: &PackageName) -> bool {
        self.expanded.contains(name)
    }

    /// Snapshot of the metrics so far
    pub fn metrics(&self) -> ResolutionMetrics {
        let stats = self.cache.stats();
        ResolutionMetrics {
            package_count: self.expanded.len(),
            resolution_time_ms: self.started.elapsed().as_millis() as u64,
            network_requests: stats.network_requests,
            cache_hits: stats.cache_hits,
            ..self.metrics.clone()
        }
    }
}
