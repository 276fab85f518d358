//! Request-scoped registry cache.
//!
//! Every registry answer is kept for the lifetime of one run, failures
//! included, so a package is fetched at most once per run. Failures are
//! logged and turned into empty results here; nothing above this layer sees
//! a transient registry error.

use std::sync::atomic::{AtomicUsize, Ordering};

use futures::stream::{self, StreamExt};
use rustc_hash::FxHashMap;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use depgraph_core::dependency::{parse_dependencies, DeclaredDependency};
use depgraph_core::package::{PackageMetadata, PackageName};

use crate::registry::Registry;

type MetadataKey = (PackageName, Option<String>);

/// Counters of a cache's traffic
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub network_requests: usize,
    pub cache_hits: usize,
}

/// A prefetch request for one package
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prefetch {
    /// Metadata at a version, or the latest release
    Metadata(PackageName, Option<String>),
    /// Published version list
    Versions(PackageName),
}

pub struct RegistryCache<'a, R: ?Sized> {
    registry: &'a R,
    metadata: RwLock<FxHashMap<MetadataKey, Option<PackageMetadata>>>,
    versions: RwLock<FxHashMap<PackageName, Vec<String>>>,
    network_requests: AtomicUsize,
    cache_hits: AtomicUsize,
}

impl<'a, R: Registry + ?Sized> RegistryCache<'a, R> {
    pub fn new(registry: &'a R) -> Self {
        Self {
            registry,
            metadata: RwLock::new(FxHashMap::default()),
            versions: RwLock::new(FxHashMap::default()),
            network_requests: AtomicUsize::new(0),
            cache_hits: AtomicUsize::new(0),
        }
    }

    /// Metadata for a release; `None` if the registry could not provide it
    pub async fn metadata(&self, name: &PackageName, version: Option<&str>) -> Option<PackageMetadata> {
        let key = (name.clone(), version.map(str::to_string));
        if let Some(cached) = self.metadata.read().await.get(&key) {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
            return cached.clone();
        }

        self.network_requests.fetch_add(1, Ordering::Relaxed);
        let fetched = match self.registry.get_metadata(name, version).await {
            Ok(metadata) => Some(metadata),
            Err(e) => {
                warn!(
                    "Failed to fetch metadata for {}=={}: {}",
                    name,
                    version.unwrap_or("latest"),
                    e
                );
                None
            }
        };
        self.metadata.write().await.insert(key, fetched.clone());
        fetched
    }

    /// Published versions; empty if the registry could not provide them
    pub async fn published_versions(&self, name: &PackageName) -> Vec<String> {
        if let Some(cached) = self.versions.read().await.get(name) {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
            return cached.clone();
        }

        self.network_requests.fetch_add(1, Ordering::Relaxed);
        let fetched = match self.registry.get_published_versions(name).await {
            Ok(versions) => versions,
            Err(e) => {
                warn!("Error fetching package versions for {}: {}", name, e);
                Vec::new()
            }
        };
        self.versions.write().await.insert(name.clone(), fetched.clone());
        fetched
    }

    /// Mandatory dependencies declared by a release
    pub async fn dependencies(&self, name: &PackageName, version: Option<&str>) -> Vec<DeclaredDependency> {
        match self.metadata(name, version).await {
            Some(metadata) => parse_dependencies(&metadata.declared_dependencies),
            None => Vec::new(),
        }
    }

    /// Warm the cache with up to `concurrency` requests in flight
    pub async fn prefetch<I>(&self, requests: I, concurrency: usize)
    where
        I: IntoIterator<Item = Prefetch>,
    {
        let requests: Vec<Prefetch> = requests.into_iter().collect();
        if requests.is_empty() {
            return;
        }
        debug!("Prefetching {} registry entries", requests.len());

        stream::iter(requests)
            .map(|request| async move {
                match request {
                    Prefetch::Metadata(name, version) => {
                        self.metadata(&name, version.as_deref()).await;
                    }
                    Prefetch::Versions(name) => {
                        self.published_versions(&name).await;
                    }
                }
            })
            .buffer_unordered(concurrency.max(1))
            .collect::<Vec<()>>()
            .await;
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            network_requests: self.network_requests.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
        }
    }
}
