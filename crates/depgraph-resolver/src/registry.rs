use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use depgraph_core::error::{DepGraphError, DepGraphResult};
use depgraph_core::package::{PackageMetadata, PackageName};
use depgraph_core::version::Version;

/// Source of package metadata and published version lists
#[async_trait]
pub trait Registry: Send + Sync {
    /// Metadata for one release, or for the latest release when `version` is `None`
    async fn get_metadata(
        &self,
        name: &PackageName,
        version: Option<&str>,
    ) -> DepGraphResult<PackageMetadata>;

    /// Every published, non-yanked version string
    async fn get_published_versions(&self, name: &PackageName) -> DepGraphResult<Vec<String>>;
}

/// Registry held entirely in memory
///
/// Serves offline runs and tests. Packages marked unavailable fail every
/// request with a network error.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    packages: BTreeMap<PackageName, BTreeMap<String, PackageMetadata>>,
    unavailable: HashSet<PackageName>,
    requests: AtomicUsize,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a release with its `Requires-Dist` lines and `Requires-Python`
    pub fn with_release(
        mut self,
        name: &str,
        version: &str,
        dependencies: &[&str],
        requires_python: Option<&str>,
    ) -> Self {
        let mut metadata =
            PackageMetadata::new(name, version).with_dependencies(dependencies.iter().copied());
        if let Some(requires_python) = requires_python {
            metadata = metadata.with_requires_python(requires_python);
        }
        if let Ok(key) = PackageName::new(name) {
            self.packages
                .entry(key)
                .or_default()
                .insert(version.to_string(), metadata);
        }
        self
    }

    /// Add dependency-free releases
    pub fn with_published(mut self, name: &str, versions: &[&str]) -> Self {
        for version in versions {
            self = self.with_release(name, version, &[], None);
        }
        self
    }

    /// Make every request for `name` fail
    pub fn with_unavailable(mut self, name: &str) -> Self {
        if let Ok(key) = PackageName::new(name) {
            self.unavailable.insert(key);
        }
        self
    }

    /// Requests served so far, failed ones included
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::Relaxed)
    }

    fn releases(&self, name: &PackageName) -> DepGraphResult<&BTreeMap<String, PackageMetadata>> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        if self.unavailable.contains(name) {
            return Err(DepGraphError::network(format!("{} is unreachable", name)));
        }
        self.packages
            .get(name)
            .ok_or_else(|| DepGraphError::package(format!("Package not found: {}", name)))
    }
}

#[async_trait]
impl Registry for MemoryRegistry {
    async fn get_metadata(
        &self,
        name: &PackageName,
        version: Option<&str>,
    ) -> DepGraphResult<PackageMetadata> {
        let releases = self.releases(name)?;
        let found = match version {
            Some(requested) => releases.get(requested).or_else(|| {
                let requested = Version::parse(requested).ok()?;
                releases
                    .iter()
                    .find(|(raw, _)| Version::parse(raw).ok().as_ref() == Some(&requested))
                    .map(|(_, metadata)| metadata)
            }),
            None => releases
                .iter()
                .filter_map(|(raw, metadata)| Some((Version::parse(raw).ok()?, metadata)))
                .filter(|(version, _)| !version.is_prerelease())
                .max_by(|a, b| a.0.cmp(&b.0))
                .map(|(_, metadata)| metadata),
        };
        found.cloned().ok_or_else(|| {
            DepGraphError::package(format!(
                "Release not found: {} {}",
                name,
                version.unwrap_or("(latest)")
            ))
        })
    }

    async fn get_published_versions(&self, name: &PackageName) -> DepGraphResult<Vec<String>> {
        Ok(self.releases(name)?.keys().cloned().collect())
    }
}
