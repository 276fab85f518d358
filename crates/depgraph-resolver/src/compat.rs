//! Interpreter compatibility of a set of pinned packages.
//!
//! Each pin's `Requires-Python` range is read at the pinned release and the
//! ranges are intersected. The aggregate is then matched against the known
//! interpreter releases, and for a chosen target interpreter a replacement
//! release is suggested for every pin that does not support it.

use std::fmt;

use thiserror::Error;
use tracing::{debug, info, warn};

use depgraph_core::package::{PackageName, Pin};
use depgraph_core::requirements::Requirements;
use depgraph_core::version::{Version, VersionConstraint};

use crate::cache::{Prefetch, RegistryCache};
use crate::registry::Registry;

/// Interpreter range declared by one pin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinRange {
    pub pin: Pin,
    pub range: VersionConstraint,
}

/// Result of reading the ranges of every pin
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeRanges {
    /// Intersection of every readable range
    pub aggregate: VersionConstraint,
    pub per_pin: Vec<PinRange>,
    /// Requirement lines and pins that could not be processed
    pub unprocessed: Vec<String>,
}

/// Known releases admitted by the aggregate range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeWindow {
    pub compatible: Vec<Version>,
    pub min: Version,
    pub max: Version,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RuntimeWindowError {
    #[error("no known interpreter release satisfies '{aggregate}'")]
    NoCompatibleRuntime { aggregate: VersionConstraint },
}

/// Suggested replacement for one pin
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recommendation {
    Upgrade { package: PackageName, version: String },
    NotFound { package: PackageName },
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recommendation::Upgrade { package, version } => write!(f, "{}: {}", package, version),
            Recommendation::NotFound { package } => {
                write!(f, "{}: No compatible version found", package)
            }
        }
    }
}

/// Compatibility checks against one registry
pub struct CompatibilityChecker<'a, R: ?Sized> {
    cache: RegistryCache<'a, R>,
    concurrency: usize,
}

impl<'a, R: Registry + ?Sized> CompatibilityChecker<'a, R> {
    pub fn new(registry: &'a R, concurrency: usize) -> Self {
        Self {
            cache: RegistryCache::new(registry),
            concurrency,
        }
    }

    pub fn cache(&self) -> &RegistryCache<'a, R> {
        &self.cache
    }

    /// Read and intersect the interpreter ranges of every pin.
    ///
    /// Pins without a declared range, or whose metadata cannot be fetched,
    /// contribute the unconstrained range. A malformed range puts the pin in
    /// `unprocessed`, next to the invalid requirement lines.
    pub async fn aggregate_ranges(&self, requirements: &Requirements) -> RuntimeRanges {
        self.cache
            .prefetch(
                requirements
                    .pins
                    .iter()
                    .map(|pin| Prefetch::Metadata(pin.name().clone(), Some(pin.version().to_string()))),
                self.concurrency,
            )
            .await;

        let mut ranges = RuntimeRanges {
            unprocessed: requirements.invalid.clone(),
            ..RuntimeRanges::default()
        };
        for pin in &requirements.pins {
            let metadata = self.cache.metadata(pin.name(), Some(pin.version())).await;
            let range = match metadata.map(|m| m.python_constraint()) {
                Some(Ok(range)) => range,
                Some(Err(e)) => {
                    warn!("Invalid Requires-Python for {}: {}", pin, e);
                    ranges.unprocessed.push(pin.to_string());
                    continue;
                }
                None => VersionConstraint::any(),
            };
            debug!("{} supports Python '{}'", pin, range);
            ranges.aggregate = ranges.aggregate.intersect(&range);
            ranges.per_pin.push(PinRange {
                pin: pin.clone(),
                range,
            });
        }
        info!("Compatible Python versions for all packages: '{}'", ranges.aggregate);
        ranges
    }

    /// Suggest a release of every pin that excludes `target`.
    ///
    /// When `target` is newer than every compatible release the pin's newer
    /// releases are searched oldest first, otherwise its older releases
    /// newest first. The first release whose range admits `target` wins.
    pub async fn recommend(
        &self,
        ranges: &RuntimeRanges,
        target: &Version,
        window_max: Option<&Version>,
    ) -> Vec<Recommendation> {
        let upgrade = window_max.map_or(true, |max| target > max);
        let mut recommendations = Vec::new();

        for PinRange { pin, range } in &ranges.per_pin {
            if range.matches(target) {
                continue;
            }
            let package = pin.name().clone();
            let recommendation = match self.search(pin, target, upgrade).await {
                Some(version) => Recommendation::Upgrade { package, version },
                None => Recommendation::NotFound { package },
            };
            info!("{}", recommendation);
            recommendations.push(recommendation);
        }
        recommendations
    }

    async fn search(&self, pin: &Pin, target: &Version, upgrade: bool) -> Option<String> {
        let current = Version::parse(pin.version()).ok()?;
        let mut candidates: Vec<(Version, String)> = self
            .cache
            .published_versions(pin.name())
            .await
            .into_iter()
            .filter_map(|raw| Some((Version::parse(&raw).ok()?, raw)))
            .filter(|(version, _)| if upgrade { *version > current } else { *version < current })
            .collect();
        candidates.sort_by(|a, b| a.0.cmp(&b.0));
        if !upgrade {
            candidates.reverse();
        }

        for (_, raw) in candidates {
            let Some(metadata) = self.cache.metadata(pin.name(), Some(&raw)).await else {
                continue;
            };
            match metadata.python_constraint() {
                Ok(range) if range.matches(target) => return Some(raw),
                Ok(_) => {}
                Err(e) => debug!("Skipping {}=={}: {}", pin.name(), raw, e),
            }
        }
        None
    }
}

/// Known interpreter releases admitted by `aggregate`
pub fn runtime_window(
    aggregate: &VersionConstraint,
    releases: &[Version],
) -> Result<RuntimeWindow, RuntimeWindowError> {
    let mut compatible: Vec<Version> = releases
        .iter()
        .filter(|release| aggregate.matches(release))
        .cloned()
        .collect();
    compatible.sort();
    compatible.dedup();

    match (compatible.first().cloned(), compatible.last().cloned()) {
        (Some(min), Some(max)) => Ok(RuntimeWindow { compatible, min, max }),
        _ => Err(RuntimeWindowError::NoCompatibleRuntime {
            aggregate: aggregate.clone(),
        }),
    }
}
