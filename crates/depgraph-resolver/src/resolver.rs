//! Conflict-aware dependency graph resolution.
//!
//! The walk is depth first over an explicit frame stack. Every time a
//! package is reached its recorded value is merged with the incoming one, but
//! its own dependencies are expanded only the first time it is reached in a
//! run, which makes dependency cycles harmless. The first merge that cannot be
//! reconciled is recorded in the graph and ends the run.

use std::collections::VecDeque;

use tracing::{debug, error, info};

use depgraph_core::config::{BarePinPolicy, DepGraphConfig};
use depgraph_core::dependency::DeclaredDependency;
use depgraph_core::error::{DepGraphError, DepGraphResult};
use depgraph_core::graph::{EdgeLabel, GraphStore};
use depgraph_core::package::{PackageName, Pin};
use depgraph_core::version::{is_bare, ConstraintKind, VersionConstraint};

use crate::cache::Prefetch;
use crate::merge::{merge, MergeOutcome};
use crate::registry::Registry;
use crate::resolution::{ResolutionContext, ResolutionMetrics};

/// Resolver settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverOptions {
    pub bare_pins: BarePinPolicy,
    /// Registry requests in flight while prefetching
    pub max_concurrent_requests: usize,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            bare_pins: BarePinPolicy::default(),
            max_concurrent_requests: 8,
        }
    }
}

impl From<&DepGraphConfig> for ResolverOptions {
    fn from(config: &DepGraphConfig) -> Self {
        Self {
            bare_pins: config.resolver.bare_pins,
            max_concurrent_requests: config.registry.max_concurrent_requests,
        }
    }
}

/// A package whose dependencies are being walked
#[derive(Debug)]
struct Frame {
    package: PackageName,
    version: String,
    pending: VecDeque<DeclaredDependency>,
}

impl Frame {
    fn new(package: PackageName, version: String, dependencies: Vec<DeclaredDependency>) -> Self {
        Self {
            package,
            version,
            pending: dependencies.into(),
        }
    }
}

/// Builds the dependency graph of pinned packages into a [`GraphStore`]
pub struct GraphResolver<R> {
    registry: R,
    options: ResolverOptions,
}

impl<R: Registry> GraphResolver<R> {
    pub fn new(registry: R, options: ResolverOptions) -> Self {
        Self { registry, options }
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn options(&self) -> &ResolverOptions {
        &self.options
    }

    /// Fresh per-run state
    pub fn context(&self) -> ResolutionContext<'_, R> {
        ResolutionContext::new(&self.registry)
    }

    /// Resolve every pin in order, then flush the store.
    ///
    /// Stops at the first unresolvable conflict with
    /// [`DepGraphError::Conflict`], after the conflict has been recorded and
    /// flushed.
    pub async fn resolve_requirements<S: GraphStore + ?Sized>(
        &self,
        store: &mut S,
        pins: &[Pin],
    ) -> DepGraphResult<ResolutionMetrics> {
        let mut ctx = self.context();
        for pin in pins {
            info!("Resolving {}", pin);
            let dependencies = ctx.cache.dependencies(pin.name(), Some(pin.version())).await;
            self.resolve(&mut ctx, store, pin.name(), pin.version(), dependencies)
                .await?;
            ctx.metrics.root_count += 1;
        }
        store.flush().await?;

        let metrics = ctx.metrics();
        info!("Resolution finished: {}", metrics);
        Ok(metrics)
    }

    /// Record `package` at `version` and walk `dependencies` depth first
    pub async fn resolve<S: GraphStore + ?Sized>(
        &self,
        ctx: &mut ResolutionContext<'_, R>,
        store: &mut S,
        package: &PackageName,
        version: &str,
        dependencies: Vec<DeclaredDependency>,
    ) -> DepGraphResult<()> {
        let version = self.record_root(ctx, store, package, version).await?;
        ctx.expanded.insert(package.clone());

        let root = Frame::new(package.clone(), version, dependencies);
        self.prefetch(ctx, store, &root).await?;
        let mut stack = vec![root];

        while let Some(frame) = stack.last_mut() {
            let Some(dependency) = frame.pending.pop_front() else {
                stack.pop();
                continue;
            };
            if dependency.name == frame.package {
                continue;
            }

            let parent = frame.package.clone();
            let parent_version = frame.version.clone();
            if let Some(child) = self
                .visit(ctx, store, &parent, &parent_version, dependency)
                .await?
            {
                self.prefetch(ctx, store, &child).await?;
                stack.push(child);
            }
        }
        Ok(())
    }

    /// Root step: record the pin, merging with what an earlier visit recorded
    async fn record_root<S: GraphStore + ?Sized>(
        &self,
        ctx: &mut ResolutionContext<'_, R>,
        store: &mut S,
        package: &PackageName,
        version: &str,
    ) -> DepGraphResult<String> {
        let existing = match store.find_node(package).await? {
            Some(node) if node.version != version => node,
            _ => {
                store.upsert_node(package, version).await?;
                return Ok(version.to_string());
            }
        };

        let outcome = merge(
            Some(existing.version.as_str()),
            version,
            package,
            &ctx.cache,
            self.options.bare_pins,
        )
        .await;
        match outcome {
            MergeOutcome::Accepted(merged) => {
                ctx.metrics.merges += 1;
                store.upsert_node(package, &merged).await?;
                Ok(merged)
            }
            MergeOutcome::Rejected(candidate) => {
                error!(
                    "{} is recorded as {} but requested as {}",
                    package, existing.version, version
                );
                store.upsert_node(package, version).await?;
                store.flush().await?;
                Err(DepGraphError::pin_conflict(
                    package.as_str(),
                    existing.version,
                    candidate,
                ))
            }
        }
    }

    /// Handle one edge `parent -> dependency`; returns the frame to descend into
    async fn visit<S: GraphStore + ?Sized>(
        &self,
        ctx: &mut ResolutionContext<'_, R>,
        store: &mut S,
        parent: &PackageName,
        parent_version: &str,
        dependency: DeclaredDependency,
    ) -> DepGraphResult<Option<Frame>> {
        let DeclaredDependency { name, constraint } = dependency;

        let recorded = match store.find_node(&name).await? {
            None => constraint,
            Some(node) => {
                let outcome = merge(
                    Some(node.version.as_str()),
                    &constraint,
                    &name,
                    &ctx.cache,
                    self.options.bare_pins,
                )
                .await;
                match outcome {
                    MergeOutcome::Accepted(merged) => {
                        ctx.metrics.merges += 1;
                        merged
                    }
                    MergeOutcome::Rejected(candidate) => {
                        self.record_conflict(store, parent, parent_version, &name, &candidate)
                            .await?;
                        return Err(DepGraphError::conflict(
                            parent.as_str(),
                            name.as_str(),
                            candidate,
                        ));
                    }
                }
            }
        };

        store.upsert_node(&name, &recorded).await?;
        store.upsert_edge(parent, &name, EdgeLabel::DependsOn).await?;

        if !ctx.expanded.insert(name.clone()) {
            debug!("{} already expanded, not descending again", name);
            return Ok(None);
        }
        let version = fetch_version(&recorded);
        let dependencies = ctx.cache.dependencies(&name, version.as_deref()).await;
        Ok(Some(Frame::new(name, recorded, dependencies)))
    }

    /// Leave the failed merge visible in the graph and persist it
    async fn record_conflict<S: GraphStore + ?Sized>(
        &self,
        store: &mut S,
        package: &PackageName,
        version: &str,
        dependency: &PackageName,
        candidate: &str,
    ) -> DepGraphResult<()> {
        error!(
            "Cannot reconcile {} required by {}: {} is not satisfiable",
            dependency, package, candidate
        );
        store.upsert_node(package, version).await?;
        store.upsert_node(dependency, candidate).await?;
        store
            .upsert_edge(package, dependency, EdgeLabel::IncompatibleUpgradeRequired)
            .await?;
        store.flush().await
    }

    /// Fetch what the frame's dependencies will need before walking them
    async fn prefetch<S: GraphStore + ?Sized>(
        &self,
        ctx: &ResolutionContext<'_, R>,
        store: &S,
        frame: &Frame,
    ) -> DepGraphResult<()> {
        let mut requests = Vec::new();
        for dependency in frame.pending.iter().filter(|d| d.name != frame.package) {
            match store.find_node(&dependency.name).await? {
                // A revisit: only a merge involving a range needs the version list
                Some(node) if !(is_bare(&node.version) && is_bare(&dependency.constraint)) => {
                    requests.push(Prefetch::Versions(dependency.name.clone()));
                }
                Some(_) => {}
                None if !ctx.is_expanded(&dependency.name) => {
                    requests.push(Prefetch::Metadata(
                        dependency.name.clone(),
                        fetch_version(&dependency.constraint),
                    ));
                }
                None => {}
            }
        }
        ctx.cache
            .prefetch(requests, self.options.max_concurrent_requests)
            .await;
        Ok(())
    }
}

/// Release to read dependencies from for a recorded version or range.
///
/// A bare pin is used as is; a range uses its lower bound, then its exact
/// pin. `None` means the latest release.
pub fn fetch_version(recorded: &str) -> Option<String> {
    match ConstraintKind::classify(recorded) {
        ConstraintKind::Unset => None,
        ConstraintKind::Bare(version) => Some(version),
        ConstraintKind::Ranged(range) => VersionConstraint::parse(&range)
            .ok()?
            .base_version()
            .map(|version| version.to_string()),
    }
}
