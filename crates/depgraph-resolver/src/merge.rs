//! Reconciling two requests for the same package.

use tracing::{debug, warn};

use depgraph_core::config::BarePinPolicy;
use depgraph_core::package::PackageName;
use depgraph_core::version::{
    filter_versions, narrow_to_observed_range, ConstraintKind, Version, VersionConstraint,
};

use crate::cache::RegistryCache;
use crate::registry::Registry;

/// Result of merging a recorded value with an incoming one
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Value to record on the node
    Accepted(String),
    /// The two values cannot both hold; carries the rejected candidate
    Rejected(String),
}

/// Merge the value recorded for `package` with an incoming version or range.
///
/// Ranged values are narrowed to the closed range of published versions they
/// jointly admit. A bare pin must be one of the published versions the other
/// side's range admits. Two bare pins follow `policy`.
pub async fn merge<R: Registry + ?Sized>(
    existing: Option<&str>,
    incoming: &str,
    package: &PackageName,
    registry: &RegistryCache<'_, R>,
    policy: BarePinPolicy,
) -> MergeOutcome {
    let Some(recorded) = existing else {
        return MergeOutcome::Accepted(incoming.to_string());
    };

    match (ConstraintKind::classify(recorded), ConstraintKind::classify(incoming)) {
        (_, ConstraintKind::Unset) => MergeOutcome::Accepted(recorded.to_string()),
        (ConstraintKind::Unset, _) => MergeOutcome::Accepted(incoming.to_string()),
        (ConstraintKind::Ranged(a), ConstraintKind::Ranged(b)) => {
            let (a, b) = match (VersionConstraint::parse(&a), VersionConstraint::parse(&b)) {
                (Ok(a), Ok(b)) => (a, b),
                (Err(e), _) | (_, Err(e)) => {
                    warn!("Cannot merge constraints for {}: {}", package, e);
                    return MergeOutcome::Rejected(incoming.to_string());
                }
            };
            let published = registry.published_versions(package).await;
            match narrow_to_observed_range(&published, &a.intersect(&b)) {
                Ok(narrowed) => {
                    debug!("Narrowed {} to {}", package, narrowed);
                    MergeOutcome::Accepted(narrowed.to_string())
                }
                Err(e) => {
                    debug!("{}: {}", package, e);
                    MergeOutcome::Rejected(incoming.to_string())
                }
            }
        }
        (ConstraintKind::Ranged(range), ConstraintKind::Bare(pin)) => {
            if pin_within_range(&pin, &range, package, registry).await {
                MergeOutcome::Accepted(incoming.to_string())
            } else {
                MergeOutcome::Rejected(incoming.to_string())
            }
        }
        (ConstraintKind::Bare(pin), ConstraintKind::Ranged(range)) => {
            if pin_within_range(&pin, &range, package, registry).await {
                MergeOutcome::Accepted(recorded.to_string())
            } else {
                MergeOutcome::Rejected(recorded.to_string())
            }
        }
        (ConstraintKind::Bare(a), ConstraintKind::Bare(b)) => match policy {
            BarePinPolicy::LastWriteWins => MergeOutcome::Accepted(incoming.to_string()),
            BarePinPolicy::RequireEqual if same_version(&a, &b) => {
                MergeOutcome::Accepted(incoming.to_string())
            }
            BarePinPolicy::RequireEqual => MergeOutcome::Rejected(incoming.to_string()),
        },
    }
}

/// True if `pin` is among the published versions `range` admits
async fn pin_within_range<R: Registry + ?Sized>(
    pin: &str,
    range: &str,
    package: &PackageName,
    registry: &RegistryCache<'_, R>,
) -> bool {
    let (pin, range) = match (Version::parse(pin), VersionConstraint::parse(range)) {
        (Ok(pin), Ok(range)) => (pin, range),
        (Err(e), _) | (_, Err(e)) => {
            warn!("Cannot compare {} pin with range: {}", package, e);
            return false;
        }
    };
    let published = registry.published_versions(package).await;
    filter_versions(&published, &range).contains(&pin)
}

fn same_version(a: &str, b: &str) -> bool {
    match (Version::parse(a), Version::parse(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
