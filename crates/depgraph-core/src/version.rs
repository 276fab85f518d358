//! PEP 440 versions and specifier sets.
//!
//! [`Version`] and [`VersionConstraint`] wrap the `pep440_rs` types. A
//! constraint keeps its specifiers in an ordered set, so intersecting two
//! constraints is a set union and the result does not depend on the order
//! the operands were combined in.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use pep440_rs::{Operator, VersionSpecifier, VersionSpecifiers};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{DepGraphError, DepGraphResult};

/// Package version following PEP 440
///
/// Local version labels are kept for display.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version(pep440_rs::Version);

impl Version {
    /// Parse a version string
    pub fn parse(version: &str) -> DepGraphResult<Self> {
        pep440_rs::Version::from_str(version.trim())
            .map(Self)
            .map_err(|e| DepGraphError::version(format!("Invalid version '{}': {}", version, e)))
    }

    /// Pre-releases and development releases
    pub fn is_prerelease(&self) -> bool {
        self.0.any_prerelease()
    }
}

impl FromStr for Version {
    type Err = DepGraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Serialize for Version {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Version::parse(&s).map_err(serde::de::Error::custom)
    }
}

// One clause of a constraint, ordered for display: lower bounds, pins,
// exclusions, upper bounds.
#[derive(Debug, Clone)]
struct Specifier(VersionSpecifier);

impl Specifier {
    fn rank(&self) -> u8 {
        match self.0.operator() {
            Operator::TildeEqual => 0,
            Operator::GreaterThanEqual => 1,
            Operator::GreaterThan => 2,
            Operator::Equal => 3,
            Operator::EqualStar => 4,
            Operator::ExactEqual => 5,
            Operator::NotEqual => 6,
            Operator::NotEqualStar => 7,
            Operator::LessThanEqual => 8,
            Operator::LessThan => 9,
        }
    }

    fn names_prerelease(&self) -> bool {
        self.0.version().any_prerelease()
    }
}

impl PartialEq for Specifier {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Specifier {}

impl Hash for Specifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        self.0.version().hash(state);
    }
}

impl PartialOrd for Specifier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Specifier {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank()
            .cmp(&other.rank())
            .then_with(|| self.0.version().cmp(other.0.version()))
    }
}

/// The filtered set of published versions was empty
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("no published version satisfies '{constraint}'")]
pub struct Unsatisfiable {
    pub constraint: VersionConstraint,
}

/// Version constraint following PEP 440
///
/// Pre-releases are admitted per operand. A parsed constraint admits them
/// when one of its own clauses names a pre-release; an intersection admits
/// them only when every operand did.
#[derive(Debug, Clone, Default, Hash, Eq, PartialEq, PartialOrd, Ord)]
pub struct VersionConstraint {
    specifiers: BTreeSet<Specifier>,
    prereleases: bool,
}

impl VersionConstraint {
    /// Create a constraint that matches any final version
    pub fn any() -> Self {
        Self::default()
    }

    /// Parse a comma separated specifier set, e.g. `>=1.0, <2.0`
    pub fn parse(constraint: &str) -> DepGraphResult<Self> {
        let trimmed = constraint
            .trim()
            .trim_start_matches('(')
            .trim_end_matches(')')
            .trim();
        if trimmed.is_empty() || trimmed == "*" {
            return Ok(Self::any());
        }

        let parsed = VersionSpecifiers::from_str(trimmed).map_err(|e| {
            DepGraphError::version(format!("Invalid version constraint '{}': {}", constraint, e))
        })?;

        Ok(Self::from_clauses(parsed.iter().cloned().map(Specifier)))
    }

    /// Closed range `>=min,<=max`
    pub fn closed(min: Version, max: Version) -> Self {
        Self::from_clauses([
            Specifier(VersionSpecifier::greater_than_equal_version(min.0)),
            Specifier(VersionSpecifier::less_than_equal_version(max.0)),
        ])
    }

    fn from_clauses(clauses: impl IntoIterator<Item = Specifier>) -> Self {
        let specifiers: BTreeSet<Specifier> = clauses.into_iter().collect();
        let prereleases = specifiers.iter().any(Specifier::names_prerelease);
        Self {
            specifiers,
            prereleases,
        }
    }

    /// True if no comparison is present
    pub fn is_unconstrained(&self) -> bool {
        self.specifiers.is_empty()
    }

    /// Constraint accepting exactly the versions both operands accept
    pub fn intersect(&self, other: &VersionConstraint) -> VersionConstraint {
        Self {
            specifiers: self
                .specifiers
                .union(&other.specifiers)
                .cloned()
                .collect(),
            prereleases: self.prereleases && other.prereleases,
        }
    }

    /// Check if a version matches this constraint
    pub fn matches(&self, version: &Version) -> bool {
        if version.is_prerelease() && !self.prereleases {
            return false;
        }
        self.specifiers.iter().all(|spec| spec.0.contains(&version.0))
    }

    /// Version to query metadata for when a node carries this range
    ///
    /// Prefers a lower bound, then an exact pin. `None` means "latest".
    pub fn base_version(&self) -> Option<Version> {
        let find = |wanted: &[Operator]| {
            self.specifiers
                .iter()
                .find(|spec| wanted.contains(spec.0.operator()))
        };
        find(&[
            Operator::GreaterThanEqual,
            Operator::GreaterThan,
            Operator::TildeEqual,
        ])
        .or_else(|| find(&[Operator::Equal, Operator::ExactEqual]))
        .map(|spec| Version(spec.0.version().clone()))
    }
}

impl FromStr for VersionConstraint {
    type Err = DepGraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let clauses: Vec<String> = self.specifiers.iter().map(|s| s.0.to_string()).collect();
        f.write_str(&clauses.join(","))
    }
}

impl Serialize for VersionConstraint {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for VersionConstraint {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        VersionConstraint::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Parse and sort the entries of `candidates` accepted by `constraint`.
/// Entries that are not valid versions are skipped.
pub fn filter_versions<S: AsRef<str>>(candidates: &[S], constraint: &VersionConstraint) -> Vec<Version> {
    let mut accepted: Vec<Version> = candidates
        .iter()
        .filter_map(|raw| Version::parse(raw.as_ref()).ok())
        .filter(|version| constraint.matches(version))
        .collect();
    accepted.sort();
    accepted.dedup();
    accepted
}

/// Re-express `constraint` as the closed range spanned by the published
/// versions it accepts.
pub fn narrow_to_observed_range<S: AsRef<str>>(
    candidates: &[S],
    constraint: &VersionConstraint,
) -> Result<VersionConstraint, Unsatisfiable> {
    let accepted = filter_versions(candidates, constraint);
    match (accepted.first(), accepted.last()) {
        (Some(min), Some(max)) => Ok(VersionConstraint::closed(min.clone(), max.clone())),
        _ => Err(Unsatisfiable {
            constraint: constraint.clone(),
        }),
    }
}

/// How a recorded version string constrains its package
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstraintKind {
    /// Nothing recorded yet
    Unset,
    /// An exact version, written either bare or as `==X`
    Bare(String),
    /// Anything carrying a comparison
    Ranged(String),
}

impl ConstraintKind {
    pub fn classify(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() {
            return ConstraintKind::Unset;
        }
        let has_operator = |s: &str| s.contains(['<', '>', '!', '~', '=', ',', '*']);
        if !has_operator(raw) {
            return ConstraintKind::Bare(raw.to_string());
        }
        if let Some(pinned) = raw.strip_prefix("==") {
            let pinned = pinned.trim();
            if !pinned.is_empty() && !has_operator(pinned) {
                return ConstraintKind::Bare(pinned.to_string());
            }
        }
        ConstraintKind::Ranged(raw.to_string())
    }
}

/// True if `raw` carries no comparison operator
pub fn is_bare(raw: &str) -> bool {
    !matches!(ConstraintKind::classify(raw), ConstraintKind::Ranged(_))
}
