use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DepGraphError, DepGraphResult};
use crate::version::{Version, VersionConstraint};

/// Normalized package name (PEP 503)
///
/// Lowercased, with runs of `-`, `_` and `.` collapsed to a single `-`.
/// This is the key nodes are stored under.
#[derive(Debug, Clone, Hash, Eq, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageName(String);

impl PackageName {
    pub fn new(name: &str) -> DepGraphResult<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DepGraphError::package("Empty package name"));
        }
        if !name
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.'))
        {
            return Err(DepGraphError::package(format!("Invalid package name '{}'", name)));
        }

        let mut normalized = String::with_capacity(name.len());
        let mut in_separator = false;
        for ch in name.chars() {
            if matches!(ch, '-' | '_' | '.') {
                if !in_separator {
                    normalized.push('-');
                }
                in_separator = true;
            } else {
                normalized.push(ch.to_ascii_lowercase());
                in_separator = false;
            }
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for PackageName {
    type Err = DepGraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PackageName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A `name==version` line from a requirements file
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct Pin {
    name: PackageName,
    version: String,
}

impl Pin {
    pub fn new(name: PackageName, version: impl Into<String>) -> Self {
        Self {
            name,
            version: version.into(),
        }
    }

    pub fn name(&self) -> &PackageName {
        &self.name
    }

    /// The pinned version exactly as written
    pub fn version(&self) -> &str {
        &self.version
    }
}

impl fmt::Display for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}=={}", self.name, self.version)
    }
}

/// Registry metadata for one release of a package
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageMetadata {
    /// Package name as published
    pub name: String,
    /// Release this metadata describes
    pub version: String,
    /// Raw `Requires-Dist` lines
    pub declared_dependencies: Vec<String>,
    /// Raw `Requires-Python` value
    pub requires_python: Option<String>,
}

impl PackageMetadata {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            declared_dependencies: Vec::new(),
            requires_python: None,
        }
    }

    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.declared_dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_requires_python(mut self, requires_python: impl Into<String>) -> Self {
        self.requires_python = Some(requires_python.into());
        self
    }

    /// Declared interpreter range; a missing or blank value is unconstrained
    pub fn python_constraint(&self) -> DepGraphResult<VersionConstraint> {
        match self.requires_python.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => VersionConstraint::parse(raw),
            _ => Ok(VersionConstraint::any()),
        }
    }

    /// Check if this release supports the given interpreter version
    pub fn is_python_compatible(&self, version: &Version) -> DepGraphResult<bool> {
        Ok(self.python_constraint()?.matches(version))
    }
}
