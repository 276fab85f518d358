use std::io;
use thiserror::Error;

/// Custom result type for depgraph operations
pub type DepGraphResult<T> = Result<T, DepGraphError>;

/// Custom error type for depgraph operations
#[derive(Debug, Error)]
pub enum DepGraphError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Package error: {0}")]
    Package(String),

    #[error("Version error: {0}")]
    Version(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Graph store error: {0}")]
    Store(String),

    /// Two requests for the same package could not be reconciled.
    #[error("Change the versions of {package}/{dependency}, currently incompatible (rejected {candidate})")]
    Conflict {
        package: String,
        dependency: String,
        candidate: String,
    },

    /// A pinned requirement clashes with what earlier requests recorded.
    #[error("Change the pinned version of {package}, currently incompatible with {recorded} (rejected {candidate})")]
    PinConflict {
        package: String,
        recorded: String,
        candidate: String,
    },
}

impl DepGraphError {
    /// Create a new network error
    pub fn network<S: Into<String>>(msg: S) -> Self {
        DepGraphError::Network(msg.into())
    }

    /// Create a new package error
    pub fn package<S: Into<String>>(msg: S) -> Self {
        DepGraphError::Package(msg.into())
    }

    /// Create a new version error
    pub fn version<S: Into<String>>(msg: S) -> Self {
        DepGraphError::Version(msg.into())
    }

    /// Create a new parse error
    pub fn parse<S: Into<String>>(msg: S) -> Self {
        DepGraphError::Parse(msg.into())
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        DepGraphError::Config(msg.into())
    }

    /// Create a new serialization error
    pub fn serialization<S: Into<String>>(msg: S) -> Self {
        DepGraphError::Serialization(msg.into())
    }

    /// Create a new graph store error
    pub fn store<S: Into<String>>(msg: S) -> Self {
        DepGraphError::Store(msg.into())
    }

    /// Create a new conflict error
    pub fn conflict(
        package: impl Into<String>,
        dependency: impl Into<String>,
        candidate: impl Into<String>,
    ) -> Self {
        DepGraphError::Conflict {
            package: package.into(),
            dependency: dependency.into(),
            candidate: candidate.into(),
        }
    }

    /// Create a conflict error for a pinned requirement
    pub fn pin_conflict(
        package: impl Into<String>,
        recorded: impl Into<String>,
        candidate: impl Into<String>,
    ) -> Self {
        DepGraphError::PinConflict {
            package: package.into(),
            recorded: recorded.into(),
            candidate: candidate.into(),
        }
    }

    /// Whether this error must abort the whole resolution run
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            DepGraphError::Conflict { .. } | DepGraphError::PinConflict { .. }
        )
    }
}

impl From<serde_json::Error> for DepGraphError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for DepGraphError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::ser::Error> for DepGraphError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<io::Error> for DepGraphError {
    fn from(err: io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
