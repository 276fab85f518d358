use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{DepGraphError, DepGraphResult};
use crate::graph::LookupMode;
use crate::logging::LoggingConfig;

/// File picked up from the working directory when no `--config` is given
pub const DEFAULT_CONFIG_FILE: &str = "depgraph.toml";

pub const ENV_REGISTRY_URL: &str = "DEPGRAPH_REGISTRY_URL";
pub const ENV_GRAPH_PATH: &str = "DEPGRAPH_GRAPH_PATH";
pub const ENV_TARGET_RUNTIME: &str = "DEPGRAPH_TARGET_RUNTIME";

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DepGraphConfig {
    pub registry: RegistryConfig,
    pub runtime: RuntimeConfig,
    pub resolver: ResolverConfig,
    pub graph: GraphConfig,
    pub logging: LoggingConfig,
    /// Target interpreter version; skips the interactive prompt when set
    pub target_runtime: Option<String>,
}

/// Package registry settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RegistryConfig {
    /// Base of the JSON API, without trailing slash
    pub url: String,
    /// Connect timeout in seconds
    pub connect_timeout: u64,
    /// Request timeout in seconds
    pub request_timeout: u64,
    /// Maximum number of concurrent prefetch requests
    pub max_concurrent_requests: usize,
    /// Whether to verify SSL certificates
    pub verify_ssl: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            url: "https://pypi.org/pypi".to_string(),
            connect_timeout: 10,
            request_timeout: 30,
            max_concurrent_requests: 8,
            verify_ssl: true,
        }
    }
}

/// Where interpreter releases come from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Downloads page listing interpreter releases
    pub listing_url: String,
    /// Fixed release list, used instead of the listing page when present
    pub releases: Option<Vec<String>>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            listing_url: "https://www.python.org/downloads/".to_string(),
            releases: None,
        }
    }
}

/// What to do when two exact pins for one package meet
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum BarePinPolicy {
    /// Keep the incoming pin without comparing
    #[default]
    LastWriteWins,
    /// Conflict unless both pins name the same version
    RequireEqual,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ResolverConfig {
    pub lookup: LookupMode,
    pub bare_pins: BarePinPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GraphConfig {
    /// JSON snapshot of the graph, merged into on every run
    pub path: PathBuf,
    /// Optional Graphviz export written after resolution
    pub dot_path: Option<PathBuf>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("depgraph.json"),
            dot_path: None,
        }
    }
}

impl DepGraphConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> DepGraphResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            DepGraphError::config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&contents)
    }

    /// Create config from TOML string
    pub fn from_toml(content: &str) -> DepGraphResult<Self> {
        toml::from_str(content).map_err(|e| DepGraphError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Convert config to TOML string
    pub fn to_toml(&self) -> DepGraphResult<String> {
        toml::to_string_pretty(self).map_err(|e| DepGraphError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Resolve the configuration for a run: an explicit file, else
    /// `depgraph.toml` in the working directory, else defaults. Environment
    /// overrides are applied last.
    pub fn load(explicit: Option<&Path>) -> DepGraphResult<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                debug!("Using {}", DEFAULT_CONFIG_FILE);
                Self::from_file(DEFAULT_CONFIG_FILE)?
            }
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a key lookup (the process environment in practice)
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_REGISTRY_URL) {
            self.registry.url = url;
        }
        if let Some(path) = lookup(ENV_GRAPH_PATH) {
            self.graph.path = PathBuf::from(path);
        }
        if let Some(target) = lookup(ENV_TARGET_RUNTIME) {
            self.target_runtime = Some(target);
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> DepGraphResult<()> {
        if self.registry.url.trim().is_empty() {
            return Err(DepGraphError::config("Registry URL must not be empty"));
        }
        if self.registry.max_concurrent_requests == 0 {
            return Err(DepGraphError::config(
                "max_concurrent_requests must be at least 1",
            ));
        }
        if self.graph.path.as_os_str().is_empty() {
            return Err(DepGraphError::config("Graph path must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = DepGraphConfig::default();
        assert_eq!(config.registry.url, "https://pypi.org/pypi");
        assert_eq!(config.resolver.lookup, LookupMode::Exact);
        assert_eq!(config.resolver.bare_pins, BarePinPolicy::LastWriteWins);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let config = DepGraphConfig::from_toml(
            r#"
target_runtime = "3.12"

[registry]
url = "http://localhost:8080/pypi"
max_concurrent_requests = 2

[resolver]
lookup = "prefix"
bare_pins = "require-equal"

[runtime]
releases = ["3.8.18", "3.9.18"]
"#,
        )
        .unwrap();
        assert_eq!(config.registry.url, "http://localhost:8080/pypi");
        assert_eq!(config.registry.request_timeout, 30);
        assert_eq!(config.resolver.lookup, LookupMode::Prefix);
        assert_eq!(config.resolver.bare_pins, BarePinPolicy::RequireEqual);
        assert_eq!(config.runtime.releases.as_deref().map(|r| r.len()), Some(2));
        assert_eq!(config.target_runtime.as_deref(), Some("3.12"));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = DepGraphConfig::default();
        let text = config.to_toml().unwrap();
        assert_eq!(DepGraphConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_REGISTRY_URL, "http://mirror/pypi"),
            (ENV_GRAPH_PATH, "/tmp/g.json"),
        ]
        .into_iter()
        .collect();
        let mut config = DepGraphConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.registry.url, "http://mirror/pypi");
        assert_eq!(config.graph.path, PathBuf::from("/tmp/g.json"));
        assert_eq!(config.target_runtime, None);
    }

    #[test]
    fn test_invalid_config() {
        let mut config = DepGraphConfig::default();
        config.registry.max_concurrent_requests = 0;
        assert!(matches!(config.validate(), Err(DepGraphError::Config(_))));
        assert!(DepGraphConfig::from_toml("registry = 5").is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[graph]\npath = \"out/graph.json\"").unwrap();
        let config = DepGraphConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.graph.path, PathBuf::from("out/graph.json"));
        assert!(DepGraphConfig::load(Some(Path::new("/nonexistent/depgraph.toml"))).is_err());
    }
}
