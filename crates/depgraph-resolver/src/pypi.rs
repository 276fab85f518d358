use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use depgraph_core::config::RegistryConfig;
use depgraph_core::error::{DepGraphError, DepGraphResult};
use depgraph_core::package::{PackageMetadata, PackageName};

use crate::registry::Registry;

/// PyPI JSON API client
#[derive(Debug, Clone)]
pub struct PyPIClient {
    client: Client,
    base_url: Url,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PyPIResponse {
    info: PackageInfo,
    #[serde(default)]
    releases: HashMap<String, Vec<ReleaseFile>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PackageInfo {
    name: String,
    version: String,
    requires_python: Option<String>,
    requires_dist: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ReleaseFile {
    #[serde(default)]
    yanked: bool,
}

// Helper function to convert reqwest errors to DepGraphError
fn handle_reqwest_error(err: reqwest::Error) -> DepGraphError {
    DepGraphError::network(err.to_string())
}

impl PyPIClient {
    /// Create a new PyPI client
    pub fn new(config: &RegistryConfig) -> DepGraphResult<Self> {
        let base_url = Url::parse(config.url.trim_end_matches('/')).map_err(|e| {
            DepGraphError::config(format!("Invalid registry URL '{}': {}", config.url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(DepGraphError::config(format!(
                "Registry URL '{}' cannot carry a path",
                config.url
            )));
        }

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout))
            .timeout(Duration::from_secs(config.request_timeout))
            .danger_accept_invalid_certs(!config.verify_ssl)
            .user_agent(concat!("depgraph/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(handle_reqwest_error)?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> DepGraphResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| DepGraphError::config(format!("Invalid registry URL {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments)
            .push("json");
        Ok(url)
    }

    async fn fetch(&self, url: Url, what: &str) -> DepGraphResult<PyPIResponse> {
        debug!("Fetching {} from {}", what, url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(handle_reqwest_error)?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => {
                return Err(DepGraphError::package(format!("Package not found: {}", what)));
            }
            status => {
                return Err(DepGraphError::network(format!(
                    "Registry returned {} for {}",
                    status, what
                )));
            }
        }

        response
            .json()
            .await
            .map_err(|e| DepGraphError::package(format!("Invalid package metadata for {}: {}", what, e)))
    }
}

#[async_trait]
impl Registry for PyPIClient {
    async fn get_metadata(
        &self,
        name: &PackageName,
        version: Option<&str>,
    ) -> DepGraphResult<PackageMetadata> {
        let (url, what) = match version {
            Some(version) => (
                self.endpoint(&[name.as_str(), version])?,
                format!("{}=={}", name, version),
            ),
            None => (self.endpoint(&[name.as_str()])?, name.to_string()),
        };
        let data = self.fetch(url, &what).await?;

        let mut metadata = PackageMetadata::new(data.info.name, data.info.version)
            .with_dependencies(data.info.requires_dist.unwrap_or_default());
        metadata.requires_python = data.info.requires_python;
        Ok(metadata)
    }

    async fn get_published_versions(&self, name: &PackageName) -> DepGraphResult<Vec<String>> {
        let data = self.fetch(self.endpoint(&[name.as_str()])?, name.as_str()).await?;

        let mut versions: Vec<String> = data
            .releases
            .into_iter()
            // Skip yanked releases
            .filter(|(_, files)| !files.iter().any(|file| file.yanked))
            .map(|(version, _)| version)
            .collect();
        versions.sort();
        Ok(versions)
    }
}
