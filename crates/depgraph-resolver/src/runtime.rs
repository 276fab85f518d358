//! Listing of published interpreter releases.

use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use tracing::{debug, info};

use depgraph_core::config::{RegistryConfig, RuntimeConfig};
use depgraph_core::error::{DepGraphError, DepGraphResult};
use depgraph_core::version::Version;

static RELEASE_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<span class="release-number">(.*?)</span>"#)
        .expect("release-number pattern is valid")
});

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"));

/// Source of known interpreter releases
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RuntimeReleaseSource: Send + Sync {
    /// All known releases, sorted ascending without duplicates
    async fn releases(&self) -> DepGraphResult<Vec<Version>>;
}

/// Scrapes the python.org downloads page
#[derive(Debug, Clone)]
pub struct PythonOrgReleases {
    client: Client,
    url: String,
}

impl PythonOrgReleases {
    pub fn new(url: impl Into<String>, registry: &RegistryConfig) -> DepGraphResult<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(registry.connect_timeout))
            .timeout(Duration::from_secs(registry.request_timeout))
            .danger_accept_invalid_certs(!registry.verify_ssl)
            .build()
            .map_err(|e| DepGraphError::network(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl RuntimeReleaseSource for PythonOrgReleases {
    async fn releases(&self) -> DepGraphResult<Vec<Version>> {
        debug!("Fetching interpreter releases from {}", self.url);
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| DepGraphError::network(e.to_string()))?;
        if !response.status().is_success() {
            return Err(DepGraphError::network(format!(
                "Release listing returned {} from {}",
                response.status(),
                self.url
            )));
        }
        let html = response
            .text()
            .await
            .map_err(|e| DepGraphError::network(e.to_string()))?;

        let releases = parse_release_listing(&html);
        info!("Found {} interpreter releases", releases.len());
        Ok(releases)
    }
}

/// Fixed release list from the configuration
#[derive(Debug, Clone, Default)]
pub struct StaticReleases {
    releases: Vec<String>,
}

impl StaticReleases {
    pub fn new<I, S>(releases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            releases: releases.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl RuntimeReleaseSource for StaticReleases {
    async fn releases(&self) -> DepGraphResult<Vec<Version>> {
        Ok(normalize_releases(self.releases.iter().map(String::as_str)))
    }
}

/// Release source selected by the configuration
pub fn release_source(
    runtime: &RuntimeConfig,
    registry: &RegistryConfig,
) -> DepGraphResult<Box<dyn RuntimeReleaseSource>> {
    match &runtime.releases {
        Some(releases) => Ok(Box::new(StaticReleases::new(releases.iter().cloned()))),
        None => Ok(Box::new(PythonOrgReleases::new(&runtime.listing_url, registry)?)),
    }
}

/// Extract release numbers from the downloads page markup
pub fn parse_release_listing(html: &str) -> Vec<Version> {
    let labels: Vec<String> = RELEASE_NUMBER
        .captures_iter(html)
        .map(|caps| TAG.replace_all(&caps[1], "").trim().to_string())
        .collect();
    normalize_releases(
        labels
            .iter()
            .map(|label| label.trim_start_matches("Python").trim()),
    )
}

fn normalize_releases<'a>(labels: impl Iterator<Item = &'a str>) -> Vec<Version> {
    let mut releases: Vec<Version> = labels.filter_map(|label| Version::parse(label).ok()).collect();
    releases.sort();
    releases.dedup();
    releases
}
