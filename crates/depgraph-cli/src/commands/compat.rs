use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use depgraph_core::config::DepGraphConfig;
use depgraph_core::requirements::Requirements;
use depgraph_core::version::Version;
use depgraph_resolver::{release_source, runtime_window, CompatibilityChecker, PyPIClient};

use crate::output::{
    format_recommendations, format_runtime_range, format_unprocessed, format_warning,
    format_window,
};
use crate::progress::ProgressManager;
use crate::prompt;

use super::load_requirements;

/// Execute the compat command
pub async fn execute(
    config: &DepGraphConfig,
    requirements_path: &Path,
    target: Option<String>,
) -> Result<()> {
    let requirements = load_requirements(requirements_path).await?;
    report(config, &requirements, target).await
}

/// Print the supported interpreter range of the pins and the upgrades
/// needed to reach the target interpreter
pub(crate) async fn report(
    config: &DepGraphConfig,
    requirements: &Requirements,
    target: Option<String>,
) -> Result<()> {
    let registry = PyPIClient::new(&config.registry)?;
    let checker = CompatibilityChecker::new(&registry, config.registry.max_concurrent_requests);

    let mut progress = ProgressManager::new();
    progress.start_task("Reading Requires-Python metadata...");
    let ranges = checker.aggregate_ranges(requirements).await;
    progress.set_message("Listing Python releases...");
    let listed = release_source(&config.runtime, &config.registry)?
        .releases()
        .await;
    progress.finish_task("Metadata read");
    println!("{}", format_runtime_range(&ranges.aggregate));

    let releases = match listed {
        Ok(releases) => releases,
        Err(e) => {
            warn!("Could not list Python releases: {}", e);
            println!("{}", format_warning(&format!("Could not list Python releases: {}", e)));
            Vec::new()
        }
    };
    let window = runtime_window(&ranges.aggregate, &releases);
    match &window {
        Ok(window) => println!("{}", format_window(window)),
        Err(e) => println!("{}", format_warning(&e.to_string())),
    }
    if !ranges.unprocessed.is_empty() {
        println!("{}", format_unprocessed(&ranges.unprocessed));
    }

    let window_max = window.as_ref().ok().map(|window| &window.max);
    let raw_target = match target {
        Some(target) => target,
        None => prompt::target_runtime(window_max)?,
    };
    let target = Version::parse(raw_target.trim())
        .with_context(|| format!("Invalid target Python version '{}'", raw_target))?;
    debug!("Target Python {}", target);

    let recommendations = checker.recommend(&ranges, &target, window_max).await;
    println!("{}", format_recommendations(&target, &recommendations));

    let stats = checker.cache().stats();
    debug!(
        "{} registry requests ({} cached)",
        stats.network_requests, stats.cache_hits
    );
    Ok(())
}
