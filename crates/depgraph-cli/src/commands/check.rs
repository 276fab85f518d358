use std::path::Path;

use anyhow::Result;
use tracing::debug;

use depgraph_core::config::DepGraphConfig;

use super::{compat, graph, load_requirements};

/// Execute the check command
///
/// The compatibility report only runs once the graph resolved without a
/// conflict.
pub async fn execute(
    config: &DepGraphConfig,
    requirements_path: &Path,
    dot: Option<&Path>,
    target: Option<String>,
) -> Result<()> {
    debug!("Checking {}", requirements_path.display());
    let requirements = load_requirements(requirements_path).await?;

    graph::build(config, &requirements, dot, false).await?;
    println!();
    compat::report(config, &requirements, target).await
}
