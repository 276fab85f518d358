use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, error};

use depgraph_core::config::DepGraphConfig;
use depgraph_core::graph::JsonGraphStore;
use depgraph_core::requirements::Requirements;
use depgraph_resolver::{GraphResolver, PyPIClient, ResolverOptions};

use crate::output::{format_info, format_node, format_success};
use crate::progress::ProgressManager;

use super::load_requirements;

/// Execute the graph command
pub async fn execute(
    config: &DepGraphConfig,
    requirements_path: &Path,
    dot: Option<&Path>,
    json: bool,
) -> Result<()> {
    let requirements = load_requirements(requirements_path).await?;
    build(config, &requirements, dot, json).await
}

/// Resolve the pins into the configured graph store
pub(crate) async fn build(
    config: &DepGraphConfig,
    requirements: &Requirements,
    dot: Option<&Path>,
    json: bool,
) -> Result<()> {
    let registry = PyPIClient::new(&config.registry)?;
    let resolver = GraphResolver::new(registry, ResolverOptions::from(config));
    let mut store = JsonGraphStore::open(&config.graph.path, config.resolver.lookup).await?;
    debug!("Graph store at {}", store.path().display());

    let mut progress = ProgressManager::new();
    progress.start_resolution(requirements.pins.len());
    let metrics = match resolver
        .resolve_requirements(&mut store, &requirements.pins)
        .await
    {
        Ok(metrics) => {
            progress.finish_resolution();
            metrics
        }
        Err(e) => {
            progress.abandon_resolution();
            error!("Resolution stopped: {}", e);
            return Err(e.into());
        }
    };

    let graph = store.graph();
    println!(
        "{}",
        format_success(&format!(
            "Graph written to {} ({} packages, {} edges)",
            store.path().display(),
            graph.node_count(),
            graph.edge_count()
        ))
    );
    for pin in &requirements.pins {
        if let Some(node) = graph.node(pin.name()) {
            println!("  {}", format_node(node));
        }
    }
    if json {
        println!("{}", serde_json::to_string_pretty(&metrics)?);
    } else {
        println!("{}", format_info(&metrics.to_string()));
    }

    if let Some(dot_path) = dot.or(config.graph.dot_path.as_deref()) {
        tokio::fs::write(dot_path, graph.to_dot())
            .await
            .with_context(|| format!("Failed to write {}", dot_path.display()))?;
        println!(
            "{}",
            format_success(&format!("DOT graph written to {}", dot_path.display()))
        );
    }

    Ok(())
}
