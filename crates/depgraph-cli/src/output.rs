//! Output formatting utilities for CLI

use console::style;

use depgraph_core::graph::PackageNode;
use depgraph_core::version::{Version, VersionConstraint};
use depgraph_resolver::{Recommendation, RuntimeWindow};

/// Format a graph node for display
pub fn format_node(node: &PackageNode) -> String {
    format!(
        "{} {}",
        style(&node.name).green(),
        style(&node.version).yellow()
    )
}

/// Format a version for display
pub fn format_version(version: &Version) -> String {
    style(version.to_string()).yellow().to_string()
}

/// Format the interpreter range shared by every pin
pub fn format_runtime_range(aggregate: &VersionConstraint) -> String {
    let range = if aggregate.is_unconstrained() {
        "any".to_string()
    } else {
        aggregate.to_string()
    };
    format!(
        "Compatible Python versions for all packages: {}",
        style(range).cyan()
    )
}

/// Format the oldest and newest supported interpreter releases
pub fn format_window(window: &RuntimeWindow) -> String {
    format!(
        "Minimum Python version: {}\nMaximum Python version: {}",
        format_version(&window.min),
        format_version(&window.max)
    )
}

/// Format requirement lines that were left out of the check
pub fn format_unprocessed(lines: &[String]) -> String {
    let mut output = format_warning("Could not process the following lines:");
    for line in lines {
        output.push_str(&format!("\n  {}", style(line).dim()));
    }
    output
}

/// Format the upgrade table for `target`
pub fn format_recommendations(target: &Version, recommendations: &[Recommendation]) -> String {
    if recommendations.is_empty() {
        return format_success(&format!("All pinned packages support Python {}", target));
    }

    let mut output = format_info("Upgrade the dependencies, like so:");
    for recommendation in recommendations {
        let line = match recommendation {
            Recommendation::Upgrade { package, version } => {
                format!("{}: {}", style(package).green(), style(version).yellow())
            }
            Recommendation::NotFound { package } => format!(
                "{}: {}",
                style(package).green(),
                style("No compatible version found").red()
            ),
        };
        output.push_str(&format!("\n  {}", line));
    }
    output
}

/// Format an error message
pub fn format_error(msg: &str) -> String {
    style(format!("Error: {}", msg)).red().to_string()
}

/// Format a success message
pub fn format_success(msg: &str) -> String {
    style(format!("Success: {}", msg)).green().to_string()
}

/// Format a warning message
pub fn format_warning(msg: &str) -> String {
    style(format!("Warning: {}", msg)).yellow().to_string()
}

/// Format an info message
pub fn format_info(msg: &str) -> String {
    style(msg).blue().to_string()
}
