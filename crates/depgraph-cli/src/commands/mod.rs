pub mod check;
pub mod compat;
pub mod graph;

pub use check::execute as execute_check;
pub use compat::execute as execute_compat;
pub use graph::execute as execute_graph;

use std::path::Path;

use anyhow::Result;

use depgraph_core::requirements::Requirements;

use crate::output::format_warning;

/// Read the pinned requirements, warning about lines that are not pins
pub(crate) async fn load_requirements(path: &Path) -> Result<Requirements> {
    let requirements = Requirements::from_file(path).await?;
    if requirements.is_empty() {
        println!(
            "{}",
            format_warning(&format!("No pinned packages in {}", path.display()))
        );
    }
    Ok(requirements)
}
