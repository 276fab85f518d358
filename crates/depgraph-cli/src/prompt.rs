//! Interactive questions.

use anyhow::{bail, Result};
use dialoguer::theme::ColorfulTheme;
use dialoguer::Input;

use depgraph_core::version::Version;

/// Ask for the interpreter version to upgrade to.
///
/// Offers the newest compatible release as the default answer. Fails when
/// nobody is at the terminal to answer.
pub(crate) fn target_runtime(newest_compatible: Option<&Version>) -> Result<String> {
    if !console::user_attended() {
        bail!(
            "No target Python version given; pass --target or set {}",
            depgraph_core::config::ENV_TARGET_RUNTIME
        );
    }

    let theme = ColorfulTheme::default();
    let mut input = Input::<String>::with_theme(&theme)
        .with_prompt("Enter the target Python version you want to upgrade to (e.g., 3.12)")
        .validate_with(|value: &String| validate_target(value));
    if let Some(version) = newest_compatible {
        input = input.default(version.to_string());
    }
    Ok(input.interact_text()?)
}

fn validate_target(value: &str) -> Result<(), String> {
    Version::parse(value.trim())
        .map(|_| ())
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_target() {
        assert!(validate_target("3.12").is_ok());
        assert!(validate_target(" 3.9 ").is_ok());
        assert!(validate_target("three").is_err());
        assert!(validate_target("").is_err());
    }
}
