//! Parsing of `Requires-Dist` lines from registry metadata.

use std::str::FromStr;

use pep508_rs::{Requirement, VersionOrUrl};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::package::PackageName;

/// A mandatory dependency declared by a release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredDependency {
    pub name: PackageName,
    /// Version expression with whitespace removed, e.g. `>=2.5,<4`
    pub constraint: String,
}

/// True if the requirement only applies when an optional extra is requested.
///
/// Environment markers are taken as satisfied; only `extra` clauses decide.
fn requires_extra(requirement: &Requirement) -> bool {
    !requirement.marker.evaluate_optional_environment(None, &[])
}

/// Parse one raw dependency line into a name and constraint.
///
/// Returns `None` for extras-gated lines and for anything without a usable
/// version expression (bare names, URL requirements, garbage).
pub fn parse_dependency(line: &str) -> Option<DeclaredDependency> {
    let requirement = match Requirement::from_str(line) {
        Ok(requirement) => requirement,
        Err(e) => {
            debug!("Skipping unparseable dependency '{}': {}", line, e);
            return None;
        }
    };

    if requires_extra(&requirement) {
        return None;
    }

    // Extras on the name do not change what is required of the package itself.
    let specifiers = match &requirement.version_or_url {
        Some(VersionOrUrl::VersionSpecifier(specifiers)) if !specifiers.is_empty() => specifiers,
        _ => {
            debug!("Skipping dependency without version expression: {}", line);
            return None;
        }
    };

    let name = PackageName::new(&requirement.name.to_string()).ok()?;
    Some(DeclaredDependency {
        name,
        constraint: specifiers.to_string().split_whitespace().collect(),
    })
}

/// Parse a whole `Requires-Dist` list.
///
/// Order of first appearance is kept; a later line for the same package
/// replaces the earlier constraint.
pub fn parse_dependencies<S: AsRef<str>>(lines: &[S]) -> Vec<DeclaredDependency> {
    let mut parsed: Vec<DeclaredDependency> = Vec::new();
    for dependency in lines.iter().filter_map(|line| parse_dependency(line.as_ref())) {
        match parsed.iter_mut().find(|existing| existing.name == dependency.name) {
            Some(existing) => existing.constraint = dependency.constraint,
            None => parsed.push(dependency),
        }
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(line: &str) -> Option<(String, String)> {
        parse_dependency(line).map(|dep| (dep.name.to_string(), dep.constraint))
    }

    #[test]
    fn test_name_with_parenthesized_expression() {
        assert_eq!(
            parsed("chardet (<4,>=3.0.2)"),
            Some(("chardet".into(), "<4,>=3.0.2".into()))
        );
    }

    #[test]
    fn test_name_with_spaced_expression() {
        assert_eq!(
            parsed("idna >= 2.5, < 4"),
            Some(("idna".into(), ">=2.5,<4".into()))
        );
    }

    #[test]
    fn test_inline_operator() {
        assert_eq!(parsed("certifi>=2017.4.17"), Some(("certifi".into(), ">=2017.4.17".into())));
        assert_eq!(parsed("urllib3<3"), Some(("urllib3".into(), "<3".into())));
        assert_eq!(
            parsed("charset_normalizer<4,>=2"),
            Some(("charset-normalizer".into(), "<4,>=2".into()))
        );
    }

    #[test]
    fn test_environment_marker_is_stripped() {
        assert_eq!(
            parsed("importlib-metadata>=3.6; python_version < \"3.10\""),
            Some(("importlib-metadata".into(), ">=3.6".into()))
        );
    }

    #[test]
    fn test_extra_gated_lines_are_excluded() {
        assert_eq!(parsed("PySocks!=1.5.7,>=1.5.6; extra == \"socks\""), None);
        assert_eq!(parsed("pytest>=7 ; (extra=='test')"), None);
        assert_eq!(
            parsed("pytest>=7; python_version >= \"3.8\" and extra == \"test\""),
            None
        );
        assert_eq!(
            parsed("extras-helper>=1.0; python_version >= \"3.8\""),
            Some(("extras-helper".into(), ">=1.0".into()))
        );
        assert_eq!(
            parsed("extras-helper>=1.0"),
            Some(("extras-helper".into(), ">=1.0".into()))
        );
    }

    #[test]
    fn test_extras_on_name_are_dropped() {
        assert_eq!(
            parsed("requests[socks]>=2.0"),
            Some(("requests".into(), ">=2.0".into()))
        );
    }

    #[test]
    fn test_unusable_lines() {
        assert_eq!(parsed("typing-extensions"), None);
        assert_eq!(parsed("pkg @ https://example.com/pkg.whl"), None);
        assert_eq!(parsed(""), None);
        assert_eq!(parsed(">=1.0"), None);
    }

    #[test]
    fn test_space_separated_version_is_rejected() {
        assert_eq!(parsed("six 1.16.0"), None);
    }

    #[test]
    fn test_parse_dependencies_keeps_order_and_last_value() {
        let lines = [
            "b>=1.0",
            "a<2",
            "dev-tool>=1; extra == \"dev\"",
            "B>=1.5",
            "noversion",
        ];
        let deps = parse_dependencies(&lines);
        let names: Vec<&str> = deps.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(deps[0].constraint, ">=1.5");
    }
}
